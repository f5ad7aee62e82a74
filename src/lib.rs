// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! HTTP contract validation against declared request/response transactions.
//!
//! This library provides the core functionality for vet-http: contract
//! loading, transaction matching, response capture, per-exchange middleware
//! orchestration and a validating reverse proxy built on top of it.

pub mod capture;
pub mod compare;
pub mod config;
pub mod error;
pub mod matcher;
pub mod middleware;
pub mod proxy;
pub mod report;
pub mod request;
pub mod result;
pub mod route;
pub mod source;
pub mod transaction;
pub mod validate;
pub mod vet;

#[cfg(test)]
mod test_helpers;

// Keep library small; main.rs remains the binary entrypoint.
