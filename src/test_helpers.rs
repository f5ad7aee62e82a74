// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Shared fixtures for unit tests.

use crate::capture::ResponseSink;
use crate::source::{ParseOutcome, RequestSpec, ResponseSpec, TransactionSpec};
use crate::transaction::{Transaction, TransactionStore};
use hyper::HeaderMap;

/// In-memory response sink that records everything done to it.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub status: u16,
    pub headers: HeaderMap,
    pub written: Vec<u8>,
    pub finish_calls: usize,
}

impl RecordingSink {
    pub fn with_status(status: u16) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }
}

impl ResponseSink for RecordingSink {
    fn status(&self) -> u16 {
        self.status
    }

    fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn write_chunk(&mut self, chunk: &[u8]) {
        self.written.extend_from_slice(chunk);
    }

    fn finish(&mut self) {
        self.finish_calls += 1;
    }
}

/// Minimal contract spec: no header or body requirements, response 200.
pub fn make_spec(method: &str, uri: &str) -> TransactionSpec {
    TransactionSpec {
        name: format!("{method} {uri}"),
        request: RequestSpec {
            method: method.into(),
            uri: uri.into(),
            headers: Vec::new(),
            body: String::new(),
        },
        response: ResponseSpec {
            status: 200,
            headers: Vec::new(),
            body: String::new(),
        },
    }
}

pub fn make_specs(routes: &[(&str, &str)]) -> Vec<TransactionSpec> {
    routes
        .iter()
        .map(|(method, uri)| make_spec(method, uri))
        .collect()
}

pub fn make_store(routes: &[(&str, &str)]) -> TransactionStore {
    let outcome = ParseOutcome {
        transactions: make_specs(routes),
        warnings: Vec::new(),
        errors: Vec::new(),
    };
    TransactionStore::from_parse(outcome).expect("test contract builds")
}

pub fn make_transaction(method: &str, uri: &str) -> Transaction {
    let store = make_store(&[(method, uri)]);
    let transaction = store.iter().next().expect("one transaction").clone();
    transaction
}
