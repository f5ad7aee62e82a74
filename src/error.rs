// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Error taxonomy for contract loading, matching and validation.

use thiserror::Error;

/// Fatal failure while resolving or parsing the contract source. The store
/// never becomes ready once one of these is produced. `Clone` lets the lazy
/// store hand the latched failure to every waiter.
#[derive(Debug, Clone, Error)]
pub enum LoadError {
    #[error("contract file or files not found on path: '{pattern}'")]
    NoFiles { pattern: String },

    #[error("failed to read contract source '{path}': {message}")]
    Read { path: String, message: String },

    #[error("contract parsing failed: {}", errors.join("; "))]
    Parse { errors: Vec<String> },

    #[error(transparent)]
    Route(#[from] crate::route::RouteError),
}

/// Errors surfaced by the validation pipeline.
///
/// Contract violations are never represented here; they come back as
/// `ValidationResult` data. `NoMatch` is expected-but-exceptional and is
/// commonly caught by integrations that want to pass unmatched traffic
/// through unvalidated.
#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("request does not match any contract transaction: {method} {path}")]
    NoMatch { method: String, path: String },

    /// The comparator violated its contract by reporting a severity outside
    /// `error`/`warning`. Always propagates, never coerced.
    #[error("comparator returned unexpected severity '{severity}' for finding '{message}'")]
    UnexpectedSeverity { severity: String, message: String },
}

impl Error {
    pub fn is_no_match(&self) -> bool {
        matches!(self, Error::NoMatch { .. })
    }
}
