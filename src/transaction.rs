// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Contract transactions and the immutable transaction store.

use crate::error::LoadError;
use crate::route::RoutePattern;
use crate::source::ParseOutcome;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// One declared header. A contract may repeat a name to encode multiple
/// allowed values; `flatten_headers` collapses the list before comparison.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ContractHeader {
    pub name: String,
    pub value: String,
}

/// Request half of a contract transaction. `route` is compiled from
/// `uri_template` exactly once, at store build time.
#[derive(Debug, Clone)]
pub struct TransactionRequest {
    pub method: String,
    pub uri_template: String,
    pub route: RoutePattern,
    pub headers: Vec<ContractHeader>,
    pub body: String,
}

/// Response half of a contract transaction.
#[derive(Debug, Clone)]
pub struct TransactionResponse {
    pub status: u16,
    pub headers: Vec<ContractHeader>,
    pub body: String,
}

/// One contract-defined request/response pair. Immutable after load.
#[derive(Debug, Clone)]
pub struct Transaction {
    pub name: String,
    pub request: TransactionRequest,
    pub response: TransactionResponse,
}

/// Ordered, read-only sequence of transactions. Order is significant:
/// matching is first-match-wins, earlier contract entries shadow later ones.
#[derive(Debug, Default)]
pub struct TransactionStore {
    transactions: Vec<Transaction>,
}

impl TransactionStore {
    /// Build the store from parse output. Any parse error is fatal; parse
    /// warnings are logged and do not block readiness. Route compilation
    /// failures are load-time fatal, never deferred to request time.
    pub fn from_parse(outcome: ParseOutcome) -> Result<Self, LoadError> {
        if !outcome.errors.is_empty() {
            return Err(LoadError::Parse {
                errors: outcome.errors,
            });
        }
        for warning in &outcome.warnings {
            warn!(%warning, "contract parse warning");
        }

        let mut transactions = Vec::with_capacity(outcome.transactions.len());
        for spec in outcome.transactions {
            let route = RoutePattern::compile(&spec.request.uri)?;
            transactions.push(Transaction {
                name: spec.name,
                request: TransactionRequest {
                    method: spec.request.method,
                    uri_template: spec.request.uri,
                    route,
                    headers: spec.request.headers,
                    body: spec.request.body,
                },
                response: TransactionResponse {
                    status: spec.response.status,
                    headers: spec.response.headers,
                    body: spec.response.body,
                },
            });
        }
        Ok(Self { transactions })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Transaction> {
        self.transactions.iter()
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}
