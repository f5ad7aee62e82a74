// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Top-level facade tying source, matcher, comparator and middleware
//! together. Embedders that only need one entry point use this; everything
//! it does is also reachable through the individual modules.

use crate::capture::CapturedResponse;
use crate::compare::{BasicComparator, Comparator};
use crate::error::Error;
use crate::matcher::match_request;
use crate::middleware::{Middleware, Options};
use crate::request::InboundRequest;
use crate::result::ValidationResult;
use crate::source::{LazyStore, TransactionSource};
use crate::transaction::Transaction;
use crate::validate;
use std::sync::Arc;

/// One contract-validation context: a lazily-loaded store plus the
/// comparator used for every exchange. Cheap to clone.
#[derive(Clone)]
pub struct Vet {
    store: Arc<LazyStore>,
    comparator: Arc<dyn Comparator>,
}

impl Vet {
    /// Build with the default comparator.
    pub fn new(source: impl TransactionSource + 'static) -> Self {
        Self::with_comparator(source, Arc::new(BasicComparator))
    }

    pub fn with_comparator(
        source: impl TransactionSource + 'static,
        comparator: Arc<dyn Comparator>,
    ) -> Self {
        Self {
            store: Arc::new(LazyStore::new(source)),
            comparator,
        }
    }

    /// Force the contract to load now instead of on the first exchange.
    /// Useful to fail fast at startup on a broken contract.
    pub async fn ready(&self) -> Result<(), Error> {
        self.store.get().await?;
        Ok(())
    }

    /// Match a request against the contract. `None` means no transaction
    /// covers it.
    pub async fn match_request(
        &self,
        request: &(impl InboundRequest + ?Sized),
    ) -> Result<Option<Transaction>, Error> {
        let store = self.store.get().await?;
        Ok(match_request(request, &store).cloned())
    }

    /// Validate a request, matching on demand when no transaction is
    /// supplied. An unmatched request is a hard error here, not a finding.
    pub async fn validate_request(
        &self,
        request: &(impl InboundRequest + ?Sized),
        transaction: Option<&Transaction>,
    ) -> Result<ValidationResult, Error> {
        let snapshot = crate::request::RequestSnapshot::of(request);
        match transaction {
            Some(tx) => validate::validate_request(self.comparator.as_ref(), &snapshot, tx),
            None => {
                let store = self.store.get().await?;
                let tx = match_request(&snapshot, &store).ok_or_else(|| Error::NoMatch {
                    method: snapshot.method.clone(),
                    path: snapshot.path.clone(),
                })?;
                validate::validate_request(self.comparator.as_ref(), &snapshot, tx)
            }
        }
    }

    /// Validate an already-captured response against a known transaction.
    pub fn validate_response(
        &self,
        captured: &CapturedResponse,
        transaction: &Transaction,
    ) -> Result<ValidationResult, Error> {
        validate::validate_response(self.comparator.as_ref(), captured, transaction)
    }

    /// Build the exchange-interception middleware over this context.
    pub fn middleware(&self, options: Options) -> Middleware {
        Middleware::new(self.store.clone(), self.comparator.clone(), options)
    }
}
