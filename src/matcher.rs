// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Transaction matching: map an incoming request to the contract entry it
//! should be validated against.

use crate::request::InboundRequest;
use crate::transaction::{Transaction, TransactionStore};

/// Return the first transaction whose route matches the request path (query
/// string excluded) and whose method equals the request method. Ties resolve
/// to the earlier store entry. `None` is the expected no-match outcome, not
/// a failure. No HEAD/OPTIONS special-casing happens here; that policy lives
/// in the middleware.
pub fn match_request<'a>(
    request: &(impl InboundRequest + ?Sized),
    store: &'a TransactionStore,
) -> Option<&'a Transaction> {
    let method = request.method().to_ascii_uppercase();
    store.iter().find(|tx| {
        tx.request.route.matches(request.path()) && tx.request.method.to_ascii_uppercase() == method
    })
}
