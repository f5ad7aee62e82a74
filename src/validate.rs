// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Per-side validation glue: builds the real/expected message pair for the
//! comparator and normalizes its output.

use crate::capture::CapturedResponse;
use crate::compare::{flatten_headers, Comparator, HttpMessage, MessageKind};
use crate::error::Error;
use crate::request::RequestSnapshot;
use crate::result::{aggregate, ValidationResult};
use crate::transaction::Transaction;
use hyper::HeaderMap;
use std::collections::BTreeMap;

/// Validate a request snapshot against the matched transaction.
pub fn validate_request(
    comparator: &dyn Comparator,
    snapshot: &RequestSnapshot,
    transaction: &Transaction,
) -> Result<ValidationResult, Error> {
    let real = HttpMessage {
        method: Some(snapshot.method.clone()),
        uri: Some(snapshot.uri.clone()),
        status_code: None,
        headers: lowercase_headers(&snapshot.headers),
        body: snapshot.body.clone(),
    };
    let expected = HttpMessage {
        headers: flatten_headers(&transaction.request.headers),
        body: transaction.request.body.clone(),
        ..Default::default()
    };

    // Fast path first; the detailed diff runs only on non-conformance.
    if comparator.is_valid(&real, &expected, MessageKind::Request) {
        return Ok(ValidationResult::passing());
    }
    aggregate(
        "request",
        &comparator.validate(&real, &expected, MessageKind::Request),
    )
}

/// Validate a fully-captured response against the matched transaction.
pub fn validate_response(
    comparator: &dyn Comparator,
    captured: &CapturedResponse,
    transaction: &Transaction,
) -> Result<ValidationResult, Error> {
    let real = HttpMessage {
        status_code: Some(captured.status),
        headers: lowercase_headers(&captured.headers),
        body: captured.body.clone(),
        ..Default::default()
    };
    let expected = HttpMessage {
        status_code: Some(transaction.response.status),
        headers: flatten_headers(&transaction.response.headers),
        body: transaction.response.body.clone(),
        ..Default::default()
    };

    if comparator.is_valid(&real, &expected, MessageKind::Response) {
        return Ok(ValidationResult::passing());
    }
    aggregate(
        "response",
        &comparator.validate(&real, &expected, MessageKind::Response),
    )
}

fn lowercase_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    for (name, value) in headers {
        if let Ok(value) = value.to_str() {
            map.insert(name.as_str().to_ascii_lowercase(), value.to_string());
        }
    }
    map
}
