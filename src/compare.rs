// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Comparator seam: the field-by-field conformance engine.
//!
//! The pipeline never inspects messages itself; it hands a real/expected
//! pair to a `Comparator` and normalizes whatever comes back. `is_valid` is
//! the fast path; the detailed `validate` call is made only after the fast
//! path reports non-conformance. `BasicComparator` is a deliberately small
//! built-in engine so the binary works without an external service.

use crate::transaction::ContractHeader;
use std::collections::BTreeMap;
use std::fmt;

pub const SEVERITY_ERROR: &str = "error";
pub const SEVERITY_WARNING: &str = "warning";

/// Which side of the exchange a message belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Request,
    Response,
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageKind::Request => f.write_str("request"),
            MessageKind::Response => f.write_str("response"),
        }
    }
}

/// Canonical message handed to the comparator. Header names are lowercase.
#[derive(Debug, Clone, Default)]
pub struct HttpMessage {
    pub method: Option<String>,
    pub uri: Option<String>,
    pub status_code: Option<u16>,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

/// One conformance finding. Severity is kept as the comparator produced it;
/// the aggregator rejects anything outside `error`/`warning`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub severity: String,
    pub message: String,
}

impl Finding {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: SEVERITY_ERROR.to_string(),
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: SEVERITY_WARNING.to_string(),
            message: message.into(),
        }
    }
}

/// Findings for one field group (`headers`, `body`, `statusCode`, ...).
#[derive(Debug, Clone, Default)]
pub struct FieldCheck {
    pub name: String,
    pub results: Vec<Finding>,
}

/// Structured comparator output: ordered field groups plus a format version
/// marker. The marker is not a field group and is skipped by aggregation.
#[derive(Debug, Clone)]
pub struct ComparatorOutput {
    pub version: String,
    pub fields: Vec<FieldCheck>,
}

impl Default for ComparatorOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl ComparatorOutput {
    pub fn new() -> Self {
        Self {
            version: "2".to_string(),
            fields: Vec::new(),
        }
    }

    /// Append a finding to a group, creating the group in encounter order.
    pub fn push(&mut self, group: &str, finding: Finding) {
        if let Some(field) = self.fields.iter_mut().find(|f| f.name == group) {
            field.results.push(finding);
        } else {
            self.fields.push(FieldCheck {
                name: group.to_string(),
                results: vec![finding],
            });
        }
    }

    pub fn is_clean(&self) -> bool {
        self.fields
            .iter()
            .filter(|f| f.name != "version")
            .all(|f| f.results.is_empty())
    }
}

/// Structural conformance engine between real and expected HTTP messages.
pub trait Comparator: Send + Sync {
    fn is_valid(&self, real: &HttpMessage, expected: &HttpMessage, kind: MessageKind) -> bool;
    fn validate(
        &self,
        real: &HttpMessage,
        expected: &HttpMessage,
        kind: MessageKind,
    ) -> ComparatorOutput;
}

/// Flatten a contract's declared header list into one canonical lowercase
/// mapping. Repeated names collapse into a comma-separated value.
pub fn flatten_headers(headers: &[ContractHeader]) -> BTreeMap<String, String> {
    let mut map: BTreeMap<String, String> = BTreeMap::new();
    for header in headers {
        let name = header.name.to_ascii_lowercase();
        match map.get_mut(&name) {
            Some(existing) => {
                existing.push_str(", ");
                existing.push_str(&header.value);
            }
            None => {
                map.insert(name, header.value.clone());
            }
        }
    }
    map
}

/// Minimal built-in comparator: expected-header equality, status equality,
/// and a required-property walk over JSON bodies. Only ever emits `error`
/// findings; anything subtler belongs to an external engine.
pub struct BasicComparator;

impl Comparator for BasicComparator {
    fn is_valid(&self, real: &HttpMessage, expected: &HttpMessage, kind: MessageKind) -> bool {
        headers_conform(real, expected)
            && (kind == MessageKind::Request || status_conforms(real, expected))
            && body_findings(real, expected).is_empty()
    }

    fn validate(
        &self,
        real: &HttpMessage,
        expected: &HttpMessage,
        kind: MessageKind,
    ) -> ComparatorOutput {
        let mut out = ComparatorOutput::new();

        for (name, want) in &expected.headers {
            match real.headers.get(name) {
                None => out.push(
                    "headers",
                    Finding::error(format!("Header '{name}' is missing")),
                ),
                Some(got) if got != want => out.push(
                    "headers",
                    Finding::error(format!(
                        "Header '{name}' has value '{got}' instead of '{want}'"
                    )),
                ),
                Some(_) => {}
            }
        }

        if kind == MessageKind::Response {
            if let Some(want) = expected.status_code {
                if real.status_code != Some(want) {
                    out.push(
                        "statusCode",
                        Finding::error(format!("Status code is not '{want}'")),
                    );
                }
            }
        }

        for finding in body_findings(real, expected) {
            out.push("body", finding);
        }

        out
    }
}

fn headers_conform(real: &HttpMessage, expected: &HttpMessage) -> bool {
    expected
        .headers
        .iter()
        .all(|(name, want)| real.headers.get(name) == Some(want))
}

fn status_conforms(real: &HttpMessage, expected: &HttpMessage) -> bool {
    match expected.status_code {
        Some(want) => real.status_code == Some(want),
        None => true,
    }
}

fn body_findings(real: &HttpMessage, expected: &HttpMessage) -> Vec<Finding> {
    if expected.body.is_empty() {
        return Vec::new();
    }

    let Ok(want) = serde_json::from_str::<serde_json::Value>(&expected.body) else {
        // Non-JSON contract body: exact text comparison.
        if real.body != expected.body {
            return vec![Finding::error("Body does not equal the expected value")];
        }
        return Vec::new();
    };

    let Ok(got) = serde_json::from_str::<serde_json::Value>(&real.body) else {
        return vec![Finding::error("Body is not parseable JSON")];
    };

    let mut findings = Vec::new();
    require_properties(&got, &want, "", &mut findings);
    findings
}

// The contract body acts as a schema by example: every property it declares
// must be present in the real body, recursively for nested objects. Values
// themselves are not compared.
fn require_properties(
    got: &serde_json::Value,
    want: &serde_json::Value,
    pointer: &str,
    findings: &mut Vec<Finding>,
) {
    let (serde_json::Value::Object(want_map), serde_json::Value::Object(got_map)) = (want, got)
    else {
        return;
    };
    for (key, want_value) in want_map {
        match got_map.get(key) {
            Some(got_value) => require_properties(
                got_value,
                want_value,
                &format!("{pointer}/{key}"),
                findings,
            ),
            None => findings.push(Finding::error(format!(
                "At '{pointer}/{key}' Missing required property: {key}"
            ))),
        }
    }
}
