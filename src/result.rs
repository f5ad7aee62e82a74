// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Normalization of comparator output into the canonical validation result.

use crate::compare::{ComparatorOutput, SEVERITY_ERROR, SEVERITY_WARNING};
use crate::error::Error;

pub const DEFAULT_GLUE: &str = "\n";

/// Canonical outcome of one validation call. `valid` is true exactly when
/// `errors` is empty; warnings never flip validity. Never mutated after
/// construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub valid: bool,
    pub message: String,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// The exact result for full conformance.
    pub fn passing() -> Self {
        Self {
            valid: true,
            message: String::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

/// Normalize comparator output under a section prefix, joining messages with
/// a newline.
pub fn aggregate(section_prefix: &str, output: &ComparatorOutput) -> Result<ValidationResult, Error> {
    aggregate_joined(section_prefix, output, DEFAULT_GLUE)
}

/// Like [`aggregate`] with a configurable glue string.
///
/// Walks every field group except the `version` marker; each finding becomes
/// `"[<prefix>.<group>] <message>"` and lands in `errors` or `warnings` by
/// severity. Any other severity means the comparator broke its contract and
/// fails hard. Clean output short-circuits to the passing result without
/// walking groups.
pub fn aggregate_joined(
    section_prefix: &str,
    output: &ComparatorOutput,
    glue: &str,
) -> Result<ValidationResult, Error> {
    if output.is_clean() {
        return Ok(ValidationResult::passing());
    }

    let mut messages = Vec::new();
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    for field in &output.fields {
        if field.name == "version" {
            continue;
        }
        for finding in &field.results {
            let line = format!("[{}.{}] {}", section_prefix, field.name, finding.message);
            match finding.severity.as_str() {
                SEVERITY_ERROR => errors.push(line.clone()),
                SEVERITY_WARNING => warnings.push(line.clone()),
                other => {
                    return Err(Error::UnexpectedSeverity {
                        severity: other.to_string(),
                        message: finding.message.clone(),
                    })
                }
            }
            messages.push(line);
        }
    }

    Ok(ValidationResult {
        valid: errors.is_empty(),
        message: messages.join(glue),
        errors,
        warnings,
    })
}
