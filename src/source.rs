// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Contract sources: discovery, loading and parsing into transactions.
//!
//! The pipeline treats a source as one asynchronous call producing a
//! `{transactions, warnings, errors}` triple. `FileSource` is the built-in
//! filesystem implementation (glob patterns over JSON contract documents);
//! anything else can plug in through `TransactionSource`.

use crate::error::{Error, LoadError};
use crate::transaction::{ContractHeader, TransactionStore};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Request half of a parsed transaction, before route compilation.
#[derive(Debug, Clone, Deserialize)]
pub struct RequestSpec {
    pub method: String,
    pub uri: String,
    #[serde(default)]
    pub headers: Vec<ContractHeader>,
    #[serde(default)]
    pub body: String,
}

/// Response half of a parsed transaction.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseSpec {
    pub status: u16,
    #[serde(default)]
    pub headers: Vec<ContractHeader>,
    #[serde(default)]
    pub body: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransactionSpec {
    #[serde(default)]
    pub name: String,
    pub request: RequestSpec,
    pub response: ResponseSpec,
}

#[derive(Debug, Clone, Deserialize)]
struct ContractDocument {
    #[serde(default)]
    transactions: Vec<TransactionSpec>,
}

/// Parse output triple. Any non-empty `errors` makes the whole contract
/// store unavailable; `warnings` are reported but non-blocking.
#[derive(Debug, Default)]
pub struct ParseOutcome {
    pub transactions: Vec<TransactionSpec>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

/// Asynchronous provider of parsed contract transactions.
#[async_trait]
pub trait TransactionSource: Send + Sync {
    async fn load(&self) -> Result<ParseOutcome, LoadError>;
}

/// Filesystem contract source: glob expansion, duplicate removal, async
/// reads, JSON parsing. Unreadable or unparsable files become parse errors.
pub struct FileSource {
    patterns: Vec<String>,
}

impl FileSource {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patterns: patterns.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl TransactionSource for FileSource {
    async fn load(&self) -> Result<ParseOutcome, LoadError> {
        let files = expand_globs(&self.patterns)?;
        if files.is_empty() {
            return Err(LoadError::NoFiles {
                pattern: self.patterns.join(", "),
            });
        }

        let mut outcome = ParseOutcome::default();
        for path in files {
            let raw = match tokio::fs::read_to_string(&path).await {
                Ok(raw) => raw,
                Err(e) => {
                    outcome.errors.push(format!("{path}: {e}"));
                    continue;
                }
            };
            match serde_json::from_str::<ContractDocument>(&raw) {
                Ok(doc) => outcome.transactions.extend(doc.transactions),
                Err(e) => outcome.errors.push(format!("{path}: {e}")),
            }
        }
        note_shadowed_transactions(&mut outcome);
        Ok(outcome)
    }
}

fn expand_globs(patterns: &[String]) -> Result<Vec<String>, LoadError> {
    let mut files = Vec::new();
    for pattern in patterns {
        let matches = glob::glob(pattern).map_err(|e| LoadError::Read {
            path: pattern.clone(),
            message: e.to_string(),
        })?;
        for entry in matches {
            let path = entry.map_err(|e| LoadError::Read {
                path: pattern.clone(),
                message: e.to_string(),
            })?;
            let path = path.to_string_lossy().into_owned();
            if !files.contains(&path) {
                files.push(path);
            }
        }
    }
    Ok(files)
}

// First-match-wins makes a later transaction with the same method and
// template dead; surface that as a parse warning.
fn note_shadowed_transactions(outcome: &mut ParseOutcome) {
    let mut seen: Vec<(String, String)> = Vec::new();
    for spec in &outcome.transactions {
        let key = (
            spec.request.method.to_ascii_uppercase(),
            spec.request.uri.clone(),
        );
        if seen.contains(&key) {
            outcome.warnings.push(format!(
                "transaction '{}' for {} {} is shadowed by an earlier entry",
                spec.name, spec.request.method, spec.request.uri
            ));
        } else {
            seen.push(key);
        }
    }
}

/// Shares one async source resolution across every consumer. The source is
/// consulted exactly once: the first load publishes either the immutable
/// store or the failure, and every later call observes that same result. A
/// failed load never becomes ready.
pub struct LazyStore {
    source: Box<dyn TransactionSource>,
    cell: OnceCell<Result<Arc<TransactionStore>, Error>>,
}

impl LazyStore {
    pub fn new(source: impl TransactionSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            cell: OnceCell::new(),
        }
    }

    pub async fn get(&self) -> Result<Arc<TransactionStore>, Error> {
        self.cell
            .get_or_init(|| async {
                let outcome = self.source.load().await?;
                Ok(Arc::new(TransactionStore::from_parse(outcome)?))
            })
            .await
            .clone()
    }
}
