// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Path-template compiler for contract route patterns.
//!
//! Templates are plain paths with named segments (`/items/{id}` or
//! `/items/:id`) and optional trailing segments (`/items/{id?}`). The query
//! part of a template (`{?page}` or a literal `?`) is never part of matching.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("invalid route template '{template}': {message}")]
pub struct RouteError {
    pub template: String,
    pub message: String,
}

/// Path parameters captured during a match, in segment order.
pub type PathParams = Vec<(String, String)>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param { name: String, optional: bool },
}

/// A route pattern compiled once at contract load time.
#[derive(Debug, Clone)]
pub struct RoutePattern {
    template: String,
    segments: Vec<Segment>,
}

impl RoutePattern {
    pub fn compile(template: &str) -> Result<Self, RouteError> {
        let err = |message: &str| RouteError {
            template: template.to_string(),
            message: message.to_string(),
        };

        let path = strip_query(template);
        if !path.starts_with('/') {
            return Err(err("template must start with '/'"));
        }

        let mut segments = Vec::new();
        let mut seen_optional = false;
        for raw in path.split('/').filter(|s| !s.is_empty()) {
            let segment = parse_segment(raw).map_err(|m| err(&m))?;
            match &segment {
                Segment::Param { optional, .. } => {
                    if seen_optional && !optional {
                        return Err(err("required segment after optional segment"));
                    }
                    seen_optional = seen_optional || *optional;
                }
                Segment::Literal(_) if seen_optional => {
                    return Err(err("literal segment after optional segment"));
                }
                Segment::Literal(_) => {}
            }
            segments.push(segment);
        }

        Ok(Self {
            template: template.to_string(),
            segments,
        })
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn matches(&self, path: &str) -> bool {
        self.captures(path).is_some()
    }

    /// Match `path` against the pattern, ignoring any query string.
    /// Returns captured path parameters on success.
    pub fn captures(&self, path: &str) -> Option<PathParams> {
        let path = strip_query(path);
        let given: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        let mut params = Vec::new();
        let mut at = 0usize;
        for segment in &self.segments {
            match segment {
                Segment::Literal(lit) => {
                    if given.get(at).copied() != Some(lit.as_str()) {
                        return None;
                    }
                    at += 1;
                }
                Segment::Param { name, optional } => match given.get(at) {
                    Some(value) => {
                        params.push((name.clone(), (*value).to_string()));
                        at += 1;
                    }
                    None if *optional => {}
                    None => return None,
                },
            }
        }
        if at != given.len() {
            return None;
        }
        Some(params)
    }
}

fn parse_segment(raw: &str) -> Result<Segment, String> {
    let inner = if raw.starts_with('{') && raw.ends_with('}') {
        Some(&raw[1..raw.len() - 1])
    } else {
        raw.strip_prefix(':')
    };

    let Some(inner) = inner else {
        if raw.contains('{') || raw.contains('}') {
            return Err(format!(
                "segment '{raw}' mixes literal text and an expression"
            ));
        }
        return Ok(Segment::Literal(raw.to_string()));
    };

    let (name, optional) = match inner.strip_suffix('?') {
        Some(name) => (name, true),
        None => (inner, false),
    };
    if name.is_empty() {
        return Err(format!("segment '{raw}' has an empty parameter name"));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(format!("segment '{raw}' has an invalid parameter name"));
    }
    Ok(Segment::Param {
        name: name.to_string(),
        optional,
    })
}

// Cut a template or request path at its query part. A `?` inside a brace
// expression marks an optional segment, not a query string, and so does a
// `?` closing a `:name` segment.
fn strip_query(s: &str) -> &str {
    let bytes = s.as_bytes();
    let mut depth = 0usize;
    let mut colon_segment = false;
    let mut segment_start = true;
    for (i, c) in s.char_indices() {
        match c {
            '/' => {
                colon_segment = false;
                segment_start = true;
                continue;
            }
            '{' if s[i..].starts_with("{?") || s[i..].starts_with("{&") => return &s[..i],
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            ':' if depth == 0 && segment_start => colon_segment = true,
            '?' if depth == 0 => {
                let ends_segment = matches!(bytes.get(i + 1), None | Some(b'/'));
                if !(colon_segment && ends_segment) {
                    return &s[..i];
                }
            }
            _ => {}
        }
        segment_start = false;
    }
    s
}
