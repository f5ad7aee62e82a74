// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Middleware orchestrator: snapshot, capture arming, matching, concurrent
//! per-side validation and reporting for one request/response exchange.
//!
//! Per-exchange lifecycle: INIT -> MATCHING -> VALIDATING -> REPORTED, with
//! an early INIT -> SKIPPED exit for requests excluded by policy. `handle`
//! does the synchronous part (skip check, snapshot, capture arming) and
//! hands back a future for the rest, so capture arming strictly precedes
//! everything else while the response path is never blocked.

use crate::capture::{BodyCapture, ObservedResponse, ResponseSink};
use crate::compare::Comparator;
use crate::error::Error;
use crate::matcher::match_request;
use crate::report::{report_result, LogReporter, Reporter, Side};
use crate::request::{InboundRequest, RequestSnapshot};
use crate::result::ValidationResult;
use crate::source::LazyStore;
use crate::validate::{validate_request, validate_response};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Participation and reporting configuration.
#[derive(Clone)]
pub struct Options {
    /// Validate the request side.
    pub request: bool,
    /// Validate the response side.
    pub response: bool,
    /// Skip validation entirely for OPTIONS requests (pre-flight noise).
    pub ignore_options: bool,
    pub reporter: Arc<dyn Reporter>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            request: true,
            response: true,
            ignore_options: true,
            reporter: Arc::new(LogReporter),
        }
    }
}

/// Final outcome of one orchestration run.
#[derive(Debug)]
pub enum Outcome {
    /// Excluded by policy before any interception began. A placeholder, not
    /// a validation result.
    Skipped,
    /// Both sides disabled; the transaction was resolved and nothing more.
    Unvalidated,
    Request(ValidationResult),
    Response(ValidationResult),
    /// Request result first, response result second.
    Both(ValidationResult, ValidationResult),
}

pub type OutcomeFuture = Pin<Box<dyn Future<Output = Result<Outcome, Error>> + Send>>;

/// What `handle` gives back: the decorated response to keep writing through,
/// and the future that resolves once validation and reporting finish.
pub struct Handling<S> {
    pub response: ObservedResponse<S>,
    pub outcome: OutcomeFuture,
}

/// The request/response interception point.
#[derive(Clone)]
pub struct Middleware {
    store: Arc<LazyStore>,
    comparator: Arc<dyn Comparator>,
    options: Options,
}

impl Middleware {
    pub fn new(store: Arc<LazyStore>, comparator: Arc<dyn Comparator>, options: Options) -> Self {
        Self {
            store,
            comparator,
            options,
        }
    }

    /// Intercept one exchange.
    ///
    /// Skipped requests get a passthrough wrapper and an immediate outcome;
    /// no snapshot is taken, no capture armed, no matching done. Otherwise
    /// the snapshot is taken before anything downstream can mutate the
    /// request, and the capture is armed before the response can start
    /// writing — even when response validation is disabled, since arming
    /// after the first write would silently lose bytes.
    pub fn handle<S: ResponseSink>(
        &self,
        request: &(impl InboundRequest + ?Sized),
        response: S,
    ) -> Handling<S> {
        if self.options.ignore_options && request.method().eq_ignore_ascii_case("OPTIONS") {
            return Handling {
                response: ObservedResponse::passthrough(response),
                outcome: Box::pin(std::future::ready(Ok(Outcome::Skipped))),
            };
        }

        let snapshot = RequestSnapshot::of(request);
        let (observed, capture) = ObservedResponse::arm(response);

        let store = self.store.clone();
        let comparator = self.comparator.clone();
        let options = self.options.clone();
        Handling {
            response: observed,
            outcome: Box::pin(run(snapshot, capture, store, comparator, options)),
        }
    }
}

async fn run(
    snapshot: RequestSnapshot,
    capture: BodyCapture,
    store: Arc<LazyStore>,
    comparator: Arc<dyn Comparator>,
    options: Options,
) -> Result<Outcome, Error> {
    // The source may still be loading; a load failure rejects every run.
    let store = store.get().await?;
    let matched = match_request(&snapshot, &store);

    if !options.request && !options.response {
        return Ok(Outcome::Unvalidated);
    }

    let transaction = match matched {
        Some(tx) => tx,
        None => {
            return Err(Error::NoMatch {
                method: snapshot.method.clone(),
                path: snapshot.path.clone(),
            })
        }
    };

    // Two independent branches joined on completion. The request branch has
    // everything it needs already; the response branch first waits for the
    // capture to resolve. Violations stay data; only collaborator defects
    // propagate as errors.
    let request_branch = async {
        if !options.request {
            return Ok::<_, Error>(None);
        }
        let result = validate_request(comparator.as_ref(), &snapshot, transaction)?;
        report_result(
            options.reporter.as_ref(),
            Side::Request,
            &snapshot.method,
            &snapshot.path,
            &result,
        );
        Ok(Some(result))
    };
    let response_branch = async {
        if !options.response {
            return Ok::<_, Error>(None);
        }
        let captured = capture.wait().await;
        let result = validate_response(comparator.as_ref(), &captured, transaction)?;
        report_result(
            options.reporter.as_ref(),
            Side::Response,
            &snapshot.method,
            &snapshot.path,
            &result,
        );
        Ok(Some(result))
    };

    let (request_result, response_result) = tokio::join!(request_branch, response_branch);
    match (request_result?, response_result?) {
        (Some(req), Some(resp)) => Ok(Outcome::Both(req, resp)),
        (Some(req), None) => Ok(Outcome::Request(req)),
        (None, Some(resp)) => Ok(Outcome::Response(resp)),
        (None, None) => Ok(Outcome::Unvalidated),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::{BasicComparator, ComparatorOutput, Finding, HttpMessage, MessageKind};
    use crate::report::{Level, Sinks};
    use crate::source::{LazyStore, ParseOutcome, TransactionSource};
    use crate::test_helpers::{make_specs, RecordingSink};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    struct CountingSource {
        specs: Vec<crate::source::TransactionSpec>,
        loads: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl TransactionSource for CountingSource {
        async fn load(&self) -> Result<ParseOutcome, crate::error::LoadError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok(ParseOutcome {
                transactions: self.specs.clone(),
                warnings: Vec::new(),
                errors: Vec::new(),
            })
        }
    }

    fn middleware_from(
        specs: Vec<crate::source::TransactionSpec>,
        options: Options,
    ) -> (Middleware, Arc<AtomicUsize>) {
        let loads = Arc::new(AtomicUsize::new(0));
        let source = CountingSource {
            specs,
            loads: loads.clone(),
        };
        let store = Arc::new(LazyStore::new(source));
        (
            Middleware::new(store, Arc::new(BasicComparator), options),
            loads,
        )
    }

    fn middleware_with(
        routes: &[(&str, &str)],
        options: Options,
    ) -> (Middleware, Arc<AtomicUsize>) {
        middleware_from(make_specs(routes), options)
    }

    fn collecting_options(seen: &Arc<Mutex<Vec<(Level, String)>>>) -> Options {
        let seen = seen.clone();
        Options {
            reporter: Arc::new(Sinks::new().on_report(move |level, message| {
                seen.lock().unwrap().push((level, message.to_string()));
            })),
            ..Options::default()
        }
    }

    #[tokio::test]
    async fn both_sides_validate_and_resolve_as_a_pair() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (middleware, _) = middleware_with(&[("GET", "/items")], collecting_options(&seen));

        let request = RequestSnapshot::new("GET", "/items");
        let Handling {
            mut response,
            outcome,
        } = middleware.handle(&request, RecordingSink::with_status(200));

        response.finish();

        match outcome.await.expect("outcome") {
            Outcome::Both(req, resp) => {
                assert!(req.valid);
                assert!(resp.valid);
            }
            other => panic!("expected Both, got {other:?}"),
        }

        let seen = seen.lock().unwrap();
        assert!(seen
            .iter()
            .any(|(_, m)| m == "Request for GET /items is valid"));
        assert!(seen
            .iter()
            .any(|(_, m)| m == "Response for GET /items is valid"));
    }

    #[tokio::test]
    async fn no_match_rejects_with_method_and_path() {
        let (middleware, _) = middleware_with(&[("GET", "/items")], Options::default());

        let request = RequestSnapshot::new("GET", "/unknown");
        let Handling {
            mut response,
            outcome,
        } = middleware.handle(&request, RecordingSink::with_status(200));
        response.finish();

        match outcome.await {
            Err(Error::NoMatch { method, path }) => {
                assert_eq!(method, "GET");
                assert_eq!(path, "/unknown");
            }
            other => panic!("expected NoMatch, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn options_requests_are_skipped_without_any_interception() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (middleware, loads) = middleware_with(&[("GET", "/items")], collecting_options(&seen));

        let request = RequestSnapshot::new("OPTIONS", "/items");
        let Handling { response, outcome } =
            middleware.handle(&request, RecordingSink::with_status(204));

        assert!(!response.is_armed());
        assert!(matches!(outcome.await, Ok(Outcome::Skipped)));
        // Matching never ran: the store was never even loaded.
        assert_eq!(loads.load(Ordering::SeqCst), 0);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn options_skip_is_case_insensitive() {
        let (middleware, loads) = middleware_with(&[("GET", "/items")], Options::default());
        let request = RequestSnapshot::new("options", "/items");
        let Handling { outcome, .. } = middleware.handle(&request, RecordingSink::with_status(204));
        assert!(matches!(outcome.await, Ok(Outcome::Skipped)));
        assert_eq!(loads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn ignore_options_false_validates_options_requests() {
        let (middleware, _) = middleware_with(
            &[("OPTIONS", "/items")],
            Options {
                ignore_options: false,
                response: false,
                ..Options::default()
            },
        );
        let request = RequestSnapshot::new("OPTIONS", "/items");
        let Handling {
            mut response,
            outcome,
        } = middleware.handle(&request, RecordingSink::with_status(204));
        response.finish();
        assert!(matches!(outcome.await, Ok(Outcome::Request(_))));
    }

    #[tokio::test]
    async fn request_only_resolves_without_waiting_for_the_response() {
        let (middleware, _) = middleware_with(
            &[("GET", "/items")],
            Options {
                response: false,
                ..Options::default()
            },
        );
        let request = RequestSnapshot::new("GET", "/items");
        // Never finish the response; request-only validation must not stall.
        let Handling { response, outcome } =
            middleware.handle(&request, RecordingSink::with_status(200));

        let outcome = tokio::time::timeout(Duration::from_secs(1), outcome)
            .await
            .expect("request-only run stalled");
        assert!(matches!(outcome, Ok(Outcome::Request(_))));
        drop(response);
    }

    #[tokio::test]
    async fn request_side_reports_before_the_response_finishes() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (middleware, _) = middleware_with(&[("GET", "/items")], collecting_options(&seen));

        let request = RequestSnapshot::new("GET", "/items");
        let Handling {
            mut response,
            outcome,
        } = middleware.handle(&request, RecordingSink::with_status(200));

        let run = tokio::spawn(outcome);

        // Request-side report must land while the response is still open.
        let deadline = tokio::time::Instant::now() + Duration::from_secs(1);
        loop {
            if seen
                .lock()
                .unwrap()
                .iter()
                .any(|(_, m)| m == "Request for GET /items is valid")
            {
                break;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "request report never arrived"
            );
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        response.finish();
        assert!(matches!(run.await.expect("join"), Ok(Outcome::Both(_, _))));
    }

    #[tokio::test]
    async fn both_disabled_returns_unvalidated_even_without_a_match() {
        let (middleware, _) = middleware_with(
            &[("GET", "/items")],
            Options {
                request: false,
                response: false,
                ..Options::default()
            },
        );
        let request = RequestSnapshot::new("GET", "/unknown");
        let Handling {
            mut response,
            outcome,
        } = middleware.handle(&request, RecordingSink::with_status(200));
        response.finish();
        assert!(matches!(outcome.await, Ok(Outcome::Unvalidated)));
    }

    #[tokio::test]
    async fn violations_are_reported_not_raised() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut specs = make_specs(&[("POST", "/items2")]);
        specs[0].response.body = r#"{"version":2}"#.into();
        let (middleware, _) = middleware_from(specs, collecting_options(&seen));

        let request = RequestSnapshot::new("POST", "/items2");
        let Handling {
            mut response,
            outcome,
        } = middleware.handle(&request, RecordingSink::with_status(200));

        // Contract expects 200 with {"version":2}; send something else.
        response.get_mut().status = 200;
        response.write_chunk(br#"{"version_x":3}"#);
        response.finish();

        match outcome.await.expect("violations are data, not errors") {
            Outcome::Both(req, resp) => {
                assert!(req.valid);
                assert!(!resp.valid);
                assert_eq!(
                    resp.errors,
                    vec!["[response.body] At '/version' Missing required property: version"]
                );
            }
            other => panic!("expected Both, got {other:?}"),
        }

        let seen = seen.lock().unwrap();
        assert!(seen.iter().any(|(level, m)| *level == Level::Error
            && m == "Response for POST /items2 is invalid: \
                     [response.body] At '/version' Missing required property: version"));
    }

    struct DefectiveComparator;

    impl Comparator for DefectiveComparator {
        fn is_valid(&self, _: &HttpMessage, _: &HttpMessage, _: MessageKind) -> bool {
            false
        }
        fn validate(&self, _: &HttpMessage, _: &HttpMessage, _: MessageKind) -> ComparatorOutput {
            let mut out = ComparatorOutput::new();
            out.push(
                "headers",
                Finding {
                    severity: "fatal".into(),
                    message: "broken".into(),
                },
            );
            out
        }
    }

    #[tokio::test]
    async fn comparator_defect_propagates_as_hard_failure() {
        let store = Arc::new(LazyStore::new(CountingSource {
            specs: make_specs(&[("GET", "/items")]),
            loads: Arc::new(AtomicUsize::new(0)),
        }));
        let middleware = Middleware::new(
            store,
            Arc::new(DefectiveComparator),
            Options {
                response: false,
                ..Options::default()
            },
        );

        let request = RequestSnapshot::new("GET", "/items");
        let Handling {
            mut response,
            outcome,
        } = middleware.handle(&request, RecordingSink::with_status(200));
        response.finish();

        match outcome.await {
            Err(Error::UnexpectedSeverity { severity, .. }) => assert_eq!(severity, "fatal"),
            other => panic!("expected UnexpectedSeverity, got {other:?}"),
        }
    }

    struct FailingSource;

    #[async_trait]
    impl TransactionSource for FailingSource {
        async fn load(&self) -> Result<ParseOutcome, crate::error::LoadError> {
            Ok(ParseOutcome {
                transactions: Vec::new(),
                warnings: Vec::new(),
                errors: vec!["unexpected token at line 3".into()],
            })
        }
    }

    #[tokio::test]
    async fn load_failure_rejects_the_run() {
        let middleware = Middleware::new(
            Arc::new(LazyStore::new(FailingSource)),
            Arc::new(BasicComparator),
            Options::default(),
        );
        let request = RequestSnapshot::new("GET", "/items");
        let Handling {
            mut response,
            outcome,
        } = middleware.handle(&request, RecordingSink::with_status(200));
        response.finish();
        assert!(matches!(outcome.await, Err(Error::Load(_))));
    }

    #[tokio::test]
    async fn concurrent_exchanges_share_one_store() {
        let (middleware, loads) = middleware_with(&[("GET", "/items")], Options::default());

        let mut joins = Vec::new();
        for _ in 0..8 {
            let middleware = middleware.clone();
            joins.push(tokio::spawn(async move {
                let request = RequestSnapshot::new("GET", "/items");
                let Handling {
                    mut response,
                    outcome,
                } = middleware.handle(&request, RecordingSink::with_status(200));
                response.finish();
                outcome.await
            }));
        }
        for join in joins {
            assert!(matches!(join.await.expect("join"), Ok(Outcome::Both(_, _))));
        }
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }
}
