// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Response capture as a pure side channel.
//!
//! `ObservedResponse` decorates a live response sink: every write and the
//! finalize operation are forwarded in real time, the written bytes are
//! accumulated, and only after the forwarded finalize has taken effect does
//! the paired `BodyCapture` resolve with the full captured response. The
//! wrapper observes; it never owns, delays or alters what goes on the wire.

use hyper::HeaderMap;
use tokio::sync::oneshot;

/// Capability surface the capture layer needs from an outbound response.
pub trait ResponseSink {
    fn status(&self) -> u16;
    fn headers(&self) -> &HeaderMap;
    fn write_chunk(&mut self, chunk: &[u8]);
    fn finish(&mut self);
}

/// A fully-written response as observed on the wire.
#[derive(Debug, Clone)]
pub struct CapturedResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: String,
}

/// Decorator around a real response sink. Construct with [`arm`] to capture,
/// or [`passthrough`] for a zero-overhead inert wrapper.
///
/// [`arm`]: ObservedResponse::arm
/// [`passthrough`]: ObservedResponse::passthrough
pub struct ObservedResponse<S> {
    inner: S,
    buffer: Vec<u8>,
    resolve: Option<oneshot::Sender<CapturedResponse>>,
    armed: bool,
    finished: bool,
}

impl<S: ResponseSink> ObservedResponse<S> {
    /// Wrap `inner` and return the capture handle. Arming must happen before
    /// the first write; bytes written to the bare sink are unobservable.
    pub fn arm(inner: S) -> (Self, BodyCapture) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                inner,
                buffer: Vec::new(),
                resolve: Some(tx),
                armed: true,
                finished: false,
            },
            BodyCapture { receiver: rx },
        )
    }

    /// Inert wrapper for requests excluded from validation: no buffer, no
    /// channel, writes forwarded untouched.
    pub fn passthrough(inner: S) -> Self {
        Self {
            inner,
            buffer: Vec::new(),
            resolve: None,
            armed: false,
            finished: false,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: ResponseSink> ResponseSink for ObservedResponse<S> {
    fn status(&self) -> u16 {
        self.inner.status()
    }

    fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    fn write_chunk(&mut self, chunk: &[u8]) {
        if self.armed && !self.finished {
            self.buffer.extend_from_slice(chunk);
        }
        self.inner.write_chunk(chunk);
    }

    fn finish(&mut self) {
        if self.finished {
            return;
        }
        // Forward first; the capture resolves only after the real finalize
        // has taken effect.
        self.inner.finish();
        self.finished = true;
        if let Some(resolve) = self.resolve.take() {
            let captured = CapturedResponse {
                status: self.inner.status(),
                headers: self.inner.headers().clone(),
                body: String::from_utf8_lossy(&self.buffer).into_owned(),
            };
            // Nobody waiting (response validation disabled) is fine.
            let _ = resolve.send(captured);
        }
    }
}

/// Resolves with the captured response once the wrapped sink is finalized.
/// If the response is never finalized this never resolves; callers needing a
/// bound impose their own timeout.
pub struct BodyCapture {
    receiver: oneshot::Receiver<CapturedResponse>,
}

impl BodyCapture {
    pub async fn wait(self) -> CapturedResponse {
        match self.receiver.await {
            Ok(captured) => captured,
            // Sink dropped without finalize: an aborted connection. Stall
            // rather than fabricate an empty body.
            Err(_) => std::future::pending().await,
        }
    }
}
