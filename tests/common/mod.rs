// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

// Not every test binary uses every helper.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::io::AsyncWriteExt;
use tokio::time::sleep;

use vet_http::capture::ResponseSink;
use vet_http::middleware::Options;
use vet_http::proxy::run_proxy;
use vet_http::report::{Level, Sinks};
use vet_http::source::FileSource;
use vet_http::vet::Vet;

pub type Reports = Arc<Mutex<Vec<(Level, String)>>>;

/// Options with a collecting reporter so tests can assert on report lines.
pub fn collecting_options() -> (Options, Reports) {
    let seen: Reports = Arc::new(Mutex::new(Vec::new()));
    let seen2 = seen.clone();
    let options = Options {
        reporter: Arc::new(Sinks::new().on_report(move |level, message| {
            seen2.lock().unwrap().push((level, message.to_string()));
        })),
        ..Options::default()
    };
    (options, seen)
}

/// Write a contract document to a unique temp file and return its path.
pub async fn write_contract(doc: &str) -> anyhow::Result<PathBuf> {
    let tmp = std::env::temp_dir().join(format!("vet_integ_{}.json", uuid::Uuid::new_v4()));
    tokio::fs::write(&tmp, doc).await?;
    Ok(tmp)
}

/// Block until a matching report line arrives or the deadline passes.
pub async fn wait_for_report(seen: &Reports, needle: &str) {
    let deadline = Instant::now() + Duration::from_secs(2);
    loop {
        if seen.lock().unwrap().iter().any(|(_, m)| m.contains(needle)) {
            return;
        }
        assert!(
            Instant::now() < deadline,
            "report '{needle}' never arrived; saw {:?}",
            seen.lock().unwrap()
        );
        sleep(Duration::from_millis(10)).await;
    }
}

/// In-memory response sink for driving the middleware without a server.
#[derive(Debug, Default)]
pub struct BufferSink {
    pub status: u16,
    pub headers: hyper::HeaderMap,
    pub body: Vec<u8>,
}

impl BufferSink {
    pub fn with_status(status: u16) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }
}

impl ResponseSink for BufferSink {
    fn status(&self) -> u16 {
        self.status
    }
    fn headers(&self) -> &hyper::HeaderMap {
        &self.headers
    }
    fn write_chunk(&mut self, chunk: &[u8]) {
        self.body.extend_from_slice(chunk);
    }
    fn finish(&mut self) {}
}

// Minimal helper: start run_proxy over a contract file and wait until it accepts
pub async fn start_proxy_and_wait(
    contract: &std::path::Path,
    upstream: &str,
    options: Options,
) -> anyhow::Result<(tokio::task::JoinHandle<()>, SocketAddr)> {
    // Choose a free port by binding then dropping
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    let addr = listener.local_addr()?;
    drop(listener);

    let vet = Vet::new(FileSource::new([contract
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("contract path not utf8"))?]));
    vet.ready().await?;
    let middleware = vet.middleware(options);
    let upstream: hyper::Uri = upstream.parse()?;

    let handle = tokio::spawn(async move {
        let _ = run_proxy(addr, upstream, middleware).await;
    });

    // Wait for server to accept connections
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        if Instant::now() > deadline {
            return Err(anyhow::anyhow!("timeout waiting for proxy to start"));
        }
        if let Ok(mut s) = tokio::net::TcpStream::connect(addr).await {
            let _ = s.shutdown().await;
            break;
        }
        sleep(Duration::from_millis(50)).await;
    }

    Ok((handle, addr))
}
