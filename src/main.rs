// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

use clap::Parser;
use std::net::SocketAddr;
use tokio::signal;

use tracing::{error, info, warn};
use vet_http::{config, proxy, source::FileSource, vet::Vet};

#[derive(Parser, Debug)]
#[command(name = "vet-http")]
struct Args {
    /// Listen address, e.g. 127.0.0.1:3000
    #[arg(long)]
    listen: Option<String>,

    /// Upstream base URI, e.g. http://127.0.0.1:8080
    #[arg(long)]
    upstream: Option<String>,

    /// Contract glob pattern, repeatable
    #[arg(long = "contract")]
    contracts: Vec<String>,

    /// Optional config TOML path
    #[arg(long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    // Load config: optional CLI path; defaults if not provided
    let cfg = if let Some(ref p) = args.config {
        config::Config::load_from_path(p).await.unwrap_or_else(|e| {
            warn!(%p, %e, "failed to load config, using defaults");
            config::Config::default()
        })
    } else {
        config::Config::default()
    };

    let listen: SocketAddr = args.listen.unwrap_or_else(|| cfg.general.listen.clone()).parse()?;
    let upstream: hyper::Uri = args
        .upstream
        .unwrap_or_else(|| cfg.general.upstream.clone())
        .parse()?;

    let patterns = if args.contracts.is_empty() {
        cfg.contract.paths.clone()
    } else {
        args.contracts
    };
    if patterns.is_empty() {
        anyhow::bail!("no contract paths given; use --contract or [contract] paths in the config");
    }

    let vet = Vet::new(FileSource::new(patterns));
    // Fail fast on a broken contract instead of on the first exchange.
    vet.ready().await?;

    let middleware = vet.middleware(cfg.validate.to_options());
    let server = proxy::run_proxy(listen, upstream, middleware);

    tokio::select! {
        res = server => {
            if let Err(e) = res {
                error!(%e, "server error");
            }
        }
        _ = signal::ctrl_c() => {
            info!("shutting down");
        }
    }

    Ok(())
}
