// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Configuration loading for the validating proxy.

use crate::middleware::Options;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct GeneralConfig {
    /// Listen address, e.g. 127.0.0.1:3000
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Upstream base URI requests are forwarded to, e.g. http://127.0.0.1:8080
    #[serde(default = "default_upstream")]
    pub upstream: String,
}

fn default_listen() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_upstream() -> String {
    "http://127.0.0.1:8080".to_string()
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            upstream: default_upstream(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ContractConfig {
    /// Glob patterns for contract documents, e.g. ["contracts/*.json"]
    #[serde(default)]
    pub paths: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ValidateConfig {
    #[serde(default = "default_true")]
    pub request: bool,

    #[serde(default = "default_true")]
    pub response: bool,

    /// Skip OPTIONS requests entirely (CORS pre-flight noise).
    #[serde(default = "default_true")]
    pub ignore_options: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ValidateConfig {
    fn default() -> Self {
        Self {
            request: true,
            response: true,
            ignore_options: true,
        }
    }
}

impl ValidateConfig {
    /// Middleware options with the default reporter.
    pub fn to_options(&self) -> Options {
        Options {
            request: self.request,
            response: self.response,
            ignore_options: self.ignore_options,
            ..Options::default()
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub contract: ContractConfig,

    #[serde(default)]
    pub validate: ValidateConfig,
}

impl Config {
    /// Load configuration from a TOML file. TOML format:
    ///
    /// [general]
    /// listen = "127.0.0.1:3000"
    /// upstream = "http://127.0.0.1:8080"
    ///
    /// [contract]
    /// paths = ["contracts/*.json"]
    ///
    /// [validate]
    /// request = true
    /// response = true
    /// ignore_options = true
    pub async fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<Self> {
        let s = tokio::fs::read_to_string(path.as_ref()).await?;
        let cfg: Self = toml::from_str(&s)?;
        Ok(cfg)
    }
}
