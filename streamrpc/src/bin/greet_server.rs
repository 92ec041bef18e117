//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Serves `greet.GreetService` over TLS until interrupted.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use streamrpc::greet::GreetService;
use streamrpc::serialization::Codec;
use streamrpc::{RpcError, Server, ServerConfig, init_tracing, log_error};

#[derive(Parser)]
#[command(name = "greet-server")]
#[command(about = "Serves the greeting service over TLS")]
struct Args {
    /// Config file path (optional, CLI args override config)
    config: Option<PathBuf>,

    /// Listen address
    #[arg(short, long)]
    listen: Option<String>,

    /// PEM certificate chain
    #[arg(long)]
    cert: Option<PathBuf>,

    /// PEM private key
    #[arg(long)]
    key: Option<PathBuf>,

    /// Wire format (postcard or json)
    #[arg(long)]
    codec: Option<Codec>,

    /// Maximum concurrent calls per connection
    #[arg(long)]
    max_concurrent_calls: Option<usize>,

    /// Do not serve the reflection service
    #[arg(long)]
    no_reflection: bool,

    /// Log filter, used when RUST_LOG is not set
    #[arg(long)]
    log: Option<String>,
}

impl Args {
    fn into_config(self) -> Result<ServerConfig, RpcError> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::from_toml_file(path)?,
            None => ServerConfig::default(),
        };
        if let Some(listen) = self.listen {
            config.listen_address = listen;
        }
        if let Some(cert) = self.cert {
            config.certificate_path = cert;
        }
        if let Some(key) = self.key {
            config.private_key_path = key;
        }
        if let Some(codec) = self.codec {
            config.codec = codec;
        }
        if self.max_concurrent_calls.is_some() {
            config.max_concurrent_calls = self.max_concurrent_calls;
        }
        if self.no_reflection {
            config.reflection = false;
        }
        if let Some(log) = self.log {
            config.log_filter = log;
        }
        config.validate()?;
        Ok(config)
    }
}

async fn run(config: ServerConfig) -> Result<(), RpcError> {
    let server = Server::new(config).add_service(GreetService::default().into_service()?)?;

    let listener = server.bind().await?;
    server
        .serve_with_shutdown(listener, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "Cannot listen for Ctrl-C, serving until killed");
                std::future::pending::<()>().await;
            }
        })
        .await;

    let metrics = server.metrics();
    tracing::info!(
        calls = metrics.calls_started(),
        messages_received = metrics.messages_received(),
        messages_sent = metrics.messages_sent(),
        "Server stopped"
    );
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let config = match args.into_config() {
        Ok(config) => config,
        Err(e) => {
            init_tracing(None);
            log_error(&e);
            return ExitCode::FAILURE;
        }
    };
    init_tracing(Some(&config.log_filter));

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log_error(&e);
            ExitCode::FAILURE
        }
    }
}
