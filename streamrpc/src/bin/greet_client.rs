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

//! Calls `greet.GreetService` over TLS, one call shape per subcommand.

use clap::{Parser, Subcommand};
use futures_util::StreamExt;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use streamrpc::greet::{GreetClient, Greeting, paced};
use streamrpc::serialization::Codec;
use streamrpc::server::reflection::ReflectionClient;
use streamrpc::{CallOptions, Client, ClientConfig, Code, RpcError, init_tracing, log_error};

const NAMES: [&str; 5] = ["Pavan", "Roy", "Jason", "Logan", "Paul"];

#[derive(Parser)]
#[command(name = "greet-client")]
#[command(about = "Calls the greeting service over TLS")]
struct Args {
    /// Config file path (optional, CLI args override config)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Server address
    #[arg(short, long)]
    address: Option<String>,

    /// Name the server certificate must be valid for
    #[arg(long)]
    server_name: Option<String>,

    /// PEM certificate of the trusted authority
    #[arg(long)]
    ca: Option<PathBuf>,

    /// Wire format (postcard or json)
    #[arg(long)]
    codec: Option<Codec>,

    /// Pause between streamed requests, in milliseconds
    #[arg(long, default_value_t = 1000)]
    interval_ms: u64,

    /// Log filter, used when RUST_LOG is not set
    #[arg(long)]
    log: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Greet once
    Unary,
    /// Receive a stream of greetings
    ServerStream,
    /// Send a stream of names, receive one greeting
    ClientStream,
    /// Send names and receive greetings at the same time
    Bidi,
    /// Greet slowly under a deadline
    Deadline {
        /// Deadline in milliseconds
        #[arg(long, default_value_t = 5000)]
        timeout: u64,
    },
    /// List the services the server offers
    ListServices,
}

impl Args {
    fn load_config(&self) -> Result<ClientConfig, RpcError> {
        let mut config = match &self.config {
            Some(path) => ClientConfig::from_toml_file(path)?,
            None => ClientConfig::default(),
        };
        if let Some(address) = &self.address {
            config.server_address = address.clone();
        }
        if let Some(server_name) = &self.server_name {
            config.server_name = server_name.clone();
        }
        if let Some(ca) = &self.ca {
            config.ca_path = ca.clone();
        }
        if let Some(codec) = self.codec {
            config.codec = codec;
        }
        if let Some(log) = &self.log {
            config.log_filter = log.clone();
        }
        config.validate()?;
        Ok(config)
    }
}

fn greetings(interval: Duration) -> impl futures_util::Stream<Item = Greeting> + Send + 'static {
    let greetings = NAMES.iter().map(|name| Greeting::first(*name)).collect();
    paced(greetings, interval).inspect(|greeting| println!("Sending: {}", greeting.first_name))
}

async fn run(config: ClientConfig, command: Command, interval: Duration) -> Result<(), RpcError> {
    let client = GreetClient::new(Client::connect(&config).await?);

    match command {
        Command::Unary => {
            let options = CallOptions::new().with_metadata("key", "test-run");
            let result = client
                .greet(Greeting::new("Pavan", "Tikkani"), options)
                .await?;
            println!("Response from Greet: {}", result);
        }
        Command::ServerStream => {
            let mut responses = client
                .greet_many_times(Greeting::new("Pavan", "Kumar"), CallOptions::new())
                .await?;
            while let Some(result) = responses.next().await {
                println!("Response from GreetManyTimes: {}", result?);
            }
        }
        Command::ClientStream => {
            let result = client
                .long_greet(greetings(interval), CallOptions::new())
                .await?;
            println!("LongGreet response: {}", result);
        }
        Command::Bidi => {
            client
                .greet_everyone(greetings(interval), CallOptions::new(), |result| {
                    println!("Received: {}", result)
                })
                .await?;
        }
        Command::ListServices => {
            let reflection = ReflectionClient::new(client.inner().clone());
            for service in reflection.list_services(CallOptions::new()).await? {
                println!("{}", service.name);
                for method in &service.methods {
                    println!(
                        "  {} ({}) {} -> {}",
                        method.path, method.shape, method.request_type, method.response_type
                    );
                }
            }
        }
        Command::Deadline { timeout } => {
            let outcome = client
                .greet_with_deadline(Greeting::new("Pavan", "Tikkani"), Duration::from_millis(timeout))
                .await;
            match outcome {
                Ok(result) => println!("Response from GreetWithDeadline: {}", result),
                Err(status) if status.code() == Code::DeadlineExceeded => {
                    println!("The timeout has reached! Deadline Exceeded")
                }
                Err(status) => println!("Unexpected error: {}", status),
            }
        }
    }

    let metrics = client.inner().metrics();
    tracing::debug!(
        calls = metrics.calls_started(),
        messages_sent = metrics.messages_sent(),
        messages_received = metrics.messages_received(),
        "Client finished"
    );
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let config = match args.load_config() {
        Ok(config) => config,
        Err(e) => {
            init_tracing(None);
            log_error(&e);
            return ExitCode::FAILURE;
        }
    };
    init_tracing(Some(&config.log_filter));

    let interval = Duration::from_millis(args.interval_ms);
    match run(config, args.command, interval).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log_error(&e);
            ExitCode::FAILURE
        }
    }
}
