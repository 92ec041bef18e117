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

//! Server and client configuration.
//!
//! Both configurations can be built in code with `with_*` methods or loaded
//! from a TOML file. Every field has a default, so a file only needs the
//! values it changes:
//!
//! ```toml
//! listen_address = "127.0.0.1:50051"
//! codec = "json"
//! max_concurrent_calls = 64
//! ```

use crate::connection::{ConnectionConfig, DEFAULT_OUTBOUND_QUEUE_DEPTH};
use crate::observability::DEFAULT_LOG_FILTER;
use crate::serialization::Codec;
use crate::server::ServiceError;
use crate::serialization::framing::{FRAME_HEADER_SIZE, MAX_FRAME_SIZE};
use crate::transport::secure::DEFAULT_HANDSHAKE_TIMEOUT;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default port of the greeting service.
pub const DEFAULT_PORT: u16 = 50051;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A field has an unusable value.
    #[error("invalid {field}: {reason}")]
    Invalid {
        /// Name of the field
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },

    /// The configuration file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// File path
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The configuration file is not valid TOML for this configuration.
    #[error("failed to parse {path}: {source}")]
    Parse {
        /// File path
        path: PathBuf,
        /// The TOML error
        #[source]
        source: toml::de::Error,
    },

    /// Services could not be assembled.
    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl ConfigError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Address to listen on.
    ///
    /// Default: `0.0.0.0:50051`
    pub listen_address: String,

    /// PEM certificate chain presented to clients.
    ///
    /// Default: `ssl/server.crt`
    pub certificate_path: PathBuf,

    /// PEM private key for the certificate.
    ///
    /// Default: `ssl/server.pem`
    pub private_key_path: PathBuf,

    /// Wire format. Clients must use the same one.
    pub codec: Codec,

    /// Largest frame accepted or sent, in bytes.
    ///
    /// Default: 16 MiB
    pub max_frame_size: u32,

    /// Frames that may wait for the writer before senders are suspended.
    pub outbound_queue_depth: usize,

    /// Calls that may run at once on one connection. Calls over the limit
    /// are rejected with `UNAVAILABLE`. `None` means unlimited.
    pub max_concurrent_calls: Option<usize>,

    /// Time a client has to complete the TLS handshake, in milliseconds.
    pub handshake_timeout_ms: u64,

    /// Serve `streamrpc.reflection.ServerReflection`, which lists the
    /// registered services and their methods.
    ///
    /// Default: `true`
    pub reflection: bool,

    /// `tracing` filter used when `RUST_LOG` is not set.
    pub log_filter: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: format!("0.0.0.0:{}", DEFAULT_PORT),
            certificate_path: PathBuf::from("ssl/server.crt"),
            private_key_path: PathBuf::from("ssl/server.pem"),
            codec: Codec::default(),
            max_frame_size: MAX_FRAME_SIZE,
            outbound_queue_depth: DEFAULT_OUTBOUND_QUEUE_DEPTH,
            max_concurrent_calls: None,
            handshake_timeout_ms: u64::try_from(DEFAULT_HANDSHAKE_TIMEOUT.as_millis())
                .unwrap_or(u64::MAX),
            reflection: true,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl ServerConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a configuration from a TOML file and validates it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`], [`ConfigError::Parse`] or
    /// [`ConfigError::Invalid`].
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config: Self = read_toml(path.as_ref())?;
        config.validate()?;
        Ok(config)
    }

    /// Sets the listen address.
    pub fn with_listen_address(mut self, address: impl Into<String>) -> Self {
        self.listen_address = address.into();
        self
    }

    /// Sets the certificate and private key paths.
    pub fn with_identity(
        mut self,
        certificate_path: impl Into<PathBuf>,
        private_key_path: impl Into<PathBuf>,
    ) -> Self {
        self.certificate_path = certificate_path.into();
        self.private_key_path = private_key_path.into();
        self
    }

    /// Sets the wire format.
    pub fn with_codec(mut self, codec: Codec) -> Self {
        self.codec = codec;
        self
    }

    /// Sets the maximum frame size.
    pub fn with_max_frame_size(mut self, size: u32) -> Self {
        self.max_frame_size = size;
        self
    }

    /// Sets the outbound queue depth.
    pub fn with_outbound_queue_depth(mut self, depth: usize) -> Self {
        self.outbound_queue_depth = depth;
        self
    }

    /// Limits concurrent calls per connection.
    pub fn with_max_concurrent_calls(mut self, limit: Option<usize>) -> Self {
        self.max_concurrent_calls = limit;
        self
    }

    /// Sets the TLS handshake timeout.
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Turns the reflection service on or off.
    pub fn with_reflection(mut self, enabled: bool) -> Self {
        self.reflection = enabled;
        self
    }

    /// Sets the log filter.
    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }

    /// TLS handshake timeout as a [`Duration`].
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }

    /// Connection settings derived from this configuration.
    pub fn connection_config(&self) -> ConnectionConfig {
        ConnectionConfig::default()
            .with_codec(self.codec)
            .with_max_frame_size(self.max_frame_size)
            .with_outbound_queue_depth(self.outbound_queue_depth)
    }

    /// Checks that every field is usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.listen_address.trim().is_empty() {
            return Err(ConfigError::invalid("listen_address", "must not be empty"));
        }
        validate_connection(self.max_frame_size, self.outbound_queue_depth)?;
        if self.max_concurrent_calls == Some(0) {
            return Err(ConfigError::invalid(
                "max_concurrent_calls",
                "must be at least 1 when set",
            ));
        }
        if self.handshake_timeout_ms == 0 {
            return Err(ConfigError::invalid(
                "handshake_timeout_ms",
                "must be positive",
            ));
        }
        Ok(())
    }
}

/// Client settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// Server address.
    ///
    /// Default: `localhost:50051`
    pub server_address: String,

    /// Name the server certificate must be valid for.
    ///
    /// Default: `localhost`
    pub server_name: String,

    /// PEM certificate of the authority that signed the server certificate.
    ///
    /// Default: `ssl/ca.crt`
    pub ca_path: PathBuf,

    /// Wire format. Must match the server.
    pub codec: Codec,

    /// Largest frame accepted or sent, in bytes.
    pub max_frame_size: u32,

    /// Frames that may wait for the writer before senders are suspended.
    pub outbound_queue_depth: usize,

    /// Timeout applied to calls opened without an explicit deadline, in
    /// milliseconds. `None` means such calls have no deadline.
    pub default_timeout_ms: Option<u64>,

    /// `tracing` filter used when `RUST_LOG` is not set.
    pub log_filter: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_address: format!("localhost:{}", DEFAULT_PORT),
            server_name: "localhost".to_string(),
            ca_path: PathBuf::from("ssl/ca.crt"),
            codec: Codec::default(),
            max_frame_size: MAX_FRAME_SIZE,
            outbound_queue_depth: DEFAULT_OUTBOUND_QUEUE_DEPTH,
            default_timeout_ms: None,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl ClientConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a configuration from a TOML file and validates it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`], [`ConfigError::Parse`] or
    /// [`ConfigError::Invalid`].
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config: Self = read_toml(path.as_ref())?;
        config.validate()?;
        Ok(config)
    }

    /// Sets the server address.
    pub fn with_server_address(mut self, address: impl Into<String>) -> Self {
        self.server_address = address.into();
        self
    }

    /// Sets the expected server name.
    pub fn with_server_name(mut self, name: impl Into<String>) -> Self {
        self.server_name = name.into();
        self
    }

    /// Sets the trust anchor path.
    pub fn with_ca_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_path = path.into();
        self
    }

    /// Sets the wire format.
    pub fn with_codec(mut self, codec: Codec) -> Self {
        self.codec = codec;
        self
    }

    /// Sets the maximum frame size.
    pub fn with_max_frame_size(mut self, size: u32) -> Self {
        self.max_frame_size = size;
        self
    }

    /// Sets the outbound queue depth.
    pub fn with_outbound_queue_depth(mut self, depth: usize) -> Self {
        self.outbound_queue_depth = depth;
        self
    }

    /// Sets the default call timeout.
    pub fn with_default_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.default_timeout_ms =
            timeout.map(|t| u64::try_from(t.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// Sets the log filter.
    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }

    /// Default call timeout as a [`Duration`].
    pub fn default_timeout(&self) -> Option<Duration> {
        self.default_timeout_ms.map(Duration::from_millis)
    }

    /// Connection settings derived from this configuration.
    pub fn connection_config(&self) -> ConnectionConfig {
        ConnectionConfig::default()
            .with_codec(self.codec)
            .with_max_frame_size(self.max_frame_size)
            .with_outbound_queue_depth(self.outbound_queue_depth)
    }

    /// Checks that every field is usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server_address.trim().is_empty() {
            return Err(ConfigError::invalid("server_address", "must not be empty"));
        }
        if self.server_name.trim().is_empty() {
            return Err(ConfigError::invalid("server_name", "must not be empty"));
        }
        validate_connection(self.max_frame_size, self.outbound_queue_depth)?;
        if self.default_timeout_ms == Some(0) {
            return Err(ConfigError::invalid(
                "default_timeout_ms",
                "must be positive when set",
            ));
        }
        Ok(())
    }
}

fn validate_connection(max_frame_size: u32, outbound_queue_depth: usize) -> Result<(), ConfigError> {
    if (max_frame_size as usize) <= FRAME_HEADER_SIZE {
        return Err(ConfigError::invalid(
            "max_frame_size",
            format!("must be larger than the {} byte frame header", FRAME_HEADER_SIZE),
        ));
    }
    if outbound_queue_depth == 0 {
        return Err(ConfigError::invalid(
            "outbound_queue_depth",
            "must be at least 1",
        ));
    }
    Ok(())
}

fn read_toml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        ServerConfig::default().validate().unwrap();
        ClientConfig::default().validate().unwrap();
        assert_eq!(ServerConfig::default().listen_address, "0.0.0.0:50051");
        assert_eq!(ClientConfig::default().ca_path, PathBuf::from("ssl/ca.crt"));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: ServerConfig = toml::from_str(
            r#"
            listen_address = "127.0.0.1:6000"
            codec = "json"
            max_concurrent_calls = 8
            "#,
        )
        .unwrap();
        assert_eq!(config.listen_address, "127.0.0.1:6000");
        assert_eq!(config.codec, Codec::Json);
        assert_eq!(config.max_concurrent_calls, Some(8));
        assert_eq!(config.max_frame_size, MAX_FRAME_SIZE);
        assert_eq!(config.handshake_timeout(), DEFAULT_HANDSHAKE_TIMEOUT);
        assert!(config.reflection);

        let quiet: ServerConfig = toml::from_str("reflection = false").unwrap();
        assert!(!quiet.reflection);
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(toml::from_str::<ClientConfig>("srever_address = \"x\"").is_err());
    }

    #[test]
    fn test_validation_names_field() {
        let error = ServerConfig::new()
            .with_max_concurrent_calls(Some(0))
            .validate()
            .unwrap_err();
        assert!(matches!(
            error,
            ConfigError::Invalid {
                field: "max_concurrent_calls",
                ..
            }
        ));

        let error = ClientConfig::new()
            .with_max_frame_size(4)
            .validate()
            .unwrap_err();
        assert!(matches!(
            error,
            ConfigError::Invalid {
                field: "max_frame_size",
                ..
            }
        ));

        let error = ClientConfig::new()
            .with_default_timeout(Some(Duration::ZERO))
            .validate()
            .unwrap_err();
        assert!(error.to_string().contains("default_timeout_ms"));
    }

    #[test]
    fn test_from_toml_file() {
        let dir = std::env::temp_dir().join(format!("streamrpc-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("client.toml");
        std::fs::write(&path, "server_name = \"greet.test\"\ndefault_timeout_ms = 1500\n").unwrap();

        let config = ClientConfig::from_toml_file(&path).unwrap();
        assert_eq!(config.server_name, "greet.test");
        assert_eq!(config.default_timeout(), Some(Duration::from_millis(1500)));

        let missing = ClientConfig::from_toml_file(dir.join("missing.toml")).unwrap_err();
        assert!(matches!(missing, ConfigError::Read { .. }));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_connection_config_carries_values() {
        let config = ServerConfig::new()
            .with_codec(Codec::Json)
            .with_outbound_queue_depth(4)
            .connection_config();
        assert_eq!(config.codec, Codec::Json);
        assert_eq!(config.outbound_queue_depth, 4);
    }
}
