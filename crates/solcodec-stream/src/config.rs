//! Stream connection configuration.

use serde::{Deserialize, Serialize};
use solcodec_core::error::StreamError;
use std::path::{Path, PathBuf};
use yellowstone_grpc_proto::geyser::CommitmentLevel;

use crate::backoff::ReconnectPolicy;

pub const ENV_GRPC_URL: &str = "SOLCODEC_GRPC_URL";
pub const ENV_X_TOKEN: &str = "SOLCODEC_X_TOKEN";

/// Commitment level requested for the whole subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    Processed,
    #[default]
    Confirmed,
    Finalized,
}

impl Commitment {
    pub fn to_proto(self) -> CommitmentLevel {
        match self {
            Commitment::Processed => CommitmentLevel::Processed,
            Commitment::Confirmed => CommitmentLevel::Confirmed,
            Commitment::Finalized => CommitmentLevel::Finalized,
        }
    }
}

/// Configuration for one stream connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// gRPC endpoint, e.g. "https://grpc.example.com:443"
    pub endpoint: String,
    /// Sent as `x-token` metadata on every call
    #[serde(default)]
    pub x_token: Option<String>,
    #[serde(default)]
    pub commitment: Commitment,
    #[serde(default)]
    pub reconnect: ReconnectPolicy,
    /// Key of the filter entry in the subscribe request
    #[serde(default = "default_filter_name")]
    pub filter_name: String,
    /// Watched addresses at startup
    #[serde(default)]
    pub addresses: Vec<String>,
    /// Watched owners at startup (account streams only)
    #[serde(default)]
    pub owners: Vec<String>,
    /// Decode System / SPL-Token / SPL-Token-2022 without an IDL
    #[serde(default = "bool_true")]
    pub default_programs: bool,
    /// Directory of `*.json` IDLs loaded before connecting
    #[serde(default)]
    pub idl_dir: Option<PathBuf>,
}

fn default_filter_name() -> String {
    "solcodec".into()
}
fn bool_true() -> bool {
    true
}

impl StreamConfig {
    /// Minimal config for `endpoint` with every other field defaulted.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            x_token: None,
            commitment: Commitment::default(),
            reconnect: ReconnectPolicy::default(),
            filter_name: default_filter_name(),
            addresses: vec![],
            owners: vec![],
            default_programs: true,
            idl_dir: None,
        }
    }

    /// Load from a YAML or JSON file (JSON parses as YAML), apply
    /// environment overrides, then validate.
    pub fn from_file(path: &Path) -> Result<Self, StreamError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| StreamError::Config(format!("{}: {e}", path.display())))?;
        let mut config: StreamConfig = serde_yaml::from_str(&text)
            .map_err(|e| StreamError::Config(format!("{}: {e}", path.display())))?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// `SOLCODEC_GRPC_URL` and `SOLCODEC_X_TOKEN` replace the file values.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_GRPC_URL).filter(|v| !v.is_empty()) {
            self.endpoint = url;
        }
        if let Some(token) = lookup(ENV_X_TOKEN).filter(|v| !v.is_empty()) {
            self.x_token = Some(token);
        }
    }

    pub fn validate(&self) -> Result<(), StreamError> {
        let url = url::Url::parse(&self.endpoint)
            .map_err(|e| StreamError::Config(format!("endpoint '{}': {e}", self.endpoint)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(StreamError::Config(format!(
                "endpoint '{}': scheme must be http or https",
                self.endpoint
            )));
        }
        if self.filter_name.is_empty() {
            return Err(StreamError::Config("filter_name must not be empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn yaml_with_defaults() {
        let yaml = r#"
endpoint: https://grpc.example.com:443
addresses: [6EF8rrecthR5Dkzon8Nwu78hRvfCKubJ14M5uBEwF6P]
reconnect: { kind: exponential, initial_ms: 500, max_ms: 30000 }
"#;
        let c: StreamConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(c.commitment, Commitment::Confirmed);
        assert_eq!(c.filter_name, "solcodec");
        assert!(c.default_programs);
        assert_eq!(c.reconnect.delay(10), Duration::from_secs(30));
        c.validate().unwrap();
    }

    #[test]
    fn json_parses_too() {
        let c: StreamConfig =
            serde_yaml::from_str(r#"{"endpoint":"http://localhost:10000","commitment":"finalized"}"#).unwrap();
        assert_eq!(c.commitment.to_proto(), CommitmentLevel::Finalized);
        assert_eq!(c.reconnect, ReconnectPolicy::default());
    }

    #[test]
    fn env_overrides_replace_endpoint_and_token() {
        let mut c = StreamConfig::new("https://a.example.com");
        c.apply_overrides(|key| match key {
            ENV_GRPC_URL => Some("https://b.example.com".into()),
            ENV_X_TOKEN => Some("secret".into()),
            _ => None,
        });
        assert_eq!(c.endpoint, "https://b.example.com");
        assert_eq!(c.x_token.as_deref(), Some("secret"));
    }

    #[test]
    fn rejects_bad_endpoints() {
        assert!(StreamConfig::new("not a url").validate().is_err());
        assert!(StreamConfig::new("wss://x.example.com").validate().is_err());
        assert!(StreamConfig::new("http://127.0.0.1:10000").validate().is_ok());
    }
}
