use burnlink_crypto::KdfParams;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{BurnlinkError, BurnlinkResult};
use crate::policy::{PolicyLimits, MAX_VIEWS_LIMIT};

/// Top-level configuration (loaded from burnlink.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BurnlinkConfig {
    pub policy: PolicyLimits,
    pub kdf: KdfConfig,
    pub share: ShareConfig,
    pub store: StoreConfig,
    pub log: LogConfig,
}

/// Argon2id cost for password-protected secrets
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KdfConfig {
    /// Argon2id memory cost in KiB (default: 65536 = 64 MiB)
    pub argon2_mem_cost_kib: u32,
    /// Argon2id time cost (iterations, default: 3)
    pub argon2_time_cost: u32,
    /// Argon2id parallelism (default: 4)
    pub argon2_parallelism: u32,
}

impl Default for KdfConfig {
    fn default() -> Self {
        let params = KdfParams::default();
        Self {
            argon2_mem_cost_kib: params.mem_cost_kib,
            argon2_time_cost: params.time_cost,
            argon2_parallelism: params.parallelism,
        }
    }
}

impl KdfConfig {
    pub fn params(&self) -> KdfParams {
        KdfParams {
            mem_cost_kib: self.argon2_mem_cost_kib,
            time_cost: self.argon2_time_cost,
            parallelism: self.argon2_parallelism,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShareConfig {
    /// Origin that share links point at (default: https://localhost:3000)
    pub base_url: String,
}

impl Default for ShareConfig {
    fn default() -> Self {
        Self {
            base_url: "https://localhost:3000".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding one JSON record per secret
    pub dir: PathBuf,
    /// Largest serialized envelope accepted (default: 10 MiB)
    pub max_envelope_bytes: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("~/.local/share/burnlink/secrets"),
            max_envelope_bytes: 10 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (default: warn)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".into(),
            format: "text".into(),
        }
    }
}

impl BurnlinkConfig {
    pub fn from_toml(content: &str) -> BurnlinkResult<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| BurnlinkError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that would make every secret invalid.
    pub fn validate(&self) -> BurnlinkResult<()> {
        let policy = &self.policy;
        if policy.anonymous_ttls.is_empty() {
            return Err(BurnlinkError::Config(
                "policy.anonymous_ttls must not be empty".into(),
            ));
        }
        if !(1..=MAX_VIEWS_LIMIT).contains(&policy.max_views) {
            return Err(BurnlinkError::Config(format!(
                "policy.max_views must be between 1 and {MAX_VIEWS_LIMIT} (got {})",
                policy.max_views
            )));
        }
        if !policy.anonymous_ttls.contains(&policy.default_ttl) {
            return Err(BurnlinkError::Config(format!(
                "policy.default_ttl {} is not in policy.anonymous_ttls",
                policy.default_ttl
            )));
        }
        // Secrets sealed with costs above the recipient ceilings could never be opened.
        self.kdf
            .params()
            .check_limits()
            .map_err(|e| BurnlinkError::Config(format!("kdf: {e}")))?;
        if !matches!(self.log.format.as_str(), "json" | "text") {
            return Err(BurnlinkError::Config(format!(
                "log.format must be \"json\" or \"text\" (got {:?})",
                self.log.format
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
[policy]
anonymous_ttls = [300, 3600]
authenticated_ttls = [86400]
max_views = 10
default_ttl = 3600

[kdf]
argon2_mem_cost_kib = 131072
argon2_time_cost = 4
argon2_parallelism = 8

[share]
base_url = "https://secrets.example.com"

[store]
dir = "/var/lib/burnlink"
max_envelope_bytes = 1048576

[log]
level = "debug"
format = "json"
"#;
        let config = BurnlinkConfig::from_toml(toml_str).unwrap();

        assert_eq!(config.policy.anonymous_ttls, vec![300, 3600]);
        assert_eq!(config.policy.max_views, 10);
        assert_eq!(config.kdf.params().mem_cost_kib, 131072);
        assert_eq!(config.kdf.params().parallelism, 8);
        assert_eq!(config.share.base_url, "https://secrets.example.com");
        assert_eq!(config.store.dir, PathBuf::from("/var/lib/burnlink"));
        assert_eq!(config.store.max_envelope_bytes, 1048576);
        assert_eq!(config.log.format, "json");
    }

    #[test]
    fn test_parse_defaults() {
        let config = BurnlinkConfig::from_toml("").unwrap();

        assert_eq!(config.policy, PolicyLimits::default());
        assert_eq!(config.policy.default_ttl, 259_200);
        assert_eq!(config.kdf.params(), KdfParams::default());
        assert_eq!(config.share.base_url, "https://localhost:3000");
        assert_eq!(config.store.max_envelope_bytes, 10 * 1024 * 1024);
        assert_eq!(config.log.level, "warn");
    }

    #[test]
    fn test_parse_partial_config() {
        let toml_str = r#"
[share]
base_url = "http://127.0.0.1:8080"
"#;
        let config = BurnlinkConfig::from_toml(toml_str).unwrap();

        // Overridden
        assert_eq!(config.share.base_url, "http://127.0.0.1:8080");
        // Defaults
        assert_eq!(config.policy.max_views, 999);
        assert_eq!(config.log.format, "text");
    }

    #[test]
    fn test_default_ttl_must_be_allowed() {
        let toml_str = r#"
[policy]
anonymous_ttls = [300]
default_ttl = 3600
"#;
        assert!(matches!(
            BurnlinkConfig::from_toml(toml_str),
            Err(BurnlinkError::Config(_))
        ));
    }

    #[test]
    fn test_max_views_bounded() {
        for bad in [0, 1000] {
            let toml_str = format!("[policy]\nmax_views = {bad}\n");
            assert!(
                matches!(
                    BurnlinkConfig::from_toml(&toml_str),
                    Err(BurnlinkError::Config(_))
                ),
                "max_views = {bad}"
            );
        }
        assert!(BurnlinkConfig::from_toml("[policy]\nmax_views = 999\n").is_ok());
    }

    #[test]
    fn test_kdf_cost_over_ceiling() {
        let toml_str = r#"
[kdf]
argon2_time_cost = 64
"#;
        assert!(matches!(
            BurnlinkConfig::from_toml(toml_str),
            Err(BurnlinkError::Config(_))
        ));
    }

    #[test]
    fn test_bad_log_format() {
        let toml_str = r#"
[log]
format = "xml"
"#;
        assert!(BurnlinkConfig::from_toml(toml_str).is_err());
    }

    #[test]
    fn test_serialize_roundtrip() {
        let config = BurnlinkConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed = BurnlinkConfig::from_toml(&toml_str).unwrap();

        assert_eq!(config.policy, parsed.policy);
        assert_eq!(config.share.base_url, parsed.share.base_url);
        assert_eq!(config.store.dir, parsed.store.dir);
    }
}
