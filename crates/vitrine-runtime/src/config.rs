use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use vitrine_core::DEFAULT_MANIFEST_FILE_NAME;
use vitrine_render::SandboxPolicy;

use crate::fetch::HttpFetcherConfig;

pub const DEFAULT_MAX_FETCH_CYCLES: usize = 3;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 750;
pub const DEFAULT_FETCH_TIMEOUT_MS: u64 = 15_000;
pub const DEFAULT_UPLOAD_PREFIX: &str = "uploads";
pub const DEFAULT_SANDBOX_PROFILE: &str = "interactive";

/// Tunables for preview rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// Total enumerate-and-fetch cycles per render, the first one included.
    pub max_fetch_cycles: usize,
    /// Base backoff; retry `n` waits `n * retry_delay_ms`.
    pub retry_delay_ms: u64,
    pub fetch_timeout_ms: u64,
    /// Storage prefix used to derive a base path from an upload id.
    pub upload_prefix: String,
    pub manifest_file_name: String,
    pub sandbox_profile: String,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            max_fetch_cycles: DEFAULT_MAX_FETCH_CYCLES,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            fetch_timeout_ms: DEFAULT_FETCH_TIMEOUT_MS,
            upload_prefix: DEFAULT_UPLOAD_PREFIX.to_string(),
            manifest_file_name: DEFAULT_MANIFEST_FILE_NAME.to_string(),
            sandbox_profile: DEFAULT_SANDBOX_PROFILE.to_string(),
        }
    }
}

impl PreviewConfig {
    pub fn max_fetch_cycles(&self) -> usize {
        self.max_fetch_cycles.max(1)
    }

    /// Backoff before retry number `retry_index` (1-based).
    pub fn retry_delay(&self, retry_index: usize) -> Duration {
        Duration::from_millis(
            self.retry_delay_ms
                .saturating_mul(u64::try_from(retry_index).unwrap_or(u64::MAX)),
        )
    }

    pub fn sandbox_policy(&self) -> Result<SandboxPolicy> {
        SandboxPolicy::from_profile(&self.sandbox_profile)
            .with_context(|| format!("invalid sandbox profile '{}'", self.sandbox_profile))
    }

    pub fn http_fetcher_config(&self) -> HttpFetcherConfig {
        HttpFetcherConfig {
            request_timeout_ms: self.fetch_timeout_ms,
        }
    }

    /// Parses a TOML document over the defaults, clamping the cycle budget and
    /// rejecting unknown sandbox profiles.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str::<PreviewConfig>(raw)
            .context("failed to parse preview config")?
            .normalized()
    }

    /// Applies `VITRINE_*` overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(non_empty_env_var)
    }

    /// Applies overrides from `lookup`, which returns trimmed non-blank values.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("VITRINE_MAX_FETCH_CYCLES") {
            self.max_fetch_cycles = raw
                .parse()
                .with_context(|| format!("invalid VITRINE_MAX_FETCH_CYCLES '{raw}'"))?;
        }
        if let Some(raw) = lookup("VITRINE_RETRY_DELAY_MS") {
            self.retry_delay_ms = raw
                .parse()
                .with_context(|| format!("invalid VITRINE_RETRY_DELAY_MS '{raw}'"))?;
        }
        if let Some(raw) = lookup("VITRINE_FETCH_TIMEOUT_MS") {
            self.fetch_timeout_ms = raw
                .parse()
                .with_context(|| format!("invalid VITRINE_FETCH_TIMEOUT_MS '{raw}'"))?;
        }
        if let Some(raw) = lookup("VITRINE_UPLOAD_PREFIX") {
            self.upload_prefix = raw;
        }
        if let Some(raw) = lookup("VITRINE_SANDBOX_PROFILE") {
            self.sandbox_profile = raw;
        }
        Ok(())
    }

    fn normalized(mut self) -> Result<Self> {
        self.max_fetch_cycles = self.max_fetch_cycles();
        self.sandbox_policy()?;
        Ok(self)
    }
}

fn non_empty_env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Loads `path` (defaults when it does not exist) and applies env overrides.
pub fn load_preview_config(path: &Path) -> Result<PreviewConfig> {
    let mut config = if path.exists() {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read preview config {}", path.display()))?;
        PreviewConfig::from_toml_str(&raw)
            .with_context(|| format!("invalid preview config {}", path.display()))?
    } else {
        PreviewConfig::default()
    };
    config.apply_env_overrides()?;
    config.normalized()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn unit_defaults_match_documented_values() {
        let config = PreviewConfig::default();
        assert_eq!(config.max_fetch_cycles, 3);
        assert_eq!(config.retry_delay(2), Duration::from_millis(1_500));
        assert_eq!(config.manifest_file_name, "manifest.json");
        assert_eq!(config.http_fetcher_config().request_timeout_ms, 15_000);
        assert_eq!(
            config.sandbox_policy().expect("policy"),
            SandboxPolicy::interactive()
        );
    }

    #[test]
    fn functional_load_reads_partial_toml_over_defaults() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("preview.toml");
        std::fs::write(
            &path,
            "max_fetch_cycles = 0\nretry_delay_ms = 10\nsandbox_profile = \"document\"\n",
        )
        .expect("write config");

        let config = load_preview_config(&path).expect("load");
        assert_eq!(config.max_fetch_cycles, 1);
        assert_eq!(config.retry_delay_ms, 10);
        assert_eq!(config.upload_prefix, "uploads");
        assert_eq!(config.sandbox_profile, "document");
    }

    #[test]
    fn unit_from_toml_str_clamps_cycle_budget() {
        let config = PreviewConfig::from_toml_str("max_fetch_cycles = 0\n").expect("parse");
        assert_eq!(config.max_fetch_cycles, 1);
        assert_eq!(config.retry_delay_ms, DEFAULT_RETRY_DELAY_MS);

        let error = PreviewConfig::from_toml_str("retry_delay_ms = \"soon\"\n")
            .expect_err("string delay should be rejected");
        assert!(format!("{error:#}").contains("failed to parse preview config"));
    }

    #[test]
    fn regression_load_reports_path_on_malformed_file() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("preview.toml");
        std::fs::write(&path, "max_fetch_cycles = [\n").expect("write config");
        let error = load_preview_config(&path).expect_err("malformed toml");
        let rendered = format!("{error:#}");
        assert!(rendered.contains("preview.toml"));
        assert!(rendered.contains("failed to parse preview config"));
    }

    #[test]
    fn functional_missing_file_yields_defaults() {
        let dir = tempdir().expect("tempdir");
        let config = load_preview_config(&dir.path().join("absent.toml")).expect("load");
        assert_eq!(config.retry_delay_ms, DEFAULT_RETRY_DELAY_MS);
    }

    #[test]
    fn regression_unknown_sandbox_profile_is_rejected() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("preview.toml");
        std::fs::write(&path, "sandbox_profile = \"wide-open\"\n").expect("write config");
        let error = load_preview_config(&path).expect_err("profile should be rejected");
        assert!(format!("{error:#}").contains("wide-open"));
    }

    #[test]
    fn unit_overrides_apply_and_reject_garbage() {
        let values = HashMap::from([
            ("VITRINE_RETRY_DELAY_MS", "25"),
            ("VITRINE_UPLOAD_PREFIX", "bundles"),
        ]);
        let mut config = PreviewConfig::default();
        config
            .apply_overrides_from(|name| values.get(name).map(|value| value.to_string()))
            .expect("overrides");
        assert_eq!(config.retry_delay_ms, 25);
        assert_eq!(config.upload_prefix, "bundles");
        assert_eq!(config.max_fetch_cycles, 3);

        let mut config = PreviewConfig::default();
        let error = config
            .apply_overrides_from(|name| {
                (name == "VITRINE_MAX_FETCH_CYCLES").then(|| "many".to_string())
            })
            .expect_err("non-numeric override");
        assert!(error.to_string().contains("VITRINE_MAX_FETCH_CYCLES"));
    }
}
