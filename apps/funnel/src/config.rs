use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::models::ProcessingStage;
use crate::pipeline::{GovernorConfig, PipelineConfig};
use crate::recovery::RecoveryConfig;

/// Application configuration loaded from environment variables.
/// Every variable has a default; malformed values fail startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,

    pub max_concurrent_jobs: usize,
    pub max_memory_ratio: Option<f64>,
    pub admission_retry_ms: u64,
    pub stage_timeout_secs: Option<u64>,
    pub progress_channel_capacity: usize,

    pub recovery_retry_threshold: u32,
    pub recovery_restart_threshold: u32,
    pub recovery_critical_threshold: u32,
    pub pattern_ttl_hours: u64,
    pub pattern_sweep_secs: u64,

    /// Analyzer endpoint per stage. Stages without one stay unconfigured.
    pub analyzer_urls: BTreeMap<ProcessingStage, String>,
    pub analyzer_api_key: Option<String>,
}

const ANALYZER_URL_VARS: [(ProcessingStage, &str); 5] = [
    (ProcessingStage::Resume, "FUNNEL_RESUME_ANALYZER_URL"),
    (ProcessingStage::AiAnalysis, "FUNNEL_AI_ANALYZER_URL"),
    (ProcessingStage::LinkedIn, "FUNNEL_LINKEDIN_ANALYZER_URL"),
    (ProcessingStage::Github, "FUNNEL_GITHUB_ANALYZER_URL"),
    (ProcessingStage::Interview, "FUNNEL_INTERVIEW_ANALYZER_URL"),
];

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let max_memory_ratio: Option<f64> = parse_optional(&lookup, "FUNNEL_MAX_MEMORY_RATIO")?;
        if let Some(ratio) = max_memory_ratio {
            if !(0.0..=1.0).contains(&ratio) {
                bail!("FUNNEL_MAX_MEMORY_RATIO must be between 0 and 1, got {ratio}");
            }
        }

        let analyzer_urls = ANALYZER_URL_VARS
            .iter()
            .filter_map(|(stage, key)| {
                lookup(key)
                    .filter(|url| !url.trim().is_empty())
                    .map(|url| (*stage, url))
            })
            .collect();

        Ok(Config {
            port: parse_or(&lookup, "PORT", 8080)?,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            max_concurrent_jobs: parse_or(&lookup, "FUNNEL_MAX_CONCURRENT_JOBS", 8)?,
            max_memory_ratio,
            admission_retry_ms: parse_or(&lookup, "FUNNEL_ADMISSION_RETRY_MS", 500)?,
            stage_timeout_secs: parse_optional(&lookup, "FUNNEL_STAGE_TIMEOUT_SECS")?,
            progress_channel_capacity: parse_or(&lookup, "FUNNEL_PROGRESS_CHANNEL_CAPACITY", 256)?,
            recovery_retry_threshold: parse_or(&lookup, "FUNNEL_RECOVERY_RETRY_THRESHOLD", 3)?,
            recovery_restart_threshold: parse_or(&lookup, "FUNNEL_RECOVERY_RESTART_THRESHOLD", 2)?,
            recovery_critical_threshold: parse_or(
                &lookup,
                "FUNNEL_RECOVERY_CRITICAL_THRESHOLD",
                2,
            )?,
            pattern_ttl_hours: parse_or(&lookup, "FUNNEL_PATTERN_TTL_HOURS", 24)?,
            pattern_sweep_secs: parse_or(&lookup, "FUNNEL_PATTERN_SWEEP_SECS", 3600)?,
            analyzer_urls,
            analyzer_api_key: lookup("FUNNEL_ANALYZER_API_KEY").filter(|k| !k.is_empty()),
        })
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        let mut config = PipelineConfig::default();
        config.admission_retry = Duration::from_millis(self.admission_retry_ms);
        match self.stage_timeout_secs {
            Some(secs) => config.with_stage_timeout(Duration::from_secs(secs)),
            None => config,
        }
    }

    pub fn governor_config(&self) -> GovernorConfig {
        GovernorConfig {
            max_concurrent_jobs: self.max_concurrent_jobs,
            max_memory_ratio: self.max_memory_ratio,
        }
    }

    pub fn recovery_config(&self) -> RecoveryConfig {
        RecoveryConfig {
            retry_threshold: self.recovery_retry_threshold,
            restart_threshold: self.recovery_restart_threshold,
            critical_threshold: self.recovery_critical_threshold,
            pattern_ttl: Duration::from_secs(self.pattern_ttl_hours * 60 * 60),
            sweep_interval: Duration::from_secs(self.pattern_sweep_secs.max(1)),
            ..RecoveryConfig::default()
        }
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    Ok(parse_optional(lookup, key)?.unwrap_or(default))
}

fn parse_optional<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let c = config(&[]).unwrap();
        assert_eq!(c.port, 8080);
        assert_eq!(c.max_concurrent_jobs, 8);
        assert_eq!(c.recovery_retry_threshold, 3);
        assert!(c.analyzer_urls.is_empty());
        assert_eq!(c.recovery_config().pattern_ttl, Duration::from_secs(24 * 60 * 60));
        assert_eq!(
            c.pipeline_config().policy(ProcessingStage::AiAnalysis).timeout,
            Duration::from_secs(60)
        );
    }

    #[test]
    fn test_overrides() {
        let c = config(&[
            ("PORT", "9000"),
            ("FUNNEL_STAGE_TIMEOUT_SECS", "5"),
            ("FUNNEL_RECOVERY_RETRY_THRESHOLD", "4"),
            ("FUNNEL_GITHUB_ANALYZER_URL", "http://github-analyzer/analyze"),
            ("FUNNEL_LINKEDIN_ANALYZER_URL", ""),
        ])
        .unwrap();
        assert_eq!(c.port, 9000);
        assert_eq!(c.recovery_config().retry_threshold, 4);
        assert_eq!(
            c.pipeline_config().policy(ProcessingStage::Interview).timeout,
            Duration::from_secs(5)
        );
        assert_eq!(c.analyzer_urls.len(), 1);
        assert!(c.analyzer_urls.contains_key(&ProcessingStage::Github));
    }

    #[test]
    fn test_malformed_values_fail() {
        assert!(config(&[("PORT", "eighty")]).is_err());
        assert!(config(&[("FUNNEL_MAX_MEMORY_RATIO", "1.5")]).is_err());
    }
}
