use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 18990;
pub const DEFAULT_BIND: &str = "127.0.0.1";

/// Top-level config (nudge.toml + NUDGE_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NudgeConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub drip: DripConfig,
    #[serde(default)]
    pub notifiers: NotifiersConfig,
}

impl Default for NudgeConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            database: DatabaseConfig::default(),
            drip: DripConfig::default(),
            notifiers: NotifiersConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default)]
    pub trigger: TriggerAuthConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
            trigger: TriggerAuthConfig::default(),
        }
    }
}

/// How the cron trigger endpoint authenticates its caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerAuthConfig {
    #[serde(default = "default_trigger_mode")]
    pub mode: TriggerAuthMode,
    /// Bearer token value or HMAC signing secret, depending on `mode`.
    pub secret: Option<String>,
}

impl Default for TriggerAuthConfig {
    fn default() -> Self {
        Self {
            mode: TriggerAuthMode::BearerToken,
            secret: None,
        }
    }
}

/// Authentication mode for the scheduling caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum TriggerAuthMode {
    /// Static bearer token in the Authorization header.
    BearerToken,
    /// HMAC-SHA256 over the raw request body (GitHub-style X-Hub-Signature-256).
    HmacSha256,
    /// No authentication — use only for internal/trusted networks.
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Tunables for the drip-email scheduling policy.
///
/// The cap bounds are deliberately configuration, not constants: the daily
/// cap is drawn from `[cap_min, cap_max]` once per run so the send cadence
/// never looks machine-uniform to recipient-side spam heuristics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DripConfig {
    /// Days after install for the first onboarding email.
    #[serde(default = "default_onboarding_first_day")]
    pub onboarding_first_day: u32,
    /// Spacing between subsequent onboarding emails, in days.
    #[serde(default = "default_onboarding_gap_days")]
    pub onboarding_gap_days: u32,
    /// Number of onboarding slots in the sequence.
    #[serde(default = "default_onboarding_slot_count")]
    pub onboarding_slot_count: u32,
    /// Days of inactivity before a dormancy reminder becomes due.
    #[serde(default = "default_dormancy_threshold_days")]
    pub dormancy_threshold_days: u32,
    /// How far back to read the activity ledger when classifying.
    #[serde(default = "default_activity_lookback_days")]
    pub activity_lookback_days: u32,
    /// Lower bound of the per-run send cap.
    #[serde(default = "default_cap_min")]
    pub cap_min: u32,
    /// Upper bound of the per-run send cap (inclusive).
    #[serde(default = "default_cap_max")]
    pub cap_max: u32,
}

impl Default for DripConfig {
    fn default() -> Self {
        Self {
            onboarding_first_day: default_onboarding_first_day(),
            onboarding_gap_days: default_onboarding_gap_days(),
            onboarding_slot_count: default_onboarding_slot_count(),
            dormancy_threshold_days: default_dormancy_threshold_days(),
            activity_lookback_days: default_activity_lookback_days(),
            cap_min: default_cap_min(),
            cap_max: default_cap_max(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NotifiersConfig {
    pub email: Option<EmailConfig>,
    pub slack: Option<SlackConfig>,
}

/// SMTP delivery settings. Credentials come from the SMTP_USERNAME and
/// SMTP_PASSWORD environment variables, not from the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_host: String,
    /// Defaults to 587 (STARTTLS).
    pub smtp_port: Option<u16>,
    /// Sender address, e.g. "Nudge <hello@example.com>".
    pub from: String,
}

/// Slack incoming-webhook delivery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackConfig {
    pub webhook_url: String,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_trigger_mode() -> TriggerAuthMode {
    TriggerAuthMode::BearerToken
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.nudge/nudge.db", home)
}
fn default_onboarding_first_day() -> u32 {
    1
}
fn default_onboarding_gap_days() -> u32 {
    2
}
fn default_onboarding_slot_count() -> u32 {
    4
}
fn default_dormancy_threshold_days() -> u32 {
    7
}
fn default_activity_lookback_days() -> u32 {
    30
}
fn default_cap_min() -> u32 {
    20
}
fn default_cap_max() -> u32 {
    50
}

impl NudgeConfig {
    /// Load config from a TOML file with NUDGE_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. ~/.nudge/nudge.toml
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: NudgeConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("NUDGE_").split("_"))
            .extract()
            .map_err(|e| crate::error::NudgeError::Config(e.to_string()))?;

        Ok(config)
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.nudge/nudge.toml", home)
}
