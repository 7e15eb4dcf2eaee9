use chrono_tz::Tz;
use std::time::Duration;

use crate::models::{
    CapitalSettings, UserSettings, DEFAULT_DRAWDOWN_ALERT_PCT, DEFAULT_RISK_PCT,
    DEFAULT_STARTING_BALANCE,
};

#[derive(Debug, Clone)]
pub struct Config {
    // Storage
    pub db_path: String,

    // Mistake detection
    pub timezone: Tz,
    pub overtrading_limit: usize,
    pub min_reward_risk: f64,

    // Defaults for users who never saved settings
    pub starting_balance: f64,
    pub drawdown_alert_pct: f64,
    pub default_risk_pct: f64,

    // AI report
    pub ai_report_url: Option<String>,
    pub ai_report_api_key: Option<String>,
    pub ai_report_model: String,
    pub ai_report_timeout: Duration,
    pub report_trade_limit: usize,

    // Logging
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: "data/journal.db".to_string(),
            timezone: Tz::UTC,
            overtrading_limit: 5,
            min_reward_risk: 1.0,
            starting_balance: DEFAULT_STARTING_BALANCE,
            drawdown_alert_pct: DEFAULT_DRAWDOWN_ALERT_PCT,
            default_risk_pct: DEFAULT_RISK_PCT,
            ai_report_url: None,
            ai_report_api_key: None,
            ai_report_model: "gpt-4o-mini".to_string(),
            ai_report_timeout: Duration::from_secs(30),
            report_trade_limit: 20,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let defaults = Config::default();
        let env = |key: &str| -> Option<String> {
            std::env::var(key)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Config {
            db_path: env("JOURNAL_DB_PATH").unwrap_or(defaults.db_path),
            timezone: env("JOURNAL_TIMEZONE")
                .and_then(|s| s.parse::<Tz>().ok())
                .unwrap_or(defaults.timezone),
            overtrading_limit: env("OVERTRADING_LIMIT")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.overtrading_limit),
            min_reward_risk: env("MIN_REWARD_RISK")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.min_reward_risk),
            starting_balance: env("STARTING_BALANCE")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.starting_balance),
            drawdown_alert_pct: env("DRAWDOWN_ALERT_PCT")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.drawdown_alert_pct),
            default_risk_pct: env("DEFAULT_RISK_PCT")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.default_risk_pct),
            ai_report_url: env("AI_REPORT_URL"),
            ai_report_api_key: env("AI_REPORT_API_KEY"),
            ai_report_model: env("AI_REPORT_MODEL").unwrap_or(defaults.ai_report_model),
            ai_report_timeout: env("AI_REPORT_TIMEOUT_SECS")
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.ai_report_timeout),
            report_trade_limit: env("REPORT_TRADE_LIMIT")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.report_trade_limit),
            log_level: env("LOG_LEVEL").unwrap_or(defaults.log_level),
        }
    }

    /// Capital settings for users who have not saved their own.
    pub fn default_capital_settings(&self) -> CapitalSettings {
        CapitalSettings {
            starting_balance: self.starting_balance,
            drawdown_alert_pct: self.drawdown_alert_pct,
        }
    }

    pub fn default_user_settings(&self) -> UserSettings {
        UserSettings {
            default_risk_pct: self.default_risk_pct,
            ..UserSettings::default()
        }
    }
}
