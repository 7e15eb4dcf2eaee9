use chrono::{DateTime, Datelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::models::{Trade, UserSettings};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LossLimitStatus {
    pub daily_pnl: f64,
    pub weekly_pnl: f64,
    pub daily_limit: Option<f64>,
    pub weekly_limit: Option<f64>,
    pub daily_breached: bool,
    pub weekly_breached: bool,
}

impl LossLimitStatus {
    pub fn any_breached(&self) -> bool {
        self.daily_breached || self.weekly_breached
    }
}

fn breached(pnl: f64, limit: Option<f64>) -> bool {
    match limit {
        Some(l) if l > 0.0 => pnl <= -l,
        _ => false,
    }
}

/// Realized PnL for the local day and ISO week containing `now`, checked
/// against the user's loss limits. A trade is realized at its exit time, or
/// its entry time when no exit time was recorded.
pub fn check_loss_limits(
    trades: &[Trade],
    settings: &UserSettings,
    now: DateTime<Utc>,
    tz: Tz,
) -> LossLimitStatus {
    let today = now.with_timezone(&tz).date_naive();
    let week = today.iso_week();

    let mut daily_pnl = 0.0;
    let mut weekly_pnl = 0.0;
    for t in trades
        .iter()
        .filter(|t| t.affects_capital && t.outcome.is_closed())
    {
        let day = t.exit_date.unwrap_or(t.date).with_timezone(&tz).date_naive();
        if day.iso_week() == week {
            weekly_pnl += t.pnl;
            if day == today {
                daily_pnl += t.pnl;
            }
        }
    }

    LossLimitStatus {
        daily_pnl,
        weekly_pnl,
        daily_limit: settings.max_daily_loss,
        weekly_limit: settings.max_weekly_loss,
        daily_breached: breached(daily_pnl, settings.max_daily_loss),
        weekly_breached: breached(weekly_pnl, settings.max_weekly_loss),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::pnl_trade_on;
    use chrono::TimeZone;

    #[test]
    fn sums_today_and_this_week() {
        // Wednesday 2024-05-08
        let now = Utc.with_ymd_and_hms(2024, 5, 8, 15, 0, 0).unwrap();
        let trades = vec![
            pnl_trade_on("a", Utc.with_ymd_and_hms(2024, 5, 8, 9, 0, 0).unwrap(), -120.0),
            pnl_trade_on("b", Utc.with_ymd_and_hms(2024, 5, 8, 10, 0, 0).unwrap(), 20.0),
            pnl_trade_on("c", Utc.with_ymd_and_hms(2024, 5, 6, 10, 0, 0).unwrap(), -200.0),
            // previous week
            pnl_trade_on("d", Utc.with_ymd_and_hms(2024, 5, 3, 10, 0, 0).unwrap(), -999.0),
        ];
        let settings = UserSettings {
            max_daily_loss: Some(100.0),
            max_weekly_loss: Some(500.0),
            ..UserSettings::default()
        };
        let status = check_loss_limits(&trades, &settings, now, Tz::UTC);
        assert!((status.daily_pnl + 100.0).abs() < 1e-9);
        assert!((status.weekly_pnl + 300.0).abs() < 1e-9);
        assert!(status.daily_breached);
        assert!(!status.weekly_breached);
        assert!(status.any_breached());
    }

    #[test]
    fn no_limits_never_breach() {
        let now = Utc.with_ymd_and_hms(2024, 5, 8, 15, 0, 0).unwrap();
        let trades = vec![pnl_trade_on("a", now, -10_000.0)];
        let status = check_loss_limits(&trades, &UserSettings::default(), now, Tz::UTC);
        assert!(!status.any_breached());
    }
}
