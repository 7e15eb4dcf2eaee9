use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::Config;
use crate::models::{Direction, Outcome, Trade};

/// Mistakes the detector owns. Any tag outside this set is user-curated and
/// survives re-detection untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AutoMistake {
    PoorRiskReward,
    NoStop,
    Overtrading,
    NoDiscipline,
}

pub const AUTO_MISTAKES: &[AutoMistake] = &[
    AutoMistake::PoorRiskReward,
    AutoMistake::NoStop,
    AutoMistake::Overtrading,
    AutoMistake::NoDiscipline,
];

impl AutoMistake {
    pub fn as_str(&self) -> &'static str {
        match self {
            AutoMistake::PoorRiskReward => "Poor R/R",
            AutoMistake::NoStop => "No Stop",
            AutoMistake::Overtrading => "Overtrading",
            AutoMistake::NoDiscipline => "No Discipline",
        }
    }

    pub fn is_auto_tag(tag: &str) -> bool {
        AUTO_MISTAKES.iter().any(|m| m.as_str() == tag)
    }
}

impl fmt::Display for AutoMistake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MistakeRules {
    /// Calendar days for overtrading are taken in this zone.
    pub timezone: Tz,
    /// Same-day prior trades at which the next one is overtrading.
    pub overtrading_limit: usize,
    /// Planned reward/risk below this is flagged.
    pub min_reward_risk: f64,
}

impl Default for MistakeRules {
    fn default() -> Self {
        Self {
            timezone: Tz::UTC,
            overtrading_limit: 5,
            min_reward_risk: 1.0,
        }
    }
}

impl MistakeRules {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            timezone: cfg.timezone,
            overtrading_limit: cfg.overtrading_limit,
            min_reward_risk: cfg.min_reward_risk,
        }
    }

    pub fn local_date(&self, ts: DateTime<Utc>) -> NaiveDate {
        ts.with_timezone(&self.timezone).date_naive()
    }
}

/// Recompute the mistake tags of `trade`.
///
/// Manual tags are kept in their original order; auto tags are dropped and
/// re-derived, so running this repeatedly never grows the set.
pub fn detect_mistakes(trade: &Trade, prior_trades: &[Trade], rules: &MistakeRules) -> Vec<String> {
    let mut tags: Vec<String> = Vec::with_capacity(trade.mistakes.len() + 2);
    for tag in &trade.mistakes {
        if !AutoMistake::is_auto_tag(tag) && !tags.contains(tag) {
            tags.push(tag.clone());
        }
    }

    if trade.is_missed {
        return tags;
    }

    for mistake in auto_mistakes(trade, prior_trades, rules) {
        let tag = mistake.as_str().to_string();
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags
}

/// The auto-detectable rules that fire for `trade`, in rule order.
pub fn auto_mistakes(trade: &Trade, prior_trades: &[Trade], rules: &MistakeRules) -> Vec<AutoMistake> {
    let mut found = Vec::new();
    if trade.is_missed {
        return found;
    }

    if is_poor_risk_reward(trade, rules.min_reward_risk) {
        found.push(AutoMistake::PoorRiskReward);
    }
    if trade.stop().is_none() {
        found.push(AutoMistake::NoStop);
    }
    if same_day_count(trade, prior_trades, rules) >= rules.overtrading_limit {
        found.push(AutoMistake::Overtrading);
    }
    if broke_stop(trade) {
        found.push(AutoMistake::NoDiscipline);
    }
    found
}

fn is_poor_risk_reward(trade: &Trade, min_reward_risk: f64) -> bool {
    let (Some(tp), Some(sl)) = (trade.take_profit, trade.stop()) else {
        return false;
    };
    if tp == 0.0 || trade.entry_price == 0.0 {
        return false;
    }
    let risk = (trade.entry_price - sl).abs();
    if risk <= 0.0 || !risk.is_finite() {
        return false;
    }
    let reward = (tp - trade.entry_price).abs();
    reward / risk < min_reward_risk
}

fn same_day_count(trade: &Trade, prior_trades: &[Trade], rules: &MistakeRules) -> usize {
    let day = rules.local_date(trade.date);
    prior_trades
        .iter()
        .filter(|t| t.id != trade.id && !t.is_missed)
        .filter(|t| rules.local_date(t.date) == day)
        .count()
}

fn broke_stop(trade: &Trade) -> bool {
    if trade.outcome != Outcome::Loss {
        return false;
    }
    let (Some(exit), Some(sl)) = (trade.exit_price, trade.stop()) else {
        return false;
    };
    match trade.direction {
        Direction::Long => exit < sl,
        Direction::Short => exit > sl,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{closed_trade, trade_at};
    use chrono::{Duration, TimeZone};

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 6, 8, 0, 0).unwrap()
    }

    #[test]
    fn flags_missing_stop() {
        let mut t = closed_trade("t1", Direction::Long, 100.0, 110.0, 95.0, 1.0);
        t.stop_loss = None;
        let tags = detect_mistakes(&t, &[], &MistakeRules::default());
        assert_eq!(tags, vec!["No Stop".to_string()]);

        t.stop_loss = Some(0.0);
        let tags = detect_mistakes(&t, &[], &MistakeRules::default());
        assert_eq!(tags, vec!["No Stop".to_string()]);
    }

    #[test]
    fn flags_poor_reward_risk() {
        let mut t = closed_trade("t1", Direction::Long, 100.0, 103.0, 95.0, 1.0);
        t.take_profit = Some(104.0); // reward 4 vs risk 5
        let tags = detect_mistakes(&t, &[], &MistakeRules::default());
        assert!(tags.contains(&"Poor R/R".to_string()));

        t.take_profit = Some(105.0); // exactly 1:1
        let tags = detect_mistakes(&t, &[], &MistakeRules::default());
        assert!(!tags.contains(&"Poor R/R".to_string()));
    }

    #[test]
    fn flags_breached_stop_on_loss() {
        // Long exited below its stop
        let t = closed_trade("t1", Direction::Long, 100.0, 93.0, 95.0, 1.0);
        assert_eq!(t.outcome, Outcome::Loss);
        let tags = detect_mistakes(&t, &[], &MistakeRules::default());
        assert!(tags.contains(&"No Discipline".to_string()));

        // Short exited above its stop
        let t = closed_trade("t2", Direction::Short, 100.0, 106.0, 105.0, 1.0);
        let tags = detect_mistakes(&t, &[], &MistakeRules::default());
        assert!(tags.contains(&"No Discipline".to_string()));

        // Honoured stop
        let t = closed_trade("t3", Direction::Long, 100.0, 95.0, 95.0, 1.0);
        let tags = detect_mistakes(&t, &[], &MistakeRules::default());
        assert!(!tags.contains(&"No Discipline".to_string()));
    }

    #[test]
    fn sixth_trade_of_the_day_is_overtrading() {
        let rules = MistakeRules::default();
        let mut history: Vec<Trade> = Vec::new();
        let mut flagged = Vec::new();
        for i in 0..7 {
            let t = trade_at(&format!("t{}", i), base() + Duration::minutes(30 * i));
            let tags = detect_mistakes(&t, &history, &rules);
            flagged.push(tags.contains(&"Overtrading".to_string()));
            history.push(t);
        }
        assert_eq!(flagged, vec![false, false, false, false, false, true, true]);
    }

    #[test]
    fn overtrading_ignores_missed_and_other_days() {
        let rules = MistakeRules::default();
        let mut history: Vec<Trade> = (0..4)
            .map(|i| trade_at(&format!("h{}", i), base() + Duration::minutes(i)))
            .collect();
        let mut missed = trade_at("m", base());
        missed.is_missed = true;
        history.push(missed);
        history.push(trade_at("y", base() - Duration::days(1)));

        let t = trade_at("t", base() + Duration::hours(2));
        assert!(!detect_mistakes(&t, &history, &rules).contains(&"Overtrading".to_string()));
    }

    #[test]
    fn overtrading_uses_local_calendar_day() {
        let rules = MistakeRules {
            timezone: chrono_tz::America::New_York,
            ..MistakeRules::default()
        };
        // 2024-05-07 02:00 UTC is still 2024-05-06 in New York.
        let late = Utc.with_ymd_and_hms(2024, 5, 7, 2, 0, 0).unwrap();
        let history: Vec<Trade> = (0..5)
            .map(|i| trade_at(&format!("h{}", i), base() + Duration::hours(i)))
            .collect();
        let t = trade_at("t", late);
        assert!(detect_mistakes(&t, &history, &rules).contains(&"Overtrading".to_string()));
        assert!(!detect_mistakes(&t, &history, &MistakeRules::default())
            .contains(&"Overtrading".to_string()));
    }

    #[test]
    fn redetection_is_idempotent_and_keeps_manual_tags() {
        let mut t = closed_trade("t1", Direction::Long, 100.0, 93.0, 95.0, 1.0);
        t.mistakes = vec!["FOMO".to_string(), "No Discipline".to_string(), "Overtrading".to_string()];

        let once = detect_mistakes(&t, &[], &MistakeRules::default());
        t.mistakes = once.clone();
        let twice = detect_mistakes(&t, &[], &MistakeRules::default());

        assert_eq!(once, twice);
        assert_eq!(once, vec!["FOMO".to_string(), "No Discipline".to_string()]);
    }

    #[test]
    fn missed_trade_keeps_only_manual_tags() {
        let mut t = trade_at("t1", base());
        t.is_missed = true;
        t.stop_loss = None;
        t.mistakes = vec!["Hesitation".to_string(), "No Stop".to_string()];
        let tags = detect_mistakes(&t, &[], &MistakeRules::default());
        assert_eq!(tags, vec!["Hesitation".to_string()]);
    }
}
