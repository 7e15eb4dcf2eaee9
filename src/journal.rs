use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::analytics::{
    check_loss_limits, compute_capital_stats, global_stats, grouped_stats, CapitalStats,
    GroupDimension, GroupStats, LossLimitStatus, TradeStats,
};
use crate::config::Config;
use crate::core::metrics::derive_trade;
use crate::core::mistakes::{detect_mistakes, MistakeRules};
use crate::core::sizing::{calculate_position, TradeHandoff};
use crate::error::JournalError;
use crate::models::{
    CalculatorEntry, CapitalSettings, Direction, SizingInput, Trade, TradeDraft,
    TradeHistoryEntry, UserSettings, CALCULATOR_HISTORY_CAP,
};
use crate::store::JournalStore;

/// The journal as seen by one session. Every operation needs a resolved
/// user; without one it fails with `JournalError::Unauthorized`.
pub struct Journal {
    store: Arc<dyn JournalStore>,
    config: Config,
    rules: MistakeRules,
    user_id: Option<String>,
    /// When set, used instead of Utc::now() for timestamps
    pub sim_time: Option<DateTime<Utc>>,
}

impl Journal {
    pub fn new(store: Arc<dyn JournalStore>, config: Config, user_id: Option<String>) -> Self {
        let rules = MistakeRules::from_config(&config);
        Self {
            store,
            config,
            rules,
            user_id: user_id.filter(|u| !u.trim().is_empty()),
            sim_time: None,
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn rules(&self) -> &MistakeRules {
        &self.rules
    }

    fn user(&self) -> Result<&str, JournalError> {
        self.user_id.as_deref().ok_or(JournalError::Unauthorized)
    }

    fn now(&self) -> DateTime<Utc> {
        self.sim_time.unwrap_or_else(Utc::now)
    }

    /// Re-run detection over the trades matching `affected`, saving those
    /// whose tags changed. Prior trades are the ones ahead in store order
    /// (entry time, then insertion), so equal timestamps never see each
    /// other both ways.
    fn refresh_mistakes<F>(&self, user_id: &str, affected: F) -> Result<usize, JournalError>
    where
        F: Fn(&Trade) -> bool,
    {
        let mut trades = self.store.load_trades(user_id)?;
        let mut changed = 0;
        for i in 0..trades.len() {
            if !affected(&trades[i]) {
                continue;
            }
            let mistakes = detect_mistakes(&trades[i], &trades[..i], &self.rules);
            if mistakes != trades[i].mistakes {
                trades[i].mistakes = mistakes;
                self.store.upsert_trade(&trades[i])?;
                changed += 1;
            }
        }
        Ok(changed)
    }

    fn refresh_days(&self, user_id: &str, days: &[NaiveDate]) -> Result<usize, JournalError> {
        let changed = self.refresh_mistakes(user_id, |t| days.contains(&self.rules.local_date(t.date)))?;
        if changed > 0 {
            debug!("Mistake tags refreshed on {} trades", changed);
        }
        Ok(changed)
    }

    // ── Trades ──────────────────────────────────────────

    pub fn create_trade(&self, draft: TradeDraft) -> Result<Trade, JournalError> {
        let user_id = self.user()?;
        let now = self.now();
        let id = Uuid::new_v4().to_string();

        let trade = derive_trade(draft, &id, user_id, now, now)?;
        self.store.upsert_trade(&trade)?;
        self.refresh_days(user_id, &[self.rules.local_date(trade.date)])?;
        let trade = self.trade(&id)?;

        info!(
            "Trade {} saved: {} {} {} | PnL ${:.2} | R {:.2}",
            trade.id,
            trade.pair,
            trade.direction,
            trade.outcome,
            trade.pnl,
            trade.r_multiple
        );
        if !trade.mistakes.is_empty() {
            debug!("Trade {} mistakes: {}", trade.id, trade.mistakes.join(", "));
        }
        Ok(trade)
    }

    /// Replace a trade's raw fields, recompute everything derived and record
    /// the before/after pair in the audit history.
    pub fn update_trade(&self, id: &str, draft: TradeDraft) -> Result<Trade, JournalError> {
        let user_id = self.user()?;
        let before = self
            .store
            .get_trade(user_id, id)?
            .ok_or_else(|| JournalError::NotFound(id.to_string()))?;
        let now = self.now();

        let after = derive_trade(draft, id, user_id, before.created_at, now)?;
        self.store.upsert_trade(&after)?;
        self.refresh_days(
            user_id,
            &[
                self.rules.local_date(before.date),
                self.rules.local_date(after.date),
            ],
        )?;
        let after = self.trade(id)?;

        self.store.append_history(&TradeHistoryEntry {
            trade_id: id.to_string(),
            user_id: user_id.to_string(),
            timestamp: now,
            before,
            after: after.clone(),
        })?;

        info!(
            "Trade {} updated: {} | PnL ${:.2}",
            after.id, after.outcome, after.pnl
        );
        Ok(after)
    }

    pub fn delete_trade(&self, id: &str) -> Result<(), JournalError> {
        let user_id = self.user()?;
        let trade = self.trade(id)?;
        if !self.store.delete_trade(user_id, id)? {
            return Err(JournalError::NotFound(id.to_string()));
        }
        self.refresh_days(user_id, &[self.rules.local_date(trade.date)])?;
        info!("Trade {} deleted", id);
        Ok(())
    }

    pub fn trade(&self, id: &str) -> Result<Trade, JournalError> {
        let user_id = self.user()?;
        self.store
            .get_trade(user_id, id)?
            .ok_or_else(|| JournalError::NotFound(id.to_string()))
    }

    /// All of the user's trades, oldest entry first.
    pub fn trades(&self) -> Result<Vec<Trade>, JournalError> {
        let user_id = self.user()?;
        Ok(self.store.load_trades(user_id)?)
    }

    pub fn trade_history(&self, id: &str) -> Result<Vec<TradeHistoryEntry>, JournalError> {
        let user_id = self.user()?;
        Ok(self.store.load_history(user_id, id)?)
    }

    /// Re-run mistake detection over every trade, saving the ones whose tags
    /// changed. Returns how many were rewritten.
    pub fn redetect_mistakes(&self) -> Result<usize, JournalError> {
        let user_id = self.user()?;
        let changed = self.refresh_mistakes(user_id, |_| true)?;
        if changed > 0 {
            info!("Mistake tags refreshed on {} trades", changed);
        }
        Ok(changed)
    }

    // ── Settings ────────────────────────────────────────

    pub fn capital_settings(&self) -> Result<CapitalSettings, JournalError> {
        let user_id = self.user()?;
        Ok(self
            .store
            .load_capital_settings(user_id)?
            .unwrap_or_else(|| self.config.default_capital_settings()))
    }

    pub fn save_capital_settings(&self, settings: &CapitalSettings) -> Result<(), JournalError> {
        let user_id = self.user()?;
        self.store.save_capital_settings(user_id, settings)?;
        info!(
            "Capital settings saved: start ${:.2}, alert at {:.1}%",
            settings.starting_balance, settings.drawdown_alert_pct
        );
        Ok(())
    }

    pub fn user_settings(&self) -> Result<UserSettings, JournalError> {
        let user_id = self.user()?;
        Ok(self
            .store
            .load_user_settings(user_id)?
            .unwrap_or_else(|| self.config.default_user_settings()))
    }

    pub fn save_user_settings(&self, settings: &UserSettings) -> Result<(), JournalError> {
        let user_id = self.user()?;
        self.store.save_user_settings(user_id, settings)?;
        Ok(())
    }

    // ── Calculator ──────────────────────────────────────

    /// Run the sizing calculator and keep the result in the user's history.
    pub fn save_calculation(
        &self,
        input: SizingInput,
        pair: Option<String>,
        note: Option<String>,
    ) -> Result<CalculatorEntry, JournalError> {
        let user_id = self.user()?;
        let result = calculate_position(&input);
        let entry = CalculatorEntry {
            id: Uuid::new_v4().to_string(),
            created_at: self.now(),
            pair: pair.filter(|p| !p.trim().is_empty()),
            note: note.filter(|n| !n.trim().is_empty()),
            input,
            result,
        };
        self.store
            .append_calculation(user_id, &entry, CALCULATOR_HISTORY_CAP)?;
        debug!(
            "Calculation saved ({}): size {:.6}, risk ${:.2}",
            input.target.as_str(),
            result.position_size,
            result.dollar_risk
        );
        Ok(entry)
    }

    /// Saved calculations, oldest first.
    pub fn calculations(&self) -> Result<Vec<CalculatorEntry>, JournalError> {
        let user_id = self.user()?;
        Ok(self.store.load_calculations(user_id)?)
    }

    /// Start a trade draft from a saved calculation.
    pub fn draft_from_calculation(&self, calculation_id: &str) -> Result<TradeDraft, JournalError> {
        let entry = self
            .calculations()?
            .into_iter()
            .find(|c| c.id == calculation_id)
            .ok_or_else(|| JournalError::NotFound(calculation_id.to_string()))?;
        let handoff = TradeHandoff::from_calculation(&entry.input, &entry.result).ok_or_else(|| {
            JournalError::Validation("calculation did not produce a position".to_string())
        })?;

        let pair = entry.pair.clone().unwrap_or_default();
        let direction = handoff.direction.unwrap_or(Direction::Long);
        let mut draft = TradeDraft::new(&pair, direction, self.now());
        handoff.apply_to(&mut draft);
        Ok(draft)
    }

    // ── Analytics ───────────────────────────────────────

    pub fn stats(&self) -> Result<TradeStats, JournalError> {
        Ok(global_stats(&self.trades()?))
    }

    pub fn grouped(&self, dimension: GroupDimension) -> Result<Vec<GroupStats>, JournalError> {
        Ok(grouped_stats(&self.trades()?, dimension))
    }

    pub fn capital(&self) -> Result<CapitalStats, JournalError> {
        let settings = self.capital_settings()?;
        let stats = compute_capital_stats(&self.trades()?, &settings);
        if stats.drawdown_alert {
            warn!(
                "Drawdown {:.2}% has reached the {:.1}% alert threshold",
                stats.current_drawdown_pct, settings.drawdown_alert_pct
            );
        }
        Ok(stats)
    }

    pub fn loss_limits(&self) -> Result<LossLimitStatus, JournalError> {
        let settings = self.user_settings()?;
        let status = check_loss_limits(&self.trades()?, &settings, self.now(), self.rules.timezone);
        if status.daily_breached {
            warn!("Daily loss limit reached: ${:.2}", status.daily_pnl);
        }
        if status.weekly_breached {
            warn!("Weekly loss limit reached: ${:.2}", status.weekly_pnl);
        }
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::mistakes::AutoMistake;
    use crate::models::{RiskMode, SizingTarget};
    use crate::store::MemoryStore;
    use crate::test_helpers::base_time;

    fn journal(user: Option<&str>) -> Journal {
        let mut j = Journal::new(
            Arc::new(MemoryStore::new()),
            Config::default(),
            user.map(str::to_string),
        );
        j.sim_time = Some(base_time());
        j
    }

    fn long_draft(entry: f64, exit: f64, stop: Option<f64>) -> TradeDraft {
        let mut d = TradeDraft::new("EURUSD", Direction::Long, base_time());
        d.entry_price = entry;
        d.exit_price = Some(exit);
        d.stop_loss = stop;
        d.position_size = 100.0;
        d
    }

    #[test]
    fn every_operation_requires_a_user() {
        let j = journal(None);
        assert!(matches!(
            j.create_trade(long_draft(1.0, 1.1, Some(0.9))),
            Err(JournalError::Unauthorized)
        ));
        assert!(matches!(j.trades(), Err(JournalError::Unauthorized)));
        assert!(matches!(j.stats(), Err(JournalError::Unauthorized)));
        assert!(matches!(j.calculations(), Err(JournalError::Unauthorized)));

        let blank = journal(Some("  "));
        assert!(matches!(blank.capital(), Err(JournalError::Unauthorized)));
    }

    #[test]
    fn create_detects_and_update_keeps_manual_tags() {
        let j = journal(Some("user-1"));
        let mut draft = long_draft(100.0, 90.0, None);
        draft.mistakes = vec!["FOMO".to_string()];
        let trade = j.create_trade(draft).unwrap();
        assert_eq!(trade.mistakes, vec!["FOMO", AutoMistake::NoStop.as_str()]);

        let mut fixed = trade.to_draft();
        fixed.stop_loss = Some(95.0);
        let updated = j.update_trade(&trade.id, fixed).unwrap();
        assert_eq!(updated.mistakes, vec!["FOMO", "No Discipline"]);
        assert_eq!(updated.created_at, trade.created_at);

        let history = j.trade_history(&trade.id).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].before, trade);
        assert_eq!(history[0].after, updated);
    }

    #[test]
    fn same_timestamp_trades_only_flag_the_sixth() {
        let j = journal(Some("user-1"));
        for _ in 0..6 {
            j.create_trade(long_draft(100.0, 105.0, Some(95.0))).unwrap();
        }
        assert_eq!(j.redetect_mistakes().unwrap(), 0);

        let flagged: Vec<bool> = j
            .trades()
            .unwrap()
            .iter()
            .map(|t| t.mistakes.contains(&AutoMistake::Overtrading.to_string()))
            .collect();
        assert_eq!(flagged, vec![false, false, false, false, false, true]);
    }

    #[test]
    fn missing_trades_are_not_found() {
        let j = journal(Some("user-1"));
        assert!(matches!(j.delete_trade("nope"), Err(JournalError::NotFound(_))));
        assert!(matches!(
            j.update_trade("nope", long_draft(1.0, 1.1, Some(0.9))),
            Err(JournalError::NotFound(_))
        ));
    }

    #[test]
    fn settings_fall_back_to_config_defaults() {
        let j = journal(Some("user-1"));
        assert_eq!(j.capital_settings().unwrap().starting_balance, 10_000.0);
        assert_eq!(j.user_settings().unwrap().default_risk_mode, RiskMode::Percent);
    }

    #[test]
    fn calculation_hands_off_to_a_draft() {
        let j = journal(Some("user-1"));
        let entry = j
            .save_calculation(
                SizingInput {
                    balance: 10_000.0,
                    risk_mode: RiskMode::Percent,
                    risk_value: 1.0,
                    target: SizingTarget::Units {
                        entry: 100.0,
                        stop: 105.0,
                    },
                },
                Some("ETHUSD".to_string()),
                None,
            )
            .unwrap();
        let draft = j.draft_from_calculation(&entry.id).unwrap();
        assert_eq!(draft.pair, "ETHUSD");
        assert_eq!(draft.direction, Direction::Short);
        assert_eq!(draft.stop_loss, Some(105.0));
        assert!((draft.position_size - 20.0).abs() < 1e-9);
        assert_eq!(draft.risk_mode, RiskMode::Fixed);
    }
}
