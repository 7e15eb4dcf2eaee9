use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::JournalError;
use crate::models::{Direction, Outcome, Trade, TradeDraft};

/// |pnl| below this is classified as break-even regardless of sign.
pub const BREAKEVEN_EPSILON: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradeMetrics {
    pub pnl: f64,
    pub r_multiple: f64,
    pub outcome: Outcome,
}

impl TradeMetrics {
    pub fn open() -> Self {
        Self {
            pnl: 0.0,
            r_multiple: 0.0,
            outcome: Outcome::Open,
        }
    }
}

pub fn classify_outcome(pnl: f64) -> Outcome {
    if !pnl.is_finite() || pnl.abs() < BREAKEVEN_EPSILON {
        Outcome::BreakEven
    } else if pnl > 0.0 {
        Outcome::Win
    } else {
        Outcome::Loss
    }
}

/// PnL, R-multiple and outcome for one execution.
///
/// A missing, zero or non-finite exit means the trade is still open. The
/// R-multiple uses the unsigned price move over the stop distance, negated
/// for losses, and is 0 whenever the stop distance is 0.
pub fn compute_metrics(
    direction: Direction,
    entry_price: f64,
    exit_price: Option<f64>,
    stop_loss: f64,
    size: f64,
) -> TradeMetrics {
    let exit = match exit_price {
        Some(p) if p.is_finite() && p != 0.0 => p,
        _ => return TradeMetrics::open(),
    };
    if !entry_price.is_finite() || !size.is_finite() {
        return TradeMetrics::open();
    }

    let pnl = match direction {
        Direction::Long => (exit - entry_price) * size,
        Direction::Short => (entry_price - exit) * size,
    };
    let outcome = classify_outcome(pnl);

    let risk_per_unit = if stop_loss.is_finite() {
        (entry_price - stop_loss).abs()
    } else {
        0.0
    };
    let reward_per_unit = (exit - entry_price).abs();

    let r_multiple = if risk_per_unit > 0.0 {
        match outcome {
            Outcome::Win => reward_per_unit / risk_per_unit,
            Outcome::Loss => -(reward_per_unit / risk_per_unit),
            _ => 0.0,
        }
    } else {
        0.0
    };

    TradeMetrics {
        pnl,
        r_multiple,
        outcome,
    }
}

/// R-multiple for a user-entered pnl: pnl over the dollar risk implied by
/// the stop distance and size.
pub fn manual_r_multiple(pnl: f64, entry_price: f64, stop_loss: f64, size: f64) -> f64 {
    let total_risk = (entry_price - stop_loss).abs() * size;
    if total_risk.is_finite() && total_risk > 0.0 && pnl.is_finite() {
        pnl / total_risk
    } else {
        0.0
    }
}

/// Trim, drop empties and dedupe, keeping first-seen order.
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}

fn normalize_label(label: Option<String>) -> Option<String> {
    label
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
}

/// Build a full trade from form input, recomputing every derived field.
pub fn derive_trade(
    draft: TradeDraft,
    id: &str,
    user_id: &str,
    created_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<Trade, JournalError> {
    if draft.pair.trim().is_empty() {
        return Err(JournalError::Validation("pair is required".to_string()));
    }
    let skip_reason = normalize_label(draft.skip_reason);
    if draft.is_missed && skip_reason.is_none() {
        return Err(JournalError::Validation(
            "missed trade requires a skip reason".to_string(),
        ));
    }

    let stop = draft.stop_loss.unwrap_or(0.0);
    let (metrics, is_manual_pnl) = if draft.is_missed {
        (
            TradeMetrics {
                pnl: 0.0,
                r_multiple: 0.0,
                outcome: Outcome::Missed,
            },
            false,
        )
    } else if let Some(pnl) = draft.manual_pnl.filter(|p| p.is_finite()) {
        let outcome = match draft.manual_outcome {
            Some(o) if o != Outcome::Missed => o,
            _ => classify_outcome(pnl),
        };
        let r_multiple = manual_r_multiple(pnl, draft.entry_price, stop, draft.position_size);
        (
            TradeMetrics {
                pnl,
                r_multiple,
                outcome,
            },
            true,
        )
    } else {
        (
            compute_metrics(
                draft.direction,
                draft.entry_price,
                draft.exit_price,
                stop,
                draft.position_size,
            ),
            false,
        )
    };

    let duration_minutes = match draft.exit_date {
        Some(exit) if exit >= draft.date => Some((exit - draft.date).num_minutes()),
        _ => None,
    };

    Ok(Trade {
        id: id.to_string(),
        user_id: user_id.to_string(),
        date: draft.date,
        pair: draft.pair.trim().to_string(),
        direction: draft.direction,
        entry_price: draft.entry_price,
        stop_loss: draft.stop_loss,
        take_profit: draft.take_profit,
        exit_price: draft.exit_price,
        exit_date: draft.exit_date,
        position_size: draft.position_size,
        risk_amount: draft.risk_amount,
        risk_mode: draft.risk_mode,
        reason: draft.reason,
        notes: draft.notes,
        media_links: normalize_tags(draft.media_links),
        setups: normalize_tags(draft.setups),
        timeframes: normalize_tags(draft.timeframes),
        emotions: normalize_tags(draft.emotions),
        entry_emotion: normalize_label(draft.entry_emotion),
        exit_emotion: normalize_label(draft.exit_emotion),
        mistakes: normalize_tags(draft.mistakes),
        pnl: metrics.pnl,
        r_multiple: metrics.r_multiple,
        outcome: metrics.outcome,
        duration_minutes,
        is_manual_pnl,
        affects_capital: draft.affects_capital,
        is_missed: draft.is_missed,
        skip_reason,
        news_affected: draft.news_affected,
        created_at,
        updated_at: now,
    })
}
