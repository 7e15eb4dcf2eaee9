use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::models::{Outcome, Trade};

/// Bucket label for trades with nothing recorded in a dimension.
pub const UNKNOWN_BUCKET: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GroupDimension {
    Setup,
    Timeframe,
    Emotion,
    EntryEmotion,
    ExitEmotion,
    Mistake,
    Pair,
    Direction,
    Weekday,
}

pub const DIMENSIONS: &[GroupDimension] = &[
    GroupDimension::Setup,
    GroupDimension::Timeframe,
    GroupDimension::Emotion,
    GroupDimension::EntryEmotion,
    GroupDimension::ExitEmotion,
    GroupDimension::Mistake,
    GroupDimension::Pair,
    GroupDimension::Direction,
    GroupDimension::Weekday,
];

impl GroupDimension {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupDimension::Setup => "setup",
            GroupDimension::Timeframe => "timeframe",
            GroupDimension::Emotion => "emotion",
            GroupDimension::EntryEmotion => "entry_emotion",
            GroupDimension::ExitEmotion => "exit_emotion",
            GroupDimension::Mistake => "mistake",
            GroupDimension::Pair => "pair",
            GroupDimension::Direction => "direction",
            GroupDimension::Weekday => "weekday",
        }
    }

    pub fn from_str_loose(s: &str) -> Option<GroupDimension> {
        let s = s.trim().to_ascii_lowercase();
        let s = s.strip_suffix('s').unwrap_or(&s);
        DIMENSIONS.iter().copied().find(|d| d.as_str() == s)
    }

    /// Tag-set dimensions put one trade into several buckets.
    pub fn is_multi_valued(&self) -> bool {
        matches!(
            self,
            GroupDimension::Setup
                | GroupDimension::Timeframe
                | GroupDimension::Emotion
                | GroupDimension::Mistake
        )
    }

    fn keys(&self, trade: &Trade) -> Vec<String> {
        let keys = match self {
            GroupDimension::Setup => trade.setups.clone(),
            GroupDimension::Timeframe => trade.timeframes.clone(),
            GroupDimension::Emotion => trade.emotions.clone(),
            GroupDimension::Mistake => trade.mistakes.clone(),
            GroupDimension::EntryEmotion => trade.entry_emotion.iter().cloned().collect(),
            GroupDimension::ExitEmotion => trade.exit_emotion.iter().cloned().collect(),
            GroupDimension::Pair => vec![trade.pair.clone()],
            GroupDimension::Direction => vec![trade.direction.to_string()],
            GroupDimension::Weekday => vec![trade.date.weekday().to_string()],
        };
        let mut unique: Vec<String> = Vec::with_capacity(keys.len());
        for key in keys {
            if !key.trim().is_empty() && !unique.contains(&key) {
                unique.push(key);
            }
        }
        let mut keys = unique;
        if keys.is_empty() {
            keys.push(UNKNOWN_BUCKET.to_string());
        }
        keys
    }
}

impl fmt::Display for GroupDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupStats {
    pub name: String,
    pub total_trades: usize,
    pub wins: usize,
    pub losses: usize,
    pub win_rate: f64,
    pub net_pnl: f64,
    pub avg_r: f64,
}

#[derive(Default)]
struct Bucket {
    total: usize,
    wins: usize,
    losses: usize,
    net_pnl: f64,
    r_sum: f64,
}

/// Performance per value of `dimension` over closed trades, best win rate
/// first; equal win rates are ordered by name.
pub fn grouped_stats(trades: &[Trade], dimension: GroupDimension) -> Vec<GroupStats> {
    let mut buckets: HashMap<String, Bucket> = HashMap::new();

    for trade in trades.iter().filter(|t| t.outcome.is_closed()) {
        for key in dimension.keys(trade) {
            let b = buckets.entry(key).or_default();
            b.total += 1;
            b.net_pnl += trade.pnl;
            b.r_sum += trade.r_multiple;
            match trade.outcome {
                Outcome::Win => b.wins += 1,
                Outcome::Loss => b.losses += 1,
                _ => {}
            }
        }
    }

    let mut out: Vec<GroupStats> = buckets
        .into_iter()
        .map(|(name, b)| GroupStats {
            name,
            total_trades: b.total,
            wins: b.wins,
            losses: b.losses,
            win_rate: b.wins as f64 / b.total as f64 * 100.0,
            net_pnl: b.net_pnl,
            avg_r: b.r_sum / b.total as f64,
        })
        .collect();

    out.sort_by(|a, b| {
        b.win_rate
            .total_cmp(&a.win_rate)
            .then_with(|| a.name.cmp(&b.name))
    });
    out
}
