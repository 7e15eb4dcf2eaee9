use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analytics::{chronological, mean, Streaks};
use crate::models::{CapitalSettings, Trade};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub trade_id: String,
    pub date: DateTime<Utc>,
    pub pnl: f64,
    pub equity: f64,
    /// Realized total over the whole history, repeated on every point.
    pub realized: f64,
    pub unrealized: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapitalStats {
    pub starting_balance: f64,
    pub current_balance: f64,
    pub realized_pnl: f64,
    /// Always 0: there is no live pricing for open trades.
    pub unrealized_pnl: f64,
    pub net_growth_pct: f64,
    pub trade_count: usize,
    pub equity_curve: Vec<EquityPoint>,
    pub max_drawdown: f64,
    pub max_drawdown_pct: f64,
    pub current_drawdown_pct: f64,
    pub drawdown_alert: bool,
    pub avg_r: f64,
    pub sharpe_ratio: Option<f64>,
    pub max_win_streak: usize,
    pub max_loss_streak: usize,
    pub current_streak: i64,
}

impl CapitalStats {
    pub fn print_summary(&self) {
        println!("\n{}", "=".repeat(50));
        println!("  CAPITAL");
        println!("{}", "=".repeat(50));
        println!("  Start:       ${:.2}", self.starting_balance);
        println!("  Balance:     ${:.2}", self.current_balance);
        println!("  Realized:    ${:+.2}", self.realized_pnl);
        println!("  Growth:      {:+.2}%", self.net_growth_pct);
        println!("  Trades:      {}", self.trade_count);
        println!(
            "  Max DD:      ${:.2} ({:.2}%)",
            self.max_drawdown, self.max_drawdown_pct
        );
        println!("  Current DD:  {:.2}%", self.current_drawdown_pct);
        match self.sharpe_ratio {
            Some(s) => println!("  Sharpe:      {:.2}", s),
            None => println!("  Sharpe:      n/a"),
        }
        println!("  Streak:      {:+}", self.current_streak);
        if self.drawdown_alert {
            println!("  !! Drawdown alert threshold reached");
        }
        println!("{}", "=".repeat(50));
    }
}

fn pct_of(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        part / whole * 100.0
    } else {
        0.0
    }
}

/// Mean over sample standard deviation of R-multiples.
pub fn sharpe_like(r_values: &[f64]) -> Option<f64> {
    if r_values.len() < 2 {
        return None;
    }
    let m = mean(r_values);
    let variance =
        r_values.iter().map(|r| (r - m).powi(2)).sum::<f64>() / (r_values.len() - 1) as f64;
    let std_dev = variance.sqrt();
    if std_dev > 0.0 && std_dev.is_finite() {
        Some(m / std_dev)
    } else {
        None
    }
}

/// Equity projection over closed, capital-impacting trades.
pub fn compute_capital_stats(trades: &[Trade], settings: &CapitalSettings) -> CapitalStats {
    let start = settings.starting_balance;
    let closed = chronological(trades, |t| t.affects_capital && t.outcome.is_closed());

    let realized_pnl: f64 = closed.iter().map(|t| t.pnl).sum();
    let unrealized_pnl = 0.0;

    let mut equity = start;
    let mut peak = start;
    let mut max_drawdown = 0.0_f64;
    let mut max_drawdown_pct = 0.0_f64;
    let mut equity_curve = Vec::with_capacity(closed.len());

    for t in &closed {
        equity += t.pnl;
        peak = peak.max(equity);
        let drawdown = peak - equity;
        max_drawdown = max_drawdown.max(drawdown);
        max_drawdown_pct = max_drawdown_pct.max(pct_of(drawdown, peak));

        equity_curve.push(EquityPoint {
            trade_id: t.id.clone(),
            date: t.date,
            pnl: t.pnl,
            equity,
            realized: realized_pnl,
            unrealized: unrealized_pnl,
        });
    }

    let current_balance = start + realized_pnl + unrealized_pnl;
    let current_drawdown_pct = pct_of(peak - equity, peak);

    let r_values: Vec<f64> = closed
        .iter()
        .map(|t| t.r_multiple)
        .filter(|r| r.is_finite())
        .collect();
    let streaks = Streaks::scan(closed.iter().copied());

    CapitalStats {
        starting_balance: start,
        current_balance,
        realized_pnl,
        unrealized_pnl,
        net_growth_pct: if start != 0.0 {
            (current_balance - start) / start * 100.0
        } else {
            0.0
        },
        trade_count: closed.len(),
        equity_curve,
        max_drawdown,
        max_drawdown_pct,
        current_drawdown_pct,
        drawdown_alert: settings.drawdown_alert_pct > 0.0
            && current_drawdown_pct >= settings.drawdown_alert_pct,
        avg_r: mean(&r_values),
        sharpe_ratio: sharpe_like(&r_values),
        max_win_streak: streaks.max_win,
        max_loss_streak: streaks.max_loss,
        current_streak: streaks.current,
    }
}
