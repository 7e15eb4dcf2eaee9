use anyhow::{Context, Result};
use csv::Writer;
use std::io;
use std::path::Path;
use tracing::info;

use crate::models::{CalculatorEntry, SizingTarget, Trade};

pub const TRADE_COLUMNS: &[&str] = &[
    "id",
    "date",
    "pair",
    "direction",
    "entry_price",
    "stop_loss",
    "take_profit",
    "exit_price",
    "position_size",
    "pnl",
    "r_multiple",
    "outcome",
    "setups",
    "timeframes",
    "emotions",
    "mistakes",
    "notes",
];

pub const CALCULATION_COLUMNS: &[&str] = &[
    "created_at",
    "pair",
    "mode",
    "target",
    "balance",
    "risk_value",
    "entry",
    "stop_loss",
    "stop_loss_percent",
    "position_size",
    "position_value",
    "dollar_risk",
];

fn price(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn tags(values: &[String]) -> String {
    values.join("|")
}

pub fn write_trades<W: io::Write>(out: W, trades: &[Trade]) -> Result<()> {
    let mut wtr = Writer::from_writer(out);
    wtr.write_record(TRADE_COLUMNS)?;
    for t in trades {
        wtr.write_record([
            t.id.clone(),
            t.date.to_rfc3339(),
            t.pair.clone(),
            t.direction.to_string(),
            t.entry_price.to_string(),
            price(t.stop()),
            price(t.take_profit),
            price(t.exit_price),
            t.position_size.to_string(),
            format!("{:.2}", t.pnl),
            format!("{:.2}", t.r_multiple),
            t.outcome.to_string(),
            tags(&t.setups),
            tags(&t.timeframes),
            tags(&t.emotions),
            tags(&t.mistakes),
            t.notes.clone(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_calculations<W: io::Write>(out: W, entries: &[CalculatorEntry]) -> Result<()> {
    let mut wtr = Writer::from_writer(out);
    wtr.write_record(CALCULATION_COLUMNS)?;
    for e in entries {
        let (entry, stop_loss, stop_loss_percent) = match e.input.target {
            SizingTarget::Units { entry, stop } => (Some(entry), Some(stop), None),
            SizingTarget::Value {
                stop_loss_percent,
                entry,
            } => (entry, None, Some(stop_loss_percent)),
        };
        wtr.write_record([
            e.created_at.to_rfc3339(),
            e.pair.clone().unwrap_or_default(),
            e.input.risk_mode.to_string(),
            e.input.target.as_str().to_string(),
            format!("{:.2}", e.input.balance),
            e.input.risk_value.to_string(),
            price(entry),
            price(stop_loss),
            price(stop_loss_percent),
            format!("{:.6}", e.result.position_size),
            format!("{:.2}", e.result.position_value),
            format!("{:.2}", e.result.dollar_risk),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn export_trades(path: &Path, trades: &[Trade]) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    write_trades(file, trades)?;
    info!("Exported {} trades to {}", trades.len(), path.display());
    Ok(())
}

pub fn export_calculations(path: &Path, entries: &[CalculatorEntry]) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    write_calculations(file, entries)?;
    info!("Exported {} calculations to {}", entries.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sizing::calculate_position;
    use crate::models::{Direction, RiskMode, SizingInput};
    use crate::test_helpers::{base_time, closed_trade};

    #[test]
    fn trade_rows_follow_column_order() {
        let mut t = closed_trade("t1", Direction::Long, 100.0, 110.0, 95.0, 2.0);
        t.setups = vec!["Breakout".into(), "Retest".into()];
        t.notes = "clean, patient".into();

        let mut buf = Vec::new();
        write_trades(&mut buf, &[t]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();

        assert_eq!(lines.next().unwrap(), TRADE_COLUMNS.join(","));
        let row = lines.next().unwrap();
        assert!(row.starts_with("t1,2024-01-15T09:00:00+00:00,BTCUSD,Long,100,95,,110,2,20.00,2.00,Win,Breakout|Retest,,,"));
        assert!(row.ends_with("\"clean, patient\""));
    }

    #[test]
    fn calculation_rows_split_target_fields() {
        let input = SizingInput {
            balance: 5000.0,
            risk_mode: RiskMode::Percent,
            risk_value: 2.0,
            target: SizingTarget::Value {
                stop_loss_percent: 5.0,
                entry: None,
            },
        };
        let entry = CalculatorEntry {
            id: "c1".into(),
            created_at: base_time(),
            pair: Some("SOLUSD".into()),
            note: None,
            input,
            result: calculate_position(&input),
        };

        let mut buf = Vec::new();
        write_calculations(&mut buf, &[entry]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let row = text.lines().nth(1).unwrap();
        assert_eq!(
            row,
            "2024-01-15T09:00:00+00:00,SOLUSD,percent,value,5000.00,2,,,5,0.000000,2000.00,100.00"
        );
    }
}
