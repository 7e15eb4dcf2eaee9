use serde::{Deserialize, Serialize};

use crate::models::{Direction, RiskMode, SizingInput, SizingResult, SizingTarget, TradeDraft};

fn usable(x: f64) -> bool {
    x.is_finite() && x > 0.0
}

pub fn dollar_risk(balance: f64, risk_mode: RiskMode, risk_value: f64) -> f64 {
    let risk = match risk_mode {
        RiskMode::Percent => balance * (risk_value / 100.0),
        RiskMode::Fixed => risk_value,
    };
    if risk.is_finite() {
        risk
    } else {
        0.0
    }
}

/// Position size, notional and dollar risk for either target mode.
///
/// Inputs that cannot produce a size give an all-zero result with
/// `valid == false`; nothing here returns NaN or infinity.
pub fn calculate_position(input: &SizingInput) -> SizingResult {
    let risk = dollar_risk(input.balance, input.risk_mode, input.risk_value);
    if !usable(risk) {
        return SizingResult::default();
    }

    match input.target {
        SizingTarget::Units { entry, stop } => {
            let distance = (entry - stop).abs();
            if !usable(entry) || !usable(stop) || !usable(distance) {
                return SizingResult::default();
            }
            let position_size = risk / distance;
            SizingResult {
                valid: true,
                position_size,
                position_value: position_size * entry,
                dollar_risk: risk,
            }
        }
        SizingTarget::Value {
            stop_loss_percent,
            entry,
        } => {
            let sl = stop_loss_percent / 100.0;
            if !usable(sl) {
                return SizingResult::default();
            }
            let position_value = risk / sl;
            let position_size = match entry {
                Some(e) if usable(e) => position_value / e,
                _ => 0.0,
            };
            SizingResult {
                valid: true,
                position_size,
                position_value,
                dollar_risk: risk,
            }
        }
    }
}

/// Flat values passed from the calculator into a new trade draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeHandoff {
    pub entry: Option<f64>,
    /// Only present for units-mode calculations.
    pub stop_loss: Option<f64>,
    /// Position size with 6 decimals.
    pub size: String,
    /// Dollar risk with 2 decimals.
    pub risk: String,
    /// Inferred only in units mode; value mode leaves it to the user.
    pub direction: Option<Direction>,
}

impl TradeHandoff {
    pub fn from_calculation(input: &SizingInput, result: &SizingResult) -> Option<Self> {
        if !result.valid {
            return None;
        }
        let (entry, stop_loss, direction) = match input.target {
            SizingTarget::Units { entry, stop } => {
                let direction = if entry > stop {
                    Direction::Long
                } else {
                    Direction::Short
                };
                (Some(entry), Some(stop), Some(direction))
            }
            SizingTarget::Value { entry, .. } => (entry.filter(|e| usable(*e)), None, None),
        };
        Some(Self {
            entry,
            stop_loss,
            size: format!("{:.6}", result.position_size),
            risk: format!("{:.2}", result.dollar_risk),
            direction,
        })
    }

    /// Ordered key/value pairs, omitting absent values.
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::with_capacity(5);
        if let Some(entry) = self.entry {
            params.push(("entry", entry.to_string()));
        }
        if let Some(sl) = self.stop_loss {
            params.push(("stop_loss", sl.to_string()));
        }
        params.push(("size", self.size.clone()));
        params.push(("risk", self.risk.clone()));
        if let Some(direction) = self.direction {
            params.push(("direction", direction.as_str().to_string()));
        }
        params
    }

    /// Inverse of `to_params`. Unknown keys are ignored; `size` and `risk`
    /// are required.
    pub fn from_params<'a, I>(params: I) -> Option<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut entry = None;
        let mut stop_loss = None;
        let mut size = None;
        let mut risk = None;
        let mut direction = None;
        for (key, value) in params {
            match key {
                "entry" => entry = value.parse().ok(),
                "stop_loss" => stop_loss = value.parse().ok(),
                "size" => size = Some(value.to_string()),
                "risk" => risk = Some(value.to_string()),
                "direction" => direction = Direction::from_str_loose(value),
                _ => {}
            }
        }
        Some(Self {
            entry,
            stop_loss,
            size: size?,
            risk: risk?,
            direction,
        })
    }

    /// Pre-fill a draft with the calculated values.
    pub fn apply_to(&self, draft: &mut TradeDraft) {
        if let Some(entry) = self.entry {
            draft.entry_price = entry;
        }
        if let Some(sl) = self.stop_loss {
            draft.stop_loss = Some(sl);
        }
        if let Some(direction) = self.direction {
            draft.direction = direction;
        }
        draft.position_size = self.size.parse().unwrap_or(0.0);
        draft.risk_amount = self.risk.parse().unwrap_or(0.0);
        draft.risk_mode = RiskMode::Fixed;
    }
}
