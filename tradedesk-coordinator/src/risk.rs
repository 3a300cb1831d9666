//! Risk parameters with field-by-field, all-or-nothing updates.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum RiskError {
    #[error("unknown parameter: {0}")]
    UnknownParameter(String),

    #[error("parameter {0} must be positive")]
    NotPositive(String),

    #[error("parameter {0} must be a positive integer")]
    NotInteger(String),
}

/// The recognized risk limits. All values strictly positive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskParameters {
    /// Maximum position notional as a percent of total value.
    pub max_position_size_percent: f64,
    /// Maximum tolerated daily drawdown, in percent.
    pub max_daily_drawdown: f64,
    pub stop_loss_percent: f64,
    pub take_profit_percent: f64,
    pub max_trades_per_day: u32,
}

impl Default for RiskParameters {
    fn default() -> Self {
        Self {
            max_position_size_percent: 5.0,
            max_daily_drawdown: 10.0,
            stop_loss_percent: 5.0,
            take_profit_percent: 15.0,
            max_trades_per_day: 10,
        }
    }
}

impl RiskParameters {
    /// Validate and apply an operator update.
    ///
    /// Every key is validated before anything is written, so a single bad
    /// entry leaves the parameters untouched. Floats supplied for the
    /// integer field are accepted only when integral.
    pub fn apply_update(&mut self, updates: &BTreeMap<String, f64>) -> Result<(), RiskError> {
        let mut staged = self.clone();

        for (key, &value) in updates {
            match key.as_str() {
                "max_position_size_percent" | "max_daily_drawdown" | "stop_loss_percent"
                | "take_profit_percent" => {
                    if value <= 0.0 {
                        return Err(RiskError::NotPositive(key.clone()));
                    }
                    match key.as_str() {
                        "max_position_size_percent" => staged.max_position_size_percent = value,
                        "max_daily_drawdown" => staged.max_daily_drawdown = value,
                        "stop_loss_percent" => staged.stop_loss_percent = value,
                        _ => staged.take_profit_percent = value,
                    }
                }
                "max_trades_per_day" => {
                    if value <= 0.0 || value.floor() != value {
                        return Err(RiskError::NotInteger(key.clone()));
                    }
                    staged.max_trades_per_day = value as u32;
                }
                _ => return Err(RiskError::UnknownParameter(key.clone())),
            }
        }

        *self = staged;
        Ok(())
    }

    /// Name-to-value view for the operator surface.
    pub fn as_map(&self) -> BTreeMap<String, f64> {
        BTreeMap::from([
            ("max_position_size_percent".to_string(), self.max_position_size_percent),
            ("max_daily_drawdown".to_string(), self.max_daily_drawdown),
            ("stop_loss_percent".to_string(), self.stop_loss_percent),
            ("take_profit_percent".to_string(), self.take_profit_percent),
            ("max_trades_per_day".to_string(), f64::from(self.max_trades_per_day)),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_policy() {
        let params = RiskParameters::default();
        assert_eq!(params.max_position_size_percent, 5.0);
        assert_eq!(params.max_daily_drawdown, 10.0);
        assert_eq!(params.stop_loss_percent, 5.0);
        assert_eq!(params.take_profit_percent, 15.0);
        assert_eq!(params.max_trades_per_day, 10);
    }

    #[test]
    fn valid_update_applies_every_field() {
        let mut params = RiskParameters::default();
        let updates = BTreeMap::from([
            ("max_position_size_percent".to_string(), 2.5),
            ("max_trades_per_day".to_string(), 20.0),
        ]);
        params.apply_update(&updates).unwrap();
        assert_eq!(params.max_position_size_percent, 2.5);
        assert_eq!(params.max_trades_per_day, 20);
    }

    #[test]
    fn unknown_key_fails_atomically() {
        let mut params = RiskParameters::default();
        let updates = BTreeMap::from([
            ("max_position_size_percent".to_string(), 2.5),
            ("no_such_parameter".to_string(), 1.0),
        ]);
        assert_eq!(
            params.apply_update(&updates),
            Err(RiskError::UnknownParameter("no_such_parameter".into()))
        );
        // Nothing was applied.
        assert_eq!(params, RiskParameters::default());
    }

    #[test]
    fn non_integral_trade_count_is_rejected() {
        let mut params = RiskParameters::default();
        let updates = BTreeMap::from([("max_trades_per_day".to_string(), 10.5)]);
        assert_eq!(
            params.apply_update(&updates),
            Err(RiskError::NotInteger("max_trades_per_day".into()))
        );
        // Integral floats coerce cleanly.
        let ok = BTreeMap::from([("max_trades_per_day".to_string(), 15.0)]);
        params.apply_update(&ok).unwrap();
        assert_eq!(params.max_trades_per_day, 15);
    }

    #[test]
    fn non_positive_values_are_rejected() {
        let mut params = RiskParameters::default();
        for key in
            ["max_position_size_percent", "max_daily_drawdown", "stop_loss_percent",
             "take_profit_percent"]
        {
            let updates = BTreeMap::from([(key.to_string(), 0.0)]);
            assert_eq!(params.apply_update(&updates), Err(RiskError::NotPositive(key.into())));
        }
        let updates = BTreeMap::from([("max_trades_per_day".to_string(), -1.0)]);
        assert!(params.apply_update(&updates).is_err());
    }

    #[test]
    fn map_view_round_trips() {
        let params = RiskParameters::default();
        let map = params.as_map();
        assert_eq!(map["max_trades_per_day"], 10.0);
        assert_eq!(map.len(), 5);
    }
}
