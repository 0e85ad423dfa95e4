use std::{fmt, str::FromStr};

use alloy::primitives::Address;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{config::LocalConfig, errors::ActionError};

/// The four user actions of the lending popup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LendingAction {
    Supply,
    Withdraw,
    Borrow,
    Repay,
}

impl LendingAction {
    pub const ALL: [LendingAction; 4] = [
        LendingAction::Supply,
        LendingAction::Withdraw,
        LendingAction::Borrow,
        LendingAction::Repay,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Supply => "supply",
            Self::Withdraw => "withdraw",
            Self::Borrow => "borrow",
            Self::Repay => "repay",
        }
    }
}

impl fmt::Display for LendingAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LendingAction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        Self::ALL
            .into_iter()
            .find(|action| action.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| anyhow::anyhow!("unknown lending action: {}", s))
    }
}

/// Quick-fill buttons of the amount fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Percentage {
    Quarter,
    Half,
    ThreeQuarters,
    Max,
}

impl Percentage {
    pub fn value(&self) -> u8 {
        match self {
            Self::Quarter => 25,
            Self::Half => 50,
            Self::ThreeQuarters => 75,
            Self::Max => 100,
        }
    }
}

impl TryFrom<u8> for Percentage {
    type Error = ActionError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            25 => Ok(Self::Quarter),
            50 => Ok(Self::Half),
            75 => Ok(Self::ThreeQuarters),
            100 => Ok(Self::Max),
            _ => Err(ActionError::InvalidAmount),
        }
    }
}

/// Which read path produced the borrow side of the position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionSource {
    /// Nothing loaded yet, or no wallet connected
    #[default]
    Unloaded,
    /// Pool `getUserAccountData`
    AccountData,
    /// Debt token balance and the fallback LTV ratio
    Estimated,
}

/// Derived view of the user's position. Recomputed on every refresh.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct UserLendingPosition {
    #[serde(with = "rust_decimal::serde::str")]
    pub wallet_balance: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub supplied_balance: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub borrowed_balance: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub available_borrow: Decimal,
    /// Zero when unknown
    #[serde(with = "rust_decimal::serde::str")]
    pub health_factor: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub net_worth: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub borrow_power_used_percent: Decimal,
    pub source: PositionSource,
}

impl UserLendingPosition {
    /// Balance an action draws from: wallet (supply), supplied (withdraw),
    /// borrow capacity (borrow) or debt (repay)
    pub fn basis_balance(&self, action: LendingAction) -> Decimal {
        match action {
            LendingAction::Supply => self.wallet_balance,
            LendingAction::Withdraw => self.supplied_balance,
            LendingAction::Borrow => self.available_borrow,
            LendingAction::Repay => self.borrowed_balance,
        }
    }
}

/// Pool wiring and pricing inputs of the aggregator
#[derive(Debug, Clone)]
pub struct AggregatorSettings {
    pub asset: Address,
    pub receipt_token: Option<Address>,
    pub debt_token: Address,
    pub asset_price_usd: Decimal,
    pub fallback_ltv_ratio: Decimal,
    pub max_cap_on_health_factor: u64,
}

impl From<&LocalConfig> for AggregatorSettings {
    fn from(local_config: &LocalConfig) -> Self {
        Self {
            asset: local_config.asset_address,
            receipt_token: local_config.receipt_token_address,
            debt_token: local_config.debt_token_address,
            asset_price_usd: local_config.asset_price_usd,
            fallback_ltv_ratio: local_config.fallback_ltv_ratio,
            max_cap_on_health_factor: local_config.max_cap_on_health_factor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lending_action_from_str() {
        assert_eq!("Supply".parse::<LendingAction>().unwrap(), LendingAction::Supply);
        assert_eq!(" repay ".parse::<LendingAction>().unwrap(), LendingAction::Repay);
        assert!("stake".parse::<LendingAction>().is_err());
    }

    #[test]
    fn test_position_serializes_amounts_as_strings() {
        let position = UserLendingPosition {
            health_factor: Decimal::new(125, 2),
            source: PositionSource::AccountData,
            ..Default::default()
        };

        let json = serde_json::to_value(&position).unwrap();
        assert_eq!(json["health_factor"], "1.25");
        assert_eq!(json["source"], "account_data");
    }
}
