use alloy::primitives::{Address, U256};
use rust_decimal::Decimal;

use super::models::{AggregatorSettings, PositionSource};
use crate::{
    blockchain_manager::LendingPoolReader,
    errors::ReadError,
    utils::{
        constants::{HEALTH_FACTOR_DECIMALS, TOKEN_BALANCE_DECIMALS},
        math_helper::divide_by_precision_decimal,
    },
};

/// Ways of reading the supplied (collateral) balance, most precise first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppliedBalanceStrategy {
    /// `balanceOf` on the configured receipt token
    ConfiguredReceiptToken,
    /// Receipt token looked up through `getReserveData`, then `balanceOf`
    ReserveReceiptToken,
    /// Total collateral from `getUserAccountData`
    AccountCollateral,
}

pub const SUPPLIED_BALANCE_STRATEGIES: [SuppliedBalanceStrategy; 3] = [
    SuppliedBalanceStrategy::ConfiguredReceiptToken,
    SuppliedBalanceStrategy::ReserveReceiptToken,
    SuppliedBalanceStrategy::AccountCollateral,
];

impl SuppliedBalanceStrategy {
    pub async fn run<R: LendingPoolReader + ?Sized>(
        self,
        reader: &R,
        settings: &AggregatorSettings,
        user: Address,
    ) -> Result<Decimal, ReadError> {
        let raw = match self {
            Self::ConfiguredReceiptToken => {
                let token = settings
                    .receipt_token
                    .ok_or(ReadError::NotConfigured("receipt token"))?;
                if token == Address::ZERO {
                    return Err(ReadError::ZeroAddress("receipt token"));
                }
                reader.token_balance(token, user).await?
            }
            Self::ReserveReceiptToken => {
                let reserve = reader.reserve_tokens(settings.asset).await?;
                if reserve.receipt_token == Address::ZERO {
                    return Err(ReadError::ZeroAddress("getReserveData"));
                }
                reader.token_balance(reserve.receipt_token, user).await?
            }
            Self::AccountCollateral => reader.user_account_data(user).await?.total_collateral,
        };

        Ok(to_token_amount(raw))
    }
}

/// Borrow side of the position as one strategy reports it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BorrowData {
    pub borrowed: Decimal,
    pub available: Decimal,
    pub health_factor: Decimal,
    pub source: PositionSource,
}

/// Ways of reading debt and borrow capacity, most precise first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorrowDataStrategy {
    /// Everything from `getUserAccountData` in one call
    AccountData,
    /// Configured debt token balance, capacity estimated with the fallback LTV
    DebtTokenEstimate,
    /// Same estimate on the variable debt token the pool registered for the asset
    ReserveDebtTokenEstimate,
    /// No debt readable at all: assume none, capacity from collateral only
    CollateralEstimate,
}

pub const BORROW_DATA_STRATEGIES: [BorrowDataStrategy; 4] = [
    BorrowDataStrategy::AccountData,
    BorrowDataStrategy::DebtTokenEstimate,
    BorrowDataStrategy::ReserveDebtTokenEstimate,
    BorrowDataStrategy::CollateralEstimate,
];

impl BorrowDataStrategy {
    pub async fn run<R: LendingPoolReader + ?Sized>(
        self,
        reader: &R,
        settings: &AggregatorSettings,
        user: Address,
        supplied: Decimal,
    ) -> Result<BorrowData, ReadError> {
        match self {
            Self::AccountData => {
                let account_data = reader.user_account_data(user).await?;
                let health_factor = account_data
                    .health_factor
                    .map(|raw| {
                        divide_by_precision_decimal(raw, HEALTH_FACTOR_DECIMALS)
                            .min(Decimal::from(settings.max_cap_on_health_factor))
                    })
                    .unwrap_or(Decimal::ZERO);

                Ok(BorrowData {
                    borrowed: to_token_amount(account_data.total_debt),
                    available: to_token_amount(account_data.available_borrows),
                    health_factor,
                    source: PositionSource::AccountData,
                })
            }
            Self::DebtTokenEstimate => {
                let debt = reader.token_balance(settings.debt_token, user).await?;
                Ok(estimated_from_debt(to_token_amount(debt), supplied, settings))
            }
            Self::ReserveDebtTokenEstimate => {
                let reserve = reader.reserve_tokens(settings.asset).await?;
                if reserve.variable_debt_token == Address::ZERO {
                    return Err(ReadError::ZeroAddress("getReserveData"));
                }
                let debt = reader
                    .token_balance(reserve.variable_debt_token, user)
                    .await?;
                Ok(estimated_from_debt(to_token_amount(debt), supplied, settings))
            }
            Self::CollateralEstimate => Ok(BorrowData {
                borrowed: Decimal::ZERO,
                available: estimate_available_borrow(
                    supplied,
                    Decimal::ZERO,
                    settings.fallback_ltv_ratio,
                ),
                health_factor: Decimal::ZERO,
                source: PositionSource::Estimated,
            }),
        }
    }
}

/// `max(0, supplied * ltv - borrowed)`
pub fn estimate_available_borrow(supplied: Decimal, borrowed: Decimal, ltv_ratio: Decimal) -> Decimal {
    supplied
        .saturating_mul(ltv_ratio)
        .saturating_sub(borrowed)
        .max(Decimal::ZERO)
}

fn estimated_from_debt(borrowed: Decimal, supplied: Decimal, settings: &AggregatorSettings) -> BorrowData {
    BorrowData {
        borrowed,
        available: estimate_available_borrow(supplied, borrowed, settings.fallback_ltv_ratio),
        health_factor: Decimal::ZERO,
        source: PositionSource::Estimated,
    }
}

fn to_token_amount(raw: U256) -> Decimal {
    divide_by_precision_decimal(raw, TOKEN_BALANCE_DECIMALS)
}
