//! In-memory lending pool used by the unit tests.

use std::{
    collections::{HashMap, VecDeque},
    sync::Mutex,
};

use alloy::primitives::{address, Address, TxHash, U256};
use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::time::Instant;

use crate::{
    blockchain_manager::{AccountData, LendingPoolReader, LendingPoolWriter, ReserveTokens, Wallet},
    errors::{ActionError, ReadError},
    position_aggregator::AggregatorSettings,
    utils::math_helper::parse_units_decimal,
};

pub const USER: Address = address!("00000000000000000000000000000000000000a1");
pub const POOL: Address = address!("29edccdb3ae8cdf0ea6077cd3e682bfa6dd53f19");
pub const ASSET: Address = address!("f22ef0085f6511f70b01a68f360dcc56261f768a");
pub const RECEIPT_TOKEN: Address = address!("0a197587ee751237ffbe555568d9485e467da2a3");
pub const DEBT_TOKEN: Address = address!("cabad01fb6583c8eba17bf1d3a7d0fc36fe248ed");
pub const RESERVE_DEBT_TOKEN: Address = address!("7e2a6a6bd1e1e2c1a3be8a4b3e0d7b0e9a1c5f42");

/// 18 decimal on-chain value of a token amount
pub fn units(amount: Decimal) -> U256 {
    parse_units_decimal(amount, 18).unwrap()
}

pub fn settings() -> AggregatorSettings {
    AggregatorSettings {
        asset: ASSET,
        receipt_token: Some(RECEIPT_TOKEN),
        debt_token: DEBT_TOKEN,
        asset_price_usd: dec!(0.405),
        fallback_ltv_ratio: dec!(0.75),
        max_cap_on_health_factor: 1_000,
    }
}

pub fn account_data(collateral: Decimal, debt: Decimal, available: Decimal, hf: Decimal) -> AccountData {
    AccountData {
        total_collateral: units(collateral),
        total_debt: units(debt),
        available_borrows: units(available),
        liquidation_threshold: Some(U256::from(8_000)),
        ltv: Some(U256::from(7_500)),
        health_factor: Some(units(hf)),
    }
}

fn unavailable(call: &str) -> ReadError {
    ReadError::CallFailed(format!("{} unavailable", call))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub kind: &'static str,
    pub amount: U256,
}

pub struct FakeState {
    pub user: Option<Address>,
    pub native_balance: Result<U256, ReadError>,
    pub receipt_balance: Result<U256, ReadError>,
    pub reserve_tokens: Result<ReserveTokens, ReadError>,
    pub account_data: Result<AccountData, ReadError>,
    /// Served (front first) before `account_data`, one per read
    pub account_data_script: VecDeque<Result<AccountData, ReadError>>,
    pub debt_balance: Result<U256, ReadError>,
    /// Balance on `RESERVE_DEBT_TOKEN`, when `reserve_tokens` points there
    pub reserve_debt_balance: Result<U256, ReadError>,
    pub borrow_allowance: Result<U256, ReadError>,
    pub write_failures: HashMap<&'static str, ActionError>,
    pub submissions: Vec<Submission>,
    pub account_data_reads: Vec<Instant>,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            user: Some(USER),
            native_balance: Ok(U256::ZERO),
            receipt_balance: Ok(U256::ZERO),
            reserve_tokens: Ok(ReserveTokens {
                receipt_token: RECEIPT_TOKEN,
                variable_debt_token: DEBT_TOKEN,
            }),
            account_data: Ok(AccountData::default()),
            account_data_script: VecDeque::new(),
            debt_balance: Ok(U256::ZERO),
            reserve_debt_balance: Err(unavailable("balanceOf")),
            borrow_allowance: Ok(U256::ZERO),
            write_failures: HashMap::new(),
            submissions: Vec::new(),
            account_data_reads: Vec::new(),
        }
    }
}

#[derive(Default)]
pub struct FakeLendingPool {
    pub state: Mutex<FakeState>,
}

impl FakeLendingPool {
    pub fn with(configure: impl FnOnce(&mut FakeState)) -> Self {
        let pool = Self::default();
        configure(&mut pool.state.lock().unwrap());
        pool
    }

    pub fn update(&self, configure: impl FnOnce(&mut FakeState)) {
        configure(&mut self.state.lock().unwrap());
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.state.lock().unwrap().submissions.clone()
    }

    pub fn account_data_reads(&self) -> Vec<Instant> {
        self.state.lock().unwrap().account_data_reads.clone()
    }

    fn submit(&self, kind: &'static str, amount: U256) -> Result<TxHash, ActionError> {
        let mut state = self.state.lock().unwrap();
        if let Some(error) = state.write_failures.get(kind) {
            return Err(error.clone());
        }
        state.submissions.push(Submission { kind, amount });
        Ok(TxHash::with_last_byte(state.submissions.len() as u8))
    }
}

impl Wallet for FakeLendingPool {
    fn address(&self) -> Option<Address> {
        self.state.lock().unwrap().user
    }
}

#[async_trait]
impl LendingPoolReader for FakeLendingPool {
    async fn native_balance(&self, _user: Address) -> Result<U256, ReadError> {
        self.state.lock().unwrap().native_balance.clone()
    }

    async fn token_balance(&self, token: Address, _user: Address) -> Result<U256, ReadError> {
        let state = self.state.lock().unwrap();
        if token == RECEIPT_TOKEN {
            state.receipt_balance.clone()
        } else if token == DEBT_TOKEN {
            state.debt_balance.clone()
        } else if token == RESERVE_DEBT_TOKEN {
            state.reserve_debt_balance.clone()
        } else {
            Err(unavailable("balanceOf"))
        }
    }

    async fn reserve_tokens(&self, _asset: Address) -> Result<ReserveTokens, ReadError> {
        self.state.lock().unwrap().reserve_tokens.clone()
    }

    async fn user_account_data(&self, _user: Address) -> Result<AccountData, ReadError> {
        let mut state = self.state.lock().unwrap();
        state.account_data_reads.push(Instant::now());
        match state.account_data_script.pop_front() {
            Some(scripted) => scripted,
            None => state.account_data.clone(),
        }
    }

    async fn borrow_allowance(
        &self,
        _debt_token: Address,
        _from_user: Address,
        _to_user: Address,
    ) -> Result<U256, ReadError> {
        self.state.lock().unwrap().borrow_allowance.clone()
    }
}

#[async_trait]
impl LendingPoolWriter for FakeLendingPool {
    fn pool_address(&self) -> Address {
        POOL
    }

    async fn deposit_native(
        &self,
        _asset: Address,
        amount: U256,
        _on_behalf_of: Address,
    ) -> Result<TxHash, ActionError> {
        self.submit("deposit", amount)
    }

    async fn set_use_as_collateral(
        &self,
        _asset: Address,
        _enabled: bool,
    ) -> Result<TxHash, ActionError> {
        self.submit("collateral", U256::ZERO)
    }

    async fn withdraw_native(
        &self,
        _asset: Address,
        amount: U256,
        _to: Address,
    ) -> Result<TxHash, ActionError> {
        self.submit("withdraw", amount)
    }

    async fn borrow_native(&self, _asset: Address, amount: U256) -> Result<TxHash, ActionError> {
        self.submit("borrow", amount)
    }

    async fn repay_native(
        &self,
        _asset: Address,
        amount: U256,
        _on_behalf_of: Address,
    ) -> Result<TxHash, ActionError> {
        self.submit("repay", amount)
    }

    async fn approve_delegation(
        &self,
        _debt_token: Address,
        _delegatee: Address,
        amount: U256,
    ) -> Result<TxHash, ActionError> {
        self.submit("approve_delegation", amount)
    }
}
