mod models;

pub use models::{ActionReceipt, PositionSnapshot, SessionSettings, SessionState};

use std::{str::FromStr, sync::Arc};

use alloy::primitives::{Address, TxHash, U256};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};

use crate::{
    blockchain_manager::{LendingPoolReader, LendingPoolWriter, Wallet},
    cancellation::CancellationToken,
    config::LocalConfig,
    errors::ActionError,
    position_aggregator::{AggregatorSettings, LendingAction, LendingPositionAggregator},
    utils::{constants::TOKEN_BALANCE_DECIMALS, math_helper::parse_units_decimal},
};

/// One open lending popup: the position of the connected wallet and the
/// actions it can take against the pool.
///
/// The session owns its position exclusively. Closing it cancels pending
/// refresh passes and nothing is published afterwards.
pub struct LendingSession<C: LendingPoolReader + LendingPoolWriter + Wallet> {
    client: Arc<C>,
    aggregator: LendingPositionAggregator<C>,
    settings: SessionSettings,
    state: SessionState,
    refreshed_at: Option<DateTime<Utc>>,
    cancellation: CancellationToken,
    snapshot_sender: watch::Sender<PositionSnapshot>,
}

impl<C: LendingPoolReader + LendingPoolWriter + Wallet> LendingSession<C> {
    pub fn new(
        client: Arc<C>,
        aggregator_settings: AggregatorSettings,
        settings: SessionSettings,
    ) -> Self {
        let cancellation = CancellationToken::new();
        let aggregator = LendingPositionAggregator::new(
            client.clone(),
            aggregator_settings,
            cancellation.clone(),
        );
        let (snapshot_sender, _) = watch::channel(PositionSnapshot::default());

        Self {
            client,
            aggregator,
            settings,
            state: SessionState::Idle,
            refreshed_at: None,
            cancellation,
            snapshot_sender,
        }
    }

    pub fn from_config(client: Arc<C>, local_config: &LocalConfig) -> Self {
        Self::new(
            client,
            AggregatorSettings::from(local_config),
            SessionSettings::from(local_config),
        )
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Token shared with every pending delay of this session
    pub fn cancellation(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Receives every snapshot the session publishes
    pub fn subscribe(&self) -> watch::Receiver<PositionSnapshot> {
        self.snapshot_sender.subscribe()
    }

    pub fn snapshot(&self) -> PositionSnapshot {
        PositionSnapshot {
            position: self.aggregator.position().clone(),
            state: self.state,
            refreshed_at: self.refreshed_at,
        }
    }

    /// Loads the position for the first time
    pub async fn open(&mut self) -> PositionSnapshot {
        info!("Opening lending session");
        self.refresh().await
    }

    /// Reloads the whole position and publishes the new snapshot
    #[instrument("SESSION_REFRESH", skip_all)]
    pub async fn refresh(&mut self) -> PositionSnapshot {
        if self.cancellation.is_cancelled() {
            return self.snapshot();
        }

        self.state = SessionState::Loading;
        let source = self.aggregator.refresh(self.client.address()).await;

        if self.cancellation.is_cancelled() {
            self.state = SessionState::Idle;
            return self.snapshot();
        }

        self.state = SessionState::settled_from(source);
        self.refreshed_at = Some(Utc::now());
        self.publish()
    }

    /// Validates and submits one action, then refreshes on the configured schedule.
    ///
    /// # Arguments
    /// * `action` - Supply, withdraw, borrow or repay
    /// * `amount` - Decimal amount of the native asset as typed by the user
    ///
    /// # Returns
    /// * `Result<ActionReceipt, ActionError>` - Hash of the action transaction and the refreshed snapshot
    #[instrument("EXECUTE_ACTION", skip(self))]
    pub async fn execute_action(
        &mut self,
        action: LendingAction,
        amount: &str,
    ) -> Result<ActionReceipt, ActionError> {
        let user = self
            .client
            .address()
            .ok_or(ActionError::WalletNotConnected)?;
        let amount = parse_amount(amount)?;
        self.check_amount(action, amount)?;

        let raw_amount = parse_units_decimal(amount, TOKEN_BALANCE_DECIMALS)
            .map_err(|_| ActionError::InvalidAmount)?;
        if raw_amount.is_zero() {
            return Err(ActionError::InvalidAmount);
        }

        let settled_state = self.state;
        self.state = SessionState::Submitting;
        self.publish();
        info!("Submitting {} of {}", action, amount);

        let tx_hash = match self.submit(action, user, raw_amount).await {
            Ok(tx_hash) => tx_hash,
            Err(e) => {
                self.state = settled_state;
                self.publish();
                match e {
                    ActionError::UserRejected => warn!("{} rejected in wallet", action),
                    _ => error!("{} failed: {}", action, e),
                }
                return Err(e);
            }
        };

        info!("{} confirmed: {}", action, tx_hash);
        self.state = SessionState::Confirmed;
        self.publish();
        self.refresh_after_action().await;

        Ok(ActionReceipt {
            tx_hash,
            snapshot: self.snapshot(),
        })
    }

    /// Cancels pending passes and drops everything loaded
    pub fn close(&mut self) {
        info!("Closing lending session");
        self.cancellation.cancel();
        self.aggregator.clear();
        self.state = SessionState::Idle;
        self.refreshed_at = None;
        self.snapshot_sender.send_replace(PositionSnapshot::default());
    }

    fn check_amount(&self, action: LendingAction, amount: Decimal) -> Result<(), ActionError> {
        let position = self.aggregator.position();

        let exceeds_basis = amount > self.aggregator.basis_balance(action);
        match action {
            LendingAction::Borrow if exceeds_basis => Err(ActionError::InsufficientCollateral),
            // The repayment is sent as value, so the wallet has to cover it too
            LendingAction::Repay if exceeds_basis || amount > position.wallet_balance => {
                Err(ActionError::InsufficientBalance)
            }
            _ if exceeds_basis => Err(ActionError::InsufficientBalance),
            _ => Ok(()),
        }
    }

    async fn submit(
        &self,
        action: LendingAction,
        user: Address,
        amount: U256,
    ) -> Result<TxHash, ActionError> {
        let asset = self.aggregator.settings().asset;

        match action {
            LendingAction::Supply => {
                let tx_hash = self.client.deposit_native(asset, amount, user).await?;
                if self.settings.use_as_collateral {
                    if let Err(e) = self.client.set_use_as_collateral(asset, true).await {
                        warn!("Supply confirmed but enabling it as collateral failed: {}", e);
                    }
                }
                Ok(tx_hash)
            }
            LendingAction::Withdraw => self.client.withdraw_native(asset, amount, user).await,
            LendingAction::Borrow => {
                self.ensure_borrow_delegation(user, amount).await?;
                self.client.borrow_native(asset, amount).await
            }
            LendingAction::Repay => self.client.repay_native(asset, amount, user).await,
        }
    }

    /// The pool borrows on the user's behalf, so it needs delegated credit on the debt token
    async fn ensure_borrow_delegation(&self, user: Address, amount: U256) -> Result<(), ActionError> {
        let debt_token = self.aggregator.settings().debt_token;
        let pool = self.client.pool_address();

        match self.client.borrow_allowance(debt_token, user, pool).await {
            Ok(allowance) if allowance >= amount => {
                debug!("Borrow allowance {} covers {}", allowance, amount);
                return Ok(());
            }
            Ok(allowance) => debug!("Borrow allowance {} below {}, approving", allowance, amount),
            Err(e) => warn!("Could not read borrow allowance, approving anyway: {}", e),
        }

        self.client
            .approve_delegation(debt_token, pool, U256::MAX)
            .await
            .map_err(|e| match e {
                ActionError::UserRejected => ActionError::UserRejected,
                other => ActionError::ContractCallFailed(format!(
                    "delegation approval failed: {}",
                    other
                )),
            })?;

        Ok(())
    }

    /// Pools index new state with a lag, so the position is reloaded several times
    async fn refresh_after_action(&mut self) {
        let delays = self.settings.refresh_schedule.delays().to_vec();

        for (pass, delay) in delays.into_iter().enumerate() {
            if !self.cancellation.sleep(delay).await {
                debug!("Session closed, skipping remaining refresh passes");
                return;
            }
            debug!("Refresh pass {}", pass + 1);
            self.refresh().await;
        }
    }

    fn publish(&self) -> PositionSnapshot {
        let snapshot = self.snapshot();
        if !self.cancellation.is_cancelled() {
            self.snapshot_sender.send_replace(snapshot.clone());
        }
        snapshot
    }
}

/// Parses a user-typed amount. Must be a plain positive decimal.
pub fn parse_amount(input: &str) -> Result<Decimal, ActionError> {
    let amount = Decimal::from_str(input.trim()).map_err(|_| ActionError::InvalidAmount)?;
    if amount <= Decimal::ZERO {
        return Err(ActionError::InvalidAmount);
    }
    Ok(amount)
}
