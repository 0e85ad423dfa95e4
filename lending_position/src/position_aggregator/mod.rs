mod models;
mod strategies;

pub use models::{
    AggregatorSettings, LendingAction, Percentage, PositionSource, UserLendingPosition,
};
pub use strategies::{
    estimate_available_borrow, BorrowData, BorrowDataStrategy, SuppliedBalanceStrategy,
    BORROW_DATA_STRATEGIES, SUPPLIED_BALANCE_STRATEGIES,
};

use std::sync::Arc;

use alloy::primitives::Address;
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::{debug, info, instrument, warn};

use crate::{
    blockchain_manager::LendingPoolReader,
    cancellation::CancellationToken,
    errors::ActionError,
    utils::{
        constants::{AMOUNT_DISPLAY_DECIMALS, TOKEN_BALANCE_DECIMALS, USD_DISPLAY_DECIMALS},
        math_helper::{divide_by_precision_decimal, round_for_display},
    },
};

/// Reads a user's lending position through ordered fallback strategies and
/// derives the aggregates the popup shows.
///
/// Reads never fail outward: a strategy error falls through to the next one
/// and an exhausted chain leaves a zero/estimated value. Every write to the
/// position is skipped once the session's cancellation token fires.
pub struct LendingPositionAggregator<R: LendingPoolReader + ?Sized> {
    reader: Arc<R>,
    settings: AggregatorSettings,
    cancellation: CancellationToken,
    position: UserLendingPosition,
}

impl<R: LendingPoolReader + ?Sized> LendingPositionAggregator<R> {
    pub fn new(
        reader: Arc<R>,
        settings: AggregatorSettings,
        cancellation: CancellationToken,
    ) -> Self {
        Self {
            reader,
            settings,
            cancellation,
            position: UserLendingPosition::default(),
        }
    }

    pub fn position(&self) -> &UserLendingPosition {
        &self.position
    }

    pub fn settings(&self) -> &AggregatorSettings {
        &self.settings
    }

    /// Reloads every field for `user`, or zeroes the position when no wallet is connected
    ///
    /// # Returns
    /// * `PositionSource` - Which borrow data path the numbers came from
    #[instrument("REFRESH_POSITION", skip(self))]
    pub async fn refresh(&mut self, user: Option<Address>) -> PositionSource {
        let Some(user) = user else {
            self.reset();
            return PositionSource::Unloaded;
        };

        // Wallet and supplied balance are independent reads
        let (wallet_balance, supplied_balance) = futures::join!(
            self.read_wallet_balance(user),
            self.read_supplied_balance(user)
        );

        if !self.cancellation.is_cancelled() {
            self.position.wallet_balance = wallet_balance;
            self.position.supplied_balance = supplied_balance;
        }

        let source = self.load_borrow_data(user).await;
        self.update_net_worth();

        info!(
            "Position: supplied {} | borrowed {} | available {} | HF {} | net worth ${} ({:?})",
            self.position.supplied_balance,
            self.position.borrowed_balance,
            self.position.available_borrow,
            self.position.health_factor,
            self.position.net_worth,
            source
        );

        source
    }

    /// Clears the position back to zeros
    pub fn reset(&mut self) {
        if !self.cancellation.is_cancelled() {
            self.position = UserLendingPosition::default();
        }
    }

    /// Drops everything loaded, cancelled or not. Used when the session closes.
    pub fn clear(&mut self) {
        self.position = UserLendingPosition::default();
    }

    /// Loads the native wallet balance. A failed read counts as zero.
    pub async fn load_wallet_balance(&mut self, user: Address) -> Decimal {
        let balance = self.read_wallet_balance(user).await;
        if !self.cancellation.is_cancelled() {
            self.position.wallet_balance = balance;
        }
        balance
    }

    /// Loads the supplied balance, trying each supplied balance strategy in order.
    ///
    /// Never fails; falls back to zero when every strategy errors.
    pub async fn load_supplied_balance(&mut self, user: Address) -> Decimal {
        let balance = self.read_supplied_balance(user).await;
        if !self.cancellation.is_cancelled() {
            self.position.supplied_balance = balance;
        }
        balance
    }

    /// Loads debt, borrow capacity and health factor, then recomputes borrow power used.
    ///
    /// Relies on the supplied balance already loaded when it has to estimate.
    pub async fn load_borrow_data(&mut self, user: Address) -> PositionSource {
        let borrow_data = self.read_borrow_data(user).await;

        if self.cancellation.is_cancelled() {
            return borrow_data.source;
        }

        self.position.borrowed_balance = borrow_data.borrowed.max(Decimal::ZERO);
        self.position.available_borrow = borrow_data.available.max(Decimal::ZERO);
        self.position.health_factor = borrow_data.health_factor.max(Decimal::ZERO);
        self.position.source = borrow_data.source;
        // Saturated reads stay saturated instead of overflowing
        let price = self.settings.asset_price_usd;
        self.position.borrow_power_used_percent = borrow_power_used_percent(
            self.position.borrowed_balance.saturating_mul(price),
            self.position.available_borrow.saturating_mul(price),
        );

        borrow_data.source
    }

    /// Recomputes net worth from the wallet and supplied balances. No network access.
    pub fn update_net_worth(&mut self) -> Decimal {
        let net_worth = net_worth(
            self.position.wallet_balance,
            self.position.supplied_balance,
            self.settings.asset_price_usd,
        );
        if !self.cancellation.is_cancelled() {
            self.position.net_worth = net_worth;
        }
        net_worth
    }

    pub fn basis_balance(&self, action: LendingAction) -> Decimal {
        self.position.basis_balance(action)
    }

    /// Amount for a quick-fill button: `basis * percentage / 100` at display precision
    ///
    /// # Errors
    /// * `ActionError::NoBalance` - The basis balance is zero or negative
    pub fn resolve_percentage_amount(
        &self,
        action: LendingAction,
        percentage: Percentage,
    ) -> Result<Decimal, ActionError> {
        self.position.resolve_percentage_amount(action, percentage)
    }

    async fn read_wallet_balance(&self, user: Address) -> Decimal {
        match self.reader.native_balance(user).await {
            Ok(balance) => divide_by_precision_decimal(balance, TOKEN_BALANCE_DECIMALS),
            Err(e) => {
                warn!("Failed to read wallet balance: {}", e);
                Decimal::ZERO
            }
        }
    }

    async fn read_supplied_balance(&self, user: Address) -> Decimal {
        for strategy in SUPPLIED_BALANCE_STRATEGIES {
            match strategy.run(self.reader.as_ref(), &self.settings, user).await {
                Ok(balance) => {
                    debug!("Supplied balance {} via {:?}", balance, strategy);
                    return balance.max(Decimal::ZERO);
                }
                Err(e) => debug!("Supplied balance strategy {:?} failed: {}", strategy, e),
            }
        }

        warn!("ReadFallbackExhausted: every supplied balance read failed, using zero");
        Decimal::ZERO
    }

    async fn read_borrow_data(&self, user: Address) -> BorrowData {
        let supplied = self.position.supplied_balance;

        for strategy in BORROW_DATA_STRATEGIES {
            match strategy
                .run(self.reader.as_ref(), &self.settings, user, supplied)
                .await
            {
                Ok(borrow_data) => return borrow_data,
                Err(e) => debug!("Borrow data strategy {:?} failed: {}", strategy, e),
            }
        }

        // The last strategy cannot fail; kept for exhaustiveness
        BorrowData {
            borrowed: Decimal::ZERO,
            available: Decimal::ZERO,
            health_factor: Decimal::ZERO,
            source: PositionSource::Estimated,
        }
    }
}

impl UserLendingPosition {
    /// Percentage of the action's basis balance, see [`percentage_amount`]
    pub fn resolve_percentage_amount(
        &self,
        action: LendingAction,
        percentage: Percentage,
    ) -> Result<Decimal, ActionError> {
        let amount = percentage_amount(self.basis_balance(action), percentage)?;
        debug!("{}% of {} basis resolves to {}", percentage.value(), action, amount);
        Ok(amount)
    }
}

/// `borrowed / (borrowed + available) * 100` to two decimals, zero when both are zero
pub fn borrow_power_used_percent(borrowed_value: Decimal, available_value: Decimal) -> Decimal {
    let total = borrowed_value.saturating_add(available_value);
    if total <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    // borrowed <= total, so the ratio is at most one
    let ratio = borrowed_value.checked_div(total).unwrap_or(Decimal::ONE);
    round_for_display(ratio * Decimal::ONE_HUNDRED, USD_DISPLAY_DECIMALS)
}

/// `(wallet + supplied) * price` to two decimals
pub fn net_worth(wallet_balance: Decimal, supplied_balance: Decimal, price: Decimal) -> Decimal {
    round_for_display(
        wallet_balance.saturating_add(supplied_balance).saturating_mul(price),
        USD_DISPLAY_DECIMALS,
    )
}

/// Rounds half away from zero, but never past the basis itself.
///
/// A tiny basis can resolve to zero; submitting that amount is rejected later.
pub fn percentage_amount(basis: Decimal, percentage: Percentage) -> Result<Decimal, ActionError> {
    if basis <= Decimal::ZERO {
        return Err(ActionError::NoBalance);
    }

    let percentage = Decimal::from(percentage.value());
    let exact = match basis.checked_mul(percentage) {
        Some(scaled) => scaled / Decimal::ONE_HUNDRED,
        None => basis / Decimal::ONE_HUNDRED * percentage,
    };

    let amount = round_for_display(exact, AMOUNT_DISPLAY_DECIMALS);
    if amount > basis {
        return Ok(exact.round_dp_with_strategy(AMOUNT_DISPLAY_DECIMALS, RoundingStrategy::ToZero));
    }

    Ok(amount)
}
