use alloy::{
    network::Ethereum,
    primitives::{Address, TxHash, U256},
    providers::Provider,
    rpc::types::TransactionReceipt,
};
use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use super::{AccountData, LendingPoolReader, LendingPoolWriter, ReserveTokens, Wallet};
use crate::{
    errors::{ActionError, ReadError},
    utils::{
        constants::{REFERRAL_CODE, VARIABLE_INTEREST_RATE_MODE},
        contracts::{DebtTokenContract, Erc20Contract, LendingPoolContract},
    },
};

/// Lending pool access over an alloy provider that carries the user's signer
#[derive(Clone)]
pub struct PoolClient<P: Provider<Ethereum>> {
    provider: P,
    pool_address: Address,
    signer_address: Address,
}

impl<P: Provider<Ethereum>> PoolClient<P> {
    pub fn new(provider: P, pool_address: Address, signer_address: Address) -> Self {
        Self {
            provider,
            pool_address,
            signer_address,
        }
    }

    /// Turns a reverted receipt into an error
    fn confirmed(receipt: &TransactionReceipt, label: &str) -> Result<TxHash, ActionError> {
        if !receipt.status() {
            return Err(ActionError::ContractCallFailed(format!(
                "{} transaction {} reverted",
                label, receipt.transaction_hash
            )));
        }

        info!("{} transaction confirmed: {}", label, receipt.transaction_hash);
        Ok(receipt.transaction_hash)
    }
}

fn call_failed(e: impl std::fmt::Display) -> ReadError {
    ReadError::CallFailed(e.to_string())
}

fn submit_failed(e: impl std::fmt::Display) -> ActionError {
    ActionError::from_chain_message(&e.to_string())
}

impl<P: Provider<Ethereum>> Wallet for PoolClient<P> {
    fn address(&self) -> Option<Address> {
        Some(self.signer_address)
    }
}

#[async_trait]
impl<P: Provider<Ethereum>> LendingPoolReader for PoolClient<P> {
    async fn native_balance(&self, user: Address) -> Result<U256, ReadError> {
        self.provider.get_balance(user).await.map_err(call_failed)
    }

    async fn token_balance(&self, token: Address, user: Address) -> Result<U256, ReadError> {
        Ok(Erc20Contract::new(token, &self.provider)
            .balanceOf(user)
            .call()
            .await
            .map_err(call_failed)?
            ._0)
    }

    async fn reserve_tokens(&self, asset: Address) -> Result<ReserveTokens, ReadError> {
        let reserve = LendingPoolContract::new(self.pool_address, &self.provider)
            .getReserveData(asset)
            .call()
            .await
            .map_err(call_failed)?;

        Ok(ReserveTokens {
            receipt_token: reserve.aTokenAddress,
            variable_debt_token: reserve.variableDebtTokenAddress,
        })
    }

    async fn user_account_data(&self, user: Address) -> Result<AccountData, ReadError> {
        // Decoded by hand so that short tuple responses are still usable
        let raw = LendingPoolContract::new(self.pool_address, &self.provider)
            .getUserAccountData(user)
            .call_raw()
            .await
            .map_err(call_failed)?;

        AccountData::decode(raw.as_ref())
    }

    async fn borrow_allowance(
        &self,
        debt_token: Address,
        from_user: Address,
        to_user: Address,
    ) -> Result<U256, ReadError> {
        Ok(DebtTokenContract::new(debt_token, &self.provider)
            .borrowAllowance(from_user, to_user)
            .call()
            .await
            .map_err(call_failed)?
            ._0)
    }
}

#[async_trait]
impl<P: Provider<Ethereum>> LendingPoolWriter for PoolClient<P> {
    fn pool_address(&self) -> Address {
        self.pool_address
    }

    #[instrument("DEPOSIT", skip(self))]
    async fn deposit_native(
        &self,
        asset: Address,
        amount: U256,
        on_behalf_of: Address,
    ) -> Result<TxHash, ActionError> {
        let receipt = LendingPoolContract::new(self.pool_address, &self.provider)
            .depositETH(asset, on_behalf_of, REFERRAL_CODE)
            .value(amount)
            .send()
            .await
            .map_err(submit_failed)?
            .get_receipt()
            .await
            .map_err(submit_failed)?;

        Self::confirmed(&receipt, "Deposit")
    }

    #[instrument("SET_COLLATERAL", skip(self))]
    async fn set_use_as_collateral(
        &self,
        asset: Address,
        enabled: bool,
    ) -> Result<TxHash, ActionError> {
        let receipt = LendingPoolContract::new(self.pool_address, &self.provider)
            .setUserUseReserveAsCollateral(asset, enabled)
            .send()
            .await
            .map_err(submit_failed)?
            .get_receipt()
            .await
            .map_err(submit_failed)?;

        Self::confirmed(&receipt, "Collateral toggle")
    }

    #[instrument("WITHDRAW", skip(self))]
    async fn withdraw_native(
        &self,
        asset: Address,
        amount: U256,
        to: Address,
    ) -> Result<TxHash, ActionError> {
        let pool = LendingPoolContract::new(self.pool_address, &self.provider);

        let pending = match pool.withdrawETH(asset, amount, to).send().await {
            Ok(pending) => pending,
            Err(e) => {
                let error = submit_failed(&e);
                if error == ActionError::UserRejected {
                    return Err(error);
                }
                warn!("withdrawETH failed ({}), trying withdraw", e);
                pool.withdraw(asset, amount, to)
                    .send()
                    .await
                    .map_err(submit_failed)?
            }
        };

        let receipt = pending.get_receipt().await.map_err(submit_failed)?;
        Self::confirmed(&receipt, "Withdraw")
    }

    #[instrument("BORROW", skip(self))]
    async fn borrow_native(&self, asset: Address, amount: U256) -> Result<TxHash, ActionError> {
        let receipt = LendingPoolContract::new(self.pool_address, &self.provider)
            .borrowETH(
                asset,
                amount,
                U256::from(VARIABLE_INTEREST_RATE_MODE),
                REFERRAL_CODE,
            )
            .send()
            .await
            .map_err(submit_failed)?
            .get_receipt()
            .await
            .map_err(submit_failed)?;

        Self::confirmed(&receipt, "Borrow")
    }

    #[instrument("REPAY", skip(self))]
    async fn repay_native(
        &self,
        asset: Address,
        amount: U256,
        on_behalf_of: Address,
    ) -> Result<TxHash, ActionError> {
        let receipt = LendingPoolContract::new(self.pool_address, &self.provider)
            .repayETH(
                asset,
                amount,
                U256::from(VARIABLE_INTEREST_RATE_MODE),
                on_behalf_of,
            )
            .value(amount)
            .send()
            .await
            .map_err(submit_failed)?
            .get_receipt()
            .await
            .map_err(submit_failed)?;

        Self::confirmed(&receipt, "Repay")
    }

    #[instrument("APPROVE_DELEGATION", skip(self))]
    async fn approve_delegation(
        &self,
        debt_token: Address,
        delegatee: Address,
        amount: U256,
    ) -> Result<TxHash, ActionError> {
        debug!("Approving credit delegation to {}", delegatee);
        let receipt = DebtTokenContract::new(debt_token, &self.provider)
            .approveDelegation(delegatee, amount)
            .send()
            .await
            .map_err(submit_failed)?
            .get_receipt()
            .await
            .map_err(submit_failed)?;

        Self::confirmed(&receipt, "Delegation approval")
    }
}
