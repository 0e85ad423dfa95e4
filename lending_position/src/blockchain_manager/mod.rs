mod models;
mod pool_client;

pub use models::{AccountData, ReserveTokens};
pub use pool_client::PoolClient;

use alloy::{
    network::{Ethereum, EthereumWallet},
    primitives::{Address, TxHash, U256},
    providers::{Provider, ProviderBuilder},
    rpc::client::RpcClient,
    signers::local::PrivateKeySigner,
    transports::{http::reqwest::Url, layers::RetryBackoffLayer},
};
use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::{
    config::LocalConfig,
    errors::{ActionError, ReadError},
};

/// Read side of the lending pool as the position aggregator consumes it
#[async_trait]
pub trait LendingPoolReader: Send + Sync {
    /// Native (unwrapped) balance of `user`
    async fn native_balance(&self, user: Address) -> Result<U256, ReadError>;

    /// ERC20 `balanceOf` on a receipt or debt token
    async fn token_balance(&self, token: Address, user: Address) -> Result<U256, ReadError>;

    /// Token addresses the pool registered for `asset`
    async fn reserve_tokens(&self, asset: Address) -> Result<ReserveTokens, ReadError>;

    /// Aggregate account data in one call
    async fn user_account_data(&self, user: Address) -> Result<AccountData, ReadError>;

    /// Credit delegation from `from_user` to `to_user` on a debt token
    async fn borrow_allowance(
        &self,
        debt_token: Address,
        from_user: Address,
        to_user: Address,
    ) -> Result<U256, ReadError>;
}

/// Transaction side of the lending pool. Every call waits for the receipt.
#[async_trait]
pub trait LendingPoolWriter: Send + Sync {
    fn pool_address(&self) -> Address;

    async fn deposit_native(
        &self,
        asset: Address,
        amount: U256,
        on_behalf_of: Address,
    ) -> Result<TxHash, ActionError>;

    async fn set_use_as_collateral(&self, asset: Address, enabled: bool)
        -> Result<TxHash, ActionError>;

    async fn withdraw_native(
        &self,
        asset: Address,
        amount: U256,
        to: Address,
    ) -> Result<TxHash, ActionError>;

    async fn borrow_native(&self, asset: Address, amount: U256) -> Result<TxHash, ActionError>;

    async fn repay_native(
        &self,
        asset: Address,
        amount: U256,
        on_behalf_of: Address,
    ) -> Result<TxHash, ActionError>;

    async fn approve_delegation(
        &self,
        debt_token: Address,
        delegatee: Address,
        amount: U256,
    ) -> Result<TxHash, ActionError>;
}

/// The connected account, if any
pub trait Wallet: Send + Sync {
    fn address(&self) -> Option<Address>;
}

/// BlockchainManager handles blockchain-related operations and connections.
/// It provides functionality to create provider instances and the pool client.
pub struct BlockchainManager;

impl BlockchainManager {
    /// Creates an HTTP provider that signs with the configured private key.
    ///
    /// # Arguments
    /// * `local_config` - Local configuration containing the RPC URL and key
    ///
    /// # Returns
    /// * `Result<(impl Provider<Ethereum>, Address)>` - The provider and the signer address
    pub fn get_provider(
        local_config: &LocalConfig,
    ) -> Result<(impl Provider<Ethereum> + Clone + 'static, Address)> {
        // Instantiate the RetryBackoffLayer with the configuration
        let retry_layer = RetryBackoffLayer::new(10, 1000, 10000);

        let client = RpcClient::builder()
            .layer(retry_layer)
            .http(Url::parse(&local_config.rpc_url).context("RPC_URL is not a valid url")?);

        let signer: PrivateKeySigner = local_config
            .private_key
            .parse()
            .context("PRIVATE_KEY is not a valid private key")?;
        let signer_address = signer.address();

        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .on_client(client);

        Ok((provider, signer_address))
    }

    pub fn get_pool_client<P: Provider<Ethereum> + Clone>(
        provider: P,
        signer_address: Address,
        local_config: &LocalConfig,
    ) -> PoolClient<P> {
        PoolClient::new(provider, local_config.lending_pool_address, signer_address)
    }
}
