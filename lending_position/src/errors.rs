use thiserror::Error;

/// Failure of a single on-chain read. Always absorbed by the aggregator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReadError {
    #[error("{0} is not configured")]
    NotConfigured(&'static str),
    #[error("{0} returned the zero address")]
    ZeroAddress(&'static str),
    #[error("call failed: {0}")]
    CallFailed(String),
    #[error("could not decode response: {0}")]
    Decode(String),
}

/// Failures surfaced to the rendering layer when an action cannot run.
///
/// Display strings are the user-facing messages.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ActionError {
    #[error("Please connect your wallet first")]
    WalletNotConnected,
    #[error("Please enter a valid amount")]
    InvalidAmount,
    #[error("No balance available")]
    NoBalance,
    #[error("Insufficient balance")]
    InsufficientBalance,
    #[error("Insufficient collateral to borrow this amount")]
    InsufficientCollateral,
    #[error("Transaction rejected by user")]
    UserRejected,
    #[error("Transaction failed: {0}")]
    ContractCallFailed(String),
}

impl ActionError {
    /// Maps a raw provider/contract error message onto the taxonomy.
    pub fn from_chain_message(message: &str) -> Self {
        let lowered = message.to_lowercase();

        if lowered.contains("user rejected")
            || lowered.contains("user denied")
            || lowered.contains("action_rejected")
        {
            Self::UserRejected
        } else if lowered.contains("insufficient funds") {
            Self::InsufficientBalance
        } else if lowered.contains("insufficient collateral")
            || lowered.contains("health factor")
            || lowered.contains("collateral cannot cover")
        {
            Self::InsufficientCollateral
        } else {
            Self::ContractCallFailed(message.to_string())
        }
    }

    /// Stable identifier used by the HTTP layer
    pub fn kind(&self) -> &'static str {
        match self {
            Self::WalletNotConnected => "wallet_not_connected",
            Self::InvalidAmount => "invalid_amount",
            Self::NoBalance => "no_balance",
            Self::InsufficientBalance => "insufficient_balance",
            Self::InsufficientCollateral => "insufficient_collateral",
            Self::UserRejected => "user_rejected",
            Self::ContractCallFailed(_) => "contract_call_failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_chain_message() {
        assert_eq!(
            ActionError::from_chain_message("MetaMask Tx Signature: User denied transaction"),
            ActionError::UserRejected
        );
        assert_eq!(
            ActionError::from_chain_message("insufficient funds for gas * price + value"),
            ActionError::InsufficientBalance
        );
        assert_eq!(
            ActionError::from_chain_message("execution reverted: health factor is lesser than the liquidation threshold"),
            ActionError::InsufficientCollateral
        );
        assert_eq!(
            ActionError::from_chain_message("execution reverted: 32"),
            ActionError::ContractCallFailed("execution reverted: 32".to_string())
        );
    }

    #[test]
    fn test_messages_are_distinct() {
        let errors = [
            ActionError::WalletNotConnected,
            ActionError::InvalidAmount,
            ActionError::NoBalance,
            ActionError::InsufficientBalance,
            ActionError::InsufficientCollateral,
            ActionError::UserRejected,
            ActionError::ContractCallFailed("revert".to_string()),
        ];
        let messages: std::collections::HashSet<String> =
            errors.iter().map(|e| e.to_string()).collect();
        assert_eq!(messages.len(), errors.len());
    }
}
