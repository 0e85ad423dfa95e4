use alloy::{
    primitives::{Address, U256},
    sol_types::SolCall,
};

use crate::{errors::ReadError, utils::contracts::LendingPoolContract};

const WORD_SIZE: usize = 32;

/// Raw `getUserAccountData` values, still in on-chain fixed point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AccountData {
    pub total_collateral: U256,
    pub total_debt: U256,
    pub available_borrows: U256,
    pub liquidation_threshold: Option<U256>,
    pub ltv: Option<U256>,
    pub health_factor: Option<U256>,
}

impl AccountData {
    /// Decodes a `getUserAccountData` response.
    ///
    /// The full named six-value layout is tried first. Pool forks that answer
    /// with a shorter tuple are read positionally: the first three words are
    /// collateral, debt and available borrows, anything after that is optional.
    pub fn decode(data: &[u8]) -> Result<Self, ReadError> {
        if let Ok(named) =
            LendingPoolContract::getUserAccountDataCall::abi_decode_returns(data, false)
        {
            return Ok(Self {
                total_collateral: named.totalCollateralETH,
                total_debt: named.totalDebtETH,
                available_borrows: named.availableBorrowsETH,
                liquidation_threshold: Some(named.currentLiquidationThreshold),
                ltv: Some(named.ltv),
                health_factor: Some(named.healthFactor),
            });
        }

        Self::decode_positional(data)
    }

    fn decode_positional(data: &[u8]) -> Result<Self, ReadError> {
        let words: Vec<U256> = data
            .chunks_exact(WORD_SIZE)
            .map(U256::from_be_slice)
            .collect();

        if words.len() < 3 {
            return Err(ReadError::Decode(format!(
                "account data has {} words, expected at least 3",
                words.len()
            )));
        }

        Ok(Self {
            total_collateral: words[0],
            total_debt: words[1],
            available_borrows: words[2],
            liquidation_threshold: words.get(3).copied(),
            ltv: words.get(4).copied(),
            health_factor: words.get(5).copied(),
        })
    }
}

/// Token addresses registered for a reserve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReserveTokens {
    pub receipt_token: Address,
    pub variable_debt_token: Address,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_words(words: &[u64]) -> Vec<u8> {
        words
            .iter()
            .flat_map(|word| U256::from(*word).to_be_bytes::<32>())
            .collect()
    }

    #[test]
    fn test_decode_full_account_data() {
        let data = encode_words(&[100, 20, 55, 8_000, 7_500, 3_000]);
        let account_data = AccountData::decode(&data).unwrap();

        assert_eq!(account_data.total_collateral, U256::from(100));
        assert_eq!(account_data.total_debt, U256::from(20));
        assert_eq!(account_data.available_borrows, U256::from(55));
        assert_eq!(account_data.liquidation_threshold, Some(U256::from(8_000)));
        assert_eq!(account_data.ltv, Some(U256::from(7_500)));
        assert_eq!(account_data.health_factor, Some(U256::from(3_000)));
    }

    #[test]
    fn test_decode_short_positional_account_data() {
        let data = encode_words(&[100, 20, 55]);
        let account_data = AccountData::decode(&data).unwrap();

        assert_eq!(account_data.total_collateral, U256::from(100));
        assert_eq!(account_data.total_debt, U256::from(20));
        assert_eq!(account_data.available_borrows, U256::from(55));
        assert_eq!(account_data.ltv, None);
        assert_eq!(account_data.health_factor, None);
    }

    #[test]
    fn test_decode_rejects_truncated_response() {
        let data = encode_words(&[100, 20]);
        assert!(matches!(AccountData::decode(&data), Err(ReadError::Decode(_))));
        assert!(AccountData::decode(&[]).is_err());
    }
}
