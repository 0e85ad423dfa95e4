use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Decimals of the pool asset, its receipt token and its debt token
pub const TOKEN_BALANCE_DECIMALS: u8 = 18;

/// Health factor is reported as a 1e18 fixed point value
pub const HEALTH_FACTOR_DECIMALS: u8 = 18;

/// Precision used when filling amount fields from a percentage
pub const AMOUNT_DISPLAY_DECIMALS: u32 = 6;

/// Precision of USD denominated values and percentages
pub const USD_DISPLAY_DECIMALS: u32 = 2;

/// Aave interest rate mode for variable debt
pub const VARIABLE_INTEREST_RATE_MODE: u64 = 2;

pub const REFERRAL_CODE: u16 = 0;

pub const DEFAULT_ASSET_PRICE_USD: Decimal = dec!(0.405);

/// Used only when `getUserAccountData` is unavailable; not read from the pool
pub const DEFAULT_FALLBACK_LTV_RATIO: Decimal = dec!(0.75);

pub const DEFAULT_MAX_CAP_ON_HEALTH_FACTOR: u64 = 1_000;

pub const DEFAULT_REFRESH_DELAYS_MS: [u64; 3] = [3_000, 2_000, 2_000];

pub const DEFAULT_HTTP_PORT: u16 = 8080;
