//! Engine Constants
//!
//! All magic numbers and configuration values for the harvest engine.
//! Amounts use 8-decimal fixed point; percentages use a 1e5 denominator
//! so deployment parameters like `20 * 1000` read as 20%.

/// Reward token metadata
pub mod token {
    /// Token name
    pub const NAME: &str = "Harvest";
    /// Token symbol
    pub const SYMBOL: &str = "HRV";
    /// Decimal places
    pub const DECIMALS: u8 = 8;
    /// One unit with decimals (1 token = 100_000_000 base units)
    pub const ONE: u64 = 100_000_000;
}

/// Precision constants
pub mod precision {
    /// Scale of the per-share reward accumulator
    pub const ACC_PRECISION: u128 = 1_000_000_000_000; // 1e12

    /// Denominator for percentage values (100_000 = 100%)
    pub const PERCENT_DENOMINATOR: u64 = 100_000;
}

/// Farming configuration
pub mod farm {
    use super::precision::PERCENT_DENOMINATOR;

    /// Share of every released reward routed to the dev address (10%)
    pub const DEV_SHARE: u64 = PERCENT_DENOMINATOR / 10;

    /// Maximum number of registered pools
    pub const MAX_POOLS: usize = 64;
}

/// Treasury gathering configuration
pub mod gathering {
    use super::precision::PERCENT_DENOMINATOR;

    /// Maximum release percentage per gather (100%)
    pub const MAX_PERCENT: u64 = PERCENT_DENOMINATOR;

    /// Maximum number of registered gathering entries
    pub const MAX_ENTRIES: usize = 32;
}
