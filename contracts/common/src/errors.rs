//! Error Types for the Harvest Engine
//!
//! Typed errors with structured payloads. Authorization and balance
//! violations abort the triggering operation; funding shortfalls are
//! never errors and degrade to partial payment instead.

/// Result type alias for engine operations
pub type HarvestResult<T> = Result<T, HarvestError>;

/// Main error enum for all engine errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HarvestError {
    // ============ Authorization Errors ============
    /// Caller lacks the role required for this operation
    Unauthorized { expected: [u8; 32], actual: [u8; 32] },

    // ============ Balance Errors ============
    /// Withdrawal or transfer exceeds recorded balance
    InsufficientBalance { available: u64, requested: u64 },

    /// Vault leave exceeds recorded shares
    InsufficientShares { available: u64, requested: u64 },

    /// Zero amount not allowed
    ZeroAmount,

    // ============ Configuration Errors ============
    /// Invalid registration or reconfiguration parameter
    InvalidConfiguration { param: &'static str, reason: &'static str },

    /// Pool not found with given ID
    PoolNotFound { pool_id: u32 },

    /// No gathering entry for (token, recipient)
    EntryNotFound { token: [u8; 32], recipient: [u8; 32] },

    // ============ Math Errors ============
    /// Arithmetic overflow occurred
    Overflow,

    /// Arithmetic underflow occurred
    Underflow,

    /// Division by zero
    DivisionByZero,
}

impl HarvestError {
    /// Returns a stable error code for logging/debugging
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized { .. } => "E001_UNAUTHORIZED",
            Self::InsufficientBalance { .. } => "E010_INSUFFICIENT_BALANCE",
            Self::InsufficientShares { .. } => "E011_INSUFFICIENT_SHARES",
            Self::ZeroAmount => "E012_ZERO_AMOUNT",
            Self::InvalidConfiguration { .. } => "E020_INVALID_CONFIGURATION",
            Self::PoolNotFound { .. } => "E021_POOL_NOT_FOUND",
            Self::EntryNotFound { .. } => "E022_ENTRY_NOT_FOUND",
            Self::Overflow => "E080_OVERFLOW",
            Self::Underflow => "E081_UNDERFLOW",
            Self::DivisionByZero => "E082_DIV_ZERO",
        }
    }

    /// Returns true if this error is recoverable (caller can fix it)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::InsufficientBalance { .. }
                | Self::InsufficientShares { .. }
                | Self::ZeroAmount
        )
    }
}
