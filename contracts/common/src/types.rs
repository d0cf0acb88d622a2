//! Core Types for the Harvest Engine
//!
//! Fundamental aliases and shared structures used across the engine
//! modules. Component-specific state lives in the component modules.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

/// Type alias for account addresses (32-byte hash)
pub type Address = [u8; 32];

/// Type alias for fungible asset identifiers
pub type TokenId = [u8; 32];

/// Type alias for farming pool identifiers (index into the registry)
pub type PoolId = u32;

/// Well-known zero address, used as a sentinel in tests and defaults
pub const ZERO_ADDRESS: Address = [0u8; 32];

/// Builds a deterministic address from a small tag.
///
/// Convenience for wiring engine accounts (farm, reservoir, treasury,
/// vault) and test actors without an external key source.
pub fn account_from_tag(tag: u8) -> Address {
    let mut addr = [0u8; 32];
    addr[0] = tag;
    addr[31] = tag;
    addr
}

/// Identifies which supply component feeds a farming pool's rewards
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize,
)]
pub enum RewardSourceKind {
    /// No source attached yet; accrual releases nothing
    None,
    /// A raw capped reserve
    Reservoir,
    /// A time-gated percentage drip
    Treasury,
}
