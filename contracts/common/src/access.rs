//! Access Control Module
//!
//! Explicit capability checks for owner- and dev-gated operations. The
//! caller identity is a parameter of every mutating operation and is
//! validated up front, before any state is touched.

use crate::errors::{HarvestError, HarvestResult};
use crate::types::Address;
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

/// Single-owner capability, the engine's analog of `Ownable`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize,
)]
pub struct Ownership {
    /// Current owner address
    pub owner: Address,
}

impl Ownership {
    /// Create ownership held by `owner`
    pub fn new(owner: Address) -> Self {
        Self { owner }
    }

    /// Fails with `Unauthorized` unless `caller` is the owner.
    pub fn require(&self, caller: &Address) -> HarvestResult<()> {
        require_account(&self.owner, caller)
    }

    /// Hands ownership to `new_owner`; owner-only.
    pub fn transfer(&mut self, caller: &Address, new_owner: Address) -> HarvestResult<()> {
        self.require(caller)?;
        self.owner = new_owner;
        Ok(())
    }
}

/// Checks that `actual` is the `expected` account.
pub fn require_account(expected: &Address, actual: &Address) -> HarvestResult<()> {
    if expected != actual {
        return Err(HarvestError::Unauthorized {
            expected: *expected,
            actual: *actual,
        });
    }
    Ok(())
}
