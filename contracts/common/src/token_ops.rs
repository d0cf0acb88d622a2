//! Token Operations Module
//!
//! In-memory multi-asset fungible ledger. This models the external
//! token-transfer capability the engine is deployed against: the engine
//! components hold ledger accounts and move balances through it, while
//! supply enters only via `mint` (external inflows, reward funding,
//! vault donations).
//!
//! Per token, the sum of all balances changes only through `mint` --
//! `transfer` conserves it. The conservation tests lean on this.

use crate::errors::{HarvestError, HarvestResult};
use crate::math::{safe_add, safe_sub};
use crate::types::{Address, TokenId};
use crate::Vec;
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

/// One (token, owner) balance entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct BalanceEntry {
    /// Asset identifier
    pub token: TokenId,
    /// Owner address
    pub owner: Address,
    /// Balance amount
    pub balance: u64,
}

/// Multi-asset balance ledger
#[derive(
    Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize,
)]
pub struct TokenLedger {
    entries: Vec<BalanceEntry>,
}

impl TokenLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Balance held by `owner` in `token`
    pub fn balance_of(&self, token: &TokenId, owner: &Address) -> u64 {
        self.entries
            .iter()
            .find(|e| &e.token == token && &e.owner == owner)
            .map(|e| e.balance)
            .unwrap_or(0)
    }

    /// Total supply of `token` across all holders
    pub fn total_supply(&self, token: &TokenId) -> u64 {
        self.entries
            .iter()
            .filter(|e| &e.token == token)
            .fold(0u64, |acc, e| acc.saturating_add(e.balance))
    }

    /// Credits `amount` of `token` to `to`. External inflow; the only
    /// way supply is created.
    pub fn mint(&mut self, token: TokenId, to: Address, amount: u64) -> HarvestResult<()> {
        if amount == 0 {
            return Ok(());
        }
        self.credit(token, to, amount)
    }

    /// Moves `amount` of `token` from `from` to `to`.
    ///
    /// Zero amounts and self-transfers are no-ops. An insufficient
    /// sender balance aborts with no mutation.
    pub fn transfer(
        &mut self,
        token: &TokenId,
        from: &Address,
        to: &Address,
        amount: u64,
    ) -> HarvestResult<()> {
        if amount == 0 || from == to {
            return Ok(());
        }

        let available = self.balance_of(token, from);
        if available < amount {
            return Err(HarvestError::InsufficientBalance {
                available,
                requested: amount,
            });
        }

        self.debit(token, from, amount)?;
        self.credit(*token, *to, amount)
    }

    fn credit(&mut self, token: TokenId, owner: Address, amount: u64) -> HarvestResult<()> {
        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|e| e.token == token && e.owner == owner)
        {
            entry.balance = safe_add(entry.balance, amount)?;
        } else {
            self.entries.push(BalanceEntry {
                token,
                owner,
                balance: amount,
            });
        }
        Ok(())
    }

    fn debit(&mut self, token: &TokenId, owner: &Address, amount: u64) -> HarvestResult<()> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| &e.token == token && &e.owner == owner)
            .ok_or(HarvestError::InsufficientBalance {
                available: 0,
                requested: amount,
            })?;
        entry.balance = safe_sub(entry.balance, amount)?;
        Ok(())
    }
}
