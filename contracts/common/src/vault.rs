//! Staking Vault Module
//!
//! A share-based pool converting principal deposits into proportional
//! ownership of the vault's token balance. Rewards arrive as external
//! donations to the vault account: they raise the redemption value of
//! every existing share without minting new ones, which is the vault's
//! entire reward mechanism (distinct from the farming accumulator).

use crate::errors::{HarvestError, HarvestResult};
use crate::events::{EventLog, HarvestEvent};
use crate::math::{safe_add, safe_sub, shares_for_deposit, tokens_for_shares};
use crate::token_ops::TokenLedger;
use crate::types::{Address, TokenId};
use crate::Vec;
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

/// Per-holder share balance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct ShareBalance {
    /// Holder address
    pub owner: Address,
    /// Shares held
    pub shares: u64,
}

/// Staking vault state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct StakingVault {
    /// Ledger account holding the pooled principal
    pub account: Address,
    /// Pooled asset
    pub token: TokenId,
    /// Total shares outstanding
    pub total_shares: u64,
    /// Share ledger (zero balances are valid terminal states)
    pub holders: Vec<ShareBalance>,
}

impl StakingVault {
    /// Create an empty vault pooling `token` on `account`
    pub fn new(account: Address, token: TokenId) -> Self {
        Self {
            account,
            token,
            total_shares: 0,
            holders: Vec::new(),
        }
    }

    /// Shares held by `owner`
    pub fn balance_of(&self, owner: &Address) -> u64 {
        self.holders
            .iter()
            .find(|h| &h.owner == owner)
            .map(|h| h.shares)
            .unwrap_or(0)
    }

    /// Tokens currently pooled, donations included
    pub fn underlying(&self, ledger: &TokenLedger) -> u64 {
        ledger.balance_of(&self.token, &self.account)
    }

    /// Deposits `amount` principal and mints proportional shares.
    ///
    /// The first depositor bootstraps at 1:1; afterwards the mint rate
    /// follows the live share price, so donations received between
    /// deposits dilute nobody.
    pub fn enter(
        &mut self,
        ledger: &mut TokenLedger,
        log: &mut EventLog,
        caller: &Address,
        amount: u64,
        now: u64,
    ) -> HarvestResult<u64> {
        if amount == 0 {
            return Err(HarvestError::ZeroAmount);
        }

        // share price is quoted on the balance before this deposit
        let pooled = self.underlying(ledger);
        let minted = shares_for_deposit(amount, self.total_shares, pooled)?;

        ledger.transfer(&self.token, caller, &self.account, amount)?;
        self.credit_shares(*caller, minted)?;
        self.total_shares = safe_add(self.total_shares, minted)?;

        log.emit(HarvestEvent::VaultEntered {
            owner: *caller,
            amount,
            shares_minted: minted,
            block_height: now,
        });
        Ok(minted)
    }

    /// Burns `share_amount` shares and returns the proportional slice
    /// of the pooled balance.
    pub fn leave(
        &mut self,
        ledger: &mut TokenLedger,
        log: &mut EventLog,
        caller: &Address,
        share_amount: u64,
        now: u64,
    ) -> HarvestResult<u64> {
        let held = self.balance_of(caller);
        if share_amount > held {
            return Err(HarvestError::InsufficientShares {
                available: held,
                requested: share_amount,
            });
        }
        if share_amount == 0 {
            return Err(HarvestError::ZeroAmount);
        }

        let pooled = self.underlying(ledger);
        let amount = tokens_for_shares(share_amount, pooled, self.total_shares)?;

        self.debit_shares(caller, share_amount)?;
        self.total_shares = safe_sub(self.total_shares, share_amount)?;
        ledger.transfer(&self.token, &self.account, caller, amount)?;

        log.emit(HarvestEvent::VaultLeft {
            owner: *caller,
            shares_burned: share_amount,
            amount,
            block_height: now,
        });
        Ok(amount)
    }

    fn credit_shares(&mut self, owner: Address, shares: u64) -> HarvestResult<()> {
        if let Some(holder) = self.holders.iter_mut().find(|h| h.owner == owner) {
            holder.shares = safe_add(holder.shares, shares)?;
        } else {
            self.holders.push(ShareBalance { owner, shares });
        }
        Ok(())
    }

    fn debit_shares(&mut self, owner: &Address, shares: u64) -> HarvestResult<()> {
        let holder = self
            .holders
            .iter_mut()
            .find(|h| &h.owner == owner)
            .ok_or(HarvestError::InsufficientShares {
                available: 0,
                requested: shares,
            })?;
        holder.shares = safe_sub(holder.shares, shares)?;
        Ok(())
    }
}
