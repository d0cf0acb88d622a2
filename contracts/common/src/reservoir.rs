//! Reservoir Module
//!
//! A capped token reserve feeding a single consumer. The reservoir
//! holds the reward supply on its own ledger account and releases it
//! only to its authorized spender (the farming pool), capping every
//! request at the current balance.
//!
//! A request for more than the reserve holds is capped, not rejected;
//! an empty reservoir releases zero. This is what bounds total farming
//! payout to the funded supply.

use crate::access::require_account;
use crate::errors::HarvestResult;
use crate::token_ops::TokenLedger;
use crate::types::{Address, TokenId};
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

/// Reservoir state: the reserve account and its sole spender
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct Reservoir {
    /// Ledger account holding the reserve
    pub account: Address,
    /// Asset held by the reserve
    pub token: TokenId,
    /// The only account allowed to request transfers
    pub target: Address,
}

impl Reservoir {
    /// Create a reservoir releasing `token` from `account` to `target`
    pub fn new(account: Address, token: TokenId, target: Address) -> Self {
        Self {
            account,
            token,
            target,
        }
    }

    /// Current reserve balance
    pub fn balance_of(&self, ledger: &TokenLedger) -> u64 {
        ledger.balance_of(&self.token, &self.account)
    }

    /// Releases up to `amount` to the target and returns the amount
    /// actually moved.
    ///
    /// Only the authorized spender may call; the release is capped at
    /// the current balance and never fails for lack of funds.
    pub fn request_transfer(
        &self,
        ledger: &mut TokenLedger,
        caller: &Address,
        amount: u64,
    ) -> HarvestResult<u64> {
        require_account(&self.target, caller)?;

        let release = amount.min(self.balance_of(ledger));
        ledger.transfer(&self.token, &self.account, &self.target, release)?;
        Ok(release)
    }
}
