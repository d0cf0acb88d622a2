//! Treasury Module (Gathering Engine)
//!
//! A time-gated, percentage-based release mechanism. The treasury owns
//! a registry of gathering policies, one per (token, recipient) pair;
//! each policy releases a percentage of the treasury's live balance to
//! its recipient once per interval.
//!
//! Gathering through a closed gate is a no-op returning zero, never an
//! error: the consumer polls on every interaction and simply receives
//! nothing until the interval has elapsed. This decouples "how much
//! exists" (a reserve balance) from "how fast it may be released".

use crate::access::Ownership;
use crate::constants::gathering::{MAX_ENTRIES, MAX_PERCENT};
use crate::errors::{HarvestError, HarvestResult};
use crate::events::{EventLog, HarvestEvent};
use crate::math::percent_of;
use crate::token_ops::TokenLedger;
use crate::types::{Address, TokenId};
use crate::Vec;
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

/// One gathering policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct TreasuryEntry {
    /// Asset released by this policy
    pub token: TokenId,
    /// Recipient of every release
    pub recipient: Address,
    /// Minimum spacing between releases, in block/time ticks
    pub interval: u64,
    /// Share of the live balance released per gather (1e5 scale)
    pub percent: u64,
    /// Tick of the last successful gather. `None` until the first
    /// gather; tick 0 is a valid gather time on the injected clock.
    pub last_gather_time: Option<u64>,
    /// Earliest tick at which the first gather may happen
    pub unlock_at: u64,
}

impl TreasuryEntry {
    /// True when the gate is open at `now`
    pub fn is_open(&self, now: u64) -> bool {
        if now < self.unlock_at {
            return false;
        }
        match self.last_gather_time {
            None => true,
            Some(last) => now >= last.saturating_add(self.interval),
        }
    }
}

/// Treasury state: an owned registry of gathering policies over one
/// ledger account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct Treasury {
    /// Ledger account holding the treasury funds
    pub account: Address,
    /// Owner capability for policy registration
    pub ownership: Ownership,
    /// Registered gathering policies
    pub entries: Vec<TreasuryEntry>,
}

impl Treasury {
    /// Create an empty treasury over `account`, owned by `owner`
    pub fn new(account: Address, owner: Address) -> Self {
        Self {
            account,
            ownership: Ownership::new(owner),
            entries: Vec::new(),
        }
    }

    /// Registers a gathering policy. Owner-only.
    ///
    /// `initial_delay` shifts the first allowed gather past `now`; zero
    /// is the immediate-unlock policy.
    #[allow(clippy::too_many_arguments)]
    pub fn add(
        &mut self,
        log: &mut EventLog,
        caller: &Address,
        token: TokenId,
        recipient: Address,
        interval: u64,
        percent: u64,
        initial_delay: u64,
        now: u64,
    ) -> HarvestResult<()> {
        self.ownership.require(caller)?;

        if interval == 0 {
            return Err(HarvestError::InvalidConfiguration {
                param: "interval",
                reason: "must be positive",
            });
        }
        if percent == 0 || percent > MAX_PERCENT {
            return Err(HarvestError::InvalidConfiguration {
                param: "percent",
                reason: "must be in (0, 100%]",
            });
        }
        if self.entry(&token, &recipient).is_some() {
            return Err(HarvestError::InvalidConfiguration {
                param: "recipient",
                reason: "entry already registered",
            });
        }
        if self.entries.len() >= MAX_ENTRIES {
            return Err(HarvestError::InvalidConfiguration {
                param: "entries",
                reason: "registry full",
            });
        }

        let unlock_at = now.saturating_add(initial_delay);
        self.entries.push(TreasuryEntry {
            token,
            recipient,
            interval,
            percent,
            last_gather_time: None,
            unlock_at,
        });
        log.emit(HarvestEvent::TreasuryEntryAdded {
            token,
            recipient,
            interval,
            percent,
            unlock_at,
            block_height: now,
        });
        Ok(())
    }

    /// Looks up the policy for (token, recipient)
    pub fn entry(&self, token: &TokenId, recipient: &Address) -> Option<&TreasuryEntry> {
        self.entries
            .iter()
            .find(|e| &e.token == token && &e.recipient == recipient)
    }

    /// True iff the (token, recipient) gate is open at `now`
    pub fn is_allowed_gathering(&self, token: &TokenId, recipient: &Address, now: u64) -> bool {
        self.entry(token, recipient)
            .map(|e| e.is_open(now))
            .unwrap_or(false)
    }

    /// Amount a gather at `now` would release: the policy percentage of
    /// the live balance when the gate is open, zero otherwise.
    pub fn gatherable(
        &self,
        ledger: &TokenLedger,
        token: &TokenId,
        recipient: &Address,
        now: u64,
    ) -> HarvestResult<u64> {
        match self.entry(token, recipient) {
            Some(entry) if entry.is_open(now) => {
                percent_of(ledger.balance_of(token, &self.account), entry.percent)
            }
            _ => Ok(0),
        }
    }

    /// Releases the policy percentage of the live balance to the
    /// recipient and resets the gate. Returns the amount transferred;
    /// a closed gate returns zero without touching the gate.
    pub fn gather(
        &mut self,
        ledger: &mut TokenLedger,
        log: &mut EventLog,
        token: &TokenId,
        recipient: &Address,
        now: u64,
    ) -> HarvestResult<u64> {
        let account = self.account;
        let entry = self
            .entries
            .iter_mut()
            .find(|e| &e.token == token && &e.recipient == recipient)
            .ok_or(HarvestError::EntryNotFound {
                token: *token,
                recipient: *recipient,
            })?;

        if !entry.is_open(now) {
            return Ok(0);
        }

        let amount = percent_of(ledger.balance_of(token, &account), entry.percent)?;
        ledger.transfer(token, &account, recipient, amount)?;
        entry.last_gather_time = Some(now);

        log.emit(HarvestEvent::Gathered {
            token: *token,
            recipient: *recipient,
            amount,
            block_height: now,
        });
        Ok(amount)
    }
}
