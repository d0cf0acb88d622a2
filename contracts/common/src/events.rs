//! Engine Events
//!
//! Events are collected during operation execution and can be indexed
//! off-process for building UIs, analytics, and notifications. Every
//! event carries the block height at which the operation was applied.

use crate::types::{Address, PoolId, TokenId};
use crate::Vec;
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

/// Event types for indexing and filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
#[borsh(use_discriminant = true)]
#[repr(u8)]
pub enum EventType {
    // Farming Events (0x01 - 0x1F)
    PoolAdded = 0x01,
    PoolWeightSet = 0x02,
    PoolUpdated = 0x03,
    Deposited = 0x04,
    Withdrawn = 0x05,
    EmergencyWithdrawn = 0x06,
    RewardPaid = 0x07,
    DevFeePaid = 0x08,
    ReservoirDrained = 0x09,

    // Treasury Events (0x20 - 0x2F)
    TreasuryEntryAdded = 0x20,
    Gathered = 0x21,

    // Vault Events (0x30 - 0x3F)
    VaultEntered = 0x30,
    VaultLeft = 0x31,

    // Administration Events (0x40 - 0x4F)
    OwnershipTransferred = 0x40,
    DevAddressChanged = 0x41,
    RewardRateChanged = 0x42,
    RewardSourceChanged = 0x43,
}

/// Main event enum containing all engine events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum HarvestEvent {
    // ============ Farming Events ============

    /// Emitted when a new pool is registered
    PoolAdded {
        pool_id: PoolId,
        deposit_token: TokenId,
        weight: u64,
        block_height: u64,
    },

    /// Emitted when a pool's allocation weight changes
    PoolWeightSet {
        pool_id: PoolId,
        old_weight: u64,
        new_weight: u64,
        block_height: u64,
    },

    /// Emitted when a pool's accumulator advances
    PoolUpdated {
        pool_id: PoolId,
        released: u64,
        accrued: u64,
        acc_reward_per_share: u128,
        block_height: u64,
    },

    /// Emitted on principal deposit
    Deposited {
        pool_id: PoolId,
        owner: Address,
        amount: u64,
        block_height: u64,
    },

    /// Emitted on principal withdrawal
    Withdrawn {
        pool_id: PoolId,
        owner: Address,
        amount: u64,
        block_height: u64,
    },

    /// Emitted when a position is evacuated without settlement
    EmergencyWithdrawn {
        pool_id: PoolId,
        owner: Address,
        amount: u64,
        forfeited: u64,
        block_height: u64,
    },

    /// Emitted when settled reward is paid out
    RewardPaid {
        pool_id: PoolId,
        owner: Address,
        amount: u64,
        block_height: u64,
    },

    /// Emitted when the dev share is routed out of a release
    DevFeePaid {
        pool_id: PoolId,
        dev: Address,
        amount: u64,
        block_height: u64,
    },

    /// Emitted when the reservoir releases supply to the farm
    ReservoirDrained {
        amount: u64,
        remaining: u64,
        block_height: u64,
    },

    // ============ Treasury Events ============

    /// Emitted when a gathering policy is registered
    TreasuryEntryAdded {
        token: TokenId,
        recipient: Address,
        interval: u64,
        percent: u64,
        unlock_at: u64,
        block_height: u64,
    },

    /// Emitted when a gather releases funds through an open gate
    Gathered {
        token: TokenId,
        recipient: Address,
        amount: u64,
        block_height: u64,
    },

    // ============ Vault Events ============

    /// Emitted when principal enters the staking vault
    VaultEntered {
        owner: Address,
        amount: u64,
        shares_minted: u64,
        block_height: u64,
    },

    /// Emitted when shares are redeemed
    VaultLeft {
        owner: Address,
        shares_burned: u64,
        amount: u64,
        block_height: u64,
    },

    // ============ Administration Events ============

    /// Emitted when a component's owner changes
    OwnershipTransferred {
        old_owner: Address,
        new_owner: Address,
        block_height: u64,
    },

    /// Emitted when the farming dev address changes
    DevAddressChanged {
        old_dev: Address,
        new_dev: Address,
        block_height: u64,
    },

    /// Emitted when the per-block reward rate changes
    RewardRateChanged {
        old_rate: u64,
        new_rate: u64,
        block_height: u64,
    },

    /// Emitted when the farm switches reward source
    RewardSourceChanged {
        old_kind: crate::types::RewardSourceKind,
        new_kind: crate::types::RewardSourceKind,
        block_height: u64,
    },
}

impl HarvestEvent {
    /// Get the event type for filtering
    pub fn event_type(&self) -> EventType {
        match self {
            Self::PoolAdded { .. } => EventType::PoolAdded,
            Self::PoolWeightSet { .. } => EventType::PoolWeightSet,
            Self::PoolUpdated { .. } => EventType::PoolUpdated,
            Self::Deposited { .. } => EventType::Deposited,
            Self::Withdrawn { .. } => EventType::Withdrawn,
            Self::EmergencyWithdrawn { .. } => EventType::EmergencyWithdrawn,
            Self::RewardPaid { .. } => EventType::RewardPaid,
            Self::DevFeePaid { .. } => EventType::DevFeePaid,
            Self::ReservoirDrained { .. } => EventType::ReservoirDrained,
            Self::TreasuryEntryAdded { .. } => EventType::TreasuryEntryAdded,
            Self::Gathered { .. } => EventType::Gathered,
            Self::VaultEntered { .. } => EventType::VaultEntered,
            Self::VaultLeft { .. } => EventType::VaultLeft,
            Self::OwnershipTransferred { .. } => EventType::OwnershipTransferred,
            Self::DevAddressChanged { .. } => EventType::DevAddressChanged,
            Self::RewardRateChanged { .. } => EventType::RewardRateChanged,
            Self::RewardSourceChanged { .. } => EventType::RewardSourceChanged,
        }
    }

    /// Get the block height when the event occurred
    pub fn block_height(&self) -> u64 {
        match self {
            Self::PoolAdded { block_height, .. } => *block_height,
            Self::PoolWeightSet { block_height, .. } => *block_height,
            Self::PoolUpdated { block_height, .. } => *block_height,
            Self::Deposited { block_height, .. } => *block_height,
            Self::Withdrawn { block_height, .. } => *block_height,
            Self::EmergencyWithdrawn { block_height, .. } => *block_height,
            Self::RewardPaid { block_height, .. } => *block_height,
            Self::DevFeePaid { block_height, .. } => *block_height,
            Self::ReservoirDrained { block_height, .. } => *block_height,
            Self::TreasuryEntryAdded { block_height, .. } => *block_height,
            Self::Gathered { block_height, .. } => *block_height,
            Self::VaultEntered { block_height, .. } => *block_height,
            Self::VaultLeft { block_height, .. } => *block_height,
            Self::OwnershipTransferred { block_height, .. } => *block_height,
            Self::DevAddressChanged { block_height, .. } => *block_height,
            Self::RewardRateChanged { block_height, .. } => *block_height,
            Self::RewardSourceChanged { block_height, .. } => *block_height,
        }
    }

    /// Serialize event to bytes for storage/transmission
    pub fn to_bytes(&self) -> Vec<u8> {
        borsh::to_vec(self).unwrap_or_default()
    }

    /// Deserialize event from bytes
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        borsh::from_slice(bytes).ok()
    }
}

/// Event log for collecting events during execution
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<HarvestEvent>,
}

impl EventLog {
    /// Create a new empty event log
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Emit an event (add to log)
    pub fn emit(&mut self, event: HarvestEvent) {
        self.events.push(event);
    }

    /// Get all events
    pub fn events(&self) -> &[HarvestEvent] {
        &self.events
    }

    /// Take ownership of all events
    pub fn into_events(self) -> Vec<HarvestEvent> {
        self.events
    }

    /// Filter events by type
    pub fn filter_by_type(&self, event_type: EventType) -> Vec<&HarvestEvent> {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    /// Check if any events were emitted
    pub fn has_events(&self) -> bool {
        !self.events.is_empty()
    }

    /// Get number of events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns true when no events were emitted
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Clear all events
    pub fn clear(&mut self) {
        self.events.clear();
    }
}
