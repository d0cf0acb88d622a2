//! Farming Pool Module
//!
//! Per-pool reward accumulator keyed by allocation weight and block
//! progression. Each pool tracks a monotone `acc_reward_per_share`
//! accumulator (1e12 fixed point); a depositor's claim is the classic
//! single-subtraction `amount * acc - reward_debt`.
//!
//! ## Key Behaviors
//!
//! - **Lazy accrual**: accumulators advance only as a side effect of
//!   the next call touching the pool; there is no background accrual.
//! - **Supply-capped release**: accrual demand is served by a reward
//!   source (reservoir or treasury drip) and capped by what it actually
//!   releases. Shortfalls degrade to partial payment, never an error.
//! - **Dev share**: a fixed slice of every released reward is routed to
//!   the dev address before the accumulator advances.
//! - **Idle pools forfeit**: accrual over a span with zero deposits is
//!   skipped outright and never carried over.

use crate::access::{require_account, Ownership};
use crate::constants::farm::{DEV_SHARE, MAX_POOLS};
use crate::errors::{HarvestError, HarvestResult};
use crate::events::{EventLog, HarvestEvent};
use crate::math::{
    acc_increment, pending_amount, percent_of, pool_reward, reward_debt, safe_add, safe_sub,
};
use crate::reservoir::Reservoir;
use crate::token_ops::TokenLedger;
use crate::treasury::Treasury;
use crate::types::{Address, PoolId, RewardSourceKind, TokenId};
use crate::Vec;
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

// ============================================================================
// Types
// ============================================================================

/// One registered pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct Pool {
    /// Principal asset staked into this pool
    pub deposit_token: TokenId,
    /// Allocation weight, relative to the sum over all pools
    pub alloc_weight: u64,
    /// Last block at which the accumulator advanced
    pub last_accrual_block: u64,
    /// Cumulative reward per deposited unit, 1e12 scale. Never decreases.
    pub acc_reward_per_share: u128,
    /// Sum of all depositors' principal
    pub total_deposited: u64,
}

/// Per-depositor accounting, keyed by (pool, owner)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct UserInfo {
    /// Pool this position belongs to
    pub pool_id: PoolId,
    /// Depositor address
    pub owner: Address,
    /// Principal currently deposited
    pub amount: u64,
    /// Accumulator snapshot at last settlement
    pub reward_debt: u64,
}

/// The supply component feeding reward releases
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum RewardSource {
    /// Nothing attached; accrual releases zero
    None,
    /// Raw capped reserve, drained on demand
    Reservoir(Reservoir),
    /// Time-gated percentage drip
    Treasury(Treasury),
}

impl RewardSource {
    /// Discriminant for events and queries
    pub fn kind(&self) -> RewardSourceKind {
        match self {
            Self::None => RewardSourceKind::None,
            Self::Reservoir(_) => RewardSourceKind::Reservoir,
            Self::Treasury(_) => RewardSourceKind::Treasury,
        }
    }
}

/// Farming engine state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct FarmState {
    /// Ledger account holding principal and undistributed rewards
    pub account: Address,
    /// Owner capability for pool administration
    pub ownership: Ownership,
    /// Recipient of the dev share
    pub dev: Address,
    /// Asset paid out as reward
    pub reward_token: TokenId,
    /// Reward emitted per block across all pools
    pub reward_per_block: u64,
    /// Block before which no pool accrues
    pub start_block: u64,
    /// Supply component serving accrual demand
    pub source: RewardSource,
    /// Registered pools, in registration order
    pub pools: Vec<Pool>,
    /// Depositor positions
    pub users: Vec<UserInfo>,
    /// Reward pulled from the source but not yet accounted into any
    /// accumulator (possible under the percent-driven treasury drip)
    pub reward_buffer: u64,
}

/// Request to register a pool
#[derive(Debug, Clone)]
pub struct AddPoolRequest {
    /// Caller identity (must be owner)
    pub caller: Address,
    /// Allocation weight (must be positive)
    pub weight: u64,
    /// Principal asset for the new pool
    pub deposit_token: TokenId,
    /// Settle all pools before the weight sum changes
    pub with_update: bool,
    /// Current block height
    pub block_height: u64,
}

/// Request to change a pool's allocation weight
#[derive(Debug, Clone)]
pub struct SetWeightRequest {
    /// Caller identity (must be owner)
    pub caller: Address,
    /// Pool to reconfigure
    pub pool_id: PoolId,
    /// New weight (zero disables the pool's reward share)
    pub weight: u64,
    /// Settle all pools before the weight sum changes
    pub with_update: bool,
    /// Current block height
    pub block_height: u64,
}

/// Request to deposit principal (a zero amount is a pure harvest)
#[derive(Debug, Clone)]
pub struct DepositRequest {
    /// Depositor
    pub caller: Address,
    /// Target pool
    pub pool_id: PoolId,
    /// Principal to add
    pub amount: u64,
    /// Current block height
    pub block_height: u64,
}

/// Request to withdraw principal
#[derive(Debug, Clone)]
pub struct WithdrawRequest {
    /// Depositor
    pub caller: Address,
    /// Target pool
    pub pool_id: PoolId,
    /// Principal to remove
    pub amount: u64,
    /// Current block height
    pub block_height: u64,
}

/// Result of a pool accrual
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdatePoolResult {
    /// Amount the source actually released this call
    pub released: u64,
    /// Demand served from the release plus the buffer
    pub accrued: u64,
    /// Dev share paid out of the accrued amount
    pub dev_cut: u64,
}

/// Result of a deposit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositResult {
    /// Reward settled and paid during this deposit
    pub reward_paid: u64,
    /// Principal recorded after the deposit
    pub new_amount: u64,
}

/// Result of a withdrawal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithdrawResult {
    /// Reward settled and paid during this withdrawal
    pub reward_paid: u64,
    /// Principal returned to the caller
    pub principal_returned: u64,
    /// Principal remaining in the position
    pub remaining: u64,
}

/// Result of an emergency withdrawal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmergencyWithdrawResult {
    /// Principal returned to the caller
    pub principal_returned: u64,
    /// Accrued-but-unsettled reward forfeited
    pub forfeited: u64,
}

// ============================================================================
// State accessors
// ============================================================================

impl FarmState {
    /// Create a farm with no pools and no reward source attached
    pub fn new(
        account: Address,
        owner: Address,
        dev: Address,
        reward_token: TokenId,
        reward_per_block: u64,
        start_block: u64,
    ) -> Self {
        Self {
            account,
            ownership: Ownership::new(owner),
            dev,
            reward_token,
            reward_per_block,
            start_block,
            source: RewardSource::None,
            pools: Vec::new(),
            users: Vec::new(),
            reward_buffer: 0,
        }
    }

    /// Number of registered pools
    pub fn pool_length(&self) -> usize {
        self.pools.len()
    }

    /// Sum of all allocation weights
    pub fn total_weight(&self) -> u64 {
        self.pools
            .iter()
            .fold(0u64, |acc, p| acc.saturating_add(p.alloc_weight))
    }

    /// Pool lookup, `PoolNotFound` on a bad id
    pub fn pool(&self, pool_id: PoolId) -> HarvestResult<&Pool> {
        self.pools
            .get(pool_id as usize)
            .ok_or(HarvestError::PoolNotFound { pool_id })
    }

    /// Position lookup for (pool, owner)
    pub fn user_info(&self, pool_id: PoolId, owner: &Address) -> Option<&UserInfo> {
        self.users
            .iter()
            .find(|u| u.pool_id == pool_id && &u.owner == owner)
    }

    /// Reward tokens on the farm account that are already accounted to
    /// depositors (the buffer is excluded: it has not accrued yet).
    pub fn payable_reward(&self, ledger: &TokenLedger) -> u64 {
        ledger
            .balance_of(&self.reward_token, &self.account)
            .saturating_sub(self.reward_buffer)
    }

    fn user_index(&self, pool_id: PoolId, owner: &Address) -> Option<usize> {
        self.users
            .iter()
            .position(|u| u.pool_id == pool_id && &u.owner == owner)
    }

    fn ensure_user(&mut self, pool_id: PoolId, owner: Address) -> usize {
        if let Some(i) = self.user_index(pool_id, &owner) {
            return i;
        }
        self.users.push(UserInfo {
            pool_id,
            owner,
            amount: 0,
            reward_debt: 0,
        });
        self.users.len() - 1
    }
}

// ============================================================================
// Administration
// ============================================================================

/// Registers a new pool. Owner-only.
///
/// With `with_update`, all existing pools are settled before the weight
/// sum changes, so the new weight never affects past accrual.
pub fn add_pool(
    farm: &mut FarmState,
    ledger: &mut TokenLedger,
    log: &mut EventLog,
    req: &AddPoolRequest,
) -> HarvestResult<PoolId> {
    farm.ownership.require(&req.caller)?;

    if req.weight == 0 {
        return Err(HarvestError::InvalidConfiguration {
            param: "weight",
            reason: "must be positive",
        });
    }
    if req.deposit_token == farm.reward_token {
        return Err(HarvestError::InvalidConfiguration {
            param: "deposit_token",
            reason: "reward token cannot be pool principal",
        });
    }
    if farm.pools.iter().any(|p| p.deposit_token == req.deposit_token) {
        return Err(HarvestError::InvalidConfiguration {
            param: "deposit_token",
            reason: "pool already registered",
        });
    }
    if farm.pools.len() >= MAX_POOLS {
        return Err(HarvestError::InvalidConfiguration {
            param: "pools",
            reason: "registry full",
        });
    }

    if req.with_update {
        mass_update_pools(farm, ledger, log, req.block_height)?;
    }

    farm.pools.push(Pool {
        deposit_token: req.deposit_token,
        alloc_weight: req.weight,
        last_accrual_block: req.block_height.max(farm.start_block),
        acc_reward_per_share: 0,
        total_deposited: 0,
    });
    let pool_id = (farm.pools.len() - 1) as PoolId;

    log.emit(HarvestEvent::PoolAdded {
        pool_id,
        deposit_token: req.deposit_token,
        weight: req.weight,
        block_height: req.block_height,
    });
    Ok(pool_id)
}

/// Changes a pool's allocation weight. Owner-only.
pub fn set_weight(
    farm: &mut FarmState,
    ledger: &mut TokenLedger,
    log: &mut EventLog,
    req: &SetWeightRequest,
) -> HarvestResult<()> {
    farm.ownership.require(&req.caller)?;
    farm.pool(req.pool_id)?;

    if req.with_update {
        mass_update_pools(farm, ledger, log, req.block_height)?;
    }

    let pool = &mut farm.pools[req.pool_id as usize];
    let old_weight = pool.alloc_weight;
    pool.alloc_weight = req.weight;

    log.emit(HarvestEvent::PoolWeightSet {
        pool_id: req.pool_id,
        old_weight,
        new_weight: req.weight,
        block_height: req.block_height,
    });
    Ok(())
}

/// Changes the per-block reward rate. Owner-only.
pub fn set_reward_per_block(
    farm: &mut FarmState,
    ledger: &mut TokenLedger,
    log: &mut EventLog,
    caller: &Address,
    new_rate: u64,
    with_update: bool,
    now: u64,
) -> HarvestResult<()> {
    farm.ownership.require(caller)?;

    if with_update {
        mass_update_pools(farm, ledger, log, now)?;
    }

    let old_rate = farm.reward_per_block;
    farm.reward_per_block = new_rate;
    log.emit(HarvestEvent::RewardRateChanged {
        old_rate,
        new_rate,
        block_height: now,
    });
    Ok(())
}

/// Attaches a reward source. Owner-only.
///
/// The source must actually feed this farm: a reservoir's target and
/// token are checked, and a treasury must carry a gathering entry for
/// the farm account.
pub fn set_reward_source(
    farm: &mut FarmState,
    log: &mut EventLog,
    caller: &Address,
    source: RewardSource,
    now: u64,
) -> HarvestResult<()> {
    farm.ownership.require(caller)?;

    match &source {
        RewardSource::None => {}
        RewardSource::Reservoir(reservoir) => {
            if reservoir.target != farm.account || reservoir.token != farm.reward_token {
                return Err(HarvestError::InvalidConfiguration {
                    param: "source",
                    reason: "reservoir does not feed this farm",
                });
            }
        }
        RewardSource::Treasury(treasury) => {
            if treasury.entry(&farm.reward_token, &farm.account).is_none() {
                return Err(HarvestError::InvalidConfiguration {
                    param: "source",
                    reason: "treasury has no entry for this farm",
                });
            }
        }
    }

    let old_kind = farm.source.kind();
    let new_kind = source.kind();
    farm.source = source;
    log.emit(HarvestEvent::RewardSourceChanged {
        old_kind,
        new_kind,
        block_height: now,
    });
    Ok(())
}

/// Hands the farm to a new owner. Owner-only.
pub fn transfer_ownership(
    farm: &mut FarmState,
    log: &mut EventLog,
    caller: &Address,
    new_owner: Address,
    now: u64,
) -> HarvestResult<()> {
    let old_owner = farm.ownership.owner;
    farm.ownership.transfer(caller, new_owner)?;
    log.emit(HarvestEvent::OwnershipTransferred {
        old_owner,
        new_owner,
        block_height: now,
    });
    Ok(())
}

/// Redirects the dev share. Only the current dev address may call.
pub fn update_dev(
    farm: &mut FarmState,
    log: &mut EventLog,
    caller: &Address,
    new_dev: Address,
    now: u64,
) -> HarvestResult<()> {
    require_account(&farm.dev, caller)?;
    let old_dev = farm.dev;
    farm.dev = new_dev;
    log.emit(HarvestEvent::DevAddressChanged {
        old_dev,
        new_dev,
        block_height: now,
    });
    Ok(())
}

// ============================================================================
// Accrual
// ============================================================================

fn pull_reward(
    source: &mut RewardSource,
    ledger: &mut TokenLedger,
    log: &mut EventLog,
    farm_account: &Address,
    reward_token: &TokenId,
    demand: u64,
    now: u64,
) -> HarvestResult<u64> {
    match source {
        RewardSource::None => Ok(0),
        RewardSource::Reservoir(reservoir) => {
            let released = reservoir.request_transfer(ledger, farm_account, demand)?;
            if released > 0 {
                log.emit(HarvestEvent::ReservoirDrained {
                    amount: released,
                    remaining: reservoir.balance_of(ledger),
                    block_height: now,
                });
            }
            Ok(released)
        }
        RewardSource::Treasury(treasury) => {
            treasury.gather(ledger, log, reward_token, farm_account, now)
        }
    }
}

fn source_available(
    source: &RewardSource,
    ledger: &TokenLedger,
    reward_token: &TokenId,
    farm_account: &Address,
    now: u64,
) -> HarvestResult<u64> {
    match source {
        RewardSource::None => Ok(0),
        RewardSource::Reservoir(reservoir) => Ok(reservoir.balance_of(ledger)),
        RewardSource::Treasury(treasury) => {
            treasury.gatherable(ledger, reward_token, farm_account, now)
        }
    }
}

/// Advances one pool's accumulator to `now`. Idempotent.
///
/// A pool with no deposits only moves its accrual point forward: the
/// skipped span's reward is permanently foregone, not carried over.
pub fn update_pool(
    farm: &mut FarmState,
    ledger: &mut TokenLedger,
    log: &mut EventLog,
    pool_id: PoolId,
    now: u64,
) -> HarvestResult<UpdatePoolResult> {
    let total_weight = farm.total_weight();
    let pool = farm.pool(pool_id)?;

    if now <= pool.last_accrual_block {
        return Ok(UpdatePoolResult::default());
    }
    if pool.total_deposited == 0 {
        farm.pools[pool_id as usize].last_accrual_block = now;
        return Ok(UpdatePoolResult::default());
    }

    let elapsed = now - pool.last_accrual_block;
    let demand = pool_reward(
        elapsed,
        farm.reward_per_block,
        pool.alloc_weight,
        total_weight,
    )?;

    let account = farm.account;
    let reward_token = farm.reward_token;
    let released = pull_reward(
        &mut farm.source,
        ledger,
        log,
        &account,
        &reward_token,
        demand,
        now,
    )?;
    farm.reward_buffer = safe_add(farm.reward_buffer, released)?;

    let accrued = demand.min(farm.reward_buffer);
    farm.reward_buffer -= accrued;

    let dev_cut = percent_of(accrued, DEV_SHARE)?;
    if dev_cut > 0 {
        ledger.transfer(&reward_token, &account, &farm.dev, dev_cut)?;
        log.emit(HarvestEvent::DevFeePaid {
            pool_id,
            dev: farm.dev,
            amount: dev_cut,
            block_height: now,
        });
    }

    let pool = &mut farm.pools[pool_id as usize];
    let user_share = accrued - dev_cut;
    if user_share > 0 {
        let increment = acc_increment(user_share, pool.total_deposited)?;
        pool.acc_reward_per_share = pool
            .acc_reward_per_share
            .checked_add(increment)
            .ok_or(HarvestError::Overflow)?;
    }
    pool.last_accrual_block = now;

    log.emit(HarvestEvent::PoolUpdated {
        pool_id,
        released,
        accrued,
        acc_reward_per_share: pool.acc_reward_per_share,
        block_height: now,
    });

    Ok(UpdatePoolResult {
        released,
        accrued,
        dev_cut,
    })
}

/// Advances every pool in registration order.
pub fn mass_update_pools(
    farm: &mut FarmState,
    ledger: &mut TokenLedger,
    log: &mut EventLog,
    now: u64,
) -> HarvestResult<()> {
    for pool_id in 0..farm.pools.len() as u32 {
        update_pool(farm, ledger, log, pool_id, now)?;
    }
    Ok(())
}

// ============================================================================
// Deposits and withdrawals
// ============================================================================

/// Pays a position's pending reward out of the farm account, capped by
/// the accounted reward balance. Under-funding pays less, silently.
fn settle(
    farm: &FarmState,
    ledger: &mut TokenLedger,
    log: &mut EventLog,
    pool_id: PoolId,
    owner: &Address,
    now: u64,
) -> HarvestResult<u64> {
    let Some(user) = farm.user_info(pool_id, owner) else {
        return Ok(0);
    };
    let acc = farm.pools[pool_id as usize].acc_reward_per_share;
    let pending = pending_amount(user.amount, acc, user.reward_debt)?;
    let pay = pending.min(farm.payable_reward(ledger));
    if pay > 0 {
        ledger.transfer(&farm.reward_token, &farm.account, owner, pay)?;
        log.emit(HarvestEvent::RewardPaid {
            pool_id,
            owner: *owner,
            amount: pay,
            block_height: now,
        });
    }
    Ok(pay)
}

/// Deposits principal into a pool, settling pending reward first.
///
/// A zero-amount deposit is a pure harvest: it settles and resets the
/// reward debt without moving principal.
pub fn deposit(
    farm: &mut FarmState,
    ledger: &mut TokenLedger,
    log: &mut EventLog,
    req: &DepositRequest,
) -> HarvestResult<DepositResult> {
    let deposit_token = farm.pool(req.pool_id)?.deposit_token;

    // validate before any state moves
    let available = ledger.balance_of(&deposit_token, &req.caller);
    if req.amount > available {
        return Err(HarvestError::InsufficientBalance {
            available,
            requested: req.amount,
        });
    }

    update_pool(farm, ledger, log, req.pool_id, req.block_height)?;

    let reward_paid = settle(farm, ledger, log, req.pool_id, &req.caller, req.block_height)?;

    let idx = req.pool_id as usize;
    if req.amount > 0 {
        let account = farm.account;
        ledger.transfer(&deposit_token, &req.caller, &account, req.amount)?;

        let user_idx = farm.ensure_user(req.pool_id, req.caller);
        farm.users[user_idx].amount = safe_add(farm.users[user_idx].amount, req.amount)?;
        farm.pools[idx].total_deposited = safe_add(farm.pools[idx].total_deposited, req.amount)?;
    }

    let acc = farm.pools[idx].acc_reward_per_share;
    let new_amount = match farm.user_index(req.pool_id, &req.caller) {
        Some(user_idx) => {
            let amount = farm.users[user_idx].amount;
            farm.users[user_idx].reward_debt = reward_debt(amount, acc)?;
            amount
        }
        None => 0,
    };

    log.emit(HarvestEvent::Deposited {
        pool_id: req.pool_id,
        owner: req.caller,
        amount: req.amount,
        block_height: req.block_height,
    });
    Ok(DepositResult {
        reward_paid,
        new_amount,
    })
}

/// Withdraws principal from a pool, settling pending reward first.
pub fn withdraw(
    farm: &mut FarmState,
    ledger: &mut TokenLedger,
    log: &mut EventLog,
    req: &WithdrawRequest,
) -> HarvestResult<WithdrawResult> {
    farm.pool(req.pool_id)?;

    // validate before any state moves
    let available = farm
        .user_info(req.pool_id, &req.caller)
        .map(|u| u.amount)
        .unwrap_or(0);
    if req.amount > available {
        return Err(HarvestError::InsufficientBalance {
            available,
            requested: req.amount,
        });
    }

    update_pool(farm, ledger, log, req.pool_id, req.block_height)?;
    let reward_paid = settle(farm, ledger, log, req.pool_id, &req.caller, req.block_height)?;

    let idx = req.pool_id as usize;
    let acc = farm.pools[idx].acc_reward_per_share;
    let remaining = if let Some(user_idx) = farm.user_index(req.pool_id, &req.caller) {
        farm.users[user_idx].amount = safe_sub(farm.users[user_idx].amount, req.amount)?;
        farm.pools[idx].total_deposited = safe_sub(farm.pools[idx].total_deposited, req.amount)?;
        let amount = farm.users[user_idx].amount;
        farm.users[user_idx].reward_debt = reward_debt(amount, acc)?;
        amount
    } else {
        0
    };

    if req.amount > 0 {
        let deposit_token = farm.pools[idx].deposit_token;
        let account = farm.account;
        ledger.transfer(&deposit_token, &account, &req.caller, req.amount)?;
    }

    log.emit(HarvestEvent::Withdrawn {
        pool_id: req.pool_id,
        owner: req.caller,
        amount: req.amount,
        block_height: req.block_height,
    });
    Ok(WithdrawResult {
        reward_paid,
        principal_returned: req.amount,
        remaining,
    })
}

/// Returns the full principal without settling rewards. Accrued-but-
/// unsettled reward is forfeited; the position is zeroed.
pub fn emergency_withdraw(
    farm: &mut FarmState,
    ledger: &mut TokenLedger,
    log: &mut EventLog,
    caller: &Address,
    pool_id: PoolId,
    now: u64,
) -> HarvestResult<EmergencyWithdrawResult> {
    farm.pool(pool_id)?;

    let Some(user_idx) = farm.user_index(pool_id, caller) else {
        return Ok(EmergencyWithdrawResult {
            principal_returned: 0,
            forfeited: 0,
        });
    };

    let idx = pool_id as usize;
    let amount = farm.users[user_idx].amount;
    let acc = farm.pools[idx].acc_reward_per_share;
    let forfeited = pending_amount(amount, acc, farm.users[user_idx].reward_debt)?;

    farm.users[user_idx].amount = 0;
    farm.users[user_idx].reward_debt = 0;
    farm.pools[idx].total_deposited = safe_sub(farm.pools[idx].total_deposited, amount)?;

    let deposit_token = farm.pools[idx].deposit_token;
    let account = farm.account;
    ledger.transfer(&deposit_token, &account, caller, amount)?;

    log.emit(HarvestEvent::EmergencyWithdrawn {
        pool_id,
        owner: *caller,
        amount,
        forfeited,
        block_height: now,
    });
    Ok(EmergencyWithdrawResult {
        principal_returned: amount,
        forfeited,
    })
}

// ============================================================================
// Reads
// ============================================================================

/// Projects what `update_pool` at `now` would leave claimable for one
/// position, without mutating anything. The projection is capped by the
/// buffer plus whatever the source could release right now.
pub fn pending_reward(
    farm: &FarmState,
    ledger: &TokenLedger,
    pool_id: PoolId,
    owner: &Address,
    now: u64,
) -> HarvestResult<u64> {
    let pool = farm.pool(pool_id)?;
    let Some(user) = farm.user_info(pool_id, owner) else {
        return Ok(0);
    };

    let mut acc = pool.acc_reward_per_share;
    if now > pool.last_accrual_block && pool.total_deposited > 0 {
        let demand = pool_reward(
            now - pool.last_accrual_block,
            farm.reward_per_block,
            pool.alloc_weight,
            farm.total_weight(),
        )?;
        let available = safe_add(
            farm.reward_buffer,
            source_available(&farm.source, ledger, &farm.reward_token, &farm.account, now)?,
        )?;
        let accrued = demand.min(available);
        let user_share = accrued - percent_of(accrued, DEV_SHARE)?;
        if user_share > 0 {
            acc = acc
                .checked_add(acc_increment(user_share, pool.total_deposited)?)
                .ok_or(HarvestError::Overflow)?;
        }
    }

    pending_amount(user.amount, acc, user.reward_debt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::token::ONE;
    use crate::types::account_from_tag;

    fn reward_token() -> TokenId {
        account_from_tag(0xF0)
    }

    fn lp_token_1() -> TokenId {
        account_from_tag(0xA1)
    }

    fn lp_token_2() -> TokenId {
        account_from_tag(0xA2)
    }

    fn owner() -> Address {
        account_from_tag(1)
    }

    fn dev() -> Address {
        account_from_tag(2)
    }

    fn user() -> Address {
        account_from_tag(3)
    }

    fn farm_account() -> Address {
        account_from_tag(20)
    }

    fn reservoir_account() -> Address {
        account_from_tag(10)
    }

    /// Farm with 60/40-weight pools, reservoir funded with 5 tokens,
    /// user holding 1000 of each LP token.
    fn setup() -> (FarmState, TokenLedger, EventLog) {
        let mut farm = FarmState::new(farm_account(), owner(), dev(), reward_token(), ONE, 0);
        let mut ledger = TokenLedger::new();
        let mut log = EventLog::new();

        let reservoir = Reservoir::new(reservoir_account(), reward_token(), farm_account());
        ledger
            .mint(reward_token(), reservoir_account(), 5 * ONE)
            .unwrap();
        set_reward_source(
            &mut farm,
            &mut log,
            &owner(),
            RewardSource::Reservoir(reservoir),
            0,
        )
        .unwrap();

        ledger.mint(lp_token_1(), user(), 1_000 * ONE).unwrap();
        ledger.mint(lp_token_2(), user(), 1_000 * ONE).unwrap();

        for (weight, token) in [(60, lp_token_1()), (40, lp_token_2())] {
            add_pool(
                &mut farm,
                &mut ledger,
                &mut log,
                &AddPoolRequest {
                    caller: owner(),
                    weight,
                    deposit_token: token,
                    with_update: false,
                    block_height: 0,
                },
            )
            .unwrap();
        }

        (farm, ledger, log)
    }

    #[test]
    fn test_add_pool_owner_only() {
        let (mut farm, mut ledger, mut log) = setup();
        let err = add_pool(
            &mut farm,
            &mut ledger,
            &mut log,
            &AddPoolRequest {
                caller: user(),
                weight: 40,
                deposit_token: account_from_tag(0xA3),
                with_update: false,
                block_height: 0,
            },
        )
        .unwrap_err();
        assert!(matches!(err, HarvestError::Unauthorized { .. }));
        assert_eq!(farm.pool_length(), 2);
    }

    #[test]
    fn test_add_pool_validation() {
        let (mut farm, mut ledger, mut log) = setup();

        // zero weight
        assert!(matches!(
            add_pool(
                &mut farm,
                &mut ledger,
                &mut log,
                &AddPoolRequest {
                    caller: owner(),
                    weight: 0,
                    deposit_token: lp_token_2(),
                    with_update: false,
                    block_height: 0,
                },
            )
            .unwrap_err(),
            HarvestError::InvalidConfiguration { param: "weight", .. }
        ));

        // duplicate principal
        assert!(matches!(
            add_pool(
                &mut farm,
                &mut ledger,
                &mut log,
                &AddPoolRequest {
                    caller: owner(),
                    weight: 40,
                    deposit_token: lp_token_1(),
                    with_update: false,
                    block_height: 0,
                },
            )
            .unwrap_err(),
            HarvestError::InvalidConfiguration { param: "deposit_token", .. }
        ));

        // reward token as principal
        assert!(matches!(
            add_pool(
                &mut farm,
                &mut ledger,
                &mut log,
                &AddPoolRequest {
                    caller: owner(),
                    weight: 40,
                    deposit_token: reward_token(),
                    with_update: false,
                    block_height: 0,
                },
            )
            .unwrap_err(),
            HarvestError::InvalidConfiguration { param: "deposit_token", .. }
        ));
    }

    #[test]
    fn test_set_weight_owner_only_and_missing_pool() {
        let (mut farm, mut ledger, mut log) = setup();

        assert!(matches!(
            set_weight(
                &mut farm,
                &mut ledger,
                &mut log,
                &SetWeightRequest {
                    caller: user(),
                    pool_id: 0,
                    weight: 40,
                    with_update: true,
                    block_height: 1,
                },
            )
            .unwrap_err(),
            HarvestError::Unauthorized { .. }
        ));

        assert_eq!(
            set_weight(
                &mut farm,
                &mut ledger,
                &mut log,
                &SetWeightRequest {
                    caller: owner(),
                    pool_id: 7,
                    weight: 40,
                    with_update: false,
                    block_height: 1,
                },
            )
            .unwrap_err(),
            HarvestError::PoolNotFound { pool_id: 7 }
        );

        set_weight(
            &mut farm,
            &mut ledger,
            &mut log,
            &SetWeightRequest {
                caller: owner(),
                pool_id: 0,
                weight: 40,
                with_update: true,
                block_height: 1,
            },
        )
        .unwrap();
        assert_eq!(farm.pools[0].alloc_weight, 40);
    }

    #[test]
    fn test_update_pool_is_idempotent_at_same_block() {
        let (mut farm, mut ledger, mut log) = setup();
        deposit(
            &mut farm,
            &mut ledger,
            &mut log,
            &DepositRequest {
                caller: user(),
                pool_id: 0,
                amount: 1_000 * ONE,
                block_height: 0,
            },
        )
        .unwrap();

        let first = update_pool(&mut farm, &mut ledger, &mut log, 0, 4).unwrap();
        assert!(first.accrued > 0);
        let again = update_pool(&mut farm, &mut ledger, &mut log, 0, 4).unwrap();
        assert_eq!(again, UpdatePoolResult::default());
    }

    #[test]
    fn test_empty_pool_forfeits_idle_reward() {
        let (mut farm, mut ledger, mut log) = setup();

        // nobody deposited; ten blocks pass
        let res = update_pool(&mut farm, &mut ledger, &mut log, 0, 10).unwrap();
        assert_eq!(res, UpdatePoolResult::default());
        assert_eq!(farm.pools[0].last_accrual_block, 10);
        assert_eq!(farm.pools[0].acc_reward_per_share, 0);

        // the first depositor after the gap earns nothing for it
        deposit(
            &mut farm,
            &mut ledger,
            &mut log,
            &DepositRequest {
                caller: user(),
                pool_id: 0,
                amount: 1_000 * ONE,
                block_height: 10,
            },
        )
        .unwrap();
        assert_eq!(
            pending_reward(&farm, &ledger, 0, &user(), 10).unwrap(),
            0
        );
        // and the reservoir was never drained for the idle span
        assert_eq!(ledger.balance_of(&reward_token(), &reservoir_account()), 5 * ONE);
    }

    #[test]
    fn test_deposit_and_harvest_single_pool() {
        let (mut farm, mut ledger, mut log) = setup();
        deposit(
            &mut farm,
            &mut ledger,
            &mut log,
            &DepositRequest {
                caller: user(),
                pool_id: 0,
                amount: 1_000 * ONE,
                block_height: 0,
            },
        )
        .unwrap();
        assert_eq!(ledger.balance_of(&lp_token_1(), &user()), 0);

        // harvest via zero deposit after 4 blocks: 4 * 1 * 60% = 2.4,
        // of which 90% to the user and 10% to dev
        let res = deposit(
            &mut farm,
            &mut ledger,
            &mut log,
            &DepositRequest {
                caller: user(),
                pool_id: 0,
                amount: 0,
                block_height: 4,
            },
        )
        .unwrap();
        assert_eq!(res.reward_paid, 216_000_000);
        assert_eq!(ledger.balance_of(&reward_token(), &user()), 216_000_000);
        assert_eq!(ledger.balance_of(&reward_token(), &dev()), 24_000_000);
        assert_eq!(
            ledger.balance_of(&reward_token(), &reservoir_account()),
            5 * ONE - 240_000_000
        );
    }

    #[test]
    fn test_deposit_validates_amount_first() {
        let (mut farm, mut ledger, mut log) = setup();
        deposit(
            &mut farm,
            &mut ledger,
            &mut log,
            &DepositRequest {
                caller: user(),
                pool_id: 0,
                amount: 1_000 * ONE,
                block_height: 0,
            },
        )
        .unwrap();

        // wallet is empty now; an oversized deposit blocks later must
        // not accrue, settle, or drain anything before failing
        let err = deposit(
            &mut farm,
            &mut ledger,
            &mut log,
            &DepositRequest {
                caller: user(),
                pool_id: 0,
                amount: ONE,
                block_height: 4,
            },
        )
        .unwrap_err();
        assert_eq!(
            err,
            HarvestError::InsufficientBalance {
                available: 0,
                requested: ONE,
            }
        );
        assert_eq!(farm.pools[0].acc_reward_per_share, 0);
        assert_eq!(farm.pools[0].last_accrual_block, 0);
        assert_eq!(ledger.balance_of(&reward_token(), &reservoir_account()), 5 * ONE);
        assert_eq!(ledger.balance_of(&reward_token(), &user()), 0);
        assert_eq!(ledger.balance_of(&reward_token(), &dev()), 0);
    }

    #[test]
    fn test_withdraw_validates_amount_first() {
        let (mut farm, mut ledger, mut log) = setup();
        deposit(
            &mut farm,
            &mut ledger,
            &mut log,
            &DepositRequest {
                caller: user(),
                pool_id: 0,
                amount: 100 * ONE,
                block_height: 0,
            },
        )
        .unwrap();

        let acc_before = farm.pools[0].acc_reward_per_share;
        let err = withdraw(
            &mut farm,
            &mut ledger,
            &mut log,
            &WithdrawRequest {
                caller: user(),
                pool_id: 0,
                amount: 200 * ONE,
                block_height: 5,
            },
        )
        .unwrap_err();
        assert_eq!(
            err,
            HarvestError::InsufficientBalance {
                available: 100 * ONE,
                requested: 200 * ONE,
            }
        );
        // the failed call mutated nothing
        assert_eq!(farm.pools[0].acc_reward_per_share, acc_before);
        assert_eq!(farm.pools[0].total_deposited, 100 * ONE);
    }

    #[test]
    fn test_emergency_withdraw_forfeits_reward() {
        let (mut farm, mut ledger, mut log) = setup();
        deposit(
            &mut farm,
            &mut ledger,
            &mut log,
            &DepositRequest {
                caller: user(),
                pool_id: 0,
                amount: 1_000 * ONE,
                block_height: 0,
            },
        )
        .unwrap();

        let res =
            emergency_withdraw(&mut farm, &mut ledger, &mut log, &user(), 0, 3).unwrap();
        assert_eq!(res.principal_returned, 1_000 * ONE);
        // no settlement happened
        assert_eq!(ledger.balance_of(&reward_token(), &user()), 0);
        assert_eq!(ledger.balance_of(&lp_token_1(), &user()), 1_000 * ONE);

        let info = farm.user_info(0, &user()).unwrap();
        assert_eq!(info.amount, 0);
        assert_eq!(info.reward_debt, 0);
        assert_eq!(farm.pools[0].total_deposited, 0);
    }

    #[test]
    fn test_update_dev_permission() {
        let (mut farm, _, mut log) = setup();
        let next = account_from_tag(9);

        assert!(matches!(
            update_dev(&mut farm, &mut log, &user(), next, 1).unwrap_err(),
            HarvestError::Unauthorized { .. }
        ));
        update_dev(&mut farm, &mut log, &dev(), next, 1).unwrap();
        assert_eq!(farm.dev, next);
    }

    #[test]
    fn test_transfer_ownership() {
        let (mut farm, _, mut log) = setup();
        let next = account_from_tag(9);

        assert!(transfer_ownership(&mut farm, &mut log, &user(), next, 1).is_err());
        transfer_ownership(&mut farm, &mut log, &owner(), next, 1).unwrap();
        assert_eq!(farm.ownership.owner, next);
    }

    #[test]
    fn test_set_reward_source_must_feed_farm() {
        let (mut farm, _, mut log) = setup();

        // reservoir pointing at someone else
        let stray = Reservoir::new(reservoir_account(), reward_token(), account_from_tag(99));
        assert!(matches!(
            set_reward_source(
                &mut farm,
                &mut log,
                &owner(),
                RewardSource::Reservoir(stray),
                1,
            )
            .unwrap_err(),
            HarvestError::InvalidConfiguration { param: "source", .. }
        ));

        // treasury without an entry for the farm
        let treasury = Treasury::new(account_from_tag(11), owner());
        assert!(matches!(
            set_reward_source(
                &mut farm,
                &mut log,
                &owner(),
                RewardSource::Treasury(treasury),
                1,
            )
            .unwrap_err(),
            HarvestError::InvalidConfiguration { param: "source", .. }
        ));
    }

    #[test]
    fn test_detached_source_releases_nothing() {
        let (mut farm, mut ledger, mut log) = setup();
        set_reward_source(&mut farm, &mut log, &owner(), RewardSource::None, 0).unwrap();

        deposit(
            &mut farm,
            &mut ledger,
            &mut log,
            &DepositRequest {
                caller: user(),
                pool_id: 0,
                amount: 1_000 * ONE,
                block_height: 0,
            },
        )
        .unwrap();

        assert_eq!(pending_reward(&farm, &ledger, 0, &user(), 4).unwrap(), 0);
        let res = update_pool(&mut farm, &mut ledger, &mut log, 0, 4).unwrap();
        assert_eq!(res.accrued, 0);
        // the accrual point still advances
        assert_eq!(farm.pools[0].last_accrual_block, 4);
    }

    #[test]
    fn test_start_block_delays_accrual() {
        let mut farm = FarmState::new(farm_account(), owner(), dev(), reward_token(), ONE, 100);
        let mut ledger = TokenLedger::new();
        let mut log = EventLog::new();

        let reservoir = Reservoir::new(reservoir_account(), reward_token(), farm_account());
        ledger
            .mint(reward_token(), reservoir_account(), 5 * ONE)
            .unwrap();
        set_reward_source(
            &mut farm,
            &mut log,
            &owner(),
            RewardSource::Reservoir(reservoir),
            0,
        )
        .unwrap();
        ledger.mint(lp_token_1(), user(), 1_000 * ONE).unwrap();

        add_pool(
            &mut farm,
            &mut ledger,
            &mut log,
            &AddPoolRequest {
                caller: owner(),
                weight: 60,
                deposit_token: lp_token_1(),
                with_update: false,
                block_height: 10,
            },
        )
        .unwrap();
        // accrual starts at the start block, not the registration block
        assert_eq!(farm.pools[0].last_accrual_block, 100);

        deposit(
            &mut farm,
            &mut ledger,
            &mut log,
            &DepositRequest {
                caller: user(),
                pool_id: 0,
                amount: 1_000 * ONE,
                block_height: 50,
            },
        )
        .unwrap();
        assert_eq!(pending_reward(&farm, &ledger, 0, &user(), 100).unwrap(), 0);
        assert!(pending_reward(&farm, &ledger, 0, &user(), 101).unwrap() > 0);
    }
}
