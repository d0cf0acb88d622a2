//! Mathematical Utilities for the Harvest Engine
//!
//! Safe math operations and the fixed-point arithmetic behind the
//! reward accumulator and vault share conversion. All intermediate
//! products widen to u128 before dividing.

use crate::constants::precision::{ACC_PRECISION, PERCENT_DENOMINATOR};
use crate::errors::{HarvestError, HarvestResult};

/// Safe addition with overflow check
pub fn safe_add(a: u64, b: u64) -> HarvestResult<u64> {
    a.checked_add(b).ok_or(HarvestError::Overflow)
}

/// Safe subtraction with underflow check
pub fn safe_sub(a: u64, b: u64) -> HarvestResult<u64> {
    a.checked_sub(b).ok_or(HarvestError::Underflow)
}

/// Computes `a * b / denom` with a widened intermediate.
pub fn mul_div(a: u64, b: u64, denom: u64) -> HarvestResult<u64> {
    if denom == 0 {
        return Err(HarvestError::DivisionByZero);
    }
    let wide = (a as u128)
        .checked_mul(b as u128)
        .ok_or(HarvestError::Overflow)?
        / denom as u128;
    u64::try_from(wide).map_err(|_| HarvestError::Overflow)
}

/// Applies a percentage expressed in parts per 100_000.
pub fn percent_of(amount: u64, percent: u64) -> HarvestResult<u64> {
    mul_div(amount, percent, PERCENT_DENOMINATOR)
}

/// Reward owed to one pool for an elapsed span.
///
/// `elapsed * rate * weight / total_weight`. A zero total weight means
/// no pool is eligible, so the reward is zero rather than an error.
pub fn pool_reward(elapsed: u64, rate: u64, weight: u64, total_weight: u64) -> HarvestResult<u64> {
    if total_weight == 0 || weight == 0 {
        return Ok(0);
    }
    let span = (elapsed as u128)
        .checked_mul(rate as u128)
        .ok_or(HarvestError::Overflow)?;
    let share = span
        .checked_mul(weight as u128)
        .ok_or(HarvestError::Overflow)?
        / total_weight as u128;
    u64::try_from(share).map_err(|_| HarvestError::Overflow)
}

/// Accumulator increment for a reward distributed over `total_deposited`
/// units of principal, scaled by `ACC_PRECISION`.
pub fn acc_increment(reward: u64, total_deposited: u64) -> HarvestResult<u128> {
    if total_deposited == 0 {
        return Err(HarvestError::DivisionByZero);
    }
    Ok((reward as u128)
        .checked_mul(ACC_PRECISION)
        .ok_or(HarvestError::Overflow)?
        / total_deposited as u128)
}

/// Snapshot of `amount * acc / ACC_PRECISION`, the reward-debt value.
pub fn reward_debt(amount: u64, acc_reward_per_share: u128) -> HarvestResult<u64> {
    let wide = (amount as u128)
        .checked_mul(acc_reward_per_share)
        .ok_or(HarvestError::Overflow)?
        / ACC_PRECISION;
    u64::try_from(wide).map_err(|_| HarvestError::Overflow)
}

/// Newly accrued reward for a position: the accumulator value minus the
/// stored debt. Non-negative whenever the accumulator is monotone.
pub fn pending_amount(amount: u64, acc_reward_per_share: u128, debt: u64) -> HarvestResult<u64> {
    let earned = reward_debt(amount, acc_reward_per_share)?;
    earned.checked_sub(debt).ok_or(HarvestError::Underflow)
}

/// Shares minted for a vault deposit.
///
/// Bootstraps 1:1 while the vault is empty; otherwise proportional to
/// the current share price.
pub fn shares_for_deposit(amount: u64, total_shares: u64, pool_balance: u64) -> HarvestResult<u64> {
    if total_shares == 0 || pool_balance == 0 {
        return Ok(amount);
    }
    mul_div(amount, total_shares, pool_balance)
}

/// Tokens redeemed when burning vault shares.
pub fn tokens_for_shares(shares: u64, pool_balance: u64, total_shares: u64) -> HarvestResult<u64> {
    mul_div(shares, pool_balance, total_shares)
}
