//! Harvest Common Library
//!
//! Yield-distribution accounting engine: shared types, constants, and
//! the state-transition logic for every Harvest component.
//!
//! All state lives in plain structs and every operation is an explicit
//! transition over them. Nothing here reads a clock or touches I/O:
//! callers inject the current block height into each call, which makes
//! every path deterministic and directly testable.
//!
//! ## Components
//!
//! - **Farming Pool**: weighted multi-pool reward accumulator with
//!   lazy per-block accrual and a routed dev share
//! - **Reservoir**: capped reward reserve with a single authorized
//!   spender; shortfalls cap, they never error
//! - **Treasury**: time-gated percentage drip over a shared balance
//! - **Staking Vault**: share-based pool where donations raise the
//!   redemption price of existing shares
//! - **Token Ledger**: minimal multi-asset balance table backing all
//!   of the above
//!
//! This crate is `no_std` compatible for WASM compilation when built
//! with the `no_std` feature enabled.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

// Re-export Vec for submodules based on feature
#[cfg(not(feature = "std"))]
pub use alloc::vec::Vec;
#[cfg(feature = "std")]
pub use std::vec::Vec;

pub mod constants;
pub mod errors;
pub mod types;
pub mod math;
pub mod events;
pub mod access;
pub mod token_ops;
pub mod reservoir;
pub mod treasury;
pub mod farming;
pub mod vault;


// Re-exports for convenience
pub use constants::*;
pub use errors::*;
pub use types::*;
pub use math::*;
pub use events::*;
pub use access::*;
pub use token_ops::*;
pub use reservoir::*;
pub use treasury::*;
pub use farming::*;
pub use vault::*;
