#![deny(warnings)]

//! Stochastic market for AI Tycoon.
//!
//! This crate owns every consumer of the session's random stream:
//! - Market event draws from a fixed categorical table
//! - The hidden demand process and its period-over-period drift
//! - The noisy public proxy of recent sales
//!
//! All functions take the RNG explicitly so a seeded stream yields a fixed
//! trajectory.

mod events;
mod market;
mod proxy;

pub use events::draw_event;
pub use market::MarketEngine;
pub use proxy::{blend_proxy, ProxyTracker, PROXY_NOISE_STD, PROXY_SMOOTHING, PROXY_WINDOW};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use thiserror::Error;

/// RNG used for a whole session.
pub type SimRng = ChaCha8Rng;

/// Build the session RNG from a seed.
pub fn seeded_rng(seed: u64) -> SimRng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Errors produced when building market components.
#[derive(Debug, Error, PartialEq)]
pub enum EconError {
    /// Gaussian noise needs a finite, non-negative standard deviation.
    #[error("invalid noise std for {what}: {std}")]
    InvalidNoise { what: &'static str, std: f64 },
}
