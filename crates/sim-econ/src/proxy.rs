use rand::Rng;
use rand_distr::{Distribution, Normal};
use tracing::debug;

use crate::EconError;

/// How many of the most recent periods feed the sales average.
pub const PROXY_WINDOW: usize = 3;
/// Weight kept on the previous proxy value.
pub const PROXY_SMOOTHING: f64 = 0.7;
const SALES_WEIGHT: f64 = 0.3;
/// Std of the noise injected on every update.
pub const PROXY_NOISE_STD: f64 = 3.0;

/// Blend the current proxy with the mean of the last [`PROXY_WINDOW`] sales.
///
/// `noise` is the already-drawn perturbation, which keeps this function
/// deterministic. An empty history carries no information, so the current
/// proxy stands in for the sales mean.
pub fn blend_proxy(current: f64, recent_sales: &[u32], noise: f64) -> f64 {
    let start = recent_sales.len().saturating_sub(PROXY_WINDOW);
    let window = &recent_sales[start..];
    let mean = if window.is_empty() {
        current
    } else {
        window.iter().map(|&s| s as f64).sum::<f64>() / window.len() as f64
    };
    (PROXY_SMOOTHING * current + SALES_WEIGHT * mean + noise).max(0.0)
}

/// Public, noise-corrupted "market temperature" seen by player and advisor.
#[derive(Clone, Debug)]
pub struct ProxyTracker {
    value: f64,
    noise: Normal<f64>,
}

impl ProxyTracker {
    pub fn new(initial: f64) -> Result<Self, EconError> {
        Self::with_noise(initial, PROXY_NOISE_STD)
    }

    pub fn with_noise(initial: f64, std: f64) -> Result<Self, EconError> {
        if !(std.is_finite() && std >= 0.0) {
            return Err(EconError::InvalidNoise { what: "proxy", std });
        }
        let noise = Normal::new(0.0, std)
            .map_err(|_| EconError::InvalidNoise { what: "proxy", std })?;
        Ok(Self {
            value: initial.max(0.0),
            noise,
        })
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    /// Fold the latest sales history into the proxy. Draws one noise sample.
    pub fn update<R: Rng + ?Sized>(&mut self, recent_sales: &[u32], rng: &mut R) -> f64 {
        let noise = self.noise.sample(rng);
        let prev = self.value;
        self.value = blend_proxy(prev, recent_sales, noise);
        debug!(prev, next = self.value, noise, "proxy update");
        self.value
    }
}
