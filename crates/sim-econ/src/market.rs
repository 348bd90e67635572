use rand::Rng;
use rand_distr::{Distribution, Normal};
use sim_core::{MarketEvent, MarketParams};
use tracing::debug;

use crate::EconError;

fn normal(what: &'static str, std: f64) -> Result<Normal<f64>, EconError> {
    if !(std.is_finite() && std >= 0.0) {
        return Err(EconError::InvalidNoise { what, std });
    }
    Normal::new(0.0, std).map_err(|_| EconError::InvalidNoise { what, std })
}

/// The hidden demand process.
///
/// Holds the true parameters and the drifting baseline. Nothing outside this
/// type reads the baseline except [`MarketEngine::hidden_base_demand`], which
/// exists for post-game reporting.
#[derive(Clone, Debug)]
pub struct MarketEngine {
    params: MarketParams,
    base_demand: f64,
    drift_noise: Normal<f64>,
    demand_noise: Normal<f64>,
}

impl MarketEngine {
    pub fn new(params: MarketParams) -> Result<Self, EconError> {
        let drift_noise = normal("drift_std", params.drift_std)?;
        let demand_noise = normal("noise_std", params.noise_std)?;
        Ok(Self {
            base_demand: params.base_demand,
            params,
            drift_noise,
            demand_noise,
        })
    }

    /// Advance the baseline by one period: `base + drift + N(0, drift_std)`,
    /// floored at `base_floor`.
    pub fn drift<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let shock = self.drift_noise.sample(rng);
        self.base_demand = (self.base_demand + self.params.demand_drift + shock)
            .max(self.params.base_floor);
        debug!(base_demand = self.base_demand, shock, "market drift");
    }

    /// Latent mean demand before observation noise.
    pub fn expected_demand(
        &self,
        price: f64,
        ad_spend: f64,
        event: &MarketEvent,
        inventory_available: u32,
    ) -> f64 {
        let p = &self.params;
        self.base_demand + event.base_shock
            - p.price_sensitivity * price * (1.0 + event.price_shock)
            + p.ad_effect * ad_spend.ln_1p() * (1.0 + event.ad_shock)
            + p.availability_boost * inventory_available as f64
    }

    /// Realize true, uncensored demand for the period.
    ///
    /// The caller caps this at available inventory to get units sold.
    pub fn realize_demand<R: Rng + ?Sized>(
        &self,
        price: f64,
        ad_spend: f64,
        event: &MarketEvent,
        inventory_available: u32,
        rng: &mut R,
    ) -> u32 {
        let mu = self.expected_demand(price, ad_spend, event, inventory_available);
        let demand = (mu + self.demand_noise.sample(rng)).max(0.0);
        // Round half up.
        let units = (demand + 0.5).floor() as u32;
        debug!(mu, units, event = event.name(), "realized demand");
        units
    }

    pub fn hidden_base_demand(&self) -> f64 {
        self.base_demand
    }
}
