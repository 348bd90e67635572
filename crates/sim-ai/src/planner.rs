use serde::Serialize;
use sim_core::{
    validate_economics, validate_grid, Action, GridSpec, MarketEvent, UnitEconomics,
    ValidationError,
};
use tracing::debug;

use crate::DemandModel;

/// Public inputs the advisor plans against.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlanContext {
    /// Units on hand before this period's production.
    pub current_inventory: u32,
    pub base_proxy: f64,
    pub event_ad_mult: f64,
    pub event_price_mult: f64,
}

impl PlanContext {
    pub fn for_event(current_inventory: u32, base_proxy: f64, event: &MarketEvent) -> Self {
        Self {
            current_inventory,
            base_proxy,
            event_ad_mult: event.ad_shock,
            event_price_mult: event.price_shock,
        }
    }
}

/// A candidate plan and what the model expects it to earn.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PlanEstimate {
    pub action: Action,
    /// Predicted demand rounded and capped at available inventory.
    pub predicted_sales: u32,
    pub predicted_profit: f64,
}

/// Strategy that turns the advisor's model into a recommended plan.
///
/// Implementations must not draw from the session RNG.
pub trait PlanSearch {
    fn plan(&self, model: &DemandModel, ctx: &PlanContext) -> PlanEstimate;

    fn suggest(&self, model: &DemandModel, ctx: &PlanContext) -> Action {
        self.plan(model, ctx).action
    }
}

/// Exhaustive search over a fixed grid of (price, ad spend, production).
///
/// Enumerates price, then ad spend, then production, all ascending. Only a
/// strictly better profit replaces the incumbent, so the first point found
/// wins ties.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GridSearch {
    grid: GridSpec,
    economics: UnitEconomics,
}

impl GridSearch {
    pub fn new(grid: GridSpec, economics: UnitEconomics) -> Result<Self, ValidationError> {
        validate_grid(&grid)?;
        validate_economics(&economics)?;
        Ok(Self { grid, economics })
    }

    pub fn grid(&self) -> &GridSpec {
        &self.grid
    }

    /// Model-predicted outcome of a single plan.
    pub fn estimate(&self, model: &DemandModel, ctx: &PlanContext, action: Action) -> PlanEstimate {
        let available = ctx.current_inventory.saturating_add(action.production);
        let demand_hat = model.predict(
            action.price,
            action.ad_spend,
            ctx.base_proxy,
            available,
            ctx.event_ad_mult,
            ctx.event_price_mult,
        );
        let can_sell = (demand_hat.round() as u32).min(available);
        let revenue = can_sell as f64 * action.price;
        let cost = action.production as f64 * self.economics.unit_cost
            + action.ad_spend
            + self.economics.fixed_cost;
        PlanEstimate {
            action,
            predicted_sales: can_sell,
            predicted_profit: revenue - cost,
        }
    }
}

impl PlanSearch for GridSearch {
    fn plan(&self, model: &DemandModel, ctx: &PlanContext) -> PlanEstimate {
        // The origin is the first point visited, so seeding with it keeps
        // first-found-wins and leaves nothing to fall back on.
        let mut best = self.estimate(model, ctx, self.grid.origin());
        for price in self.grid.prices() {
            for ad_spend in self.grid.ad_spends() {
                for production in self.grid.productions() {
                    let est = self.estimate(model, ctx, Action::new(price, ad_spend, production));
                    if est.predicted_profit > best.predicted_profit {
                        best = est;
                    }
                }
            }
        }
        debug!(
            price = best.action.price,
            ad_spend = best.action.ad_spend,
            production = best.action.production,
            profit = best.predicted_profit,
            "grid search result"
        );
        best
    }
}
