#![deny(warnings)]

//! Core domain models and invariants for AI Tycoon.
//!
//! This crate defines the serializable types shared by the market engine,
//! the advisor and the session runtime, with validation helpers that guard
//! the configuration before a session starts.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lowest price a player may set.
pub const PRICE_MIN: f64 = 9.0;
/// Highest price a player may set.
pub const PRICE_MAX: f64 = 40.0;
/// Highest advertising spend a player may set.
pub const AD_SPEND_MAX: f64 = 10_000.0;
/// Highest production run a player may order in one period.
pub const PRODUCTION_MAX: u32 = 200;

/// Operating plan for one period.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Sale price per unit.
    pub price: f64,
    /// Advertising spend for the period.
    pub ad_spend: f64,
    /// Units to produce (added to inventory before sales).
    pub production: u32,
}

impl Action {
    pub fn new(price: f64, ad_spend: f64, production: u32) -> Self {
        Self {
            price,
            ad_spend,
            production,
        }
    }

    /// Whether every field lies inside the player-facing domain.
    pub fn in_domain(&self) -> bool {
        (PRICE_MIN..=PRICE_MAX).contains(&self.price)
            && (0.0..=AD_SPEND_MAX).contains(&self.ad_spend)
            && self.production <= PRODUCTION_MAX
    }

    /// Clamp every field into the player-facing domain.
    pub fn clamped(&self) -> Action {
        Action {
            price: self.price.clamp(PRICE_MIN, PRICE_MAX),
            ad_spend: self.ad_spend.clamp(0.0, AD_SPEND_MAX),
            production: self.production.min(PRODUCTION_MAX),
        }
    }

    /// Replace fields with the player's values, each clamped to its domain.
    ///
    /// Missing or non-finite values keep the field from `self`.
    pub fn with_override(&self, ov: &ActionOverride) -> Action {
        let price = ov
            .price
            .filter(|p| p.is_finite())
            .map(|p| p.clamp(PRICE_MIN, PRICE_MAX))
            .unwrap_or(self.price);
        let ad_spend = ov
            .ad_spend
            .filter(|a| a.is_finite())
            .map(|a| a.clamp(0.0, AD_SPEND_MAX))
            .unwrap_or(self.ad_spend);
        let production = ov
            .production
            .map(|p| p.clamp(0, PRODUCTION_MAX as i64) as u32)
            .unwrap_or(self.production);
        Action {
            price,
            ad_spend,
            production,
        }
    }
}

/// Player-supplied replacement values for a suggested [`Action`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionOverride {
    /// Replacement unit price, clamped to the price range.
    pub price: Option<f64>,
    /// Replacement advertising spend, clamped to the ad range.
    pub ad_spend: Option<f64>,
    /// Signed so that negative input can be clamped rather than rejected.
    pub production: Option<i64>,
}

impl ActionOverride {
    pub fn is_empty(&self) -> bool {
        self.price.is_none() && self.ad_spend.is_none() && self.production.is_none()
    }
}

/// Kinds of market events that can hit a period.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// Product goes viral.
    ViralTrend,
    /// A competitor enters the market.
    NewCompetitor,
    /// Good news on the supply side.
    SupplyNews,
    /// Economy-wide downturn.
    MacroSlump,
    /// Nothing happens.
    Quiet,
}

impl EventKind {
    /// Human-readable label shown to the player.
    pub fn label(self) -> &'static str {
        match self {
            EventKind::ViralTrend => "Viral Trend",
            EventKind::NewCompetitor => "New Competitor",
            EventKind::SupplyNews => "Supply News (positive)",
            EventKind::MacroSlump => "Macro Slump",
            EventKind::Quiet => "Nothing Special",
        }
    }

    /// Shocks as `(base, ad, price)`.
    pub fn shocks(self) -> (f64, f64, f64) {
        match self {
            EventKind::ViralTrend => (20.0, 0.50, -0.10),
            EventKind::NewCompetitor => (-15.0, -0.10, 0.25),
            EventKind::SupplyNews => (5.0, 0.05, -0.05),
            EventKind::MacroSlump => (-10.0, -0.10, 0.15),
            EventKind::Quiet => (0.0, 0.0, 0.0),
        }
    }
}

/// Cumulative probability thresholds for the non-quiet events, in draw order.
/// Any draw at or above the last threshold is [`EventKind::Quiet`].
pub const EVENT_THRESHOLDS: [(f64, EventKind); 4] = [
    (0.10, EventKind::ViralTrend),
    (0.20, EventKind::NewCompetitor),
    (0.30, EventKind::SupplyNews),
    (0.40, EventKind::MacroSlump),
];

/// A period's market event and the shocks it applies.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarketEvent {
    pub kind: EventKind,
    /// Additive offset on baseline demand.
    pub base_shock: f64,
    /// Relative change in advertising effectiveness.
    pub ad_shock: f64,
    /// Relative change in price sensitivity.
    pub price_shock: f64,
}

impl MarketEvent {
    pub fn of(kind: EventKind) -> Self {
        let (base_shock, ad_shock, price_shock) = kind.shocks();
        Self {
            kind,
            base_shock,
            ad_shock,
            price_shock,
        }
    }

    /// The no-op event: every shock is zero.
    pub fn neutral() -> Self {
        Self::of(EventKind::Quiet)
    }

    pub fn name(&self) -> &'static str {
        self.kind.label()
    }
}

/// Hidden parameters of the true demand process.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketParams {
    /// Starting latent baseline demand.
    pub base_demand: f64,
    /// Demand lost per currency unit of price.
    pub price_sensitivity: f64,
    /// Demand gained per log-currency of advertising.
    pub ad_effect: f64,
    /// Mean per-period change of the baseline.
    pub demand_drift: f64,
    /// Std of the per-period baseline random walk.
    pub drift_std: f64,
    /// Std of the observation noise on realized demand.
    pub noise_std: f64,
    /// Lower bound on the baseline after drift.
    pub base_floor: f64,
    /// Conversion lift per unit of inventory on hand.
    pub availability_boost: f64,
}

impl Default for MarketParams {
    fn default() -> Self {
        Self {
            base_demand: 60.0,
            price_sensitivity: 1.4,
            ad_effect: 9.0,
            demand_drift: 0.2,
            drift_std: 0.8,
            noise_std: 6.0,
            base_floor: 5.0,
            availability_boost: 0.08,
        }
    }
}

/// Weights of the advisor's linear demand model.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DemandWeights {
    /// Intercept (w0).
    pub bias: f64,
    /// Weight on the negated, event-adjusted price.
    pub price: f64,
    /// Weight on event-adjusted log advertising.
    pub ad: f64,
    /// Weight on the public demand proxy.
    pub base_proxy: f64,
    /// Weight on units available for sale.
    pub inventory: f64,
}

impl DemandWeights {
    pub fn to_array(self) -> [f64; 5] {
        [self.bias, self.price, self.ad, self.base_proxy, self.inventory]
    }

    pub fn from_array(w: [f64; 5]) -> Self {
        Self {
            bias: w[0],
            price: w[1],
            ad: w[2],
            base_proxy: w[3],
            inventory: w[4],
        }
    }
}

impl Default for DemandWeights {
    /// A rough analyst's guess used as the starting point.
    fn default() -> Self {
        Self {
            bias: 40.0,
            price: 1.0,
            ad: 8.0,
            base_proxy: 0.5,
            inventory: 0.1,
        }
    }
}

/// Closed intervals each weight is clamped into after an update.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeightBounds {
    /// `(lo, hi)` for the intercept.
    pub bias: (f64, f64),
    /// `(lo, hi)` for the price coefficient.
    pub price: (f64, f64),
    /// `(lo, hi)` for the log ad spend coefficient.
    pub ad: (f64, f64),
    /// `(lo, hi)` for the public proxy coefficient.
    pub base_proxy: (f64, f64),
    /// `(lo, hi)` for the available inventory coefficient.
    pub inventory: (f64, f64),
}

impl WeightBounds {
    pub fn to_array(self) -> [(f64, f64); 5] {
        [self.bias, self.price, self.ad, self.base_proxy, self.inventory]
    }

    pub fn clamp(&self, w: DemandWeights) -> DemandWeights {
        let mut out = w.to_array();
        for (v, (lo, hi)) in out.iter_mut().zip(self.to_array()) {
            *v = v.clamp(lo, hi);
        }
        DemandWeights::from_array(out)
    }

    pub fn contains(&self, w: &DemandWeights) -> bool {
        w.to_array()
            .iter()
            .zip(self.to_array())
            .all(|(v, (lo, hi))| (lo..=hi).contains(v))
    }
}

impl Default for WeightBounds {
    fn default() -> Self {
        Self {
            bias: (-200.0, 300.0),
            price: (-10.0, 10.0),
            ad: (-40.0, 40.0),
            base_proxy: (-5.0, 5.0),
            inventory: (-0.5, 0.5),
        }
    }
}

/// Discretization of the plan search space. Every axis includes both ends.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSpec {
    /// Lowest candidate price.
    pub price_min: f64,
    /// Highest candidate price.
    pub price_max: f64,
    /// Spacing between candidate prices.
    pub price_step: f64,
    /// Lowest candidate ad spend.
    pub ad_min: f64,
    /// Highest candidate ad spend.
    pub ad_max: f64,
    /// Spacing between candidate ad spends.
    pub ad_step: f64,
    /// Smallest candidate production run.
    pub production_min: u32,
    /// Largest candidate production run.
    pub production_max: u32,
    /// Spacing between candidate production runs.
    pub production_step: u32,
}

impl Default for GridSpec {
    fn default() -> Self {
        Self {
            price_min: 9.0,
            price_max: 40.0,
            price_step: 1.0,
            ad_min: 0.0,
            ad_max: 8000.0,
            ad_step: 500.0,
            production_min: 0,
            production_max: 120,
            production_step: 10,
        }
    }
}

fn float_axis(min: f64, max: f64, step: f64) -> impl Iterator<Item = f64> {
    // Index-based to avoid accumulating rounding error across steps.
    let count = if step > 0.0 && max >= min {
        ((max - min) / step + 1e-9).floor() as usize + 1
    } else {
        1
    };
    (0..count).map(move |i| min + i as f64 * step)
}

impl GridSpec {
    pub fn prices(&self) -> impl Iterator<Item = f64> {
        float_axis(self.price_min, self.price_max, self.price_step)
    }

    pub fn ad_spends(&self) -> impl Iterator<Item = f64> {
        float_axis(self.ad_min, self.ad_max, self.ad_step)
    }

    pub fn productions(&self) -> impl Iterator<Item = u32> {
        (self.production_min..=self.production_max).step_by(self.production_step.max(1) as usize)
    }

    /// Number of grid points the search will evaluate.
    pub fn point_count(&self) -> usize {
        self.prices().count() * self.ad_spends().count() * self.productions().count()
    }

    /// First point in search order: the low end of every axis.
    pub fn origin(&self) -> Action {
        Action::new(self.price_min, self.ad_min, self.production_min)
    }
}

/// Per-unit and per-period costs of running the company.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitEconomics {
    /// Production cost per unit.
    pub unit_cost: f64,
    /// Overhead paid every period.
    pub fixed_cost: f64,
}

impl Default for UnitEconomics {
    fn default() -> Self {
        Self {
            unit_cost: 8.0,
            fixed_cost: 1200.0,
        }
    }
}

/// Session configuration parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Seed for the session's single RNG stream.
    pub seed: u64,
    /// Number of periods (weeks) in a playthrough.
    pub periods: u32,
    /// Units in stock before the first period.
    pub starting_inventory: u32,
    /// Cash on hand before the first period.
    pub starting_cash: Decimal,
    /// The game ends once cash drops below this.
    pub bankruptcy_floor: Decimal,
    /// Starting value of the public demand proxy.
    pub initial_proxy: f64,
    /// Unit and overhead costs booked by the ledger.
    pub economics: UnitEconomics,
    /// True parameters of the hidden market.
    pub market: MarketParams,
    /// Starting advisor weights.
    pub priors: DemandWeights,
    /// Clamp intervals applied after every weight update.
    pub bounds: WeightBounds,
    /// SGD step size for the advisor.
    pub learning_rate: f64,
    /// Candidate plans the advisor searches.
    pub grid: GridSpec,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            seed: 12345,
            periods: 12,
            starting_inventory: 40,
            starting_cash: Decimal::new(20_000, 0),
            bankruptcy_floor: Decimal::new(-5_000, 0),
            initial_proxy: 50.0,
            economics: UnitEconomics::default(),
            market: MarketParams::default(),
            priors: DemandWeights::default(),
            bounds: WeightBounds::default(),
            learning_rate: 0.0015,
            grid: GridSpec::default(),
        }
    }
}

/// Closed record of one period. Never mutated once pushed to history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PeriodSnapshot {
    /// 1-based period number.
    pub period: u32,
    pub event: MarketEvent,
    pub action: Action,
    /// Hidden baseline demand after this period's drift.
    pub base_demand: f64,
    /// Proxy value the advisor saw when planning and learning.
    pub public_proxy: f64,
    /// Uncensored realized demand.
    pub demand: u32,
    pub sold: u32,
    pub inventory_end: u32,
    pub revenue: Decimal,
    pub cost: Decimal,
    pub profit: Decimal,
    pub cash_end: Decimal,
}

/// Validation errors for domain invariants.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// Numeric field must be finite.
    #[error("non-finite value for {0}")]
    NonFinite(&'static str),
    /// Price or cost must be non-negative.
    #[error("negative monetary value for {0}")]
    NegativeMoney(&'static str),
    /// Quantity must be non-negative.
    #[error("{0} must be >= 0")]
    Negative(&'static str),
    /// Noise standard deviations must be >= 0.
    #[error("noise std for {0} must be >= 0")]
    InvalidNoise(&'static str),
    /// Learning rate must be strictly positive.
    #[error("learning rate must be > 0")]
    InvalidLearningRate,
    /// Clamp interval has lo > hi.
    #[error("weight bounds for {0} are inverted")]
    InvalidBounds(&'static str),
    /// Prior weight lies outside its clamp interval.
    #[error("prior weight {0} is outside its bounds")]
    PriorOutOfBounds(&'static str),
    /// Search grid is malformed.
    #[error("invalid search grid: {0}")]
    InvalidGrid(&'static str),
    /// Session must have at least one period.
    #[error("session must run at least one period")]
    NoPeriods,
    /// Starting baseline is below the drift floor.
    #[error("base demand starts below its floor")]
    BaseBelowFloor,
}

const WEIGHT_NAMES: [&str; 5] = ["bias", "price", "ad", "base_proxy", "inventory"];

fn finite(v: f64, name: &'static str) -> Result<(), ValidationError> {
    if v.is_finite() {
        Ok(())
    } else {
        Err(ValidationError::NonFinite(name))
    }
}

/// Validate the hidden market parameters.
pub fn validate_market_params(m: &MarketParams) -> Result<(), ValidationError> {
    finite(m.base_demand, "base_demand")?;
    finite(m.price_sensitivity, "price_sensitivity")?;
    finite(m.ad_effect, "ad_effect")?;
    finite(m.demand_drift, "demand_drift")?;
    finite(m.base_floor, "base_floor")?;
    finite(m.availability_boost, "availability_boost")?;
    if !(m.drift_std.is_finite() && m.drift_std >= 0.0) {
        return Err(ValidationError::InvalidNoise("drift_std"));
    }
    if !(m.noise_std.is_finite() && m.noise_std >= 0.0) {
        return Err(ValidationError::InvalidNoise("noise_std"));
    }
    if m.base_demand < m.base_floor {
        return Err(ValidationError::BaseBelowFloor);
    }
    Ok(())
}

/// Validate clamp intervals and that the priors start inside them.
pub fn validate_weights(
    priors: &DemandWeights,
    bounds: &WeightBounds,
) -> Result<(), ValidationError> {
    for ((name, w), (lo, hi)) in WEIGHT_NAMES
        .into_iter()
        .zip(priors.to_array())
        .zip(bounds.to_array())
    {
        finite(w, name)?;
        finite(lo, name)?;
        finite(hi, name)?;
        if lo > hi {
            return Err(ValidationError::InvalidBounds(name));
        }
        if !(lo..=hi).contains(&w) {
            return Err(ValidationError::PriorOutOfBounds(name));
        }
    }
    Ok(())
}

/// Validate the search grid.
pub fn validate_grid(g: &GridSpec) -> Result<(), ValidationError> {
    for (v, name) in [
        (g.price_min, "price_min"),
        (g.price_max, "price_max"),
        (g.price_step, "price_step"),
        (g.ad_min, "ad_min"),
        (g.ad_max, "ad_max"),
        (g.ad_step, "ad_step"),
    ] {
        finite(v, name)?;
    }
    if g.price_step <= 0.0 || g.ad_step <= 0.0 || g.production_step == 0 {
        return Err(ValidationError::InvalidGrid("steps must be > 0"));
    }
    if g.price_max < g.price_min || g.ad_max < g.ad_min || g.production_max < g.production_min {
        return Err(ValidationError::InvalidGrid("max below min"));
    }
    if g.price_min < PRICE_MIN
        || g.price_max > PRICE_MAX
        || g.ad_min < 0.0
        || g.ad_max > AD_SPEND_MAX
        || g.production_max > PRODUCTION_MAX
    {
        return Err(ValidationError::InvalidGrid("outside the player's action domain"));
    }
    Ok(())
}

/// Validate unit economics.
pub fn validate_economics(e: &UnitEconomics) -> Result<(), ValidationError> {
    finite(e.unit_cost, "unit_cost")?;
    finite(e.fixed_cost, "fixed_cost")?;
    if e.unit_cost < 0.0 {
        return Err(ValidationError::NegativeMoney("unit_cost"));
    }
    if e.fixed_cost < 0.0 {
        return Err(ValidationError::NegativeMoney("fixed_cost"));
    }
    Ok(())
}

/// Validate a full session configuration.
pub fn validate_config(c: &SessionConfig) -> Result<(), ValidationError> {
    if c.periods == 0 {
        return Err(ValidationError::NoPeriods);
    }
    if c.starting_cash < Decimal::ZERO {
        return Err(ValidationError::NegativeMoney("starting_cash"));
    }
    finite(c.initial_proxy, "initial_proxy")?;
    if c.initial_proxy < 0.0 {
        return Err(ValidationError::Negative("initial_proxy"));
    }
    if !(c.learning_rate.is_finite() && c.learning_rate > 0.0) {
        return Err(ValidationError::InvalidLearningRate);
    }
    validate_economics(&c.economics)?;
    validate_market_params(&c.market)?;
    validate_weights(&c.priors, &c.bounds)?;
    validate_grid(&c.grid)?;
    Ok(())
}
