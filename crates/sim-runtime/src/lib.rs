#![deny(warnings)]

//! Session runtime: runs one playthrough period by period.
//!
//! [`Session::advance_period`] is the only way to move time forward and it
//! fixes the order of every step, including the order in which the single
//! seeded RNG stream is consumed:
//!
//! 1. market drift (rng)
//! 2. event draw (rng)
//! 3. advisor plan search
//! 4. caller decision (accept or override)
//! 5. production, demand realization (rng), sales
//! 6. settlement
//! 7. advisor learning on units sold
//! 8. history push, proxy update (rng)

mod ledger;

pub use ledger::{money, Financials, Ledger};

use rust_decimal::Decimal;
use serde::Serialize;
use sim_ai::{DemandModel, GridSearch, PlanContext, PlanEstimate, PlanSearch};
use sim_core::{
    validate_config, ActionOverride, DemandWeights, MarketEvent, PeriodSnapshot, SessionConfig,
    ValidationError,
};
use sim_econ::{
    draw_event, seeded_rng, EconError, MarketEngine, ProxyTracker, SimRng, PROXY_WINDOW,
};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors surfaced by the session runtime.
#[derive(Debug, Error, PartialEq)]
pub enum SessionError {
    #[error("invalid config: {0}")]
    Config(#[from] ValidationError),
    #[error("market setup failed: {0}")]
    Market(#[from] EconError),
    /// No periods remain, or the company went bankrupt.
    #[error("session is over after {periods} periods")]
    Finished { periods: u32 },
}

/// What the caller decides to do with the advisor's suggestion.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Decision {
    #[default]
    Accept,
    Override(ActionOverride),
}

/// Everything the player is shown before deciding on a period's plan.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PeriodBrief {
    pub period: u32,
    pub event: MarketEvent,
    pub suggestion: PlanEstimate,
    pub inventory: u32,
    pub cash: Decimal,
    pub public_proxy: f64,
    pub weights: DemandWeights,
}

/// End-of-game report.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SessionSummary {
    pub periods_played: u32,
    pub total_profit: Decimal,
    pub total_units_sold: u64,
    pub final_cash: Decimal,
    pub final_inventory: u32,
    pub bankrupt: bool,
    pub final_weights: DemandWeights,
    /// True baseline demand at the end, revealed after the game.
    pub hidden_base_demand: f64,
}

/// One playthrough: market, advisor, books and history.
pub struct Session<P: PlanSearch = GridSearch> {
    config: SessionConfig,
    rng: SimRng,
    market: MarketEngine,
    advisor: DemandModel,
    planner: P,
    proxy: ProxyTracker,
    ledger: Ledger,
    history: Vec<PeriodSnapshot>,
    bankrupt: bool,
}

/// Units sold over the last [`PROXY_WINDOW`] periods, oldest first.
fn recent_sales<'a>(
    history: &[PeriodSnapshot],
    window: &'a mut [u32; PROXY_WINDOW],
) -> &'a [u32] {
    let tail = &history[history.len().saturating_sub(PROXY_WINDOW)..];
    for (slot, snap) in window.iter_mut().zip(tail) {
        *slot = snap.sold;
    }
    &window[..tail.len()]
}

impl Session<GridSearch> {
    /// Start a session that plans with the configured fixed grid.
    pub fn new(config: SessionConfig) -> Result<Self, SessionError> {
        let planner = GridSearch::new(config.grid.clone(), config.economics)?;
        Self::with_planner(config, planner)
    }
}

impl<P: PlanSearch> Session<P> {
    pub fn with_planner(config: SessionConfig, planner: P) -> Result<Self, SessionError> {
        validate_config(&config)?;
        let market = MarketEngine::new(config.market.clone())?;
        let proxy = ProxyTracker::new(config.initial_proxy)?;
        let advisor = DemandModel::new(config.priors, config.bounds, config.learning_rate);
        let ledger = Ledger::new(
            config.starting_inventory,
            config.starting_cash,
            config.economics,
        );
        info!(seed = config.seed, periods = config.periods, "session started");
        Ok(Self {
            rng: seeded_rng(config.seed),
            config,
            market,
            advisor,
            planner,
            proxy,
            ledger,
            history: Vec::new(),
            bankrupt: false,
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn history(&self) -> &[PeriodSnapshot] {
        &self.history
    }

    pub fn weights(&self) -> DemandWeights {
        self.advisor.weights()
    }

    pub fn public_proxy(&self) -> f64 {
        self.proxy.value()
    }

    pub fn inventory(&self) -> u32 {
        self.ledger.inventory()
    }

    pub fn cash(&self) -> Decimal {
        self.ledger.cash()
    }

    /// The market's true baseline. Only for post-game reporting.
    pub fn hidden_base_demand(&self) -> f64 {
        self.market.hidden_base_demand()
    }

    pub fn periods_played(&self) -> u32 {
        self.history.len() as u32
    }

    pub fn is_bankrupt(&self) -> bool {
        self.bankrupt
    }

    pub fn is_over(&self) -> bool {
        self.bankrupt || self.periods_played() >= self.config.periods
    }

    /// Play one period. `decide` sees the brief and the advisor's suggestion
    /// and returns the plan to execute.
    pub fn advance_period<F>(&mut self, decide: F) -> Result<PeriodSnapshot, SessionError>
    where
        F: FnOnce(&PeriodBrief) -> Decision,
    {
        if self.is_over() {
            return Err(SessionError::Finished {
                periods: self.periods_played(),
            });
        }
        let period = self.periods_played() + 1;

        self.market.drift(&mut self.rng);
        let event = draw_event(&mut self.rng);

        let proxy = self.proxy.value();
        let ctx = PlanContext::for_event(self.ledger.inventory(), proxy, &event);
        let suggestion = self.planner.plan(&self.advisor, &ctx);

        let brief = PeriodBrief {
            period,
            event,
            suggestion,
            inventory: self.ledger.inventory(),
            cash: self.ledger.cash(),
            public_proxy: proxy,
            weights: self.advisor.weights(),
        };
        let action = match decide(&brief) {
            Decision::Accept => suggestion.action,
            Decision::Override(ov) => {
                let chosen = suggestion.action.with_override(&ov);
                debug!(?ov, ?chosen, "player override");
                chosen
            }
        };
        debug_assert!(action.in_domain(), "action outside domain: {action:?}");
        let action = action.clamped();

        let available = self.ledger.produce(action.production);
        let demand = self.market.realize_demand(
            action.price,
            action.ad_spend,
            &event,
            available,
            &mut self.rng,
        );
        let sold = self.ledger.sell(demand);
        assert!(sold <= available, "sold {sold} exceeds available {available}");
        let fin = self.ledger.settle(&action, sold);

        // Censored label: the advisor learns from units sold, not demand.
        self.advisor.learn(
            action.price,
            action.ad_spend,
            proxy,
            available,
            sold,
            event.ad_shock,
            event.price_shock,
        );

        let snap = PeriodSnapshot {
            period,
            event,
            action,
            base_demand: self.market.hidden_base_demand(),
            public_proxy: proxy,
            demand,
            sold,
            inventory_end: self.ledger.inventory(),
            revenue: fin.revenue,
            cost: fin.cost,
            profit: fin.profit,
            cash_end: self.ledger.cash(),
        };
        self.history.push(snap.clone());

        let mut window = [0; PROXY_WINDOW];
        let recent = recent_sales(&self.history, &mut window);
        self.proxy.update(recent, &mut self.rng);

        info!(
            period,
            event = event.name(),
            price = action.price,
            ad_spend = action.ad_spend,
            production = action.production,
            sold,
            profit = %fin.profit,
            cash = %snap.cash_end,
            "period closed"
        );

        if self.ledger.cash() < self.config.bankruptcy_floor {
            self.bankrupt = true;
            warn!(period, cash = %self.ledger.cash(), "cash below bankruptcy floor");
        }
        Ok(snap)
    }

    /// Play every remaining period, accepting each suggestion.
    pub fn run_auto(&mut self) -> Result<SessionSummary, SessionError> {
        while !self.is_over() {
            self.advance_period(|_| Decision::Accept)?;
        }
        Ok(self.summary())
    }

    pub fn summary(&self) -> SessionSummary {
        let summary = SessionSummary {
            periods_played: self.periods_played(),
            total_profit: self.history.iter().map(|s| s.profit).sum(),
            total_units_sold: self.history.iter().map(|s| s.sold as u64).sum(),
            final_cash: self.ledger.cash(),
            final_inventory: self.ledger.inventory(),
            bankrupt: self.bankrupt,
            final_weights: self.advisor.weights(),
            hidden_base_demand: self.market.hidden_base_demand(),
        };
        debug!(?summary, "session summary");
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_core::{Action, EventKind};

    fn config(seed: u64) -> SessionConfig {
        SessionConfig {
            seed,
            ..SessionConfig::default()
        }
    }

    #[test]
    fn rejects_invalid_config() {
        let cfg = SessionConfig {
            periods: 0,
            ..SessionConfig::default()
        };
        assert_eq!(
            Session::new(cfg).err(),
            Some(SessionError::Config(ValidationError::NoPeriods))
        );
    }

    #[test]
    fn same_seed_same_trajectory() {
        let mut a = Session::new(config(12345)).unwrap();
        let mut b = Session::new(config(12345)).unwrap();
        let sa = a.run_auto().unwrap();
        let sb = b.run_auto().unwrap();
        assert_eq!(a.history(), b.history());
        assert_eq!(sa, sb);
    }

    #[test]
    fn proxy_window_matches_full_history() {
        let mut s = Session::new(config(42)).unwrap();
        s.run_auto().unwrap();
        let mut window = [0; PROXY_WINDOW];
        for end in 1..=s.history().len() {
            let seen = &s.history()[..end];
            let all: Vec<u32> = seen.iter().map(|p| p.sold).collect();
            let recent = recent_sales(seen, &mut window);
            assert_eq!(recent, &all[all.len().saturating_sub(PROXY_WINDOW)..]);
            assert_eq!(
                sim_econ::blend_proxy(50.0, recent, 1.5),
                sim_econ::blend_proxy(50.0, &all, 1.5)
            );
        }
    }

    #[test]
    fn different_seeds_diverge() {
        let mut a = Session::new(config(1)).unwrap();
        let mut b = Session::new(config(2)).unwrap();
        a.run_auto().unwrap();
        b.run_auto().unwrap();
        assert_ne!(a.history(), b.history());
    }

    #[test]
    fn first_period_consumes_rng_in_order() {
        let cfg = config(777);
        let mut session = Session::new(cfg.clone()).unwrap();
        let snap = session.advance_period(|_| Decision::Accept).unwrap();

        // Replay the same steps by hand on a fresh stream.
        let mut rng = seeded_rng(cfg.seed);
        let mut market = MarketEngine::new(cfg.market.clone()).unwrap();
        market.drift(&mut rng);
        let event = draw_event(&mut rng);
        let ctx = PlanContext::for_event(cfg.starting_inventory, cfg.initial_proxy, &event);
        let plan = GridSearch::default().plan(&DemandModel::default(), &ctx);
        let available = cfg.starting_inventory + plan.action.production;
        let demand = market.realize_demand(
            plan.action.price,
            plan.action.ad_spend,
            &event,
            available,
            &mut rng,
        );
        let mut proxy = ProxyTracker::new(cfg.initial_proxy).unwrap();
        let sold = demand.min(available);
        proxy.update(&[sold], &mut rng);

        assert_eq!(snap.event, event);
        assert_eq!(snap.action, plan.action);
        assert_eq!(snap.base_demand, market.hidden_base_demand());
        assert_eq!(snap.demand, demand);
        assert_eq!(snap.sold, sold);
        assert_eq!(session.public_proxy(), proxy.value());
    }

    #[test]
    fn inventory_books_balance() {
        let mut s = Session::new(config(42)).unwrap();
        s.run_auto().unwrap();
        let mut inventory = s.config().starting_inventory;
        for snap in s.history() {
            let available = inventory + snap.action.production;
            assert_eq!(snap.sold, snap.demand.min(available));
            assert_eq!(snap.inventory_end, available - snap.sold);
            inventory = snap.inventory_end;
        }
        assert_eq!(inventory, s.inventory());
    }

    #[test]
    fn learns_from_censored_sales() {
        // No stock and no production: every period sells zero whatever demand is.
        let cfg = SessionConfig {
            starting_inventory: 0,
            ..config(9)
        };
        let mut s = Session::new(cfg).unwrap();
        let stop_production = ActionOverride {
            production: Some(0),
            ..ActionOverride::default()
        };
        let snap = s
            .advance_period(|_| Decision::Override(stop_production.clone()))
            .unwrap();
        assert_eq!(snap.sold, 0);

        let mut expected = DemandModel::default();
        expected.learn(
            snap.action.price,
            snap.action.ad_spend,
            snap.public_proxy,
            0,
            0,
            snap.event.ad_shock,
            snap.event.price_shock,
        );
        assert_eq!(s.weights(), expected.weights());
    }

    #[test]
    fn override_is_clamped() {
        let mut s = Session::new(config(3)).unwrap();
        let snap = s
            .advance_period(|_| {
                Decision::Override(ActionOverride {
                    price: Some(99.0),
                    ad_spend: Some(-5.0),
                    production: Some(1_000),
                })
            })
            .unwrap();
        assert_eq!(snap.action, Action::new(40.0, 0.0, 200));
    }

    #[test]
    fn brief_shows_pre_period_state() {
        let mut s = Session::new(config(5)).unwrap();
        let mut seen = None;
        s.advance_period(|b| {
            seen = Some(b.clone());
            Decision::Accept
        })
        .unwrap();
        let brief = seen.unwrap();
        assert_eq!(brief.period, 1);
        assert_eq!(brief.inventory, 40);
        assert_eq!(brief.cash, Decimal::new(20_000, 0));
        assert_eq!(brief.public_proxy, 50.0);
        assert_eq!(brief.weights, DemandWeights::default());
        assert!(brief.suggestion.action.in_domain());
        assert_eq!(s.history()[0].action, brief.suggestion.action);
    }

    #[test]
    fn finished_after_last_period() {
        let cfg = SessionConfig {
            periods: 2,
            ..config(8)
        };
        let mut s = Session::new(cfg).unwrap();
        let summary = s.run_auto().unwrap();
        assert_eq!(summary.periods_played, 2);
        assert!(s.is_over());
        assert_eq!(
            s.advance_period(|_| Decision::Accept).unwrap_err(),
            SessionError::Finished { periods: 2 }
        );
    }

    #[test]
    fn bankruptcy_ends_game_early() {
        let mut cfg = config(4);
        cfg.starting_cash = Decimal::ZERO;
        cfg.economics.fixed_cost = 100_000.0;
        let mut s = Session::new(cfg).unwrap();
        let summary = s.run_auto().unwrap();
        assert!(summary.bankrupt);
        assert_eq!(summary.periods_played, 1);
        assert!(summary.final_cash < Decimal::new(-5_000, 0));
    }

    #[test]
    fn summary_totals_history() {
        let mut s = Session::new(config(10)).unwrap();
        let summary = s.run_auto().unwrap();
        let profit: Decimal = s.history().iter().map(|h| h.profit).sum();
        assert_eq!(summary.total_profit, profit);
        assert_eq!(
            summary.final_cash,
            s.config().starting_cash + summary.total_profit
        );
        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("total_units_sold"));
    }

    struct FixedPlan(Action);

    impl PlanSearch for FixedPlan {
        fn plan(&self, _model: &DemandModel, _ctx: &PlanContext) -> PlanEstimate {
            PlanEstimate {
                action: self.0,
                predicted_sales: 0,
                predicted_profit: 0.0,
            }
        }
    }

    #[test]
    fn custom_planner_is_used() {
        let plan = Action::new(25.0, 500.0, 30);
        let mut s = Session::with_planner(config(6), FixedPlan(plan)).unwrap();
        s.run_auto().unwrap();
        assert!(s.history().iter().all(|h| h.action == plan));
    }

    #[test]
    fn neutral_period_events_have_no_shock() {
        let mut s = Session::new(config(21)).unwrap();
        s.run_auto().unwrap();
        for h in s.history().iter().filter(|h| h.event.kind == EventKind::Quiet) {
            assert_eq!(h.event, MarketEvent::neutral());
        }
    }
}
