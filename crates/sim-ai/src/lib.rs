#![deny(warnings)]

//! The advisor: an online linear demand model and the plan search that
//! queries it.
//!
//! Nothing in this crate draws random numbers. Given the same weights and
//! inputs, a plan search always returns the same plan.

mod model;
mod planner;

pub use model::{features, DemandModel, DEFAULT_LEARNING_RATE};
pub use planner::{GridSearch, PlanContext, PlanEstimate, PlanSearch};
