use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use sim_core::{Action, UnitEconomics};

/// Convert a float amount to cents.
///
/// Amounts reaching the ledger are finite (validated config or clamped
/// actions); a non-finite value books as zero.
pub fn money(x: f64) -> Decimal {
    amount(x).round_dp(2)
}

/// Unrounded conversion, for amounts that are multiplied before booking.
fn amount(x: f64) -> Decimal {
    Decimal::from_f64(x).unwrap_or(Decimal::ZERO)
}

/// One period's income statement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Financials {
    pub revenue: Decimal,
    pub cost: Decimal,
    pub profit: Decimal,
}

/// Cash and inventory books for the company.
#[derive(Clone, Debug, PartialEq)]
pub struct Ledger {
    inventory: u32,
    cash: Decimal,
    unit_cost: Decimal,
    fixed_cost: Decimal,
}

impl Ledger {
    pub fn new(inventory: u32, cash: Decimal, economics: UnitEconomics) -> Self {
        Self {
            inventory,
            cash,
            unit_cost: amount(economics.unit_cost),
            fixed_cost: money(economics.fixed_cost),
        }
    }

    pub fn inventory(&self) -> u32 {
        self.inventory
    }

    pub fn cash(&self) -> Decimal {
        self.cash
    }

    /// Add a production run to stock. Returns units now available.
    pub fn produce(&mut self, units: u32) -> u32 {
        self.inventory = self.inventory.saturating_add(units);
        self.inventory
    }

    /// Ship as much of `demand` as stock allows. Returns units sold.
    pub fn sell(&mut self, demand: u32) -> u32 {
        let sold = demand.min(self.inventory);
        self.inventory -= sold;
        sold
    }

    /// Book revenue and costs for the period and apply profit to cash.
    pub fn settle(&mut self, action: &Action, sold: u32) -> Financials {
        // Round the products, not the unit price.
        let revenue = (Decimal::from(sold) * amount(action.price)).round_dp(2);
        let variable = Decimal::from(action.production) * self.unit_cost + amount(action.ad_spend);
        let cost = variable.round_dp(2) + self.fixed_cost;
        let profit = revenue - cost;
        self.cash += profit;
        Financials {
            revenue,
            cost,
            profit,
        }
    }
}
