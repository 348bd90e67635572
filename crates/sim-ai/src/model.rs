use sim_core::{DemandWeights, WeightBounds};
use tracing::debug;

/// Default SGD step size.
pub const DEFAULT_LEARNING_RATE: f64 = 0.0015;

/// Engineered features: `[1, -price*(1+pm), ln(1+ad)*(1+am), proxy, inventory]`.
pub fn features(
    price: f64,
    ad_spend: f64,
    base_proxy: f64,
    inventory_available: u32,
    event_ad_mult: f64,
    event_price_mult: f64,
) -> [f64; 5] {
    [
        1.0,
        -price * (1.0 + event_price_mult),
        ad_spend.ln_1p() * (1.0 + event_ad_mult),
        base_proxy,
        inventory_available as f64,
    ]
}

/// Online linear demand model.
///
/// Learns from units *sold*, which are censored by available inventory. In a
/// stockout the label understates true demand and the update pulls the
/// weights down. That is how the advisor is meant to behave: it only ever
/// sees sales, never unconstrained demand.
#[derive(Clone, Debug, PartialEq)]
pub struct DemandModel {
    weights: DemandWeights,
    bounds: WeightBounds,
    learning_rate: f64,
}

impl Default for DemandModel {
    fn default() -> Self {
        Self::new(
            DemandWeights::default(),
            WeightBounds::default(),
            DEFAULT_LEARNING_RATE,
        )
    }
}

impl DemandModel {
    pub fn new(weights: DemandWeights, bounds: WeightBounds, learning_rate: f64) -> Self {
        Self {
            weights,
            bounds,
            learning_rate,
        }
    }

    pub fn weights(&self) -> DemandWeights {
        self.weights
    }

    pub fn bounds(&self) -> WeightBounds {
        self.bounds
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    fn linear(&self, x: &[f64; 5]) -> f64 {
        self.weights
            .to_array()
            .iter()
            .zip(x)
            .map(|(w, x)| w * x)
            .sum()
    }

    /// Predicted demand, floored at zero.
    pub fn predict(
        &self,
        price: f64,
        ad_spend: f64,
        base_proxy: f64,
        inventory_available: u32,
        event_ad_mult: f64,
        event_price_mult: f64,
    ) -> f64 {
        let x = features(
            price,
            ad_spend,
            base_proxy,
            inventory_available,
            event_ad_mult,
            event_price_mult,
        );
        self.linear(&x).max(0.0)
    }

    /// One SGD step on squared error against `sold_units`, then clamp.
    ///
    /// The raw (unfloored) prediction is used for the error. Returns the
    /// error `sold_units - yhat`.
    pub fn learn(
        &mut self,
        price: f64,
        ad_spend: f64,
        base_proxy: f64,
        inventory_available: u32,
        sold_units: u32,
        event_ad_mult: f64,
        event_price_mult: f64,
    ) -> f64 {
        let x = features(
            price,
            ad_spend,
            base_proxy,
            inventory_available,
            event_ad_mult,
            event_price_mult,
        );
        let yhat = self.linear(&x);
        let err = sold_units as f64 - yhat;
        let mut w = self.weights.to_array();
        for (wi, xi) in w.iter_mut().zip(x) {
            *wi += self.learning_rate * err * xi;
        }
        self.weights = self.bounds.clamp(DemandWeights::from_array(w));
        debug!(yhat, err, weights = ?self.weights, "advisor update");
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn prior_prediction_matches_hand_computation() {
        let m = DemandModel::default();
        let got = m.predict(20.0, 1000.0, 50.0, 60, 0.0, 0.0);
        let want = 40.0 + 1.0 * -20.0 + 8.0 * 1001f64.ln() + 0.5 * 50.0 + 0.1 * 60.0;
        assert!((got - want).abs() < 1e-9, "{got} vs {want}");
        assert!((got - 106.27).abs() < 0.01);
    }

    #[test]
    fn learn_moves_bias_by_lr_times_error() {
        let mut m = DemandModel::default();
        let yhat = m.predict(20.0, 1000.0, 50.0, 60, 0.0, 0.0);
        let err = m.learn(20.0, 1000.0, 50.0, 60, 80, 0.0, 0.0);
        assert!((err - (80.0 - yhat)).abs() < 1e-9);
        let want_bias = 40.0 + DEFAULT_LEARNING_RATE * err;
        assert!((m.weights().bias - want_bias).abs() < 1e-12);
        // Over-predicted, so the bias moves down.
        assert!(m.weights().bias < 40.0);
    }

    #[test]
    fn under_prediction_moves_bias_up() {
        let mut m = DemandModel::default();
        let err = m.learn(20.0, 0.0, 0.0, 0, 200, 0.0, 0.0);
        assert!(err > 0.0);
        assert!((m.weights().bias - (40.0 + DEFAULT_LEARNING_RATE * err)).abs() < 1e-12);
    }

    #[test]
    fn learn_uses_unfloored_prediction() {
        // Strong price weight drives the raw prediction negative.
        let w = DemandWeights {
            bias: 0.0,
            price: 10.0,
            ad: 0.0,
            base_proxy: 0.0,
            inventory: 0.0,
        };
        let mut m = DemandModel::new(w, WeightBounds::default(), DEFAULT_LEARNING_RATE);
        assert_eq!(m.predict(30.0, 0.0, 0.0, 0, 0.0, 0.0), 0.0);
        let err = m.learn(30.0, 0.0, 0.0, 0, 0, 0.0, 0.0);
        assert!((err - 300.0).abs() < 1e-9);
    }

    #[test]
    fn zero_shocks_match_unshocked_features() {
        let x = features(12.0, 0.0, 33.0, 7, 0.0, 0.0);
        assert_eq!(x, [1.0, -12.0, 0.0, 33.0, 7.0]);
    }

    #[test]
    fn predict_is_pure() {
        let m = DemandModel::default();
        let a = m.predict(17.0, 2500.0, 44.0, 90, 0.5, -0.1);
        let b = m.predict(17.0, 2500.0, 44.0, 90, 0.5, -0.1);
        assert_eq!(a.to_bits(), b.to_bits());
        assert_eq!(m, DemandModel::default());
    }

    proptest! {
        #[test]
        fn weights_stay_in_bounds(steps in proptest::collection::vec(
            (9.0f64..40.0, 0.0f64..10_000.0, 0.0f64..300.0, 0u32..400, 0u32..400,
             -0.1f64..0.5, -0.1f64..0.25),
            1..60)) {
            let mut m = DemandModel::default();
            for (p, a, b, inv, sold, am, pm) in steps {
                m.learn(p, a, b, inv, sold, am, pm);
                prop_assert!(m.bounds().contains(&m.weights()));
            }
        }

        #[test]
        fn prediction_never_negative(w in proptest::array::uniform5(-300.0f64..300.0),
                                     price in 0.0f64..100.0,
                                     ad in 0.0f64..20_000.0,
                                     proxy in 0.0f64..500.0,
                                     inv in 0u32..1000,
                                     am in -1.0f64..1.0,
                                     pm in -1.0f64..1.0) {
            let m = DemandModel::new(DemandWeights::from_array(w), WeightBounds::default(), DEFAULT_LEARNING_RATE);
            prop_assert!(m.predict(price, ad, proxy, inv, am, pm) >= 0.0);
        }
    }
}
