use rand::Rng;
use sim_core::{EventKind, MarketEvent, EVENT_THRESHOLDS};
use tracing::debug;

/// Draw this period's market event.
///
/// Consumes exactly one uniform sample in [0, 1) and maps it through the
/// cumulative thresholds; anything past the last threshold is a quiet period.
pub fn draw_event<R: Rng + ?Sized>(rng: &mut R) -> MarketEvent {
    let r: f64 = rng.gen();
    let kind = EVENT_THRESHOLDS
        .iter()
        .find(|(threshold, _)| r < *threshold)
        .map(|(_, kind)| *kind)
        .unwrap_or(EventKind::Quiet);
    debug!(r, event = kind.label(), "drew market event");
    MarketEvent::of(kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seeded_rng;
    use rand::rngs::mock::StepRng;
    use std::collections::HashMap;

    #[test]
    fn seeded_draws_repeat() {
        let mut a = seeded_rng(99);
        let mut b = seeded_rng(99);
        let xs: Vec<_> = (0..50).map(|_| draw_event(&mut a)).collect();
        let ys: Vec<_> = (0..50).map(|_| draw_event(&mut b)).collect();
        assert_eq!(xs, ys);
    }

    #[test]
    fn zero_draw_is_viral_trend() {
        // StepRng(0, 0) always yields 0, which maps to 0.0 in [0, 1).
        let mut rng = StepRng::new(0, 0);
        assert_eq!(draw_event(&mut rng).kind, EventKind::ViralTrend);
    }

    #[test]
    fn max_draw_is_quiet() {
        let mut rng = StepRng::new(u64::MAX, 0);
        let e = draw_event(&mut rng);
        assert_eq!(e, MarketEvent::neutral());
    }

    #[test]
    fn frequencies_match_table() {
        let mut rng = seeded_rng(2024);
        let n = 100_000;
        let mut counts: HashMap<EventKind, u32> = HashMap::new();
        for _ in 0..n {
            *counts.entry(draw_event(&mut rng).kind).or_default() += 1;
        }
        let freq = |k| *counts.get(&k).unwrap_or(&0) as f64 / n as f64;
        for k in [
            EventKind::ViralTrend,
            EventKind::NewCompetitor,
            EventKind::SupplyNews,
            EventKind::MacroSlump,
        ] {
            assert!((freq(k) - 0.10).abs() < 0.01, "{k:?}: {}", freq(k));
        }
        assert!((freq(EventKind::Quiet) - 0.60).abs() < 0.01);
    }
}
