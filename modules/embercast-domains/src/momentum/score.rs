//! Momentum scoring for topic clusters.
//!
//! Hotness derives entirely from windowed signal arithmetic — no LLM
//! dependency, no I/O.
//!
//! Formula:
//!   velocity = clamp(0, 2, 0.5 + (current − previous) / windowHours / 10)
//!   acceleration = clamp(−1, 1, velocity − previousVelocity)
//!   sourceDiversity = min(1, uniqueSources / max(1, totalOccurrences))
//!   freshness = exp(−ageHours / 72)
//!   hotScore = 0.30·velocity + 0.20·((acceleration+1)/2)
//!            + 0.15·sourceDiversity + 0.15·freshness + 0.20·confidence
//!   (clamped to [0,1])

use chrono::{DateTime, Utc};

const W_VELOCITY: f64 = 0.30;
const W_ACCELERATION: f64 = 0.20;
const W_DIVERSITY: f64 = 0.15;
const W_FRESHNESS: f64 = 0.15;
const W_CONFIDENCE: f64 = 0.20;

/// Decay constant for freshness, in hours.
const FRESHNESS_DECAY_HOURS: f64 = 72.0;

/// Everything the scorer reads about one topic window.
#[derive(Debug, Clone)]
pub struct MomentumInputs {
    pub current_count: i64,
    pub previous_count: i64,
    pub previous_velocity: f64,
    pub window_hours: f64,
    pub unique_sources: i64,
    pub total_occurrences: i64,
    pub latest_signal_at: Option<DateTime<Utc>>,
    /// Averaged confidence input, already in [0,1]-ish range; clamped here.
    pub avg_confidence: f64,
}

/// All computed momentum components for a topic.
#[derive(Debug, Clone, PartialEq)]
pub struct MomentumComponents {
    pub velocity: f64,
    pub acceleration: f64,
    pub source_diversity: f64,
    pub freshness: f64,
    pub confidence: f64,
    pub hot_score: f64,
}

/// Compute all momentum components. Pure and deterministic given `now`.
pub fn score(inputs: &MomentumInputs, now: DateTime<Utc>) -> MomentumComponents {
    // Velocity is centered at 0.5 so "no change" reads mid-scale, not zero.
    // Growth from a zero baseline is defined as 1.0 rather than undefined.
    let velocity = if inputs.previous_count == 0 && inputs.current_count > 0 {
        1.0
    } else if inputs.window_hours > 0.0 {
        let delta = (inputs.current_count - inputs.previous_count) as f64;
        clamp(0.0, 2.0, 0.5 + delta / inputs.window_hours / 10.0)
    } else {
        0.5
    };

    let acceleration = clamp(-1.0, 1.0, velocity - inputs.previous_velocity);

    let source_diversity = if inputs.total_occurrences <= 0 {
        0.0
    } else {
        (inputs.unique_sources as f64 / inputs.total_occurrences.max(1) as f64).min(1.0)
    };

    let freshness = match inputs.latest_signal_at {
        Some(latest) => {
            let age_hours = ((now - latest).num_seconds().max(0) as f64) / 3600.0;
            (-age_hours / FRESHNESS_DECAY_HOURS).exp()
        }
        None => 0.0,
    };

    let confidence = clamp(0.0, 1.0, inputs.avg_confidence);

    let hot_score = clamp(
        0.0,
        1.0,
        W_VELOCITY * velocity
            + W_ACCELERATION * ((acceleration + 1.0) / 2.0)
            + W_DIVERSITY * source_diversity
            + W_FRESHNESS * freshness
            + W_CONFIDENCE * confidence,
    );

    MomentumComponents {
        velocity,
        acceleration,
        source_diversity,
        freshness,
        confidence,
        hot_score,
    }
}

fn clamp(min: f64, max: f64, value: f64) -> f64 {
    value.max(min).min(max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn base_inputs() -> MomentumInputs {
        MomentumInputs {
            current_count: 10,
            previous_count: 10,
            previous_velocity: 0.5,
            window_hours: 24.0,
            unique_sources: 5,
            total_occurrences: 10,
            latest_signal_at: Some(Utc::now()),
            avg_confidence: 0.5,
        }
    }

    #[test]
    fn reference_vector() {
        let now = Utc::now();
        let inputs = MomentumInputs {
            latest_signal_at: Some(now),
            ..base_inputs()
        };
        let c = score(&inputs, now);

        assert!((c.velocity - 0.5).abs() < 1e-9);
        assert!((c.acceleration - 0.0).abs() < 1e-9);
        assert!((c.source_diversity - 0.5).abs() < 1e-9);
        assert!((c.freshness - 1.0).abs() < 1e-9);
        assert!((c.confidence - 0.5).abs() < 1e-9);
        assert!((c.hot_score - 0.5125).abs() < 1e-9);
    }

    #[test]
    fn growth_with_no_baseline_defaults_velocity_to_one() {
        let inputs = MomentumInputs {
            current_count: 7,
            previous_count: 0,
            ..base_inputs()
        };
        let c = score(&inputs, Utc::now());
        assert!((c.velocity - 1.0).abs() < 1e-9);
    }

    #[test]
    fn empty_topic_scores_flat() {
        let inputs = MomentumInputs {
            current_count: 0,
            previous_count: 0,
            previous_velocity: 0.0,
            unique_sources: 0,
            total_occurrences: 0,
            latest_signal_at: None,
            avg_confidence: 0.0,
            ..base_inputs()
        };
        let c = score(&inputs, Utc::now());
        assert!((c.velocity - 0.5).abs() < 1e-9);
        assert_eq!(c.source_diversity, 0.0);
        assert_eq!(c.freshness, 0.0);
        assert_eq!(c.confidence, 0.0);
        assert!((0.0..=1.0).contains(&c.hot_score));
    }

    #[test]
    fn freshness_decays_with_age() {
        let now = Utc::now();
        let fresh = score(
            &MomentumInputs {
                latest_signal_at: Some(now),
                ..base_inputs()
            },
            now,
        );
        let stale = score(
            &MomentumInputs {
                latest_signal_at: Some(now - Duration::hours(72)),
                ..base_inputs()
            },
            now,
        );
        assert!(fresh.freshness > stale.freshness);
        assert!((stale.freshness - (-1.0f64).exp()).abs() < 1e-6);
    }

    #[test]
    fn future_timestamp_clamps_age_at_zero() {
        let now = Utc::now();
        let c = score(
            &MomentumInputs {
                latest_signal_at: Some(now + Duration::hours(5)),
                ..base_inputs()
            },
            now,
        );
        assert!((c.freshness - 1.0).abs() < 1e-9);
    }

    #[test]
    fn bounds_hold_under_extreme_inputs() {
        let now = Utc::now();
        let extreme = MomentumInputs {
            current_count: 1_000_000,
            previous_count: 0,
            previous_velocity: -50.0,
            window_hours: 0.1,
            unique_sources: 1_000_000,
            total_occurrences: 1,
            latest_signal_at: Some(now),
            avg_confidence: 100.0,
        };
        let c = score(&extreme, now);
        assert!((0.0..=1.0).contains(&c.hot_score));
        assert!((0.0..=1.0).contains(&c.source_diversity));
        assert!((0.0..=1.0).contains(&c.freshness));
        assert!((0.0..=1.0).contains(&c.confidence));
        assert!((0.0..=2.0).contains(&c.velocity));
        assert!((-1.0..=1.0).contains(&c.acceleration));
    }
}
