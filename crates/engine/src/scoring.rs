//! Risk scoring — turns analyzer signals and request context into a 0–100
//! score and its band.

use aegis_config::RiskWeights;
use aegis_core::{Error, Result, RiskBands, RiskLevel, RiskSignals};

/// Everything the scorer looks at for one request.
#[derive(Debug, Clone, Copy)]
pub struct ScoreInput<'a> {
    pub value: f64,
    pub high_value_threshold: f64,
    pub trust_score: u8,
    pub signals: &'a RiskSignals,
    /// Fraction of the daily limit in use if this request were approved.
    pub projected_daily_usage: f64,
    pub whitelisted: bool,
}

/// The score and the factors that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskAssessment {
    pub score: u8,
    pub level: RiskLevel,
    /// Non-zero contributions, largest first.
    pub contributions: Vec<(&'static str, f64)>,
}

impl RiskAssessment {
    /// The signal that contributed most, ignoring the baseline value and
    /// trust factors when any signal fired.
    pub fn dominant_factor(&self) -> Option<&'static str> {
        self.contributions
            .iter()
            .find(|(name, _)| !matches!(*name, "transaction value" | "agent trust deficit"))
            .or_else(|| self.contributions.first())
            .map(|(name, _)| *name)
    }
}

/// Additive, clamped risk model with configurable weights.
///
/// Every contribution is non-negative. The whitelist discount only applies
/// when no threat fired, so adding a signal never lowers the score.
#[derive(Debug, Clone, Default)]
pub struct RiskScorer {
    weights: RiskWeights,
}

impl RiskScorer {
    pub fn new(weights: RiskWeights) -> Self {
        Self { weights }
    }

    pub fn bands(&self) -> &RiskBands {
        &self.weights.bands
    }

    pub fn weights(&self) -> &RiskWeights {
        &self.weights
    }

    pub fn score(&self, input: &ScoreInput<'_>) -> Result<RiskAssessment> {
        let w = &self.weights;
        let s = input.signals;
        let mut parts: Vec<(&'static str, f64)> = Vec::new();

        let value_ratio = (input.value / input.high_value_threshold).clamp(0.0, 1.0);
        parts.push(("transaction value", f64::from(w.value) * value_ratio));

        let deficit = f64::from(100u8.saturating_sub(input.trust_score));
        parts.push(("agent trust deficit", deficit * f64::from(w.trust_deficit) / 100.0));

        let flags: [(bool, &'static str, u8); 8] = [
            (s.injection_detected, "prompt injection detected", w.injection),
            (s.is_drain_pattern, "drain function call", w.drain_pattern),
            (s.intent_target_mismatch, "intent does not match target", w.intent_target_mismatch),
            (s.ambiguous_recipient, "ambiguous recipient", w.ambiguous_recipient),
            (s.amount_mismatch, "intent amount does not match value", w.amount_mismatch),
            (s.risky_function.is_some(), "risky function call", w.risky_function),
            (s.unknown_protocol, "unknown protocol", w.unknown_protocol),
            (
                input.projected_daily_usage >= w.daily_usage_ratio,
                "high daily usage",
                w.daily_usage,
            ),
        ];
        for (fired, name, weight) in flags {
            if fired {
                parts.push((name, f64::from(weight)));
            }
        }

        let mut raw: f64 = parts.iter().map(|(_, v)| v).sum();
        // Threats keep their full weight even toward trusted destinations.
        if input.whitelisted && !s.is_threat() {
            raw -= f64::from(w.whitelist_discount);
        }
        if !raw.is_finite() {
            return Err(Error::Internal(format!("non-finite risk score {raw}")));
        }

        let score = raw.clamp(0.0, 100.0).round() as u8;
        parts.retain(|(_, v)| *v > 0.0);
        parts.sort_by(|a, b| b.1.total_cmp(&a.1));

        Ok(RiskAssessment {
            score,
            level: w.bands.level(score),
            contributions: parts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(value: f64, trust: u8, signals: &RiskSignals) -> ScoreInput<'_> {
        ScoreInput {
            value,
            high_value_threshold: 0.5,
            trust_score: trust,
            signals,
            projected_daily_usage: 0.0,
            whitelisted: false,
        }
    }

    #[test]
    fn clean_low_value_is_low() {
        let signals = RiskSignals::default();
        let a = RiskScorer::default().score(&input(0.1, 50, &signals)).unwrap();
        // 35 * 0.2 + 50 * 20 / 100
        assert_eq!(a.score, 17);
        assert_eq!(a.level, RiskLevel::Low);
    }

    #[test]
    fn whitelist_discount_applies() {
        let signals = RiskSignals::default();
        let mut i = input(0.1, 50, &signals);
        i.whitelisted = true;
        assert_eq!(RiskScorer::default().score(&i).unwrap().score, 7);
    }

    #[test]
    fn injection_alone_reaches_critical() {
        let signals = RiskSignals {
            injection_detected: true,
            ..RiskSignals::default()
        };
        let a = RiskScorer::default().score(&input(0.0, 100, &signals)).unwrap();
        assert!(a.score >= 75);
        assert_eq!(a.level, RiskLevel::Critical);
        assert_eq!(a.dominant_factor(), Some("prompt injection detected"));
    }

    #[test]
    fn drain_alone_reaches_critical() {
        let signals = RiskSignals {
            is_drain_pattern: true,
            ..RiskSignals::default()
        };
        let a = RiskScorer::default().score(&input(0.0, 100, &signals)).unwrap();
        assert_eq!(a.score, 75);
        assert_eq!(a.level, RiskLevel::Critical);
    }

    #[test]
    fn whitelist_does_not_discount_threats() {
        let signals = RiskSignals {
            is_drain_pattern: true,
            ..RiskSignals::default()
        };
        let mut i = input(0.0, 100, &signals);
        i.whitelisted = true;
        assert_eq!(RiskScorer::default().score(&i).unwrap().level, RiskLevel::Critical);
    }

    #[test]
    fn mismatch_with_high_value_is_critical() {
        let signals = RiskSignals {
            intent_target_mismatch: true,
            ..RiskSignals::default()
        };
        let a = RiskScorer::default().score(&input(0.6, 50, &signals)).unwrap();
        assert_eq!(a.score, 80);
        let low = RiskScorer::default().score(&input(0.2, 50, &signals)).unwrap();
        assert_eq!(low.level, RiskLevel::High);
    }

    #[test]
    fn score_is_clamped() {
        let signals = RiskSignals {
            injection_detected: true,
            is_drain_pattern: true,
            intent_target_mismatch: true,
            ambiguous_recipient: true,
            ..RiskSignals::default()
        };
        let a = RiskScorer::default().score(&input(5.0, 0, &signals)).unwrap();
        assert_eq!(a.score, 100);
    }

    #[test]
    fn adding_signals_never_lowers_score() {
        let scorer = RiskScorer::default();
        let mut signals = RiskSignals::default();
        let mut previous = scorer.score(&input(0.3, 40, &signals)).unwrap().score;
        for step in 0..4 {
            match step {
                0 => signals.ambiguous_recipient = true,
                1 => signals.intent_target_mismatch = true,
                2 => signals.is_drain_pattern = true,
                _ => signals.injection_detected = true,
            }
            let next = scorer.score(&input(0.3, 40, &signals)).unwrap().score;
            assert!(next >= previous);
            previous = next;
        }
    }

    #[test]
    fn high_daily_usage_adds_weight() {
        let signals = RiskSignals::default();
        let mut i = input(0.1, 50, &signals);
        i.projected_daily_usage = 0.85;
        assert_eq!(RiskScorer::default().score(&i).unwrap().score, 27);
    }

    #[test]
    fn non_finite_input_is_an_error() {
        let signals = RiskSignals::default();
        let a = RiskScorer::default().score(&input(f64::NAN, 50, &signals));
        // NaN ratio clamps to NaN and poisons the sum
        assert!(a.is_err());
    }
}
