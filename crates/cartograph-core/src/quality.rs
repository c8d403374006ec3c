//! Quality metrics and reports.
//!
//! The evaluator scores a rendered diagram on five independent [`Metric`]s,
//! each in `[0, 1]`. The overall score is the weighted mean of those scores
//! under a fixed [`MetricWeights`] table whose entries sum to one.

use std::fmt;

use indexmap::IndexMap;
use log::warn;
use serde::Deserialize;
use thiserror::Error;

/// Tolerance when checking that weights sum to one.
const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// A quality dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Metric {
    Clarity,
    Completeness,
    Structure,
    Readability,
    Semantic,
}

impl Metric {
    /// All metrics in their fixed order. Ties are broken by this order.
    pub const ALL: [Metric; 5] = [
        Metric::Clarity,
        Metric::Completeness,
        Metric::Structure,
        Metric::Readability,
        Metric::Semantic,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Metric::Clarity => "clarity",
            Metric::Completeness => "completeness",
            Metric::Structure => "structure",
            Metric::Readability => "readability",
            Metric::Semantic => "semantic",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors raised by [`MetricWeights::validate`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WeightsError {
    #[error("weight for {metric} must be a finite non-negative number, got {value}")]
    Invalid { metric: Metric, value: f64 },

    #[error("metric weights must sum to 1.0, got {0}")]
    BadSum(f64),
}

/// Per-metric weights of the overall score.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct MetricWeights {
    clarity: f64,
    completeness: f64,
    structure: f64,
    readability: f64,
    semantic: f64,
}

impl Default for MetricWeights {
    fn default() -> Self {
        Self {
            clarity: 0.25,
            completeness: 0.20,
            structure: 0.20,
            readability: 0.15,
            semantic: 0.20,
        }
    }
}

impl MetricWeights {
    /// Creates weights in [`Metric::ALL`] order. Call [`validate`](Self::validate)
    /// before use.
    pub fn new(weights: [f64; 5]) -> Self {
        let [clarity, completeness, structure, readability, semantic] = weights;
        Self {
            clarity,
            completeness,
            structure,
            readability,
            semantic,
        }
    }

    pub fn weight(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Clarity => self.clarity,
            Metric::Completeness => self.completeness,
            Metric::Structure => self.structure,
            Metric::Readability => self.readability,
            Metric::Semantic => self.semantic,
        }
    }

    /// Checks every weight is finite and non-negative and that they sum to one.
    pub fn validate(&self) -> Result<(), WeightsError> {
        for metric in Metric::ALL {
            let value = self.weight(metric);
            if !value.is_finite() || value < 0.0 {
                return Err(WeightsError::Invalid { metric, value });
            }
        }
        let sum: f64 = Metric::ALL.iter().map(|&m| self.weight(m)).sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(WeightsError::BadSum(sum));
        }
        Ok(())
    }

    /// Weighted mean of `scores`; a missing metric counts as zero.
    pub fn weighted_mean(&self, scores: &IndexMap<Metric, f64>) -> f64 {
        Metric::ALL
            .iter()
            .map(|&metric| self.weight(metric) * scores.get(&metric).copied().unwrap_or(0.0))
            .sum()
    }
}

/// Scores, overall score and improvement suggestions for one artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct QualityReport {
    scores: IndexMap<Metric, f64>,
    overall: f64,
    suggestions: Vec<String>,
}

impl QualityReport {
    /// Builds a report; scores are clamped to `[0, 1]` and stored in metric order.
    pub fn new(
        scores: IndexMap<Metric, f64>,
        weights: &MetricWeights,
        suggestions: Vec<String>,
    ) -> Self {
        let scores: IndexMap<Metric, f64> = Metric::ALL
            .iter()
            .map(|&metric| {
                let raw = scores.get(&metric).copied().unwrap_or(0.0);
                let score = if raw.is_nan() { 0.0 } else { raw.clamp(0.0, 1.0) };
                if score != raw {
                    warn!(metric:% = metric, score = raw; "Score outside [0, 1] clamped");
                }
                (metric, score)
            })
            .collect();
        let overall = weights.weighted_mean(&scores);
        Self {
            scores,
            overall,
            suggestions,
        }
    }

    pub fn scores(&self) -> &IndexMap<Metric, f64> {
        &self.scores
    }

    pub fn score(&self, metric: Metric) -> f64 {
        self.scores.get(&metric).copied().unwrap_or(0.0)
    }

    pub fn overall(&self) -> f64 {
        self.overall
    }

    pub fn suggestions(&self) -> &[String] {
        &self.suggestions
    }

    /// The lowest scoring metric, earliest in [`Metric::ALL`] on ties.
    pub fn weakest(&self) -> Metric {
        let mut weakest = Metric::Clarity;
        for metric in Metric::ALL {
            if self.score(metric) < self.score(weakest) {
                weakest = metric;
            }
        }
        weakest
    }
}

impl fmt::Display for QualityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "overall {:.3} (", self.overall)?;
        for (i, (metric, score)) in self.scores.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{metric} {score:.2}")?;
        }
        write!(f, ")")
    }
}


#[cfg(test)]
mod proptest_tests {
    use float_cmp::approx_eq;
    use proptest::prelude::*;

    use super::*;

    // ===================
    // Strategies
    // ===================

    fn scores_strategy() -> impl Strategy<Value = [f64; 5]> {
        prop::array::uniform5(0.0f64..=1.0)
    }

    /// Raw positive weights normalized to sum to one.
    fn weights_strategy() -> impl Strategy<Value = MetricWeights> {
        prop::array::uniform5(0.01f64..10.0).prop_map(|raw| {
            let sum: f64 = raw.iter().sum();
            MetricWeights::new(raw.map(|w| w / sum))
        })
    }

    // ===================
    // Property Test Functions
    // ===================

    /// The overall score equals the explicit weighted mean of the scores.
    fn check_overall_is_weighted_mean(
        values: [f64; 5],
        weights: MetricWeights,
    ) -> Result<(), TestCaseError> {
        let report = QualityReport::new(
            Metric::ALL.into_iter().zip(values).collect(),
            &weights,
            vec![],
        );
        let expected: f64 = Metric::ALL
            .iter()
            .zip(values)
            .map(|(&metric, score)| weights.weight(metric) * score)
            .sum();
        prop_assert!(
            approx_eq!(f64, report.overall(), expected, epsilon = 1e-9),
            "overall {} != weighted mean {expected}",
            report.overall()
        );
        Ok(())
    }

    /// The overall score stays within `[0, 1]` for normalized weights.
    fn check_overall_in_unit_interval(
        values: [f64; 5],
        weights: MetricWeights,
    ) -> Result<(), TestCaseError> {
        let report = QualityReport::new(
            Metric::ALL.into_iter().zip(values).collect(),
            &weights,
            vec![],
        );
        prop_assert!(report.overall() >= -1e-9 && report.overall() <= 1.0 + 1e-9);
        Ok(())
    }

    /// Normalized weights always pass validation.
    fn check_normalized_weights_validate(weights: MetricWeights) -> Result<(), TestCaseError> {
        prop_assert!(weights.validate().is_ok());
        Ok(())
    }

    // ===================
    // Property Tests
    // ===================

    proptest! {
        #[test]
        fn overall_is_weighted_mean(values in scores_strategy(), weights in weights_strategy()) {
            check_overall_is_weighted_mean(values, weights)?;
        }

        #[test]
        fn overall_in_unit_interval(values in scores_strategy(), weights in weights_strategy()) {
            check_overall_in_unit_interval(values, weights)?;
        }

        #[test]
        fn normalized_weights_validate(weights in weights_strategy()) {
            check_normalized_weights_validate(weights)?;
        }
    }
}
