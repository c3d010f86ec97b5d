//! Per-sample regime selection and hinge evaluation.
//!
//! A sample pair is [`Supervised`](SampleRegime::Supervised) when both sides carry a label and
//! [`Unsupervised`](SampleRegime::Unsupervised) when at least one side carries the ignore label.
//! A hinge is active only when its margin is strictly positive; a margin of exactly zero yields
//! zero loss and zero gradient.

use crate::config::SemiHingeLossConfig;

/// Loss regime of one sample pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleRegime {
    /// Both labels present: contrastive hinge on the label agreement.
    Supervised,
    /// At least one label missing: two-sided hinge around `unsup_thre`.
    Unsupervised,
}

impl SampleRegime {
    /// Classifies a sample pair from its two labels.
    pub const fn classify(label0: i64, label1: i64, ignore_label: i64) -> Self {
        if label0 != ignore_label && label1 != ignore_label {
            Self::Supervised
        } else {
            Self::Unsupervised
        }
    }
}

/// Hinge state recorded for one sample during forward and consumed by backward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HingeTerm {
    /// Regime the sample was evaluated under.
    pub regime: SampleRegime,
    /// Whether the hinge margin was strictly positive.
    pub active: bool,
    /// `y` for supervised samples, `sign(unsup_thre - D)` for unsupervised ones.
    pub sign: f64,
}

impl Default for HingeTerm {
    fn default() -> Self {
        Self {
            regime: SampleRegime::Unsupervised,
            active: false,
            sign: 1.0,
        }
    }
}

impl HingeTerm {
    /// Evaluates the hinge of one sample pair at squared distance `dist`.
    ///
    /// Returns the weighted per-sample loss `l_i` (before the `1 / 2N` normalisation) together
    /// with the state backward needs.
    pub fn evaluate(
        config: &SemiHingeLossConfig,
        label0: i64,
        label1: i64,
        dist: f64,
    ) -> (f64, Self) {
        let regime = SampleRegime::classify(label0, label1, config.ignore_label);
        let (margin, sign, weight) = match regime {
            SampleRegime::Supervised => {
                let y = if label0 == label1 { 1.0 } else { -1.0 };
                (config.sup_bias - y * (config.sup_thre - dist), y, 1.0)
            }
            SampleRegime::Unsupervised => {
                let u = config.unsup_thre - dist;
                let sign = if u >= 0.0 { 1.0 } else { -1.0 };
                (config.unsup_bias - u.abs(), sign, config.gamma)
            }
        };

        let active = margin > 0.0;
        let loss = if active { weight * margin } else { 0.0 };
        (
            loss,
            Self {
                regime,
                active,
                sign,
            },
        )
    }

    /// Derivative of the weighted per-sample loss with respect to the squared distance.
    pub fn slope(&self, gamma: f64) -> f64 {
        if !self.active {
            return 0.0;
        }
        match self.regime {
            SampleRegime::Supervised => self.sign,
            SampleRegime::Unsupervised => gamma * self.sign,
        }
    }
}
