//! Discrete distributions of tick durations.

use std::fmt;

use itertools::Itertools;
use rand::distributions::Distribution;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Identifies which of the two duration samplers of a simulation is meant, e.g., in error
/// messages and logs.
#[derive(
    Debug,
    PartialEq,
    Eq,
    Clone,
    Copy,
    strum::Display,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum SamplerRole {
    /// Time between two consecutive arrivals.
    InterArrival,
    /// Time a server spends on a single customer.
    Service,
}

/// A single row of a probability table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TableEntry {
    /// The value produced when this row is drawn.
    pub value: i64,
    /// Probability of drawing this row. Normalized once the sampler is constructed.
    pub probability: f64,
}

impl From<(i64, f64)> for TableEntry {
    fn from((value, probability): (i64, f64)) -> Self {
        Self { value, probability }
    }
}

/// Samples integer values from a finite probability table.
///
/// The table is normalized at construction and never changes afterwards. All randomness comes
/// from the generator passed to [`DiscreteSampler::sample`], so that a simulation holding a single
/// seeded generator is fully reproducible.
///
/// # Examples
///
/// ```
/// # use qsim::DiscreteSampler;
/// # use rand::SeedableRng;
/// let sampler = DiscreteSampler::new(vec![(1, 1.0), (2, 3.0)])?;
/// assert_eq!(sampler.entries()[1].probability, 0.75);
/// let mut rng = rand_chacha::ChaChaRng::seed_from_u64(17);
/// let value = sampler.sample(&mut rng);
/// assert!(value == 1 || value == 2);
/// # Ok::<(), qsim::ConfigError>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DiscreteSampler {
    entries: Vec<TableEntry>,
    cumulative: Vec<f64>,
}

impl DiscreteSampler {
    /// Constructs a sampler from `(value, probability)` rows, kept in the given order.
    ///
    /// Probabilities need not sum to one: they are divided by their sum.
    ///
    /// # Errors
    ///
    /// Returns an error if the table is empty, any probability is negative or not finite, or
    /// the probabilities sum to zero or overflow.
    pub fn new<I, E>(table: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = E>,
        E: Into<TableEntry>,
    {
        let mut entries: Vec<TableEntry> = table.into_iter().map(Into::into).collect();
        if entries.is_empty() {
            return Err(ConfigError::EmptyTable);
        }
        if let Some(entry) = entries
            .iter()
            .find(|e| !e.probability.is_finite() || e.probability < 0.0)
        {
            return Err(ConfigError::InvalidProbability {
                value: entry.value,
                probability: entry.probability,
            });
        }
        let sum: f64 = entries.iter().map(|e| e.probability).sum();
        if !sum.is_finite() {
            return Err(ConfigError::NonFiniteSum(sum));
        }
        if sum <= 0.0 {
            return Err(ConfigError::NonPositiveSum(sum));
        }
        for entry in &mut entries {
            entry.probability /= sum;
        }
        let mut cumulative: Vec<f64> = entries
            .iter()
            .scan(0.0, |acc: &mut f64, e| {
                *acc = (*acc + e.probability).min(1.0);
                Some(*acc)
            })
            .collect();
        if let Some(last) = cumulative.last_mut() {
            *last = 1.0;
        }
        Ok(Self {
            entries,
            cumulative,
        })
    }

    /// Constructs a sampler that always returns `value`.
    #[must_use]
    pub fn constant(value: i64) -> Self {
        Self {
            entries: vec![TableEntry {
                value,
                probability: 1.0,
            }],
            cumulative: vec![1.0],
        }
    }

    /// Draws one uniform variate from `rng` and maps it to a table value.
    ///
    /// Returns the first value whose cumulative probability is at least the drawn variate. Rows
    /// with zero probability are never drawn, even for a variate of exactly zero, so that a
    /// zero-weighted duration cannot leak into a simulation. If rounding leaves the variate above
    /// every cumulative value, the last drawable value is returned.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> i64 {
        let u: f64 = rng.gen();
        self.value_at(u)
    }

    fn value_at(&self, u: f64) -> i64 {
        self.entries
            .iter()
            .zip(&self.cumulative)
            .find(|&(e, &c)| e.probability > 0.0 && u <= c)
            .map_or_else(|| self.last_value(), |(e, _)| e.value)
    }

    fn last_value(&self) -> i64 {
        self.support()
            .last()
            .expect("sampler tables always have a row with positive probability")
    }

    /// Normalized table rows, in their original order.
    #[must_use]
    pub fn entries(&self) -> &[TableEntry] {
        &self.entries
    }

    /// Cumulative probabilities; the last one is always exactly `1.0`.
    #[must_use]
    pub fn cumulative(&self) -> &[f64] {
        &self.cumulative
    }

    /// The smallest value that can be drawn. Rows with zero probability are ignored.
    #[must_use]
    pub fn min_value(&self) -> i64 {
        self.support()
            .min()
            .expect("sampler tables always have a row with positive probability")
    }

    /// The largest value that can be drawn. Rows with zero probability are ignored.
    #[must_use]
    pub fn max_value(&self) -> i64 {
        self.support()
            .max()
            .expect("sampler tables always have a row with positive probability")
    }

    /// The expected value of a draw.
    #[must_use]
    pub fn mean(&self) -> f64 {
        self.entries
            .iter()
            .map(|e| e.value as f64 * e.probability)
            .sum()
    }

    fn support(&self) -> impl Iterator<Item = i64> + '_ {
        self.entries
            .iter()
            .filter(|e| e.probability > 0.0)
            .map(|e| e.value)
    }
}

impl Distribution<i64> for DiscreteSampler {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> i64 {
        DiscreteSampler::sample(self, rng)
    }
}

impl fmt::Display for DiscreteSampler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}]",
            self.entries
                .iter()
                .format_with(", ", |e, f| f(&format_args!("{}: {:.4}", e.value, e.probability)))
        )
    }
}
