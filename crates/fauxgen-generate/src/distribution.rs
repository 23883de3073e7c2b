use std::cell::RefCell;
use std::f64::consts::TAU;
use std::fmt;

use rand::{Rng, RngCore};

use crate::errors::GenerationError;
use crate::field_types::{FieldKind, FieldType};
use crate::model::GeneratedValue;

const NORMAL_RESAMPLE_LIMIT: usize = 16;
const PERCENT_TOTAL: f64 = 100.0;
const PERCENT_TOLERANCE: f64 = 1e-6;
const DEFICIT_EPSILON: f64 = 1e-12;

/// Sampling shape applied across a domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistributionKind {
    Uniform,
    Normal,
    Weight,
    Percent,
}

impl DistributionKind {
    pub fn parse(value: &str) -> Result<Self, GenerationError> {
        match value {
            "uniform" => Ok(Self::Uniform),
            "normal" => Ok(Self::Normal),
            "weight" | "weighted" => Ok(Self::Weight),
            "percent" | "percentage" => Ok(Self::Percent),
            other => Err(GenerationError::DistributionConfiguration(format!(
                "unknown distribution '{other}'; expected uniform, normal, weight or percent"
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uniform => "uniform",
            Self::Normal => "normal",
            Self::Weight => "weight",
            Self::Percent => "percent",
        }
    }

    pub fn supports_multiple_intervals(self) -> bool {
        matches!(self, Self::Weight | Self::Percent)
    }

    pub fn is_compatible(self, kind: FieldKind) -> bool {
        match self {
            Self::Uniform => kind.is_numeric(),
            Self::Normal => kind == FieldKind::Decimal,
            Self::Weight | Self::Percent => kind.is_interval(),
        }
    }
}

impl fmt::Display for DistributionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One member of a domain.
#[derive(Debug, Clone)]
pub struct Interval {
    pub field_type: FieldType,
    pub weight: Option<f64>,
}

impl Interval {
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            weight: None,
        }
    }

    pub fn weighted(field_type: FieldType, weight: f64) -> Self {
        Self {
            field_type,
            weight: Some(weight),
        }
    }
}

/// Validated domain plus the sampling state of its kind.
#[derive(Debug, Clone)]
pub struct Distribution {
    kind: DistributionKind,
    intervals: Vec<FieldType>,
    weights: Vec<f64>,
    bins: RefCell<Vec<u64>>,
}

impl Distribution {
    pub fn new(kind: DistributionKind, domain: Vec<Interval>) -> Result<Self, GenerationError> {
        if domain.is_empty() {
            return Err(GenerationError::DistributionConfiguration(format!(
                "{kind} distribution requires at least one interval"
            )));
        }
        if !kind.supports_multiple_intervals() && domain.len() > 1 {
            return Err(GenerationError::DistributionConfiguration(format!(
                "{kind} distribution accepts exactly one interval, found {}",
                domain.len()
            )));
        }

        let first = domain[0].field_type.kind();
        if domain.iter().any(|interval| interval.field_type.kind() != first) {
            return Err(GenerationError::DistributionConfiguration(
                "Each distribution domain must be of the same type".to_string(),
            ));
        }
        if !kind.is_compatible(first) {
            return Err(GenerationError::DistributionConfiguration(format!(
                "{kind} distribution is not compatible with {first} intervals"
            )));
        }

        let weights = resolve_weights(kind, &domain)?;
        let intervals: Vec<FieldType> = domain
            .into_iter()
            .map(|interval| interval.field_type)
            .collect();
        let bins = RefCell::new(vec![0; intervals.len()]);

        Ok(Self {
            kind,
            intervals,
            weights,
            bins,
        })
    }

    pub fn kind(&self) -> DistributionKind {
        self.kind
    }

    pub fn intervals(&self) -> &[FieldType] {
        &self.intervals
    }

    /// Draws allocated to each interval so far (percent only).
    pub fn allocations(&self) -> Vec<u64> {
        self.bins.borrow().clone()
    }

    pub fn sample(&self, rng: &mut dyn RngCore) -> Result<GeneratedValue, GenerationError> {
        match self.kind {
            DistributionKind::Uniform => self.intervals[0].sample(rng),
            DistributionKind::Normal => self.sample_normal(rng),
            DistributionKind::Weight => {
                let index = self.pick_weighted(rng);
                self.intervals[index].sample(rng)
            }
            DistributionKind::Percent => {
                let index = self.pick_percent();
                self.intervals[index].sample(rng)
            }
        }
    }

    fn sample_normal(&self, rng: &mut dyn RngCore) -> Result<GeneratedValue, GenerationError> {
        let FieldType::Decimal { min, max } = &self.intervals[0] else {
            return self.intervals[0].sample(rng);
        };
        let (min, max) = (*min, *max);
        if max <= min {
            return Ok(GeneratedValue::Float(min));
        }

        // mean at the midpoint, three deviations to either bound
        let mean = (min + max) / 2.0;
        let deviation = (max - min) / 6.0;
        let mut value = mean;
        for _ in 0..NORMAL_RESAMPLE_LIMIT {
            value = mean + deviation * standard_normal(rng);
            if (min..=max).contains(&value) {
                return Ok(GeneratedValue::Float(value));
            }
        }
        Ok(GeneratedValue::Float(value.clamp(min, max)))
    }

    fn pick_weighted(&self, rng: &mut dyn RngCore) -> usize {
        let total: f64 = self.weights.iter().sum();
        let mut target = rng.random_range(0.0..total);
        for (index, weight) in self.weights.iter().enumerate() {
            if target < *weight {
                return index;
            }
            target -= weight;
        }
        self.weights.len() - 1
    }

    /// Interval whose actual share lags its target share the most.
    fn pick_percent(&self) -> usize {
        let mut bins = self.bins.borrow_mut();
        let drawn: u64 = bins.iter().sum();

        let mut best = 0;
        let mut best_deficit = f64::NEG_INFINITY;
        for (index, weight) in self.weights.iter().enumerate() {
            let target = weight / PERCENT_TOTAL;
            let actual = if drawn == 0 {
                0.0
            } else {
                bins[index] as f64 / drawn as f64
            };
            let deficit = target - actual;
            if deficit > best_deficit + DEFICIT_EPSILON {
                best = index;
                best_deficit = deficit;
            }
        }

        bins[best] += 1;
        best
    }
}

fn resolve_weights(kind: DistributionKind, domain: &[Interval]) -> Result<Vec<f64>, GenerationError> {
    match kind {
        DistributionKind::Uniform | DistributionKind::Normal => Ok(vec![1.0]),
        DistributionKind::Weight => {
            let weights = domain
                .iter()
                .map(|interval| {
                    let weight = interval.weight.unwrap_or(1.0);
                    if weight.is_finite() && weight > 0.0 {
                        Ok(weight)
                    } else {
                        Err(GenerationError::DistributionConfiguration(format!(
                            "weight {weight} must be a positive number"
                        )))
                    }
                })
                .collect::<Result<Vec<f64>, _>>()?;

            let total: f64 = weights.iter().sum();
            if !total.is_finite() {
                return Err(GenerationError::DistributionConfiguration(
                    "weights are too large to sum".to_string(),
                ));
            }
            Ok(weights)
        }
        DistributionKind::Percent => {
            let weights = domain
                .iter()
                .map(|interval| {
                    let weight = interval.weight.ok_or_else(|| {
                        GenerationError::DistributionConfiguration(
                            "percent intervals require a percentage".to_string(),
                        )
                    })?;
                    if weight.is_finite() && weight >= 0.0 {
                        Ok(weight)
                    } else {
                        Err(GenerationError::DistributionConfiguration(format!(
                            "percentage {weight} must not be negative"
                        )))
                    }
                })
                .collect::<Result<Vec<f64>, _>>()?;

            let total: f64 = weights.iter().sum();
            if (total - PERCENT_TOTAL).abs() > PERCENT_TOLERANCE {
                return Err(GenerationError::DistributionConfiguration(format!(
                    "percentages must sum to 100, found {total}"
                )));
            }
            Ok(weights)
        }
    }
}

/// Box-Muller transform over two uniform draws.
fn standard_normal(rng: &mut dyn RngCore) -> f64 {
    let u1: f64 = 1.0 - rng.random::<f64>();
    let u2: f64 = rng.random::<f64>();
    (-2.0 * u1.ln()).sqrt() * (TAU * u2).cos()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn int_interval(min: i64, max: i64, weight: f64) -> Interval {
        Interval::weighted(FieldType::integer(min, max).expect("valid"), weight)
    }

    fn count_in(values: &[i64], min: i64, max: i64) -> usize {
        values.iter().filter(|value| (min..=max).contains(*value)).count()
    }

    fn draw_ints(distribution: &Distribution, draws: usize, seed: u64) -> Vec<i64> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        (0..draws)
            .map(|_| {
                distribution
                    .sample(&mut rng)
                    .expect("sample")
                    .as_i64()
                    .expect("integer")
            })
            .collect()
    }

    #[test]
    fn percent_split_evenly_is_exact() {
        let distribution = Distribution::new(
            DistributionKind::Percent,
            vec![int_interval(1, 10, 50.0), int_interval(100, 110, 50.0)],
        )
        .expect("valid distribution");
        let values = draw_ints(&distribution, 10, 42);
        assert_eq!(count_in(&values, 1, 10), 5);
        assert_eq!(count_in(&values, 100, 110), 5);
    }

    #[test]
    fn percent_sixty_forty_is_exact() {
        let distribution = Distribution::new(
            DistributionKind::Percent,
            vec![int_interval(1, 10, 60.0), int_interval(100, 110, 40.0)],
        )
        .expect("valid distribution");
        let values = draw_ints(&distribution, 10, 7);
        assert_eq!(count_in(&values, 1, 10), 6);
        assert_eq!(count_in(&values, 100, 110), 4);
        assert_eq!(distribution.allocations(), vec![6, 4]);
    }

    #[test]
    fn percent_must_sum_to_one_hundred() {
        let err = Distribution::new(
            DistributionKind::Percent,
            vec![int_interval(1, 10, 30.0), int_interval(100, 110, 30.0)],
        )
        .expect_err("bad percentages");
        assert!(matches!(err, GenerationError::DistributionConfiguration(_)));
    }

    #[test]
    fn weight_stays_inside_intervals() {
        let distribution = Distribution::new(
            DistributionKind::Weight,
            vec![
                int_interval(1, 3, 1.0),
                int_interval(50, 60, 5.0),
                int_interval(-10, -8, 0.5),
            ],
        )
        .expect("valid distribution");
        for draws in [1, 7, 300] {
            let values = draw_ints(&distribution, draws, draws as u64);
            let inside = count_in(&values, 1, 3)
                + count_in(&values, 50, 60)
                + count_in(&values, -10, -8);
            assert_eq!(inside, draws);
        }
    }

    #[test]
    fn weights_must_sum_to_a_finite_total() {
        let err = Distribution::new(
            DistributionKind::Weight,
            vec![int_interval(1, 3, 1e308), int_interval(5, 9, 1e308)],
        )
        .expect_err("total overflows");
        assert!(matches!(err, GenerationError::DistributionConfiguration(_)));
    }

    #[test]
    fn mixed_interval_types_are_rejected() {
        let err = Distribution::new(
            DistributionKind::Weight,
            vec![
                int_interval(1, 3, 1.0),
                Interval::weighted(FieldType::decimal(1.0, 2.0).expect("valid"), 1.0),
            ],
        )
        .expect_err("mixed domain");
        assert_eq!(
            err.to_string(),
            "invalid distribution: Each distribution domain must be of the same type"
        );
    }

    #[test]
    fn single_interval_kinds_reject_many() {
        for kind in [DistributionKind::Uniform, DistributionKind::Normal] {
            let domain = vec![
                Interval::new(FieldType::decimal(1.0, 2.0).expect("valid")),
                Interval::new(FieldType::decimal(3.0, 4.0).expect("valid")),
            ];
            assert!(Distribution::new(kind, domain).is_err());
        }
    }

    #[test]
    fn normal_requires_decimal_and_stays_in_bounds() {
        assert!(
            Distribution::new(
                DistributionKind::Normal,
                vec![Interval::new(FieldType::integer(1, 10).expect("valid"))],
            )
            .is_err()
        );

        let distribution = Distribution::new(
            DistributionKind::Normal,
            vec![Interval::new(FieldType::decimal(10.0, 20.0).expect("valid"))],
        )
        .expect("valid distribution");
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        let mut total = 0.0;
        for _ in 0..1000 {
            let value = distribution
                .sample(&mut rng)
                .expect("sample")
                .as_f64()
                .expect("float");
            assert!((10.0..=20.0).contains(&value));
            total += value;
        }
        let mean = total / 1000.0;
        assert!((mean - 15.0).abs() < 0.5, "mean {mean} drifted from midpoint");
    }

    #[test]
    fn uniform_rejects_non_numeric() {
        assert!(
            Distribution::new(DistributionKind::Uniform, vec![Interval::new(FieldType::Bool)])
                .is_err()
        );
    }
}
