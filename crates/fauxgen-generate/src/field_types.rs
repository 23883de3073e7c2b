use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use chrono::{NaiveDateTime, TimeDelta};
use rand::{Rng, RngCore};

use crate::dictionary::Dictionary;
use crate::distribution::Distribution;
use crate::emitter::Emitter;
use crate::errors::GenerationError;
use crate::generator::Generator;
use crate::model::{EntityResult, GeneratedValue};

/// Characters drawn by `string` fields.
pub const TEXT_ALPHABET: &[u8] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789!@";

pub const DEFAULT_TEXT_LENGTH: usize = 5;
pub const DEFAULT_INTEGER_RANGE: (i64, i64) = (1, 10);
pub const DEFAULT_DECIMAL_RANGE: (f64, f64) = (1.0, 10.0);

/// Value computed per record from the fields generated before it.
pub trait DynamicField: fmt::Debug {
    fn resolve(&self, record: &EntityResult) -> Result<GeneratedValue, GenerationError>;
}

/// Coarse classification used by distributions to compare interval types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Literal,
    Text,
    Integer,
    Decimal,
    Date,
    Bool,
    Dict,
    Enum,
    Serial,
    Uid,
    Entity,
    Dynamic,
    Distribution,
}

impl FieldKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldKind::Literal => "literal",
            FieldKind::Text => "string",
            FieldKind::Integer => "integer",
            FieldKind::Decimal => "decimal",
            FieldKind::Date => "date",
            FieldKind::Bool => "bool",
            FieldKind::Dict => "dict",
            FieldKind::Enum => "enum",
            FieldKind::Serial => "serial",
            FieldKind::Uid => "uid",
            FieldKind::Entity => "entity",
            FieldKind::Dynamic => "dynamic",
            FieldKind::Distribution => "distribution",
        }
    }

    /// Whether values of this kind can form one interval of a domain.
    pub fn is_interval(self) -> bool {
        !matches!(
            self,
            FieldKind::Serial
                | FieldKind::Uid
                | FieldKind::Entity
                | FieldKind::Dynamic
                | FieldKind::Distribution
        )
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, FieldKind::Integer | FieldKind::Decimal)
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value-producing primitive behind a field.
#[derive(Debug, Clone)]
pub enum FieldType {
    Literal(GeneratedValue),
    Text {
        length: usize,
    },
    Integer {
        min: i64,
        max: i64,
    },
    Decimal {
        min: f64,
        max: f64,
    },
    Date {
        min: NaiveDateTime,
        max: NaiveDateTime,
        format: Option<String>,
    },
    Bool,
    Dict {
        category: String,
        dictionary: Rc<Dictionary>,
    },
    Enum {
        values: Vec<GeneratedValue>,
    },
    Serial {
        next: Cell<i64>,
    },
    Uid,
    Entity(Rc<Generator>),
    Dynamic(Rc<dyn DynamicField>),
    Distribution(Distribution),
}

/// What a field sees of the record being assembled.
pub struct FieldContext<'a> {
    pub owner: &'a str,
    pub field: &'a str,
    pub record: &'a EntityResult,
    pub key: &'a GeneratedValue,
}

impl FieldType {
    pub fn literal(value: GeneratedValue) -> Self {
        FieldType::Literal(value)
    }

    pub fn text(length: i64) -> Result<Self, GenerationError> {
        if length < 0 {
            return Err(GenerationError::InvalidFieldArguments(format!(
                "string length {length} must not be negative"
            )));
        }
        Ok(FieldType::Text {
            length: length as usize,
        })
    }

    pub fn integer(min: i64, max: i64) -> Result<Self, GenerationError> {
        if max < min {
            return Err(GenerationError::InvalidFieldArguments(format!(
                "max cannot be less than min (min {min}, max {max})"
            )));
        }
        Ok(FieldType::Integer { min, max })
    }

    pub fn decimal(min: f64, max: f64) -> Result<Self, GenerationError> {
        if !min.is_finite() || !max.is_finite() {
            return Err(GenerationError::InvalidFieldArguments(
                "decimal bounds must be finite".to_string(),
            ));
        }
        if max < min {
            return Err(GenerationError::InvalidFieldArguments(format!(
                "max cannot be less than min (min {min}, max {max})"
            )));
        }
        if !(max - min).is_finite() {
            return Err(GenerationError::InvalidFieldArguments(format!(
                "decimal range is too wide to sample (min {min}, max {max})"
            )));
        }
        Ok(FieldType::Decimal { min, max })
    }

    pub fn date(
        min: NaiveDateTime,
        max: NaiveDateTime,
        format: Option<String>,
    ) -> Result<Self, GenerationError> {
        if max <= min {
            return Err(GenerationError::InvalidFieldArguments(format!(
                "max cannot be before min (min {min}, max {max})"
            )));
        }
        Ok(FieldType::Date { min, max, format })
    }

    pub fn dict(
        category: impl Into<String>,
        dictionary: Rc<Dictionary>,
    ) -> Result<Self, GenerationError> {
        let category = category.into();
        dictionary.ensure_category(&category)?;
        Ok(FieldType::Dict {
            category,
            dictionary,
        })
    }

    pub fn enumeration(values: Vec<GeneratedValue>) -> Result<Self, GenerationError> {
        if values.is_empty() {
            return Err(GenerationError::InvalidFieldArguments(
                "enum requires at least one value".to_string(),
            ));
        }
        Ok(FieldType::Enum { values })
    }

    pub fn serial() -> Self {
        FieldType::Serial { next: Cell::new(0) }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            FieldType::Literal(_) => FieldKind::Literal,
            FieldType::Text { .. } => FieldKind::Text,
            FieldType::Integer { .. } => FieldKind::Integer,
            FieldType::Decimal { .. } => FieldKind::Decimal,
            FieldType::Date { .. } => FieldKind::Date,
            FieldType::Bool => FieldKind::Bool,
            FieldType::Dict { .. } => FieldKind::Dict,
            FieldType::Enum { .. } => FieldKind::Enum,
            FieldType::Serial { .. } => FieldKind::Serial,
            FieldType::Uid => FieldKind::Uid,
            FieldType::Entity(_) => FieldKind::Entity,
            FieldType::Dynamic(_) => FieldKind::Dynamic,
            FieldType::Distribution(_) => FieldKind::Distribution,
        }
    }

    /// Draw a value that does not depend on the record being assembled.
    pub fn sample(&self, rng: &mut dyn RngCore) -> Result<GeneratedValue, GenerationError> {
        let value = match self {
            FieldType::Literal(value) => value.clone(),
            FieldType::Text { length } => {
                let text = (0..*length)
                    .map(|_| TEXT_ALPHABET[rng.random_range(0..TEXT_ALPHABET.len())] as char)
                    .collect();
                GeneratedValue::Text(text)
            }
            FieldType::Integer { min, max } => GeneratedValue::Int(rng.random_range(*min..=*max)),
            FieldType::Decimal { min, max } => {
                GeneratedValue::Float(rng.random_range(*min..=*max))
            }
            FieldType::Date { min, max, format } => {
                let span = (*max - *min).num_seconds().max(1);
                let offset = TimeDelta::seconds(rng.random_range(0..span));
                GeneratedValue::Date {
                    value: *min + offset,
                    format: format.clone(),
                }
            }
            FieldType::Bool => GeneratedValue::Bool(rng.random_bool(0.5)),
            FieldType::Dict {
                category,
                dictionary,
            } => dictionary.sample(category, rng)?,
            FieldType::Enum { values } => values[rng.random_range(0..values.len())].clone(),
            FieldType::Serial { next } => {
                let value = next.get();
                next.set(value.saturating_add(1));
                GeneratedValue::Int(value)
            }
            FieldType::Uid => GeneratedValue::Uuid(random_uuid(rng)),
            FieldType::Distribution(distribution) => distribution.sample(rng)?,
            FieldType::Entity(generator) => {
                return Err(GenerationError::InvalidFieldArguments(format!(
                    "entity field of type {} needs a record context",
                    generator.name()
                )));
            }
            FieldType::Dynamic(_) => {
                return Err(GenerationError::InvalidFieldArguments(
                    "computed field needs a record context".to_string(),
                ));
            }
        };
        Ok(value)
    }

    /// Produce one value for the record described by `ctx`.
    ///
    /// Nested entity values are emitted into `emitter` before they are returned.
    pub fn one(
        &self,
        ctx: &FieldContext<'_>,
        emitter: &mut dyn Emitter,
        rng: &mut dyn RngCore,
    ) -> Result<GeneratedValue, GenerationError> {
        match self {
            FieldType::Entity(generator) => {
                let record = generator.one(Some(ctx.key), emitter, rng)?;
                Ok(GeneratedValue::Entity(record))
            }
            FieldType::Dynamic(dynamic) => dynamic.resolve(ctx.record).map_err(|err| match err {
                deferred @ GenerationError::DeferredField { .. } => deferred,
                other => GenerationError::DeferredField {
                    field: format!("{}.{}", ctx.owner, ctx.field),
                    message: other.to_string(),
                },
            }),
            _ => self.sample(rng),
        }
    }
}

/// Random (version 4) UUID drawn from `rng`.
pub fn random_uuid(rng: &mut dyn RngCore) -> String {
    let mut bytes = [0u8; 16];
    rng.fill_bytes(&mut bytes);
    uuid::Builder::from_random_bytes(bytes)
        .into_uuid()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn datetime(year: i32, month: u32, day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .expect("valid date")
    }

    #[test]
    fn integers_stay_within_bounds() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let field = FieldType::integer(-5, 5).expect("valid range");
        for _ in 0..500 {
            let value = field.sample(&mut rng).expect("sample");
            let value = value.as_i64().expect("integer");
            assert!((-5..=5).contains(&value));
        }
    }

    #[test]
    fn inverted_bounds_are_rejected() {
        assert!(FieldType::integer(10, 1).is_err());
        assert!(FieldType::decimal(2.5, 1.0).is_err());
        assert!(FieldType::date(datetime(2020, 1, 1), datetime(1999, 1, 1), None).is_err());
        assert!(FieldType::date(datetime(2020, 1, 1), datetime(2020, 1, 1), None).is_err());
    }

    #[test]
    fn decimal_spans_must_be_sampleable() {
        let err = FieldType::decimal(-1e308, 1e308).expect_err("span overflows");
        assert!(matches!(err, GenerationError::InvalidFieldArguments(_)));

        let wide = FieldType::decimal(-1e307, 1e307).expect("span fits");
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        for _ in 0..20 {
            let value = wide.sample(&mut rng).expect("sample");
            assert!(value.as_f64().is_some_and(f64::is_finite));
        }
    }

    #[test]
    fn strings_have_exact_length_and_alphabet() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for length in [0, 1, 5, 64] {
            let field = FieldType::text(length).expect("valid length");
            let value = field.sample(&mut rng).expect("sample");
            let text = value.as_str().expect("text");
            assert_eq!(text.chars().count(), length as usize);
            assert!(text.bytes().all(|byte| TEXT_ALPHABET.contains(&byte)));
        }
    }

    #[test]
    fn dates_fall_in_half_open_range() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let min = datetime(1945, 1, 1);
        let max = datetime(1945, 1, 2);
        let field = FieldType::date(min, max, Some("%Y".to_string())).expect("valid dates");
        for _ in 0..200 {
            let value = field.sample(&mut rng).expect("sample").as_date().expect("date");
            assert!(value >= min && value < max);
        }
    }

    #[test]
    fn serial_counts_from_zero() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let field = FieldType::serial();
        let values: Vec<i64> = (0..4)
            .map(|_| field.sample(&mut rng).expect("sample").as_i64().expect("int"))
            .collect();
        assert_eq!(values, vec![0, 1, 2, 3]);
    }

    #[test]
    fn uids_are_version_four() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let value = FieldType::Uid.sample(&mut rng).expect("sample");
        let parsed = uuid::Uuid::parse_str(value.as_str().expect("uuid text")).expect("parse");
        assert_eq!(parsed.get_version_num(), 4);
    }

    #[test]
    fn enum_requires_values() {
        assert!(FieldType::enumeration(Vec::new()).is_err());
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let field = FieldType::enumeration(vec![
            GeneratedValue::Text("red".to_string()),
            GeneratedValue::Text("blue".to_string()),
        ])
        .expect("valid enum");
        let value = field.sample(&mut rng).expect("sample");
        assert!(matches!(value.as_str(), Some("red") | Some("blue")));
    }
}
