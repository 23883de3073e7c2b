use std::collections::HashSet;

use rand::{Rng, RngCore};

use crate::errors::GenerationError;
use crate::field_types::random_uuid;
use crate::model::{GeneratedValue, ID_KEY};

const RANDOM_DRAW_ATTEMPTS: usize = 32;

/// How key values are allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimaryKeyKind {
    /// Sequential integers starting at 0.
    Serial,
    /// Random integers in `[min, max]`, never repeated.
    UniqueInteger { min: i64, max: i64 },
    /// Random UUID v4 strings.
    Uid,
}

impl PrimaryKeyKind {
    pub fn parse(kind: &str, bounds: Option<(i64, i64)>) -> Result<Self, GenerationError> {
        let parsed = match kind {
            "serial" => Self::Serial,
            "unique-integer" | "uint" => {
                let (min, max) = bounds.unwrap_or((1, i64::MAX));
                if max < min {
                    return Err(GenerationError::InvalidFieldArguments(format!(
                        "primary key range max {max} cannot be less than min {min}"
                    )));
                }
                Self::UniqueInteger { min, max }
            }
            "uid" | "unique-id" => Self::Uid,
            other => {
                return Err(GenerationError::InvalidPrimaryKeyKind {
                    kind: other.to_string(),
                });
            }
        };
        if bounds.is_some() && !matches!(parsed, Self::UniqueInteger { .. }) {
            return Err(GenerationError::InvalidFieldArguments(format!(
                "primary key kind '{kind}' takes no arguments"
            )));
        }
        Ok(parsed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Serial => "serial",
            Self::UniqueInteger { .. } => "unique-integer",
            Self::Uid => "uid",
        }
    }

    /// Distinct values this kind can still produce, `None` when unbounded.
    fn capacity(&self) -> Option<u128> {
        match self {
            Self::Serial => Some(i64::MAX as u128 + 1),
            Self::UniqueInteger { min, max } => Some((*max as i128 - *min as i128) as u128 + 1),
            Self::Uid => None,
        }
    }
}

/// Key policy of an entity: field name plus allocation kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryKey {
    pub name: String,
    pub kind: PrimaryKeyKind,
}

impl PrimaryKey {
    pub fn new(name: impl Into<String>, kind: PrimaryKeyKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Whether the key is also written as an ordinary field.
    pub fn is_field(&self) -> bool {
        self.name != ID_KEY
    }
}

impl Default for PrimaryKey {
    fn default() -> Self {
        Self::new(ID_KEY, PrimaryKeyKind::Uid)
    }
}

/// Allocation state for one entity's keys.
#[derive(Debug, Default)]
pub struct KeySource {
    next_serial: i64,
    used: HashSet<i64>,
}

impl KeySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail when `count` more keys cannot be produced.
    pub fn ensure(
        &self,
        key: &PrimaryKey,
        entity: &str,
        count: u64,
    ) -> Result<(), GenerationError> {
        let Some(capacity) = key.kind.capacity() else {
            return Ok(());
        };
        let consumed = match key.kind {
            PrimaryKeyKind::Serial => self.next_serial as u128,
            _ => self.used.len() as u128,
        };
        let remaining = capacity.saturating_sub(consumed);
        if (count as u128) > remaining {
            return Err(GenerationError::GenerationCapacityExceeded {
                entity: entity.to_string(),
                requested: count,
                reason: format!(
                    "{} key '{}' has only {} value(s) left",
                    key.kind.as_str(),
                    key.name,
                    remaining
                ),
            });
        }
        Ok(())
    }

    pub fn next(
        &mut self,
        key: &PrimaryKey,
        entity: &str,
        rng: &mut dyn RngCore,
    ) -> Result<GeneratedValue, GenerationError> {
        match key.kind {
            PrimaryKeyKind::Serial => {
                let value = self.next_serial;
                self.next_serial = value.checked_add(1).ok_or_else(|| exhausted(key, entity))?;
                Ok(GeneratedValue::Int(value))
            }
            PrimaryKeyKind::UniqueInteger { min, max } => {
                for _ in 0..RANDOM_DRAW_ATTEMPTS {
                    let candidate = rng.random_range(min..=max);
                    if self.used.insert(candidate) {
                        return Ok(GeneratedValue::Int(candidate));
                    }
                }
                // dense range: walk up from a random start
                let start = rng.random_range(min..=max);
                let candidate = (start..=max)
                    .chain(min..start)
                    .find(|value| !self.used.contains(value))
                    .ok_or_else(|| exhausted(key, entity))?;
                self.used.insert(candidate);
                Ok(GeneratedValue::Int(candidate))
            }
            PrimaryKeyKind::Uid => Ok(GeneratedValue::Uuid(random_uuid(rng))),
        }
    }
}

fn exhausted(key: &PrimaryKey, entity: &str) -> GenerationError {
    GenerationError::GenerationCapacityExceeded {
        entity: entity.to_string(),
        requested: 1,
        reason: format!("{} key '{}' is exhausted", key.kind.as_str(), key.name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn parses_permitted_kinds_only() {
        assert_eq!(
            PrimaryKeyKind::parse("serial", None).expect("serial"),
            PrimaryKeyKind::Serial
        );
        assert_eq!(
            PrimaryKeyKind::parse("unique-id", None).expect("uid"),
            PrimaryKeyKind::Uid
        );
        assert_eq!(
            PrimaryKeyKind::parse("uint", Some((1, 3))).expect("uint"),
            PrimaryKeyKind::UniqueInteger { min: 1, max: 3 }
        );
        assert!(matches!(
            PrimaryKeyKind::parse("autoincrement", None),
            Err(GenerationError::InvalidPrimaryKeyKind { .. })
        ));
    }

    #[test]
    fn unique_integers_exhaust_their_range() {
        let key = PrimaryKey::new("id", PrimaryKeyKind::UniqueInteger { min: 1, max: 5 });
        let mut source = KeySource::new();
        let mut rng = ChaCha8Rng::seed_from_u64(17);

        assert!(source.ensure(&key, "Person", 5).is_ok());
        assert!(matches!(
            source.ensure(&key, "Person", 6),
            Err(GenerationError::GenerationCapacityExceeded { requested: 6, .. })
        ));

        let mut values: Vec<i64> = (0..5)
            .map(|_| {
                source
                    .next(&key, "Person", &mut rng)
                    .expect("key")
                    .as_i64()
                    .expect("int")
            })
            .collect();
        values.sort_unstable();
        assert_eq!(values, vec![1, 2, 3, 4, 5]);
        assert!(source.ensure(&key, "Person", 1).is_err());
    }

    #[test]
    fn serial_keys_start_at_zero() {
        let key = PrimaryKey::new("id", PrimaryKeyKind::Serial);
        let mut source = KeySource::new();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let first = source.next(&key, "Person", &mut rng).expect("key");
        let second = source.next(&key, "Person", &mut rng).expect("key");
        assert_eq!(first, GeneratedValue::Int(0));
        assert_eq!(second, GeneratedValue::Int(1));
    }

    #[test]
    fn default_key_is_metadata_only() {
        let key = PrimaryKey::default();
        assert_eq!(key.name, "$id");
        assert!(!key.is_field());
    }
}
