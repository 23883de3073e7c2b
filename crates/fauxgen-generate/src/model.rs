use chrono::NaiveDateTime;
use indexmap::IndexMap;
use rand::{Rng, RngCore};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use crate::errors::GenerationError;

/// Metadata key holding a record's own primary key.
pub const ID_KEY: &str = "$id";
/// Metadata key holding the enclosing record's primary key.
pub const PARENT_KEY: &str = "$parent";
/// Date rendering used when a date field has no explicit format.
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Generated value for a field.
#[derive(Debug, Clone, PartialEq)]
pub enum GeneratedValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Uuid(String),
    Date {
        value: NaiveDateTime,
        format: Option<String>,
    },
    List(Vec<GeneratedValue>),
    Entity(EntityResult),
}

impl GeneratedValue {
    pub fn is_null(&self) -> bool {
        matches!(self, GeneratedValue::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            GeneratedValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            GeneratedValue::Int(value) => Some(*value as f64),
            GeneratedValue::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            GeneratedValue::Text(value) | GeneratedValue::Uuid(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDateTime> {
        match self {
            GeneratedValue::Date { value, .. } => Some(*value),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[GeneratedValue]> {
        match self {
            GeneratedValue::List(values) => Some(values.as_slice()),
            _ => None,
        }
    }

    pub fn as_entity(&self) -> Option<&EntityResult> {
        match self {
            GeneratedValue::Entity(record) => Some(record),
            _ => None,
        }
    }

    /// Stable textual key used to detect repeated values.
    pub fn unique_key(&self) -> String {
        match self {
            GeneratedValue::Null => "<null>".to_string(),
            GeneratedValue::Bool(value) => value.to_string(),
            GeneratedValue::Int(value) => value.to_string(),
            GeneratedValue::Float(value) => value.to_string(),
            GeneratedValue::Text(value) | GeneratedValue::Uuid(value) => value.clone(),
            GeneratedValue::Date { value, .. } => value.format(DEFAULT_DATE_FORMAT).to_string(),
            GeneratedValue::List(_) | GeneratedValue::Entity(_) => {
                serde_json::to_string(self).unwrap_or_default()
            }
        }
    }
}

impl Serialize for GeneratedValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            GeneratedValue::Null => serializer.serialize_none(),
            GeneratedValue::Bool(value) => serializer.serialize_bool(*value),
            GeneratedValue::Int(value) => serializer.serialize_i64(*value),
            GeneratedValue::Float(value) => serializer.serialize_f64(*value),
            GeneratedValue::Text(value) | GeneratedValue::Uuid(value) => {
                serializer.serialize_str(value)
            }
            GeneratedValue::Date { value, format } => {
                let format = format.as_deref().unwrap_or(DEFAULT_DATE_FORMAT);
                serializer.collect_str(&value.format(format))
            }
            GeneratedValue::List(values) => {
                let mut seq = serializer.serialize_seq(Some(values.len()))?;
                for value in values {
                    seq.serialize_element(value)?;
                }
                seq.end()
            }
            GeneratedValue::Entity(record) => record.serialize(serializer),
        }
    }
}

/// One generated record: field values in declaration order plus metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityResult {
    fields: IndexMap<String, GeneratedValue>,
}

impl EntityResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: GeneratedValue) {
        self.fields.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&GeneratedValue> {
        self.fields.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &GeneratedValue)> {
        self.fields.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.fields.keys()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Own key, when metadata is enabled.
    pub fn id(&self) -> Option<&GeneratedValue> {
        self.fields.get(ID_KEY)
    }

    /// Enclosing record's key, when produced as a nested value.
    pub fn parent(&self) -> Option<&GeneratedValue> {
        self.fields.get(PARENT_KEY)
    }
}

impl Serialize for EntityResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Inclusive cardinality bounds for a multi-valued field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountRange {
    pub min: i64,
    pub max: i64,
}

impl CountRange {
    pub fn new(min: i64, max: i64) -> Result<Self, GenerationError> {
        let range = Self { min, max };
        range.validate()?;
        Ok(range)
    }

    pub fn exactly(count: i64) -> Result<Self, GenerationError> {
        Self::new(count, count)
    }

    pub fn validate(&self) -> Result<(), GenerationError> {
        if self.min < 0 {
            return Err(GenerationError::InvalidFieldArguments(format!(
                "count range min {} must not be negative",
                self.min
            )));
        }
        if self.max < self.min {
            return Err(GenerationError::InvalidFieldArguments(format!(
                "count range max {} cannot be less than min {}",
                self.max, self.min
            )));
        }
        Ok(())
    }

    pub fn count(&self, rng: &mut dyn RngCore) -> usize {
        rng.random_range(self.min..=self.max) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_records_in_insertion_order() {
        let mut record = EntityResult::new();
        record.insert("name", GeneratedValue::Text("kyle".to_string()));
        record.insert("age", GeneratedValue::Int(41));
        record.insert(
            "tags",
            GeneratedValue::List(vec![GeneratedValue::Bool(true), GeneratedValue::Null]),
        );

        let json = serde_json::to_string(&record).expect("serialize record");
        assert_eq!(json, r#"{"name":"kyle","age":41,"tags":[true,null]}"#);
    }

    #[test]
    fn dates_render_with_their_format() {
        let value = NaiveDateTime::parse_from_str("1945-01-01 10:30:00", "%Y-%m-%d %H:%M:%S")
            .expect("parse date");
        let formatted = GeneratedValue::Date {
            value,
            format: Some("%d/%m/%Y".to_string()),
        };
        let plain = GeneratedValue::Date {
            value,
            format: None,
        };
        assert_eq!(
            serde_json::to_string(&formatted).expect("serialize"),
            "\"01/01/1945\""
        );
        assert_eq!(
            serde_json::to_string(&plain).expect("serialize"),
            "\"1945-01-01T10:30:00\""
        );
    }

    #[test]
    fn count_range_rejects_inverted_bounds() {
        assert!(CountRange::new(3, 1).is_err());
        assert!(CountRange::new(-1, 1).is_err());
        assert!(CountRange::new(2, 2).is_ok());
    }
}
