use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;
use std::time::Instant;

use indexmap::IndexMap;
use rand::RngCore;
use tracing::info;

use crate::emitter::Emitter;
use crate::errors::GenerationError;
use crate::field_types::{FieldContext, FieldType};
use crate::model::{CountRange, EntityResult, GeneratedValue, ID_KEY, PARENT_KEY};
use crate::primary_key::{KeySource, PrimaryKey};

/// Attempts a unique field gets to produce an unseen value.
pub const UNIQUE_ATTEMPTS: usize = 100;

/// One named slot of an entity.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub field_type: FieldType,
    pub count: Option<CountRange>,
    pub unique: bool,
    seen: RefCell<HashSet<String>>,
}

impl FieldSpec {
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            count: None,
            unique: false,
            seen: RefCell::new(HashSet::new()),
        }
    }

    pub fn with_count(mut self, count: Option<CountRange>) -> Self {
        self.count = count;
        self
    }

    pub fn with_unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    fn snapshot(&self) -> Self {
        Self {
            field_type: self.field_type.clone(),
            count: self.count,
            unique: self.unique,
            seen: RefCell::new(HashSet::new()),
        }
    }
}

/// Compiled entity: ordered fields, key policy and record assembly.
///
/// Generators are shared through `Rc` so a field can refer to the entity that
/// declares it; fields are added through `&self` while the entity is built.
#[derive(Debug)]
pub struct Generator {
    name: String,
    parent: Option<String>,
    fields: RefCell<IndexMap<String, FieldSpec>>,
    primary_key: PrimaryKey,
    keys: RefCell<KeySource>,
    disable_metadata: bool,
}

impl Generator {
    pub fn new(name: impl Into<String>, primary_key: PrimaryKey, disable_metadata: bool) -> Self {
        Self {
            name: name.into(),
            parent: None,
            fields: RefCell::new(IndexMap::new()),
            primary_key,
            keys: RefCell::new(KeySource::new()),
            disable_metadata,
        }
    }

    /// Start from a snapshot of `parent`'s fields.
    ///
    /// Fields added to `parent` afterwards are not seen by the extension.
    pub fn extend(
        name: impl Into<String>,
        parent: &Generator,
        primary_key: Option<PrimaryKey>,
        disable_metadata: bool,
    ) -> Self {
        let fields = parent
            .fields
            .borrow()
            .iter()
            .map(|(name, spec)| (name.clone(), spec.snapshot()))
            .collect();
        Self {
            name: name.into(),
            parent: Some(parent.name.clone()),
            fields: RefCell::new(fields),
            primary_key: primary_key.unwrap_or_else(|| parent.primary_key.clone()),
            keys: RefCell::new(KeySource::new()),
            disable_metadata,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent_name(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn primary_key(&self) -> &PrimaryKey {
        &self.primary_key
    }

    pub fn metadata_enabled(&self) -> bool {
        !self.disable_metadata
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.borrow().contains_key(name)
    }

    pub fn field_names(&self) -> Vec<String> {
        self.fields.borrow().keys().cloned().collect()
    }

    pub fn field_type(&self, name: &str) -> Option<FieldType> {
        self.fields
            .borrow()
            .get(name)
            .map(|spec| spec.field_type.clone())
    }

    /// Add or replace a field, keeping its position. Returns the replaced spec.
    pub fn with_field(&self, name: impl Into<String>, spec: FieldSpec) -> Option<FieldSpec> {
        self.fields.borrow_mut().insert(name.into(), spec)
    }

    pub fn with_static_field(
        &self,
        name: impl Into<String>,
        value: GeneratedValue,
    ) -> Option<FieldSpec> {
        self.with_field(name, FieldSpec::new(FieldType::Literal(value)))
    }

    pub fn with_entity_field(
        &self,
        name: impl Into<String>,
        entity: Rc<Generator>,
        count: Option<CountRange>,
    ) -> Option<FieldSpec> {
        self.with_field(name, FieldSpec::new(FieldType::Entity(entity)).with_count(count))
    }

    /// Fail before anything is produced when `count` keys cannot be supplied,
    /// by this entity or by any entity nested in it.
    ///
    /// Nested demand assumes every count range yields its maximum. Recursive
    /// entities are not followed.
    pub fn ensure_generatable(&self, count: u64) -> Result<(), GenerationError> {
        self.keys
            .borrow()
            .ensure(&self.primary_key, &self.name, count)?;

        let mut demand = IndexMap::new();
        let mut path = vec![self as *const Generator];
        self.nested_key_demand(count, &mut path, &mut demand);
        for (nested, needed) in demand.values() {
            nested
                .keys
                .borrow()
                .ensure(&nested.primary_key, &nested.name, *needed)?;
        }
        Ok(())
    }

    fn nested_key_demand(
        &self,
        count: u64,
        path: &mut Vec<*const Generator>,
        demand: &mut IndexMap<*const Generator, (Rc<Generator>, u64)>,
    ) {
        let fields = self.fields.borrow();
        for spec in fields.values() {
            let FieldType::Entity(nested) = &spec.field_type else {
                continue;
            };
            let ptr = Rc::as_ptr(nested);
            if path.contains(&ptr) {
                continue;
            }
            let per_record = spec.count.map_or(1, |range| range.max.max(0) as u64);
            let needed = count.saturating_mul(per_record);
            let entry = demand.entry(ptr).or_insert_with(|| (Rc::clone(nested), 0));
            entry.1 = entry.1.saturating_add(needed);

            path.push(ptr);
            nested.nested_key_demand(needed, path, demand);
            path.pop();
        }
    }

    /// Assemble, emit and return one record.
    ///
    /// `parent_key` is the key of the enclosing record when this one is a
    /// nested value.
    pub fn one(
        &self,
        parent_key: Option<&GeneratedValue>,
        emitter: &mut dyn Emitter,
        rng: &mut dyn RngCore,
    ) -> Result<EntityResult, GenerationError> {
        let key = self
            .keys
            .borrow_mut()
            .next(&self.primary_key, &self.name, rng)?;

        let mut record = EntityResult::new();
        if !self.disable_metadata {
            record.insert(ID_KEY, key.clone());
            if let Some(parent) = parent_key {
                record.insert(PARENT_KEY, parent.clone());
            }
        }
        if self.primary_key.is_field() {
            record.insert(self.primary_key.name.clone(), key.clone());
        }

        let fields = self.fields.borrow();
        for (name, spec) in fields.iter() {
            let value = {
                let ctx = FieldContext {
                    owner: &self.name,
                    field: name,
                    record: &record,
                    key: &key,
                };
                if matches!(spec.field_type, FieldType::Entity(_)) {
                    let nested = emitter.next_emitter(Some(&self.name), name, spec.count.is_some());
                    self.produce(spec, &ctx, nested, rng)?
                } else {
                    self.produce(spec, &ctx, emitter, rng)?
                }
            };
            record.insert(name.clone(), value);
        }
        drop(fields);

        emitter.emit(&record, &self.name)?;
        Ok(record)
    }

    pub fn generate(
        &self,
        count: u64,
        emitter: &mut dyn Emitter,
    ) -> Result<Vec<EntityResult>, GenerationError> {
        self.generate_with_rng(count, emitter, &mut rand::rng())
    }

    /// Produce exactly `count` records.
    pub fn generate_with_rng(
        &self,
        count: u64,
        emitter: &mut dyn Emitter,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<EntityResult>, GenerationError> {
        self.ensure_generatable(count)?;

        let start = Instant::now();
        info!(entity = %self.name, count, "generation started");

        let mut records = Vec::with_capacity(count.min(4096) as usize);
        for _ in 0..count {
            records.push(self.one(None, emitter, rng)?);
        }

        info!(
            entity = %self.name,
            records = records.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "generation completed"
        );
        Ok(records)
    }

    fn produce(
        &self,
        spec: &FieldSpec,
        ctx: &FieldContext<'_>,
        emitter: &mut dyn Emitter,
        rng: &mut dyn RngCore,
    ) -> Result<GeneratedValue, GenerationError> {
        let Some(range) = spec.count else {
            return self.produce_one(spec, ctx, emitter, rng);
        };
        let count = range.count(rng);
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            values.push(self.produce_one(spec, ctx, emitter, rng)?);
        }
        Ok(GeneratedValue::List(values))
    }

    fn produce_one(
        &self,
        spec: &FieldSpec,
        ctx: &FieldContext<'_>,
        emitter: &mut dyn Emitter,
        rng: &mut dyn RngCore,
    ) -> Result<GeneratedValue, GenerationError> {
        if !spec.unique {
            return spec.field_type.one(ctx, emitter, rng);
        }
        for _ in 0..UNIQUE_ATTEMPTS {
            let value = spec.field_type.one(ctx, emitter, rng)?;
            if spec.seen.borrow_mut().insert(value.unique_key()) {
                return Ok(value);
            }
        }
        Err(GenerationError::GenerationCapacityExceeded {
            entity: self.name.clone(),
            requested: 1,
            reason: format!(
                "unique field '{}' produced no unseen value in {} attempts",
                ctx.field, UNIQUE_ATTEMPTS
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emitter::MemoryEmitter;
    use crate::primary_key::PrimaryKeyKind;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn person() -> Generator {
        let generator = Generator::new("Person", PrimaryKey::default(), false);
        generator.with_field(
            "name",
            FieldSpec::new(FieldType::text(8).expect("valid length")),
        );
        generator.with_field(
            "age",
            FieldSpec::new(FieldType::integer(18, 90).expect("valid range")),
        );
        generator
    }

    #[test]
    fn fields_follow_declaration_order() {
        let generator = person();
        let mut emitter = MemoryEmitter::new();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let record = generator
            .one(None, &mut emitter, &mut rng)
            .expect("record");
        let keys: Vec<&str> = record.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["$id", "name", "age"]);
        assert!(record.parent().is_none());
    }

    #[test]
    fn named_key_is_also_a_field() {
        let generator = Generator::new(
            "Order",
            PrimaryKey::new("order_id", PrimaryKeyKind::Serial),
            false,
        );
        let mut emitter = MemoryEmitter::new();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let records = generator
            .generate_with_rng(3, &mut emitter, &mut rng)
            .expect("records");
        let ids: Vec<_> = records
            .iter()
            .map(|record| record.get("order_id").cloned())
            .collect();
        assert_eq!(
            ids,
            vec![
                Some(GeneratedValue::Int(0)),
                Some(GeneratedValue::Int(1)),
                Some(GeneratedValue::Int(2))
            ]
        );
        assert_eq!(records[2].id(), Some(&GeneratedValue::Int(2)));
    }

    #[test]
    fn metadata_can_be_disabled() {
        let generator = Generator::new("Person", PrimaryKey::default(), true);
        generator.with_field("flag", FieldSpec::new(FieldType::Bool));
        let mut emitter = MemoryEmitter::new();
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let record = generator
            .one(None, &mut emitter, &mut rng)
            .expect("record");
        assert_eq!(record.len(), 1);
        assert!(record.id().is_none());
    }

    #[test]
    fn nested_records_are_emitted_first_with_parent_key() {
        let address = Rc::new(Generator::new("Address", PrimaryKey::default(), false));
        address.with_field(
            "zip",
            FieldSpec::new(FieldType::text(5).expect("valid length")),
        );
        let generator = person();
        generator.with_entity_field("home", Rc::clone(&address), None);

        let mut emitter = MemoryEmitter::new();
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let record = generator
            .one(None, &mut emitter, &mut rng)
            .expect("record");

        assert_eq!(emitter.entity_types(), vec!["Address", "Person"]);
        let home = record
            .get("home")
            .and_then(GeneratedValue::as_entity)
            .expect("nested record");
        assert_eq!(home.parent(), record.id());
    }

    #[test]
    fn count_ranges_produce_lists() {
        let generator = Generator::new("Bag", PrimaryKey::default(), false);
        generator.with_field(
            "items",
            FieldSpec::new(FieldType::integer(1, 3).expect("valid range"))
                .with_count(Some(CountRange::new(2, 4).expect("valid count"))),
        );
        let mut emitter = MemoryEmitter::new();
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        for _ in 0..20 {
            let record = generator
                .one(None, &mut emitter, &mut rng)
                .expect("record");
            let items = record
                .get("items")
                .and_then(GeneratedValue::as_list)
                .expect("list");
            assert!((2..=4).contains(&items.len()));
        }
    }

    #[test]
    fn unique_fields_exhaust_with_error() {
        let generator = Generator::new("Coin", PrimaryKey::default(), false);
        generator.with_field(
            "side",
            FieldSpec::new(FieldType::Bool).with_unique(true),
        );
        let mut emitter = MemoryEmitter::new();
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        let err = generator
            .generate_with_rng(3, &mut emitter, &mut rng)
            .expect_err("only two booleans exist");
        assert!(matches!(
            err,
            GenerationError::GenerationCapacityExceeded { .. }
        ));
    }

    #[test]
    fn insufficient_key_range_fails_before_emitting() {
        let generator = Generator::new(
            "Ticket",
            PrimaryKey::new("seat", PrimaryKeyKind::UniqueInteger { min: 1, max: 3 }),
            false,
        );
        let mut emitter = MemoryEmitter::new();
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        assert!(
            generator
                .generate_with_rng(4, &mut emitter, &mut rng)
                .is_err()
        );
        assert!(emitter.is_empty());
    }

    #[test]
    fn nested_key_range_is_checked_before_emitting() {
        let seat = Rc::new(Generator::new(
            "Seat",
            PrimaryKey::new("number", PrimaryKeyKind::UniqueInteger { min: 1, max: 3 }),
            false,
        ));
        let booking = Generator::new("Booking", PrimaryKey::default(), false);
        booking.with_entity_field("seats", Rc::clone(&seat), Some(CountRange::exactly(2).expect("count")));

        let mut emitter = MemoryEmitter::new();
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let err = booking
            .generate_with_rng(2, &mut emitter, &mut rng)
            .expect_err("four seats from a range of three");
        assert!(matches!(
            err,
            GenerationError::GenerationCapacityExceeded { ref entity, requested: 4, .. } if entity == "Seat"
        ));
        assert!(emitter.is_empty());

        let records = booking
            .generate_with_rng(1, &mut emitter, &mut rng)
            .expect("two seats fit");
        assert_eq!(records.len(), 1);
        assert_eq!(emitter.records_of("Seat").count(), 2);
    }

    #[test]
    fn recursive_entities_do_not_loop_the_capacity_check() {
        let node = Rc::new(Generator::new("Node", PrimaryKey::default(), false));
        node.with_entity_field("children", Rc::clone(&node), Some(CountRange::new(0, 0).expect("count")));
        assert!(node.ensure_generatable(5).is_ok());
    }

    #[test]
    fn extension_snapshots_parent_fields() {
        let base = person();
        let child = Generator::extend("Employee", &base, None, false);
        let replaced = child.with_static_field("age", GeneratedValue::Int(30));
        assert!(replaced.is_some());
        base.with_field("later", FieldSpec::new(FieldType::Bool));

        assert_eq!(child.field_names(), vec!["name", "age"]);
        assert_eq!(child.parent_name(), Some("Person"));
        assert!(!child.has_field("later"));
    }
}
