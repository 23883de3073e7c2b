use std::collections::VecDeque;

use crate::errors::EmitterError;
use crate::model::EntityResult;

/// Streaming sink receiving every generated record.
///
/// Nested records are emitted before the record that contains them.
pub trait Emitter {
    /// Called once before any generation.
    fn init(&mut self) -> Result<(), EmitterError>;

    /// Called once per fully assembled record.
    fn emit(&mut self, record: &EntityResult, entity_type: &str) -> Result<(), EmitterError>;

    /// Sink that nested or list-valued field generation writes into.
    fn next_emitter(
        &mut self,
        receiver: Option<&str>,
        field_key: &str,
        is_multi_valued: bool,
    ) -> &mut dyn Emitter;

    /// Called once after generation completes. Repeated calls are no-ops.
    fn finalize(&mut self) -> Result<(), EmitterError>;
}

/// Keeps records in emission order.
#[derive(Debug, Default)]
pub struct MemoryEmitter {
    records: VecDeque<(String, EntityResult)>,
    initialized: bool,
    finalized: bool,
}

impl MemoryEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return the oldest record.
    pub fn shift(&mut self) -> Option<EntityResult> {
        self.records.pop_front().map(|(_, record)| record)
    }

    /// Remove and return the oldest record with its entity type.
    pub fn shift_typed(&mut self) -> Option<(String, EntityResult)> {
        self.records.pop_front()
    }

    pub fn records(&self) -> impl Iterator<Item = &EntityResult> {
        self.records.iter().map(|(_, record)| record)
    }

    pub fn records_of<'a>(&'a self, entity_type: &'a str) -> impl Iterator<Item = &'a EntityResult> {
        self.records
            .iter()
            .filter(move |(name, _)| name == entity_type)
            .map(|(_, record)| record)
    }

    pub fn entity_types(&self) -> Vec<&str> {
        self.records.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn initialized(&self) -> bool {
        self.initialized
    }

    pub fn finalized(&self) -> bool {
        self.finalized
    }
}

impl Emitter for MemoryEmitter {
    fn init(&mut self) -> Result<(), EmitterError> {
        self.initialized = true;
        Ok(())
    }

    fn emit(&mut self, record: &EntityResult, entity_type: &str) -> Result<(), EmitterError> {
        if self.finalized {
            return Err(EmitterError::Finalized {
                entity_type: entity_type.to_string(),
            });
        }
        self.records
            .push_back((entity_type.to_string(), record.clone()));
        Ok(())
    }

    fn next_emitter(
        &mut self,
        _receiver: Option<&str>,
        _field_key: &str,
        _is_multi_valued: bool,
    ) -> &mut dyn Emitter {
        self
    }

    fn finalize(&mut self) -> Result<(), EmitterError> {
        self.finalized = true;
        Ok(())
    }
}

/// Discards records; still enforces the finalize contract.
#[derive(Debug, Default)]
pub struct NullEmitter {
    emitted: u64,
    finalized: bool,
}

impl NullEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emitted(&self) -> u64 {
        self.emitted
    }
}

impl Emitter for NullEmitter {
    fn init(&mut self) -> Result<(), EmitterError> {
        Ok(())
    }

    fn emit(&mut self, _record: &EntityResult, entity_type: &str) -> Result<(), EmitterError> {
        if self.finalized {
            return Err(EmitterError::Finalized {
                entity_type: entity_type.to_string(),
            });
        }
        self.emitted += 1;
        Ok(())
    }

    fn next_emitter(
        &mut self,
        _receiver: Option<&str>,
        _field_key: &str,
        _is_multi_valued: bool,
    ) -> &mut dyn Emitter {
        self
    }

    fn finalize(&mut self) -> Result<(), EmitterError> {
        self.finalized = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GeneratedValue;

    #[test]
    fn memory_emitter_rejects_emit_after_finalize() {
        let mut emitter = MemoryEmitter::new();
        emitter.init().expect("init");
        let mut record = EntityResult::new();
        record.insert("a", GeneratedValue::Int(1));
        emitter.emit(&record, "Thing").expect("emit");

        emitter.finalize().expect("finalize");
        emitter.finalize().expect("finalize is idempotent");
        assert!(emitter.finalized());
        assert!(matches!(
            emitter.emit(&record, "Thing"),
            Err(EmitterError::Finalized { .. })
        ));

        assert_eq!(emitter.entity_types(), vec!["Thing"]);
        assert_eq!(emitter.shift(), Some(record));
        assert!(emitter.shift().is_none());
    }
}
