use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::emitter::Emitter;
use crate::errors::EmitterError;
use crate::model::EntityResult;

/// Key carrying the entity type in each emitted line.
pub const TYPE_KEY: &str = "$type";

/// Writes one JSON object per record, tagged with its entity type.
pub struct JsonLinesEmitter<W: Write> {
    writer: CountingWriter<W>,
    records: u64,
    finalized: bool,
}

impl JsonLinesEmitter<BufWriter<File>> {
    pub fn create(path: &Path) -> Result<Self, EmitterError> {
        let file = File::create(path)?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> JsonLinesEmitter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: CountingWriter::new(inner),
            records: 0,
            finalized: false,
        }
    }

    pub fn bytes_written(&self) -> u64 {
        self.writer.bytes_written()
    }

    pub fn records_written(&self) -> u64 {
        self.records
    }

    pub fn into_inner(self) -> W {
        self.writer.inner
    }
}

impl<W: Write> Emitter for JsonLinesEmitter<W> {
    fn init(&mut self) -> Result<(), EmitterError> {
        Ok(())
    }

    fn emit(&mut self, record: &EntityResult, entity_type: &str) -> Result<(), EmitterError> {
        if self.finalized {
            return Err(EmitterError::Finalized {
                entity_type: entity_type.to_string(),
            });
        }
        let line = TypedRecord {
            entity_type,
            record,
        };
        serde_json::to_writer(&mut self.writer, &line)?;
        self.writer.write_all(b"\n")?;
        self.records += 1;
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
        if self.finalized {
            return Ok(());
        }
        self.writer.flush()?;
        self.finalized = true;
        Ok(())
    }
}

struct TypedRecord<'a> {
    entity_type: &'a str,
    record: &'a EntityResult,
}

impl Serialize for TypedRecord<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.record.len() + 1))?;
        map.serialize_entry(TYPE_KEY, self.entity_type)?;
        for (key, value) in self.record.iter() {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

struct CountingWriter<W: Write> {
    inner: W,
    bytes: u64,
}

impl<W: Write> CountingWriter<W> {
    fn new(inner: W) -> Self {
        Self { inner, bytes: 0 }
    }

    fn bytes_written(&self) -> u64 {
        self.bytes
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let size = self.inner.write(buf)?;
        self.bytes = self.bytes.saturating_add(size as u64);
        Ok(size)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}
