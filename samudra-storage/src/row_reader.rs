// Point-path hash input: a precomputed descriptor list over the row layout,
// built once per schema generation and reused for every single-row placement.

use ahash::AHashMap;
use samudra_core::schema::{DataType, Schema};
use samudra_core::{Error, Result, Row, Value};

use crate::append::CellBytes;
use crate::hash::HashCalcer;

/// Where one sharding column lives in the encoded row, and how to decode it.
/// The name is carried for diagnostics only.
#[derive(Debug, Clone)]
struct ColumnSlot {
    index: usize,
    data_type: DataType,
    name: String,
}

/// Reads the sharding columns of a single encoded row, in declared order,
/// into a hash session.
#[derive(Debug, Clone)]
pub struct RowFieldReader {
    slots: Vec<ColumnSlot>,
}

impl RowFieldReader {
    /// `layout` gives each column's position in the row, `columns_remap` its
    /// declared storage type. Every sharding column must be known to both.
    pub fn new(
        layout: &Schema,
        columns_remap: &AHashMap<String, DataType>,
        sharding_columns: &[String],
    ) -> Result<Self> {
        if sharding_columns.is_empty() {
            return Err(Error::Configuration(
                "sharding requires at least one column".to_string(),
            ));
        }
        let mut slots = Vec::with_capacity(sharding_columns.len());
        for name in sharding_columns {
            let data_type = columns_remap
                .get(name)
                .cloned()
                .ok_or_else(|| Error::ColumnNotFound(name.clone()))?;
            let index = layout
                .field_index(name)
                .ok_or_else(|| Error::ColumnNotFound(name.clone()))?;
            slots.push(ColumnSlot {
                index,
                data_type,
                name: name.clone(),
            });
        }
        Ok(Self { slots })
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Feeds each configured column's canonical bytes into the hash session.
    ///
    /// This path only sees validated primary-key-bearing rows, so a null cell
    /// or a declared type outside the supported set signals a schema/engine
    /// invariant violation and raises rather than computing a wrong shard.
    pub fn build_bytes_for_hash(&self, row: &Row, hasher: &mut dyn HashCalcer) -> Result<()> {
        for slot in &self.slots {
            let value = row.get(slot.index).ok_or_else(|| {
                Error::SchemaMismatch(format!(
                    "row has no cell for column {} at position {}",
                    slot.name, slot.index
                ))
            })?;
            match value {
                Value::String(s) => hasher.update(s.as_bytes()),
                Value::Binary(b) => hasher.update(b),
                other => {
                    let cell = embedded_cell(&slot.data_type, other).ok_or_else(|| {
                        Error::InvalidDataType {
                            expected: format!("{:?}", slot.data_type),
                            actual: match other.data_type() {
                                Some(dt) => format!("{:?}", dt),
                                None => "Null".to_string(),
                            },
                        }
                    })?;
                    hasher.update(cell.as_bytes());
                }
            }
        }
        Ok(())
    }
}

/// Canonical encoding of an embedded scalar, selected by the declared type
/// tag. Only 16/32/64-bit integers are embeddable in the point path; the
/// value variant must agree with the tag.
fn embedded_cell(declared: &DataType, value: &Value) -> Option<CellBytes<'static>> {
    match (declared, value) {
        (DataType::UInt16, Value::UInt16(v)) => Some(CellBytes::from_u16(*v)),
        (DataType::UInt32, Value::UInt32(v)) => Some(CellBytes::from_u32(*v)),
        (DataType::UInt64, Value::UInt64(v)) => Some(CellBytes::from_u64(*v)),
        (DataType::Int16, Value::Int16(v)) => Some(CellBytes::from_i16(*v)),
        (DataType::Int32, Value::Int32(v)) => Some(CellBytes::from_i32(*v)),
        (DataType::Int64, Value::Int64(v)) => Some(CellBytes::from_i64(*v)),
        _ => None,
    }
}
