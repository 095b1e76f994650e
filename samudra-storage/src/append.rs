// Canonical hash input for typed cells. Both row representations feed the
// hash through the constructors here, so the two paths cannot drift apart.

use samudra_core::schema::DataType;
use samudra_core::Column;

use crate::batch::BatchColumn;
use crate::hash::HashCalcer;

/// Canonical byte image of one cell. Variable-length payloads are fed as-is;
/// fixed-width values are fed as their little-endian image at native width.
pub(crate) enum CellBytes<'a> {
    Var(&'a [u8]),
    Fixed { buf: [u8; 16], len: u8 },
}

impl<'a> CellBytes<'a> {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            CellBytes::Var(bytes) => bytes,
            CellBytes::Fixed { buf, len } => &buf[..*len as usize],
        }
    }

    fn fixed(bytes: &[u8]) -> CellBytes<'static> {
        let mut buf = [0u8; 16];
        buf[..bytes.len()].copy_from_slice(bytes);
        CellBytes::Fixed {
            buf,
            len: bytes.len() as u8,
        }
    }

    pub fn from_i8(v: i8) -> CellBytes<'static> {
        Self::fixed(&v.to_le_bytes())
    }

    pub fn from_i16(v: i16) -> CellBytes<'static> {
        Self::fixed(&v.to_le_bytes())
    }

    pub fn from_i32(v: i32) -> CellBytes<'static> {
        Self::fixed(&v.to_le_bytes())
    }

    pub fn from_i64(v: i64) -> CellBytes<'static> {
        Self::fixed(&v.to_le_bytes())
    }

    pub fn from_u8(v: u8) -> CellBytes<'static> {
        Self::fixed(&v.to_le_bytes())
    }

    pub fn from_u16(v: u16) -> CellBytes<'static> {
        Self::fixed(&v.to_le_bytes())
    }

    pub fn from_u32(v: u32) -> CellBytes<'static> {
        Self::fixed(&v.to_le_bytes())
    }

    pub fn from_u64(v: u64) -> CellBytes<'static> {
        Self::fixed(&v.to_le_bytes())
    }

    pub fn from_i128(v: i128) -> CellBytes<'static> {
        Self::fixed(&v.to_le_bytes())
    }
}

/// Whether a physical type may participate in a sharding key. Bit patterns of
/// booleans and floats are not stable hash inputs; operator construction
/// rejects them before any row is processed.
pub fn hashable(data_type: &DataType) -> bool {
    !matches!(
        data_type,
        DataType::Boolean | DataType::Float32 | DataType::Float64
    )
}

/// Feeds one cell of a columnar array into the hash session. Null cells
/// contribute nothing.
///
/// Panics if the array holds a type `hashable` rejects: operator construction
/// already screened the schema, so reaching such a cell means upstream
/// validation was bypassed, and a silently wrong shard index is worse than an
/// abort.
pub fn append_field(column: &BatchColumn, row: usize, hasher: &mut dyn HashCalcer) {
    if column.is_null(row) {
        return;
    }
    match column.values() {
        Column::Int8(v) => hasher.update(CellBytes::from_i8(v[row]).as_bytes()),
        Column::Int16(v) => hasher.update(CellBytes::from_i16(v[row]).as_bytes()),
        Column::Int32(v) => hasher.update(CellBytes::from_i32(v[row]).as_bytes()),
        Column::Int64(v) => hasher.update(CellBytes::from_i64(v[row]).as_bytes()),
        Column::UInt8(v) => hasher.update(CellBytes::from_u8(v[row]).as_bytes()),
        Column::UInt16(v) => hasher.update(CellBytes::from_u16(v[row]).as_bytes()),
        Column::UInt32(v) => hasher.update(CellBytes::from_u32(v[row]).as_bytes()),
        Column::UInt64(v) => hasher.update(CellBytes::from_u64(v[row]).as_bytes()),
        Column::String(v) => hasher.update(v[row].as_bytes()),
        Column::Binary(v) => hasher.update(&v[row]),
        Column::Timestamp(v) => hasher.update(CellBytes::from_i64(v[row]).as_bytes()),
        Column::Date(v) => hasher.update(CellBytes::from_i32(v[row]).as_bytes()),
        Column::Decimal128(v) => hasher.update(CellBytes::from_i128(v[row]).as_bytes()),
        Column::Boolean(_) | Column::Float32(_) | Column::Float64(_) => {
            panic!(
                "column type {:?} cannot participate in shard hashing",
                column.data_type()
            )
        }
    }
}
