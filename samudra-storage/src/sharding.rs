// Row-to-shard placement for distributed tables. A strategy is a pure
// function from (row bytes, persisted configuration) to a shard index in
// [0, shards_count); identical inputs under an unchanged configuration must
// resolve identically forever, across restarts and architectures.

use rayon::prelude::*;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::{debug, warn};

use samudra_core::schema::{DataType, Schema};
use samudra_core::{Column, Error, Result, Row};

use crate::append::{append_field, hashable};
use crate::batch::RecordBatch;
use crate::hash::{HashCalcer, StreamHashCalcer};
use crate::row_reader::RowFieldReader;

/// Batches at or above this row count shard in parallel, one thread-confined
/// hash session per task.
const PARALLEL_ROW_THRESHOLD: usize = 4096;

/// Hash function family recorded in the persisted descriptor. `Unknown`
/// models a tag written by a newer schema version: it survives decoding and
/// the factory maps it to "no sharding operator available".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShardingFunction {
    ModuloN,
    CloudLogs,
    Unknown,
}

impl ShardingFunction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShardingFunction::ModuloN => "modulo_n",
            ShardingFunction::CloudLogs => "cloud_logs",
            ShardingFunction::Unknown => "unknown",
        }
    }
}

impl Serialize for ShardingFunction {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ShardingFunction {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Ok(match tag.as_str() {
            "modulo_n" => ShardingFunction::ModuloN,
            "cloud_logs" => ShardingFunction::CloudLogs,
            _ => ShardingFunction::Unknown,
        })
    }
}

/// Persisted sharding configuration of one table generation. Immutable once
/// attached: the seed in particular must never change after creation, since
/// it participates in every placement decision already made.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardingDescriptor {
    pub function: ShardingFunction,
    /// Sharding columns in canonical hash-input order; order is significant.
    pub columns: Vec<String>,
    pub shards_count: u32,
    #[serde(default)]
    pub seed: u64,
    #[serde(default)]
    pub active_shards_count: Option<u32>,
}

impl ShardingDescriptor {
    pub fn modulo_n(columns: Vec<String>, shards_count: u32) -> Self {
        Self {
            function: ShardingFunction::ModuloN,
            columns,
            shards_count,
            seed: 0,
            active_shards_count: None,
        }
    }

    pub fn cloud_logs(columns: Vec<String>, shards_count: u32) -> Self {
        Self {
            function: ShardingFunction::CloudLogs,
            columns,
            shards_count,
            seed: 0,
            active_shards_count: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_active_shards(mut self, active_shards_count: u32) -> Self {
        self.active_shards_count = Some(active_shards_count);
        self
    }
}

/// A built sharding operator. Immutable and shareable across threads; hash
/// sessions are created per call, never shared.
pub trait ShardingStrategy: Send + Sync {
    /// One shard index per row, in row order. An empty result means the batch
    /// is not shardable under this configuration (a configured column is
    /// missing, or a strategy precondition does not hold for this batch);
    /// the caller decides whether that fails the write.
    fn make_sharding(&self, batch: &RecordBatch) -> Vec<u32>;

    /// Shard index for one encoded row. Errors signal an engine invariant
    /// violation or a strategy that does not support point resolution; a
    /// wrong-but-plausible index is never returned.
    fn calc_shard_id(&self, row: &Row, reader: &RowFieldReader) -> Result<u32>;

    fn sharding_columns(&self) -> &[String];

    /// Diagnostics only, no semantic contract.
    fn debug_string(&self) -> String {
        format!("Columns: {}", self.sharding_columns().join(", "))
    }
}

/// Builds the operator a persisted descriptor calls for, validating the
/// configuration against the table schema before any row is processed.
///
/// `Ok(None)` means the descriptor names a function this build does not
/// recognize; callers must treat that as "no sharding function available",
/// not as an error.
pub fn build_sharding_operator(
    descriptor: &ShardingDescriptor,
    schema: &Schema,
) -> Result<Option<Box<dyn ShardingStrategy>>> {
    match descriptor.function {
        ShardingFunction::Unknown => {
            warn!("persisted descriptor names an unrecognized sharding function; no operator built");
            Ok(None)
        }
        ShardingFunction::ModuloN => {
            validate_columns(descriptor, schema)?;
            debug!(
                shards = descriptor.shards_count,
                columns = descriptor.columns.len(),
                "built modulo-n sharding operator"
            );
            Ok(Some(Box::new(HashSharding::new(
                descriptor.shards_count,
                descriptor.columns.clone(),
                descriptor.seed,
            ))))
        }
        ShardingFunction::CloudLogs => {
            validate_columns(descriptor, schema)?;
            if descriptor.columns.len() < 2 {
                return Err(Error::Configuration(
                    "cloud logs sharding requires a timestamp column and at least one balancing column"
                        .to_string(),
                ));
            }
            let first = &descriptor.columns[0];
            match schema.field(first) {
                Some(field) if field.data_type == DataType::Timestamp => {}
                Some(field) => {
                    return Err(Error::Configuration(format!(
                        "first sharding column {} must be a timestamp, got {:?}",
                        first, field.data_type
                    )))
                }
                None => return Err(Error::ColumnNotFound(first.clone())),
            }
            let active = match descriptor.active_shards_count {
                None => LogsSharding::DEFAULT_ACTIVE_SHARDS.min(descriptor.shards_count),
                Some(0) => {
                    return Err(Error::Configuration(
                        "active shards count must be positive".to_string(),
                    ))
                }
                Some(n) if n > descriptor.shards_count => {
                    return Err(Error::Configuration(format!(
                        "active shards count {} exceeds shards count {}",
                        n, descriptor.shards_count
                    )))
                }
                Some(n) => n,
            };
            debug!(
                shards = descriptor.shards_count,
                active,
                "built cloud logs sharding operator"
            );
            Ok(Some(Box::new(LogsSharding::new(
                descriptor.shards_count,
                descriptor.columns.clone(),
                active,
                descriptor.seed,
            ))))
        }
    }
}

fn validate_columns(descriptor: &ShardingDescriptor, schema: &Schema) -> Result<()> {
    if descriptor.shards_count == 0 {
        return Err(Error::Configuration(
            "shards count must be positive".to_string(),
        ));
    }
    if descriptor.columns.is_empty() {
        return Err(Error::Configuration(
            "sharding requires at least one column".to_string(),
        ));
    }
    for name in &descriptor.columns {
        let field = schema
            .field(name)
            .ok_or_else(|| Error::ColumnNotFound(name.clone()))?;
        if !hashable(&field.data_type) {
            return Err(Error::Configuration(format!(
                "column {} has type {:?}, which cannot be used for shard hashing",
                name, field.data_type
            )));
        }
    }
    Ok(())
}

/// General-purpose strategy: digest over the configured columns in declared
/// order, reduced modulo the shard count. Resizing the shard set reassigns
/// nearly every row; migration on resize is an external concern.
pub struct HashSharding {
    shards_count: u32,
    columns: Vec<String>,
    seed: u64,
}

impl HashSharding {
    pub fn new(shards_count: u32, columns: Vec<String>, seed: u64) -> Self {
        Self {
            shards_count,
            columns,
            seed,
        }
    }

    pub fn shards_count(&self) -> u32 {
        self.shards_count
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl ShardingStrategy for HashSharding {
    fn make_sharding(&self, batch: &RecordBatch) -> Vec<u32> {
        let mut columns = Vec::with_capacity(self.columns.len());
        for name in &self.columns {
            match batch.column_by_name(name) {
                Some(column) => columns.push(column),
                None => return Vec::new(),
            }
        }

        let num_rows = batch.num_rows();
        let shard_for_row = |row: usize, hasher: &mut StreamHashCalcer| -> u32 {
            hasher.start();
            for column in &columns {
                append_field(column, row, hasher);
            }
            (hasher.finish() % u64::from(self.shards_count)) as u32
        };

        if num_rows >= PARALLEL_ROW_THRESHOLD {
            (0..num_rows)
                .into_par_iter()
                .map(|row| {
                    let mut hasher = StreamHashCalcer::new(self.seed);
                    shard_for_row(row, &mut hasher)
                })
                .collect()
        } else {
            let mut hasher = StreamHashCalcer::new(self.seed);
            (0..num_rows)
                .map(|row| shard_for_row(row, &mut hasher))
                .collect()
        }
    }

    fn calc_shard_id(&self, row: &Row, reader: &RowFieldReader) -> Result<u32> {
        let mut hasher = StreamHashCalcer::new(self.seed);
        hasher.start();
        reader.build_bytes_for_hash(row, &mut hasher)?;
        Ok((hasher.finish() % u64::from(self.shards_count)) as u32)
    }

    fn sharding_columns(&self) -> &[String] {
        &self.columns
    }
}

/// Strategy for append-mostly, time-ordered tables: writes with nearby
/// timestamps land on a bounded, rotating window of shards, and the
/// remaining columns' digest balances load within that window.
pub struct LogsSharding {
    shards_count: u32,
    columns: Vec<String>,
    active_shards_count: u32,
    seed: u64,
}

impl LogsSharding {
    pub const DEFAULT_ACTIVE_SHARDS: u32 = 10;

    /// Width of one time bucket in microseconds (five minutes). Together with
    /// the rotation in `shard_no` this constant is compatibility-sensitive:
    /// changing it reshuffles the historical placement of every logs table.
    pub const BUCKET_WIDTH_MICROS: i64 = 5 * 60 * 1_000_000;

    pub fn new(shards_count: u32, columns: Vec<String>, active_shards_count: u32, seed: u64) -> Self {
        Self {
            shards_count,
            columns,
            active_shards_count,
            seed,
        }
    }

    pub fn shards_count(&self) -> u32 {
        self.shards_count
    }

    pub fn active_shards_count(&self) -> u32 {
        self.active_shards_count
    }

    /// Destination shard for a timestamp (microseconds) and a balancing
    /// digest. The timestamp selects a bucket; each bucket owns a window of
    /// `active_shards_count` consecutive shard slots, advancing by one window
    /// per bucket and wrapping cyclically over the shard set, so a bucket's
    /// window never moves once written. The digest picks one shard inside
    /// the window.
    pub fn shard_no(&self, timestamp: i64, balance_hash: u64) -> u32 {
        let bucket = timestamp.div_euclid(Self::BUCKET_WIDTH_MICROS);
        let active = u64::from(self.active_shards_count);
        let base = (bucket as u64).wrapping_mul(active);
        (base.wrapping_add(balance_hash % active) % u64::from(self.shards_count)) as u32
    }
}

impl ShardingStrategy for LogsSharding {
    fn make_sharding(&self, batch: &RecordBatch) -> Vec<u32> {
        if self.columns.len() < 2 {
            return Vec::new();
        }

        let ts_column = match batch.column_by_name(&self.columns[0]) {
            Some(column) => column,
            None => return Vec::new(),
        };
        let ts_values = match ts_column.values() {
            Column::Timestamp(values) => values,
            _ => return Vec::new(),
        };

        let mut balance_columns = Vec::with_capacity(self.columns.len() - 1);
        for name in &self.columns[1..] {
            match batch.column_by_name(name) {
                Some(column) => balance_columns.push(column),
                None => return Vec::new(),
            }
        }

        let num_rows = batch.num_rows();
        let shard_for_row = |row: usize, hasher: &mut StreamHashCalcer| -> u32 {
            hasher.start();
            for column in &balance_columns {
                append_field(column, row, hasher);
            }
            self.shard_no(ts_values[row], hasher.finish())
        };

        if num_rows >= PARALLEL_ROW_THRESHOLD {
            (0..num_rows)
                .into_par_iter()
                .map(|row| {
                    let mut hasher = StreamHashCalcer::new(self.seed);
                    shard_for_row(row, &mut hasher)
                })
                .collect()
        } else {
            let mut hasher = StreamHashCalcer::new(self.seed);
            (0..num_rows)
                .map(|row| shard_for_row(row, &mut hasher))
                .collect()
        }
    }

    fn calc_shard_id(&self, _row: &Row, _reader: &RowFieldReader) -> Result<u32> {
        Err(Error::Unsupported(
            "cloud logs sharding cannot resolve a shard for a single row".to_string(),
        ))
    }

    fn sharding_columns(&self) -> &[String] {
        &self.columns
    }
}
