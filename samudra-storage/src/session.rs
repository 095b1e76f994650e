// Per-table sharding state: the built operator plus the precomputed row
// reader for one schema generation, shared read-only by every writer.

use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::RwLock;
use tracing::{debug, info};

use samudra_core::schema::{DataType, Schema};
use samudra_core::types::{GenerationId, TableId};
use samudra_core::{Error, Result, Row};

use crate::batch::RecordBatch;
use crate::row_reader::RowFieldReader;
use crate::sharding::{
    build_sharding_operator, ShardingDescriptor, ShardingFunction, ShardingStrategy,
};

/// Sharding state of one table at one schema generation. Immutable after
/// `build`; rebuild a fresh session when the generation moves.
pub struct TableShardingSession {
    table_id: TableId,
    generation: GenerationId,
    descriptor: ShardingDescriptor,
    strategy: Option<Box<dyn ShardingStrategy>>,
    reader: Option<RowFieldReader>,
}

impl TableShardingSession {
    pub fn build(
        table_id: TableId,
        generation: GenerationId,
        schema: &Schema,
        descriptor: ShardingDescriptor,
    ) -> Result<Self> {
        let strategy = build_sharding_operator(&descriptor, schema)?;
        // Only the modulo strategy resolves single rows, so the reader is
        // precomputed just for it.
        let reader = if strategy.is_some() && descriptor.function == ShardingFunction::ModuloN {
            let remap: AHashMap<String, DataType> = schema
                .fields
                .iter()
                .map(|f| (f.name.clone(), f.data_type.clone()))
                .collect();
            Some(RowFieldReader::new(schema, &remap, &descriptor.columns)?)
        } else {
            None
        };
        debug!(
            table = table_id.0,
            generation = generation.0,
            "built sharding session"
        );
        Ok(Self {
            table_id,
            generation,
            descriptor,
            strategy,
            reader,
        })
    }

    pub fn table_id(&self) -> TableId {
        self.table_id
    }

    pub fn generation(&self) -> GenerationId {
        self.generation
    }

    pub fn descriptor(&self) -> &ShardingDescriptor {
        &self.descriptor
    }

    /// `None` when the persisted descriptor names a function this build does
    /// not recognize.
    pub fn strategy(&self) -> Option<&dyn ShardingStrategy> {
        self.strategy.as_deref()
    }

    pub fn shard_batch(&self, batch: &RecordBatch) -> Result<Vec<u32>> {
        match &self.strategy {
            Some(strategy) => Ok(strategy.make_sharding(batch)),
            None => Err(Error::Configuration(
                "table has no sharding operator (descriptor from a newer schema version)"
                    .to_string(),
            )),
        }
    }

    pub fn shard_row(&self, row: &Row) -> Result<u32> {
        let strategy = self.strategy.as_ref().ok_or_else(|| {
            Error::Configuration(
                "table has no sharding operator (descriptor from a newer schema version)"
                    .to_string(),
            )
        })?;
        let reader = self.reader.as_ref().ok_or_else(|| {
            Error::Unsupported(
                "sharding strategy does not support single-row shard resolution".to_string(),
            )
        })?;
        strategy.calc_shard_id(row, reader)
    }
}

/// Process-wide cache of table sharding sessions, keyed by table and reused
/// while the schema generation is unchanged.
#[derive(Default)]
pub struct ShardingSessionRegistry {
    sessions: RwLock<AHashMap<TableId, Arc<TableShardingSession>>>,
}

impl ShardingSessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, table_id: TableId) -> Option<Arc<TableShardingSession>> {
        self.sessions.read().get(&table_id).cloned()
    }

    /// Returns the cached session while the generation matches, rebuilding it
    /// otherwise.
    pub fn ensure(
        &self,
        table_id: TableId,
        generation: GenerationId,
        schema: &Schema,
        descriptor: &ShardingDescriptor,
    ) -> Result<Arc<TableShardingSession>> {
        if let Some(session) = self.get(table_id) {
            if session.generation() == generation {
                return Ok(session);
            }
        }
        let session = Arc::new(TableShardingSession::build(
            table_id,
            generation,
            schema,
            descriptor.clone(),
        )?);
        self.sessions.write().insert(table_id, session.clone());
        info!(
            "Rebuilt sharding session for table {} at generation {}",
            table_id.0, generation.0
        );
        Ok(session)
    }

    pub fn invalidate(&self, table_id: TableId) {
        self.sessions.write().remove(&table_id);
    }
}
