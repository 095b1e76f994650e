pub mod batch;
pub mod hash;
pub mod append;
pub mod row_reader;
pub mod sharding;
pub mod session;

pub use batch::{BatchColumn, RecordBatch};
pub use hash::{HashCalcer, StreamHashCalcer};
pub use row_reader::RowFieldReader;
pub use sharding::{
    build_sharding_operator, HashSharding, LogsSharding, ShardingDescriptor, ShardingFunction,
    ShardingStrategy,
};
pub use session::{ShardingSessionRegistry, TableShardingSession};
