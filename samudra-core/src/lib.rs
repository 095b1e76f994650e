pub mod types;
pub mod error;
pub mod schema;
pub mod row;
pub mod column;

pub use error::{Error, Result};
pub use schema::{Schema, Field, DataType};
pub use row::{Row, Value};
pub use column::Column;
