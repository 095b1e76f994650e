// Columnar batch container consumed by the bulk write path.
// Nullability lives here, as per-column validity masks; the typed arrays
// themselves always hold a value slot for every row.

use samudra_core::schema::{DataType, Schema};
use samudra_core::{Column, Error, Result};

/// One named array of a batch: values plus an optional validity mask.
/// `None` validity means every cell is present.
#[derive(Debug, Clone)]
pub struct BatchColumn {
    values: Column,
    validity: Option<Vec<bool>>,
}

impl BatchColumn {
    pub fn new(values: Column) -> Self {
        Self {
            values,
            validity: None,
        }
    }

    /// `validity[row] == false` marks a null cell; the mask must cover every row.
    pub fn with_validity(values: Column, validity: Vec<bool>) -> Result<Self> {
        if validity.len() != values.len() {
            return Err(Error::SchemaMismatch(format!(
                "validity mask covers {} rows but column has {}",
                validity.len(),
                values.len()
            )));
        }
        Ok(Self {
            values,
            validity: Some(validity),
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn data_type(&self) -> DataType {
        self.values.data_type()
    }

    pub fn is_null(&self, row: usize) -> bool {
        match &self.validity {
            Some(mask) => !mask[row],
            None => false,
        }
    }

    pub fn values(&self) -> &Column {
        &self.values
    }
}

/// A batch of rows in columnar form, addressed by schema field name.
#[derive(Debug, Clone)]
pub struct RecordBatch {
    schema: Schema,
    columns: Vec<BatchColumn>,
    num_rows: usize,
}

impl RecordBatch {
    /// Builds a batch, validating that the arrays line up with the schema and
    /// with each other.
    pub fn try_new(schema: Schema, columns: Vec<BatchColumn>) -> Result<Self> {
        if columns.len() != schema.len() {
            return Err(Error::SchemaMismatch(format!(
                "schema declares {} columns but batch has {}",
                schema.len(),
                columns.len()
            )));
        }
        for (field, column) in schema.fields.iter().zip(columns.iter()) {
            if field.data_type != column.data_type() {
                return Err(Error::InvalidDataType {
                    expected: format!("{:?}", field.data_type),
                    actual: format!("{:?}", column.data_type()),
                });
            }
        }
        let num_rows = columns.first().map(|c| c.len()).unwrap_or(0);
        if columns.iter().any(|c| c.len() != num_rows) {
            return Err(Error::SchemaMismatch(
                "batch columns have differing row counts".to_string(),
            ));
        }
        Ok(Self {
            schema,
            columns,
            num_rows,
        })
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn column(&self, index: usize) -> Option<&BatchColumn> {
        self.columns.get(index)
    }

    pub fn column_by_name(&self, name: &str) -> Option<&BatchColumn> {
        self.schema
            .field_index(name)
            .and_then(|idx| self.columns.get(idx))
    }
}
