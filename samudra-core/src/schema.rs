use ahash::AHashMap;
use serde::{Deserialize, Deserializer, Serialize};

/// Physical storage type of a column.
///
/// `Timestamp` is microseconds since the Unix epoch, `Date` is days since the
/// epoch, `Decimal128` is a 16-byte two's-complement fixed-point value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    Boolean,
    String,
    Binary,
    Timestamp,
    Date,
    Decimal128,
}

impl DataType {
    pub fn size(&self) -> Option<usize> {
        match self {
            DataType::Int8 | DataType::UInt8 | DataType::Boolean => Some(1),
            DataType::Int16 | DataType::UInt16 => Some(2),
            DataType::Int32 | DataType::UInt32 | DataType::Float32 | DataType::Date => Some(4),
            DataType::Int64 | DataType::UInt64 | DataType::Float64 | DataType::Timestamp => {
                Some(8)
            }
            DataType::Decimal128 => Some(16),
            DataType::String | DataType::Binary => None,
        }
    }

    pub fn is_fixed_size(&self) -> bool {
        self.size().is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
    pub default_value: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Schema {
    pub fields: Vec<Field>,
    #[serde(skip_serializing)]
    field_map: AHashMap<String, usize>,
}

impl<'de> Deserialize<'de> for Schema {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct SchemaHelper {
            fields: Vec<Field>,
        }

        let helper = SchemaHelper::deserialize(deserializer)?;
        Ok(Schema::new(helper.fields))
    }
}

impl Schema {
    pub fn new(fields: Vec<Field>) -> Self {
        let field_map: AHashMap<String, usize> = fields
            .iter()
            .enumerate()
            .map(|(idx, field)| (field.name.clone(), idx))
            .collect();

        Self { fields, field_map }
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.field_map.get(name).copied()
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.field_index(name).map(|idx| &self.fields[idx])
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str, data_type: DataType) -> Field {
        Field {
            name: name.to_string(),
            data_type,
            nullable: false,
            default_value: None,
        }
    }

    #[test]
    fn test_data_type_size() {
        assert_eq!(DataType::Int8.size(), Some(1));
        assert_eq!(DataType::Int32.size(), Some(4));
        assert_eq!(DataType::Timestamp.size(), Some(8));
        assert_eq!(DataType::Decimal128.size(), Some(16));
        assert_eq!(DataType::String.size(), None);
    }

    #[test]
    fn test_data_type_is_fixed_size() {
        assert!(DataType::Int32.is_fixed_size());
        assert!(DataType::Decimal128.is_fixed_size());
        assert!(!DataType::String.is_fixed_size());
        assert!(!DataType::Binary.is_fixed_size());
    }

    #[test]
    fn test_schema_creation() {
        let schema = Schema::new(vec![
            field("id", DataType::Int64),
            field("name", DataType::String),
        ]);
        assert_eq!(schema.len(), 2);
        assert_eq!(schema.field_index("id"), Some(0));
        assert_eq!(schema.field_index("name"), Some(1));
        assert_eq!(schema.field_index("nonexistent"), None);
    }

    #[test]
    fn test_schema_field_access() {
        let schema = Schema::new(vec![field("id", DataType::Int64)]);
        assert!(schema.field("id").is_some());
        assert_eq!(schema.field("id").unwrap().name, "id");
        assert!(schema.field("nonexistent").is_none());
    }

    #[test]
    fn test_schema_roundtrip_rebuilds_index() {
        let schema = Schema::new(vec![
            field("ts", DataType::Timestamp),
            field("uid", DataType::String),
        ]);
        let json = serde_json::to_string(&schema).unwrap();
        let decoded: Schema = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.field_index("uid"), Some(1));
        assert_eq!(decoded.len(), schema.len());
    }
}
