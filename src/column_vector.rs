//! The read-only surface a query layer sees: typed columns, schemas, and batches.

use crate::error::{Error, Result};
use crate::field::FieldVector;
use crate::types::{LogicalType, Value};

/// A column as seen by a query layer.
pub trait ColumnVector {
    fn data_type(&self) -> LogicalType;
    /// The value in row `index`, or `None` for a null. Rows past `size` are an error.
    fn value(&self, index: usize) -> Result<Option<Value>>;
    /// The number of populated rows.
    fn size(&self) -> usize;
}

impl ColumnVector for FieldVector {
    fn data_type(&self) -> LogicalType {
        self.logical_type()
    }
    fn value(&self, index: usize) -> Result<Option<Value>> {
        if index >= self.value_count() {
            return Err(Error::out_of_bounds(index, 1, self.value_count()));
        }
        self.get_object(index)
    }
    fn size(&self) -> usize {
        self.value_count()
    }
}

/// A named, typed column description.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Field {
    pub name: String,
    pub data_type: LogicalType,
    pub nullable: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, data_type: LogicalType, nullable: bool) -> Self {
        Self { name: name.into(), data_type, nullable }
    }
}

/// An ordered list of fields.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// The position of the one field called `name`.
    pub fn index_of(&self, name: &str) -> Result<usize> {
        let mut matches = self.fields.iter().enumerate().filter(|(_, field)| field.name == name).map(|(index, _)| index);
        match (matches.next(), matches.next()) {
            (Some(index), None) => Ok(index),
            (None, _) => Err(Error::NoSuchField { name: name.to_string() }),
            (Some(_), Some(_)) => Err(Error::AmbiguousField { name: name.to_string() }),
        }
    }

    pub fn field(&self, name: &str) -> Result<&Field> {
        self.index_of(name).map(|index| &self.fields[index])
    }

    /// A schema of the named fields, in the order named.
    ///
    /// Each name must match exactly one field.
    pub fn select(&self, names: &[&str]) -> Result<Schema> {
        let fields = names.iter().map(|name| self.field(name).cloned()).collect::<Result<Vec<_>>>()?;
        Ok(Schema { fields })
    }
}

/// Columns of equal standing described by a schema.
#[derive(Debug)]
pub struct RecordBatch {
    schema: Schema,
    columns: Vec<FieldVector>,
}

impl RecordBatch {
    /// Pairs `columns` with `schema`, which must describe them one to one and in order.
    pub fn try_new(schema: Schema, columns: Vec<FieldVector>) -> Result<Self> {
        if schema.fields.len() != columns.len() {
            return Err(Error::UnsupportedOperation("schema and columns differ in number"));
        }
        for (field, column) in schema.fields.iter().zip(columns.iter()) {
            if field.data_type != column.data_type() {
                return Err(Error::TypeMismatch {
                    operation: "record batch",
                    expected: field.data_type,
                    found: column.data_type(),
                });
            }
        }
        Ok(Self { schema, columns })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The size of the first column, or zero without columns.
    pub fn row_count(&self) -> usize {
        self.columns.first().map_or(0, ColumnVector::size)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, index: usize) -> Option<&FieldVector> {
        self.columns.get(index)
    }

    pub fn column_by_name(&self, name: &str) -> Result<&FieldVector> {
        self.schema.index_of(name).map(|index| &self.columns[index])
    }

    pub fn into_columns(self) -> Vec<FieldVector> {
        self.columns
    }
}

#[cfg(test)]
mod test {
    use super::{ColumnVector, Field, RecordBatch, Schema};
    use crate::allocator::RootAllocator;
    use crate::error::Error;
    use crate::field::FieldVector;
    use crate::types::{LogicalType, Value};

    fn schema() -> Schema {
        Schema::new(vec![
            Field::new("id", LogicalType::Int32, false),
            Field::new("name", LogicalType::Utf8, true),
            Field::new("dup", LogicalType::TinyInt, true),
            Field::new("dup", LogicalType::TinyInt, true),
        ])
    }

    #[test]
    fn select() {
        let schema = schema();
        let selected = schema.select(&["name", "id"]).unwrap();
        assert_eq!(selected.fields()[0].name, "name");
        assert_eq!(selected.fields()[1].data_type, LogicalType::Int32);
        assert_eq!(schema.select(&["missing"]), Err(Error::NoSuchField { name: "missing".to_string() }));
        assert_eq!(schema.select(&["dup"]), Err(Error::AmbiguousField { name: "dup".to_string() }));
    }

    #[test]
    fn batches() {
        let allocator = RootAllocator::unbounded();
        let mut ids = FieldVector::new("id", LogicalType::Int32, allocator.clone());
        let mut names = FieldVector::new("name", LogicalType::Utf8, allocator.clone());
        ids.allocate_new().unwrap();
        names.allocate_new().unwrap();
        for row in 0 .. 3 {
            ids.set_object(row, Some(Value::Int(row as i32))).unwrap();
        }
        names.set_object(0, Some(Value::from("a"))).unwrap();

        assert_eq!(ids.size(), 3);
        assert_eq!(ids.value(2), Ok(Some(Value::Int(2))));
        assert!(ids.value(3).is_err());
        assert_eq!(names.value(0), Ok(Some(Value::from("a"))));

        let schema = Schema::new(vec![Field::new("id", LogicalType::Int32, false), Field::new("name", LogicalType::Utf8, true)]);
        let batch = RecordBatch::try_new(schema.clone(), vec![ids, names]).unwrap();
        assert_eq!(batch.row_count(), 3);
        assert_eq!(batch.column_count(), 2);
        assert_eq!(batch.column_by_name("name").unwrap().data_type(), LogicalType::Utf8);
        assert!(batch.column(2).is_none());

        let swapped = batch.into_columns().into_iter().rev().collect();
        assert!(RecordBatch::try_new(schema, swapped).is_err());
        assert_eq!(RecordBatch::try_new(Schema::default(), vec![]).unwrap().row_count(), 0);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn schema_serde() {
        let json = serde_json::to_string(&Field::new("id", LogicalType::TinyInt, true)).unwrap();
        assert_eq!(json, r#"{"name":"id","data_type":"tiny-int","nullable":true}"#);
        let schema = schema();
        let back: Schema = serde_json::from_str(&serde_json::to_string(&schema).unwrap()).unwrap();
        assert_eq!(back, schema);
    }
}
