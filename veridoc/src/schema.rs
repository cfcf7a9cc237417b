//! Schema declaration and validation.
//!
//! A schema is a required-subset contract for a collection: every declared
//! field must be present in a document (possibly null), while unknown extra
//! fields are always permitted. Nested schemas validate nested documents
//! recursively, reporting failures with dotted field paths.

use crate::document::{Document, Value, FIELD_SEPARATOR};
use crate::errors::{ErrorKind, VeridocError, VeridocResult};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// The primitive type tags a schema can declare for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Int,
    Float,
    Bool,
    DateTime,
}

impl FieldType {
    /// Checks whether a value matches this type tag. `Null` is handled by
    /// the caller; this is a strict match on the non-null variants.
    pub fn matches(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (FieldType::String, Value::String(_))
                | (FieldType::Int, Value::I64(_))
                | (FieldType::Float, Value::F64(_))
                | (FieldType::Bool, Value::Bool(_))
                | (FieldType::DateTime, Value::DateTime(_))
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Int => "int",
            FieldType::Float => "float",
            FieldType::Bool => "bool",
            FieldType::DateTime => "datetime",
        }
    }
}

impl Display for FieldType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A single schema declaration: either a primitive type tag or a nested
/// schema for a nested document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaNode {
    Field(FieldType),
    Nested(Schema),
}

/// The declared field contract for one collection.
///
/// Built with a fluent API:
///
/// ```ignore
/// let schema = Schema::new()
///     .field("curso", FieldType::String)
///     .field("semestre", FieldType::Int)
///     .nested("desistentes", Schema::new().field("1C", FieldType::Int));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Schema {
    fields: BTreeMap<String, SchemaNode>,
}

impl Schema {
    pub fn new() -> Self {
        Schema {
            fields: BTreeMap::new(),
        }
    }

    /// Declares a primitive field.
    pub fn field(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.fields
            .insert(name.into(), SchemaNode::Field(field_type));
        self
    }

    /// Declares a nested document field with its own schema.
    pub fn nested(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.fields.insert(name.into(), SchemaNode::Nested(schema));
        self
    }

    pub fn get(&self, name: &str) -> Option<&SchemaNode> {
        self.fields.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SchemaNode)> {
        self.fields.iter()
    }
}

/// Why a document failed validation against its collection's schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationReason {
    /// A declared field is absent from the document
    Missing,
    /// A nested-schema field holds something other than a nested document
    NotADocument,
    /// A declared primitive field holds a value of the wrong type
    TypeMismatch {
        expected: FieldType,
        actual: String,
    },
}

/// A schema violation, carrying the dotted path of the offending field
/// (e.g. `metadata.data_insercao`) and the reason it was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    path: String,
    reason: ValidationReason,
}

impl ValidationError {
    pub fn missing(path: impl Into<String>) -> Self {
        ValidationError {
            path: path.into(),
            reason: ValidationReason::Missing,
        }
    }

    pub fn not_a_document(path: impl Into<String>) -> Self {
        ValidationError {
            path: path.into(),
            reason: ValidationReason::NotADocument,
        }
    }

    pub fn type_mismatch(
        path: impl Into<String>,
        expected: FieldType,
        actual: impl Into<String>,
    ) -> Self {
        ValidationError {
            path: path.into(),
            reason: ValidationReason::TypeMismatch {
                expected,
                actual: actual.into(),
            },
        }
    }

    /// The dotted path of the field that failed.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn reason(&self) -> &ValidationReason {
        &self.reason
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.reason {
            ValidationReason::Missing => {
                write!(f, "required field '{}' is missing", self.path)
            }
            ValidationReason::NotADocument => {
                write!(f, "field '{}' must be a nested document", self.path)
            }
            ValidationReason::TypeMismatch { expected, actual } => write!(
                f,
                "field '{}' must be of type {}, but {} was provided",
                self.path, expected, actual
            ),
        }
    }
}

impl Error for ValidationError {}

/// Holds one schema per collection name and validates documents against
/// them. Pure validation logic; no I/O.
///
/// Collections without a registered schema validate trivially (permissive
/// default), and a schema is immutable once registered.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: RwLock<HashMap<String, Schema>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        SchemaRegistry {
            schemas: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a schema for a collection.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the collection already has a schema;
    /// registered schemas are immutable.
    pub fn register(&self, collection: &str, schema: Schema) -> VeridocResult<()> {
        let mut schemas = self.schemas.write();
        if schemas.contains_key(collection) {
            return Err(VeridocError::new(
                &format!("collection '{}' already has a registered schema", collection),
                ErrorKind::Configuration,
            ));
        }
        schemas.insert(collection.to_string(), schema);
        Ok(())
    }

    pub fn is_registered(&self, collection: &str) -> bool {
        self.schemas.read().contains_key(collection)
    }

    /// Returns a copy of the schema registered for a collection, if any.
    pub fn schema(&self, collection: &str) -> Option<Schema> {
        self.schemas.read().get(collection).cloned()
    }

    pub fn collection_names(&self) -> Vec<String> {
        self.schemas.read().keys().cloned().collect()
    }

    /// Validates a whole document against the collection's schema.
    ///
    /// Every declared field must be present with a value of the declared
    /// type or null; nested schemas recurse with the dotted path
    /// accumulated. Unknown extra fields are permitted.
    pub fn validate(&self, collection: &str, document: &Document) -> Result<(), ValidationError> {
        match self.schema(collection) {
            // no schema registered for this collection, assume the document is ok
            None => Ok(()),
            Some(schema) => validate_document(&schema, document, ""),
        }
    }

    /// Validates a partial set of update fields: only fields declared in the
    /// schema are checked, recursing for nested-schema fields. Fields not
    /// declared in the schema pass through untouched.
    pub fn validate_fields(&self, collection: &str, fields: &Document) -> Result<(), ValidationError> {
        let schema = match self.schema(collection) {
            None => return Ok(()),
            Some(schema) => schema,
        };

        for (field, value) in fields.iter() {
            if let Some(node) = schema.get(field) {
                check_node_at(node, field, value)?;
            }
        }
        Ok(())
    }
}

fn validate_document(schema: &Schema, document: &Document, path: &str) -> Result<(), ValidationError> {
    for (key, node) in schema.iter() {
        let full_path = join_path(path, key);
        match document.field(key) {
            None => return Err(ValidationError::missing(full_path)),
            Some(value) => check_node_at(node, &full_path, value)?,
        }
    }
    Ok(())
}

fn check_node_at(node: &SchemaNode, path: &str, value: &Value) -> Result<(), ValidationError> {
    match node {
        SchemaNode::Nested(inner) => match value {
            Value::Document(nested) => validate_document(inner, nested, path),
            _ => Err(ValidationError::not_a_document(path)),
        },
        SchemaNode::Field(field_type) => {
            // a null value satisfies any declared primitive type
            if !value.is_null() && !field_type.matches(value) {
                return Err(ValidationError::type_mismatch(
                    path,
                    *field_type,
                    value.type_name(),
                ));
            }
            Ok(())
        }
    }
}

fn join_path(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}{}{}", path, FIELD_SEPARATOR, key)
    }
}
