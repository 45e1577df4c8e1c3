//! Avro type model.
//!
//! Named types ([`NamedType`]) are the unit of resolution. Whenever one named
//! type mentions another, including inline declarations nested inside a
//! record, the reference is kept as [`Schema::Named`] and the nested
//! declaration is registered as a definition of its own. Comparing two
//! [`NamedType`] values is therefore a flat structural comparison that never
//! chases references.

use std::collections::BTreeMap;

use serde_json::{Map, Value, json};

use crate::TypeName;

/// Extra JSON attributes (e.g. `logicalType`, `precision`, `java-class`).
///
/// Stored in a sorted map so that equality ignores declaration order.
pub type Properties = BTreeMap<String, Value>;

/// Avro primitive types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Bytes,
    String,
}

impl PrimitiveType {
    /// Parses a primitive type keyword.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "null" => Self::Null,
            "boolean" => Self::Boolean,
            "int" => Self::Int,
            "long" => Self::Long,
            "float" => Self::Float,
            "double" => Self::Double,
            "bytes" => Self::Bytes,
            "string" => Self::String,
            _ => return None,
        })
    }

    /// Returns the Avro keyword for this primitive.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean => "boolean",
            Self::Int => "int",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
            Self::Bytes => "bytes",
            Self::String => "string",
        }
    }
}

/// A type expression as it appears in a field, array, map or union.
#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    /// Primitive type, optionally annotated (e.g. with a `logicalType`).
    Primitive {
        kind: PrimitiveType,
        properties: Properties,
    },
    /// Array with a single item type.
    Array {
        items: Box<Schema>,
        properties: Properties,
    },
    /// Map with string keys.
    Map {
        values: Box<Schema>,
        properties: Properties,
    },
    /// Union of branches.
    Union(Vec<Schema>),
    /// Reference to a record, enum or fixed type by full name.
    Named(TypeName),
}

impl Schema {
    /// Bare primitive without properties.
    pub fn primitive(kind: PrimitiveType) -> Self {
        Self::Primitive {
            kind,
            properties: Properties::new(),
        }
    }

    /// Key identifying a union branch. Two branches with the same key make
    /// the union ambiguous.
    pub fn branch_key(&self) -> String {
        match self {
            Self::Primitive { kind, .. } => kind.as_str().to_string(),
            Self::Array { .. } => "array".to_string(),
            Self::Map { .. } => "map".to_string(),
            Self::Union(_) => "union".to_string(),
            Self::Named(name) => name.fullname(),
        }
    }

    /// Renders the schema as Avro JSON.
    pub fn to_json_value(&self) -> Value {
        match self {
            Self::Primitive { kind, properties } if properties.is_empty() => json!(kind.as_str()),
            Self::Primitive { kind, properties } => {
                let mut obj = Map::new();
                obj.insert("type".to_string(), json!(kind.as_str()));
                extend_properties(&mut obj, properties);
                Value::Object(obj)
            }
            Self::Array { items, properties } => {
                let mut obj = Map::new();
                obj.insert("type".to_string(), json!("array"));
                obj.insert("items".to_string(), items.to_json_value());
                extend_properties(&mut obj, properties);
                Value::Object(obj)
            }
            Self::Map { values, properties } => {
                let mut obj = Map::new();
                obj.insert("type".to_string(), json!("map"));
                obj.insert("values".to_string(), values.to_json_value());
                extend_properties(&mut obj, properties);
                Value::Object(obj)
            }
            Self::Union(branches) => {
                Value::Array(branches.iter().map(Schema::to_json_value).collect())
            }
            Self::Named(name) => json!(name.fullname()),
        }
    }

    /// Collects every named type this schema refers to.
    pub fn references(&self, out: &mut Vec<TypeName>) {
        match self {
            Self::Primitive { .. } => {}
            Self::Array { items, .. } => items.references(out),
            Self::Map { values, .. } => values.references(out),
            Self::Union(branches) => branches.iter().for_each(|b| b.references(out)),
            Self::Named(name) => out.push(name.clone()),
        }
    }
}

/// Sort order of a record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldOrder {
    #[default]
    Ascending,
    Descending,
    Ignore,
}

impl FieldOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ascending => "ascending",
            Self::Descending => "descending",
            Self::Ignore => "ignore",
        }
    }
}

/// A record field.
///
/// `doc` and `aliases` are informational and excluded from equality.
#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub schema: Schema,
    pub default: Option<Value>,
    pub order: FieldOrder,
    pub doc: Option<String>,
    pub aliases: Vec<String>,
    pub properties: Properties,
}

impl Field {
    /// Creates a field with no default, doc or properties.
    pub fn new(name: impl Into<String>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            schema,
            default: None,
            order: FieldOrder::Ascending,
            doc: None,
            aliases: Vec::new(),
            properties: Properties::new(),
        }
    }

    pub fn to_json_value(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("name".to_string(), json!(&self.name));
        obj.insert("type".to_string(), self.schema.to_json_value());
        if let Some(doc) = &self.doc {
            obj.insert("doc".to_string(), json!(doc));
        }
        if let Some(default) = &self.default {
            obj.insert("default".to_string(), default.clone());
        }
        if self.order != FieldOrder::Ascending {
            obj.insert("order".to_string(), json!(self.order.as_str()));
        }
        if !self.aliases.is_empty() {
            obj.insert("aliases".to_string(), json!(&self.aliases));
        }
        extend_properties(&mut obj, &self.properties);
        Value::Object(obj)
    }
}

impl PartialEq for Field {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.schema == other.schema
            && self.default == other.default
            && self.order == other.order
            && self.properties == other.properties
    }
}

/// A record (or protocol `error`) declaration.
#[derive(Debug, Clone)]
pub struct RecordType {
    pub name: TypeName,
    /// Declared with `"type": "error"` inside a protocol.
    pub is_error: bool,
    pub fields: Vec<Field>,
    pub doc: Option<String>,
    pub aliases: Vec<TypeName>,
    pub properties: Properties,
}

impl PartialEq for RecordType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.is_error == other.is_error
            && self.fields == other.fields
            && self.properties == other.properties
    }
}

/// An enum declaration.
#[derive(Debug, Clone)]
pub struct EnumType {
    pub name: TypeName,
    pub symbols: Vec<String>,
    pub default: Option<String>,
    pub doc: Option<String>,
    pub aliases: Vec<TypeName>,
    pub properties: Properties,
}

impl PartialEq for EnumType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.symbols == other.symbols
            && self.default == other.default
            && self.properties == other.properties
    }
}

/// A fixed-length byte sequence declaration.
#[derive(Debug, Clone)]
pub struct FixedType {
    pub name: TypeName,
    pub size: usize,
    pub doc: Option<String>,
    pub aliases: Vec<TypeName>,
    pub properties: Properties,
}

impl PartialEq for FixedType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.size == other.size && self.properties == other.properties
    }
}

/// A resolved named type: the value side of the definitions map.
///
/// Equality is structural. Two independently parsed declarations of the same
/// type compare equal as long as their kind, fields, symbols, sizes and
/// properties agree; documentation and aliases are ignored.
///
/// # Examples
///
/// ```
/// use avro_resolve_core::{SchemaParser, TypeName};
///
/// let a = r#"{"type": "enum", "name": "ex.Suit", "doc": "a", "symbols": ["HEART", "SPADE"]}"#;
/// let b = r#"{"type": "enum", "name": "ex.Suit", "doc": "b", "symbols": ["HEART", "SPADE"]}"#;
///
/// let a = SchemaParser::new().parse_str(a).unwrap();
/// let b = SchemaParser::new().parse_str(b).unwrap();
/// assert_eq!(a.defined[0].1, b.defined[0].1);
/// assert_eq!(a.defined[0].0, TypeName::qualify("ex.Suit", None));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum NamedType {
    Record(RecordType),
    Enum(EnumType),
    Fixed(FixedType),
}

impl NamedType {
    /// Returns the fully-qualified name of this type.
    pub fn name(&self) -> &TypeName {
        match self {
            Self::Record(record) => &record.name,
            Self::Enum(enumeration) => &enumeration.name,
            Self::Fixed(fixed) => &fixed.name,
        }
    }

    /// Returns the Avro kind keyword (`record`, `error`, `enum`, `fixed`).
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Record(record) if record.is_error => "error",
            Self::Record(_) => "record",
            Self::Enum(_) => "enum",
            Self::Fixed(_) => "fixed",
        }
    }

    /// Returns the documentation string, if any.
    pub fn doc(&self) -> Option<&str> {
        match self {
            Self::Record(record) => record.doc.as_deref(),
            Self::Enum(enumeration) => enumeration.doc.as_deref(),
            Self::Fixed(fixed) => fixed.doc.as_deref(),
        }
    }

    /// Names of the other named types this declaration refers to.
    pub fn references(&self) -> Vec<TypeName> {
        let mut out = Vec::new();
        if let Self::Record(record) = self {
            for field in &record.fields {
                field.schema.references(&mut out);
            }
        }
        out.retain(|name| name != self.name());
        out.sort();
        out.dedup();
        out
    }

    /// Renders the declaration as Avro JSON. Nested named types appear as
    /// full-name references.
    pub fn to_json_value(&self) -> Value {
        let name = self.name();
        let mut obj = Map::new();
        obj.insert("type".to_string(), json!(self.kind()));
        obj.insert("name".to_string(), json!(&name.name));
        if let Some(ns) = &name.namespace {
            obj.insert("namespace".to_string(), json!(ns));
        }
        if let Some(doc) = self.doc() {
            obj.insert("doc".to_string(), json!(doc));
        }

        let (aliases, properties) = match self {
            Self::Record(record) => {
                let fields: Vec<Value> = record.fields.iter().map(Field::to_json_value).collect();
                obj.insert("fields".to_string(), Value::Array(fields));
                (&record.aliases, &record.properties)
            }
            Self::Enum(enumeration) => {
                obj.insert("symbols".to_string(), json!(&enumeration.symbols));
                if let Some(default) = &enumeration.default {
                    obj.insert("default".to_string(), json!(default));
                }
                (&enumeration.aliases, &enumeration.properties)
            }
            Self::Fixed(fixed) => {
                obj.insert("size".to_string(), json!(fixed.size));
                (&fixed.aliases, &fixed.properties)
            }
        };

        if !aliases.is_empty() {
            let aliases: Vec<String> = aliases.iter().map(TypeName::fullname).collect();
            obj.insert("aliases".to_string(), json!(aliases));
        }
        extend_properties(&mut obj, properties);
        Value::Object(obj)
    }
}

fn extend_properties(obj: &mut Map<String, Value>, properties: &Properties) {
    for (key, value) in properties {
        obj.insert(key.clone(), value.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn suit(doc: Option<&str>, symbols: &[&str]) -> NamedType {
        NamedType::Enum(EnumType {
            name: TypeName::qualify("ex.Suit", None),
            symbols: symbols.iter().map(|s| s.to_string()).collect(),
            default: None,
            doc: doc.map(String::from),
            aliases: Vec::new(),
            properties: Properties::new(),
        })
    }

    #[test]
    fn test_equality_ignores_doc() {
        assert_eq!(
            suit(Some("one"), &["HEART", "SPADE"]),
            suit(Some("two"), &["HEART", "SPADE"])
        );
    }

    #[test]
    fn test_equality_respects_symbol_order() {
        assert_ne!(
            suit(None, &["HEART", "SPADE"]),
            suit(None, &["SPADE", "HEART"])
        );
    }

    #[test]
    fn test_record_equality_compares_field_types_and_properties() {
        let record = |kind: PrimitiveType, prop: Option<(&str, Value)>| {
            let mut properties = Properties::new();
            if let Some((key, value)) = prop {
                properties.insert(key.to_string(), value);
            }
            NamedType::Record(RecordType {
                name: TypeName::qualify("ex.Cat", None),
                is_error: false,
                fields: vec![Field::new("age", Schema::primitive(kind))],
                doc: None,
                aliases: Vec::new(),
                properties,
            })
        };

        assert_eq!(record(PrimitiveType::Int, None), record(PrimitiveType::Int, None));
        assert_ne!(record(PrimitiveType::Int, None), record(PrimitiveType::Long, None));
        assert_ne!(
            record(PrimitiveType::Int, None),
            record(PrimitiveType::Int, Some(("java-class", json!("Foo"))))
        );
    }

    #[test]
    fn test_record_json_renders_nested_types_as_references() {
        let record = NamedType::Record(RecordType {
            name: TypeName::qualify("ex.Hand", None),
            is_error: false,
            fields: vec![Field::new(
                "cards",
                Schema::Array {
                    items: Box::new(Schema::Named(TypeName::qualify("ex.Suit", None))),
                    properties: Properties::new(),
                },
            )],
            doc: None,
            aliases: Vec::new(),
            properties: Properties::new(),
        });

        let json = record.to_json_value();
        assert_eq!(json["type"], "record");
        assert_eq!(json["namespace"], "ex");
        assert_eq!(json["fields"][0]["type"]["items"], "ex.Suit");
        assert_eq!(record.references(), vec![TypeName::qualify("ex.Suit", None)]);
    }

    #[test]
    fn test_annotated_primitive_renders_as_object() {
        let mut properties = Properties::new();
        properties.insert("logicalType".to_string(), json!("timestamp-millis"));
        let schema = Schema::Primitive {
            kind: PrimitiveType::Long,
            properties,
        };
        assert_eq!(
            schema.to_json_value(),
            json!({"type": "long", "logicalType": "timestamp-millis"})
        );
        assert_eq!(Schema::primitive(PrimitiveType::Long).to_json_value(), json!("long"));
    }
}
