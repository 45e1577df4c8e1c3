//! Per-document Avro schema parser.
//!
//! A [`SchemaParser`] is seeded with the definitions known so far and parses
//! exactly one document. It reports the names the document introduces, or a
//! [`ParseFailure`] that tells the caller whether the document can be retried
//! later ([`ParseFailure::UnresolvedReference`]), collides with a known name
//! ([`ParseFailure::AlreadyDefined`]), or is simply broken
//! ([`ParseFailure::Other`]).
//!
//! # Examples
//!
//! ```
//! use avro_resolve_core::{Definitions, ParseFailure, SchemaParser, TypeName};
//!
//! let suit = r#"{"type": "enum", "name": "Suit", "namespace": "cards", "symbols": ["HEART"]}"#;
//! let card = r#"{"type": "record", "name": "cards.Card",
//!                "fields": [{"name": "suit", "type": "Suit"}]}"#;
//!
//! // On its own, the card refers to an unknown type.
//! let failure = SchemaParser::new().parse_str(card).unwrap_err();
//! assert_eq!(failure, ParseFailure::UnresolvedReference(TypeName::qualify("cards.Suit", None)));
//!
//! // Seeded with the enum, it parses.
//! let mut known = Definitions::new();
//! known.extend(SchemaParser::new().parse_str(suit).unwrap().defined);
//! let parsed = SchemaParser::with_known(&known).parse_str(card).unwrap();
//! assert_eq!(parsed.defined.len(), 1);
//! ```

use std::collections::{BTreeMap, HashSet};

use serde_json::{Map, Value};

use crate::error::{ParseFailure, ParseResult};
use crate::name::{is_primitive, is_valid_name, is_valid_namespace};
use crate::types::{
    EnumType, Field, FieldOrder, FixedType, NamedType, PrimitiveType, Properties, RecordType,
    Schema,
};
use crate::TypeName;

/// Cumulative mapping from full name to resolved type.
pub type Definitions = BTreeMap<TypeName, NamedType>;

const RECORD_KEYS: &[&str] = &["type", "name", "namespace", "doc", "aliases", "fields"];
const FIELD_KEYS: &[&str] = &["name", "type", "default", "order", "doc", "aliases"];
const ENUM_KEYS: &[&str] = &["type", "name", "namespace", "doc", "aliases", "symbols", "default"];
const FIXED_KEYS: &[&str] = &["type", "name", "namespace", "doc", "aliases", "size"];
const ARRAY_KEYS: &[&str] = &["type", "items"];
const MAP_KEYS: &[&str] = &["type", "values"];
const PRIMITIVE_KEYS: &[&str] = &["type"];

/// Result of parsing one document.
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    /// The document's top-level type.
    pub root: Schema,
    /// Names introduced by the document, in completion order (a nested
    /// declaration completes before the record enclosing it).
    pub defined: Vec<(TypeName, NamedType)>,
}

impl ParsedDocument {
    /// Looks up a type introduced by this document.
    pub fn get(&self, name: &TypeName) -> Option<&NamedType> {
        self.defined
            .iter()
            .find(|(defined, _)| defined == name)
            .map(|(_, ty)| ty)
    }
}

/// Single-document parser seeded with previously known definitions.
#[derive(Debug)]
pub struct SchemaParser<'a> {
    known: Option<&'a Definitions>,
    defined: Vec<(TypeName, NamedType)>,
    /// Records whose fields are being parsed; they may refer to themselves.
    in_progress: HashSet<TypeName>,
    allow_error_records: bool,
    validate_defaults: bool,
}

impl<'a> SchemaParser<'a> {
    /// Creates a parser that knows no named types.
    pub fn new() -> Self {
        Self {
            known: None,
            defined: Vec::new(),
            in_progress: HashSet::new(),
            allow_error_records: false,
            validate_defaults: true,
        }
    }

    /// Creates a parser pre-seeded with `known` definitions.
    pub fn with_known(known: &'a Definitions) -> Self {
        Self {
            known: Some(known),
            ..Self::new()
        }
    }

    /// Accepts `"type": "error"` declarations (protocol documents only).
    pub fn allow_error_records(mut self, allow: bool) -> Self {
        self.allow_error_records = allow;
        self
    }

    /// Enables or disables checking field defaults against field types.
    pub fn validate_defaults(mut self, validate: bool) -> Self {
        self.validate_defaults = validate;
        self
    }

    /// Parses a JSON document.
    pub fn parse_str(self, json: &str) -> ParseResult<ParsedDocument> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| ParseFailure::other(format!("invalid JSON: {e}")))?;
        self.parse_value(&value)
    }

    /// Parses an already-decoded JSON document.
    pub fn parse_value(mut self, value: &Value) -> ParseResult<ParsedDocument> {
        let root = self.parse_schema(value, None)?;
        Ok(ParsedDocument {
            root,
            defined: self.defined,
        })
    }

    /// Parses one type expression inside a larger document, keeping the
    /// types declared so far. Used by the protocol parser.
    pub(crate) fn parse_schema(
        &mut self,
        value: &Value,
        namespace: Option<&str>,
    ) -> ParseResult<Schema> {
        match value {
            Value::String(name) => self.parse_reference(name, namespace),
            Value::Object(obj) => self.parse_object(obj, namespace),
            Value::Array(branches) => self.parse_union(branches, namespace),
            other => Err(ParseFailure::other(format!(
                "expected a type name, object or union, found: {other}"
            ))),
        }
    }

    pub(crate) fn into_defined(self) -> Vec<(TypeName, NamedType)> {
        self.defined
    }

    pub(crate) fn lookup(&self, name: &TypeName) -> Option<&NamedType> {
        self.known
            .and_then(|known| known.get(name))
            .or_else(|| {
                self.defined
                    .iter()
                    .find(|(defined, _)| defined == name)
                    .map(|(_, ty)| ty)
            })
    }

    fn is_declared(&self, name: &TypeName) -> bool {
        self.in_progress.contains(name) || self.lookup(name).is_some()
    }

    fn parse_reference(&self, raw: &str, namespace: Option<&str>) -> ParseResult<Schema> {
        if let Some(kind) = PrimitiveType::from_name(raw) {
            return Ok(Schema::primitive(kind));
        }
        if !is_valid_full_name(raw) {
            return Err(ParseFailure::other(format!("invalid type name: {raw:?}")));
        }

        // Unqualified names bind only in the enclosing namespace.
        let qualified = TypeName::qualify(raw, namespace);
        if self.is_declared(&qualified) {
            return Ok(Schema::Named(qualified));
        }
        Err(ParseFailure::UnresolvedReference(qualified))
    }

    fn parse_object(
        &mut self,
        obj: &Map<String, Value>,
        namespace: Option<&str>,
    ) -> ParseResult<Schema> {
        let type_value = obj
            .get("type")
            .ok_or_else(|| ParseFailure::other("missing 'type' attribute"))?;

        let keyword = match type_value {
            Value::String(keyword) => keyword.as_str(),
            // `{"type": {...}}` and `{"type": [...]}` wrap another schema.
            nested => return self.parse_schema(nested, namespace),
        };

        match keyword {
            "record" => self.parse_record(obj, namespace, false),
            "error" if self.allow_error_records => self.parse_record(obj, namespace, true),
            "error" => Err(ParseFailure::other("error types are only allowed in protocols")),
            "enum" => self.parse_enum(obj, namespace),
            "fixed" => self.parse_fixed(obj, namespace),
            "array" => {
                let items = obj
                    .get("items")
                    .ok_or_else(|| ParseFailure::other("array missing 'items'"))?;
                Ok(Schema::Array {
                    items: Box::new(self.parse_schema(items, namespace)?),
                    properties: properties(obj, ARRAY_KEYS),
                })
            }
            "map" => {
                let values = obj
                    .get("values")
                    .ok_or_else(|| ParseFailure::other("map missing 'values'"))?;
                Ok(Schema::Map {
                    values: Box::new(self.parse_schema(values, namespace)?),
                    properties: properties(obj, MAP_KEYS),
                })
            }
            other => match PrimitiveType::from_name(other) {
                Some(kind) => Ok(Schema::Primitive {
                    kind,
                    properties: properties(obj, PRIMITIVE_KEYS),
                }),
                None => self.parse_reference(other, namespace),
            },
        }
    }

    fn parse_union(&mut self, branches: &[Value], namespace: Option<&str>) -> ParseResult<Schema> {
        if branches.is_empty() {
            return Err(ParseFailure::other("union must have at least one branch"));
        }

        let mut parsed = Vec::with_capacity(branches.len());
        let mut seen = HashSet::new();
        for branch in branches {
            let schema = self.parse_schema(branch, namespace)?;
            if matches!(schema, Schema::Union(_)) {
                return Err(ParseFailure::other(
                    "unions may not immediately contain other unions",
                ));
            }
            let key = schema.branch_key();
            if !seen.insert(key.clone()) {
                return Err(ParseFailure::other(format!("duplicate in union: {key}")));
            }
            parsed.push(schema);
        }

        Ok(Schema::Union(parsed))
    }

    /// Computes and checks the name of a record, enum or fixed declaration.
    fn declare(
        &self,
        obj: &Map<String, Value>,
        namespace: Option<&str>,
        kind: &str,
    ) -> ParseResult<TypeName> {
        let raw = obj
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| ParseFailure::other(format!("{kind} missing 'name'")))?;

        let explicit_namespace = match obj.get("namespace") {
            None | Some(Value::Null) => None,
            Some(Value::String(ns)) => Some(ns.as_str()),
            Some(other) => {
                return Err(ParseFailure::other(format!(
                    "namespace must be a string, found: {other}"
                )));
            }
        };

        let name = TypeName::qualify(raw, explicit_namespace.or(namespace));
        if !is_valid_name(&name.name) || is_primitive(&name.name) {
            return Err(ParseFailure::other(format!("illegal name: {raw:?}")));
        }
        if let Some(ns) = &name.namespace {
            if !is_valid_namespace(ns) {
                return Err(ParseFailure::other(format!("illegal namespace: {ns:?}")));
            }
        }
        if self.is_declared(&name) {
            return Err(ParseFailure::AlreadyDefined(name));
        }

        Ok(name)
    }

    fn parse_record(
        &mut self,
        obj: &Map<String, Value>,
        namespace: Option<&str>,
        is_error: bool,
    ) -> ParseResult<Schema> {
        let name = self.declare(obj, namespace, "record")?;
        let fields_value = obj
            .get("fields")
            .and_then(Value::as_array)
            .ok_or_else(|| ParseFailure::other(format!("record {name} missing 'fields' array")))?;

        self.in_progress.insert(name.clone());
        let inner_namespace = name.namespace.clone();
        let mut fields: Vec<Field> = Vec::with_capacity(fields_value.len());
        for value in fields_value {
            let field = self.parse_field(value, inner_namespace.as_deref(), &name)?;
            if fields.iter().any(|existing| existing.name == field.name) {
                return Err(ParseFailure::other(format!(
                    "duplicate field {} in record {name}",
                    field.name
                )));
            }
            fields.push(field);
        }
        self.in_progress.remove(&name);

        let record = RecordType {
            name: name.clone(),
            is_error,
            fields,
            doc: doc(obj),
            aliases: aliases(obj, name.namespace.as_deref())?,
            properties: properties(obj, RECORD_KEYS),
        };
        self.defined.push((name.clone(), NamedType::Record(record)));
        Ok(Schema::Named(name))
    }

    fn parse_field(
        &mut self,
        value: &Value,
        namespace: Option<&str>,
        record: &TypeName,
    ) -> ParseResult<Field> {
        let obj = value
            .as_object()
            .ok_or_else(|| ParseFailure::other(format!("field of {record} must be an object")))?;
        let name = obj
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| ParseFailure::other(format!("field of {record} missing 'name'")))?;
        if !is_valid_name(name) {
            return Err(ParseFailure::other(format!("illegal field name {name:?} in {record}")));
        }
        let type_value = obj
            .get("type")
            .ok_or_else(|| {
                ParseFailure::other(format!("field {name} of {record} missing 'type'"))
            })?;
        let schema = self.parse_schema(type_value, namespace)?;

        let order = match obj.get("order").map(|v| v.as_str()) {
            None | Some(Some("ascending")) => FieldOrder::Ascending,
            Some(Some("descending")) => FieldOrder::Descending,
            Some(Some("ignore")) => FieldOrder::Ignore,
            Some(_) => {
                return Err(ParseFailure::other(format!(
                    "illegal sort order for field {name} of {record}"
                )));
            }
        };

        let default = obj.get("default").cloned();
        if let Some(default) = &default {
            if self.validate_defaults && !self.is_valid_default(&schema, default) {
                return Err(ParseFailure::other(format!(
                    "invalid default for field {name} of {record}: {default}"
                )));
            }
        }

        Ok(Field {
            name: name.to_string(),
            schema,
            default,
            order,
            doc: doc(obj),
            aliases: string_list(obj, "aliases")?,
            properties: properties(obj, FIELD_KEYS),
        })
    }

    fn parse_enum(
        &mut self,
        obj: &Map<String, Value>,
        namespace: Option<&str>,
    ) -> ParseResult<Schema> {
        let name = self.declare(obj, namespace, "enum")?;
        let symbols_value = obj
            .get("symbols")
            .and_then(Value::as_array)
            .ok_or_else(|| ParseFailure::other(format!("enum {name} missing 'symbols' array")))?;

        let mut symbols: Vec<String> = Vec::with_capacity(symbols_value.len());
        for symbol in symbols_value {
            let symbol = symbol
                .as_str()
                .filter(|s| is_valid_name(s))
                .ok_or_else(|| {
                    ParseFailure::other(format!("illegal enum symbol {symbol} in {name}"))
                })?;
            if symbols.iter().any(|s| s == symbol) {
                return Err(ParseFailure::other(format!(
                    "duplicate enum symbol {symbol} in {name}"
                )));
            }
            symbols.push(symbol.to_string());
        }

        let default = match obj.get("default") {
            None => None,
            Some(Value::String(default)) if symbols.contains(default) => Some(default.clone()),
            Some(other) => {
                return Err(ParseFailure::other(format!(
                    "enum default {other} is not a symbol of {name}"
                )));
            }
        };

        let enumeration = EnumType {
            name: name.clone(),
            symbols,
            default,
            doc: doc(obj),
            aliases: aliases(obj, name.namespace.as_deref())?,
            properties: properties(obj, ENUM_KEYS),
        };
        self.defined.push((name.clone(), NamedType::Enum(enumeration)));
        Ok(Schema::Named(name))
    }

    fn parse_fixed(
        &mut self,
        obj: &Map<String, Value>,
        namespace: Option<&str>,
    ) -> ParseResult<Schema> {
        let name = self.declare(obj, namespace, "fixed")?;
        let size = obj
            .get("size")
            .and_then(Value::as_u64)
            .and_then(|size| usize::try_from(size).ok())
            .ok_or_else(|| {
                ParseFailure::other(format!("fixed {name} needs a non-negative integer 'size'"))
            })?;

        let fixed = FixedType {
            name: name.clone(),
            size,
            doc: doc(obj),
            aliases: aliases(obj, name.namespace.as_deref())?,
            properties: properties(obj, FIXED_KEYS),
        };
        self.defined.push((name.clone(), NamedType::Fixed(fixed)));
        Ok(Schema::Named(name))
    }

    /// Checks a field default against its type. Records still being parsed
    /// are not inspected.
    fn is_valid_default(&self, schema: &Schema, value: &Value) -> bool {
        match schema {
            Schema::Primitive { kind, .. } => match kind {
                PrimitiveType::Null => value.is_null(),
                PrimitiveType::Boolean => value.is_boolean(),
                PrimitiveType::Int => value
                    .as_i64()
                    .is_some_and(|v| i32::try_from(v).is_ok()),
                PrimitiveType::Long => value.is_i64(),
                PrimitiveType::Float | PrimitiveType::Double => value.is_number(),
                PrimitiveType::Bytes | PrimitiveType::String => value.is_string(),
            },
            Schema::Array { items, .. } => value
                .as_array()
                .is_some_and(|values| values.iter().all(|v| self.is_valid_default(items, v))),
            Schema::Map { values, .. } => value
                .as_object()
                .is_some_and(|entries| entries.values().all(|v| self.is_valid_default(values, v))),
            Schema::Union(branches) => branches.iter().any(|b| self.is_valid_default(b, value)),
            Schema::Named(name) => match self.lookup(name) {
                None => true,
                Some(NamedType::Fixed(_)) => value.is_string(),
                Some(NamedType::Enum(enumeration)) => value
                    .as_str()
                    .is_some_and(|s| enumeration.symbols.iter().any(|symbol| symbol == s)),
                Some(NamedType::Record(record)) => value.as_object().is_some_and(|entries| {
                    record.fields.iter().all(|field| match entries.get(&field.name) {
                        Some(v) => self.is_valid_default(&field.schema, v),
                        None => field.default.is_some(),
                    })
                }),
            },
        }
    }
}

impl Default for SchemaParser<'_> {
    fn default() -> Self {
        Self::new()
    }
}

fn is_valid_full_name(raw: &str) -> bool {
    match raw.rsplit_once('.') {
        Some((ns, simple)) => is_valid_namespace(ns) && is_valid_name(simple),
        None => is_valid_name(raw),
    }
}

fn doc(obj: &Map<String, Value>) -> Option<String> {
    obj.get("doc").and_then(Value::as_str).map(String::from)
}

fn string_list(obj: &Map<String, Value>, key: &str) -> ParseResult<Vec<String>> {
    match obj.get(key) {
        None => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(String::from)
                    .ok_or_else(|| ParseFailure::other(format!("'{key}' entries must be strings")))
            })
            .collect(),
        Some(_) => Err(ParseFailure::other(format!("'{key}' must be an array of strings"))),
    }
}

fn aliases(obj: &Map<String, Value>, namespace: Option<&str>) -> ParseResult<Vec<TypeName>> {
    Ok(string_list(obj, "aliases")?
        .iter()
        .map(|alias| TypeName::qualify(alias, namespace))
        .collect())
}

fn properties(obj: &Map<String, Value>, reserved: &[&str]) -> Properties {
    obj.iter()
        .filter(|(key, _)| !reserved.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}
