//! Avro protocol documents.
//!
//! A protocol is self-contained: its `types` are parsed in order with a
//! fresh parser, and its messages may only refer to those types. No
//! cross-document resolution takes place.

use std::collections::BTreeMap;

use serde_json::{Map, Value, json};

use crate::error::{ParseFailure, ParseResult};
use crate::name::{is_valid_name, is_valid_namespace};
use crate::parser::SchemaParser;
use crate::types::{Field, NamedType, PrimitiveType, Schema};
use crate::TypeName;

/// One message (RPC) of a protocol.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub doc: Option<String>,
    pub request: Vec<Field>,
    pub response: Schema,
    /// Declared errors, always headed by the implicit `string` branch.
    pub errors: Vec<Schema>,
    pub one_way: bool,
}

/// A parsed protocol.
///
/// # Examples
///
/// ```
/// use avro_resolve_core::Protocol;
///
/// let protocol = Protocol::parse_str(r#"{
///     "protocol": "Ping", "namespace": "ex.rpc",
///     "types": [{"type": "record", "name": "Pong", "fields": []}],
///     "messages": {"ping": {"request": [], "response": "Pong"}}
/// }"#).unwrap();
///
/// assert_eq!(protocol.name, "Ping");
/// assert_eq!(protocol.fullname(), "ex.rpc.Ping");
/// assert_eq!(protocol.types.len(), 1);
/// assert!(protocol.messages.contains_key("ping"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Protocol {
    pub name: String,
    pub namespace: Option<String>,
    pub doc: Option<String>,
    /// Declared types in declaration order, nested declarations included.
    pub types: Vec<NamedType>,
    pub messages: BTreeMap<String, Message>,
}

impl Protocol {
    /// Parses a protocol document.
    pub fn parse_str(json: &str) -> ParseResult<Self> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| ParseFailure::other(format!("invalid JSON: {e}")))?;
        Self::parse_value(&value)
    }

    /// Parses an already-decoded protocol document.
    pub fn parse_value(value: &Value) -> ParseResult<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| ParseFailure::other("protocol must be a JSON object"))?;

        let name = obj
            .get("protocol")
            .and_then(Value::as_str)
            .ok_or_else(|| ParseFailure::other("protocol missing 'protocol' name"))?;
        let (namespace, name) = match name.rsplit_once('.') {
            Some((ns, simple)) => (Some(ns.to_string()), simple.to_string()),
            None => (
                obj.get("namespace")
                    .and_then(Value::as_str)
                    .filter(|ns| !ns.is_empty())
                    .map(String::from),
                name.to_string(),
            ),
        };
        if !is_valid_name(&name) {
            return Err(ParseFailure::other(format!("illegal protocol name: {name:?}")));
        }
        if let Some(ns) = &namespace {
            if !is_valid_namespace(ns) {
                return Err(ParseFailure::other(format!("illegal namespace: {ns:?}")));
            }
        }

        let mut parser = SchemaParser::new().allow_error_records(true);
        if let Some(types) = obj.get("types") {
            let types = types
                .as_array()
                .ok_or_else(|| ParseFailure::other("protocol 'types' must be an array"))?;
            for declaration in types {
                parser.parse_schema(declaration, namespace.as_deref())?;
            }
        }

        let mut messages = BTreeMap::new();
        if let Some(declared) = obj.get("messages") {
            let declared = declared
                .as_object()
                .ok_or_else(|| ParseFailure::other("protocol 'messages' must be an object"))?;
            for (message_name, body) in declared {
                let message = parse_message(&mut parser, message_name, body, namespace.as_deref())?;
                messages.insert(message_name.clone(), message);
            }
        }

        Ok(Self {
            name,
            namespace,
            doc: obj.get("doc").and_then(Value::as_str).map(String::from),
            types: parser.into_defined().into_iter().map(|(_, ty)| ty).collect(),
            messages,
        })
    }

    /// Returns `namespace.name`, or `name` without a namespace.
    pub fn fullname(&self) -> String {
        TypeName::new(self.namespace.as_deref(), self.name.clone()).fullname()
    }

    /// Renders the protocol as Avro JSON.
    pub fn to_json_value(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("protocol".to_string(), json!(&self.name));
        if let Some(ns) = &self.namespace {
            obj.insert("namespace".to_string(), json!(ns));
        }
        if let Some(doc) = &self.doc {
            obj.insert("doc".to_string(), json!(doc));
        }
        let types: Vec<Value> = self.types.iter().map(NamedType::to_json_value).collect();
        obj.insert("types".to_string(), Value::Array(types));

        let mut messages = Map::new();
        for (name, message) in &self.messages {
            let mut body = Map::new();
            if let Some(doc) = &message.doc {
                body.insert("doc".to_string(), json!(doc));
            }
            let request: Vec<Value> = message.request.iter().map(Field::to_json_value).collect();
            body.insert("request".to_string(), Value::Array(request));
            body.insert("response".to_string(), message.response.to_json_value());
            // The implicit `string` branch is not written back.
            if message.errors.len() > 1 {
                let errors: Vec<Value> =
                    message.errors[1..].iter().map(Schema::to_json_value).collect();
                body.insert("errors".to_string(), Value::Array(errors));
            }
            if message.one_way {
                body.insert("one-way".to_string(), json!(true));
            }
            messages.insert(name.clone(), Value::Object(body));
        }
        obj.insert("messages".to_string(), Value::Object(messages));
        Value::Object(obj)
    }
}

fn parse_message(
    parser: &mut SchemaParser<'_>,
    name: &str,
    body: &Value,
    namespace: Option<&str>,
) -> ParseResult<Message> {
    let body = body
        .as_object()
        .ok_or_else(|| ParseFailure::other(format!("message {name} must be an object")))?;

    let request_value = body
        .get("request")
        .and_then(Value::as_array)
        .ok_or_else(|| ParseFailure::other(format!("message {name} missing 'request' array")))?;
    let mut request: Vec<Field> = Vec::with_capacity(request_value.len());
    for param in request_value {
        let param_obj = param
            .as_object()
            .ok_or_else(|| ParseFailure::other(format!("parameter of {name} must be an object")))?;
        let param_name = param_obj
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| ParseFailure::other(format!("parameter of {name} missing 'name'")))?;
        let param_type = param_obj.get("type").ok_or_else(|| {
            ParseFailure::other(format!("parameter {param_name} of {name} missing 'type'"))
        })?;
        let mut field = Field::new(param_name, parser.parse_schema(param_type, namespace)?);
        field.doc = param_obj.get("doc").and_then(Value::as_str).map(String::from);
        field.default = param_obj.get("default").cloned();
        request.push(field);
    }

    let response = match body.get("response") {
        Some(response) => parser.parse_schema(response, namespace)?,
        None => return Err(ParseFailure::other(format!("message {name} missing 'response'"))),
    };

    let mut errors = vec![Schema::primitive(PrimitiveType::String)];
    if let Some(declared) = body.get("errors") {
        let declared = declared
            .as_array()
            .ok_or_else(|| ParseFailure::other(format!("errors of {name} must be an array")))?;
        for error in declared {
            errors.push(parser.parse_schema(error, namespace)?);
        }
    }

    let one_way = body.get("one-way").and_then(Value::as_bool).unwrap_or(false);
    if one_way {
        let null_response = matches!(
            response,
            Schema::Primitive {
                kind: PrimitiveType::Null,
                ..
            }
        );
        if !null_response || errors.len() > 1 {
            return Err(ParseFailure::other(format!(
                "one-way message {name} must have a null response and no errors"
            )));
        }
    }

    Ok(Message {
        doc: body.get("doc").and_then(Value::as_str).map(String::from),
        request,
        response,
        errors,
        one_way,
    })
}
