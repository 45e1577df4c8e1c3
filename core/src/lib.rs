//! Avro schema model and single-document parser.
//!
//! This crate defines the building blocks used to resolve a set of Avro
//! definition documents:
//!
//! - [`TypeName`]: namespace-qualified name of a record, enum or fixed type.
//! - [`Schema`]: a type expression; nested named declarations are referred
//!   to by name through [`Schema::Named`].
//! - [`NamedType`]: a record, enum or fixed declaration. Equality ignores
//!   documentation and aliases.
//! - [`SchemaParser`]: parses one document against previously known
//!   [`Definitions`], failing with a typed [`ParseFailure`].
//! - [`Protocol`]: a self-contained protocol document with its own types
//!   and messages.
//!
//! # Example
//!
//! ```
//! use avro_resolve_core::*;
//!
//! let gender = r#"{"type": "enum", "name": "example.Gender", "symbols": ["F", "M"]}"#;
//! let person = r#"{"type": "record", "name": "example.Person",
//!                  "fields": [{"name": "gender", "type": "Gender"}]}"#;
//!
//! let mut known = Definitions::new();
//! known.extend(SchemaParser::new().parse_str(gender).unwrap().defined);
//!
//! let parsed = SchemaParser::with_known(&known).parse_str(person).unwrap();
//! let (name, ty) = &parsed.defined[0];
//! assert_eq!(name.fullname(), "example.Person");
//! assert_eq!(ty.references(), vec![TypeName::qualify("example.Gender", None)]);
//! ```

mod error;
mod name;
mod parser;
mod protocol;
mod types;

pub use error::{ParseFailure, ParseResult};
pub use name::{PRIMITIVE_TYPES, TypeName, is_primitive, is_valid_name, is_valid_namespace};
pub use parser::{Definitions, ParsedDocument, SchemaParser};
pub use protocol::{Message, Protocol};
pub use types::{
    EnumType, Field, FieldOrder, FixedType, NamedType, PrimitiveType, Properties, RecordType,
    Schema,
};
