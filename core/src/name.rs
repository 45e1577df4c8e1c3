//! Fully-qualified type names and Avro naming rules.
//!
//! A [`TypeName`] is the unit of resolution: two declarations collide exactly
//! when their fullnames are identical strings.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Avro primitive type names. None of these may be used as a named type.
pub const PRIMITIVE_TYPES: &[&str] = &[
    "null", "boolean", "int", "long", "float", "double", "bytes", "string",
];

/// Namespace-qualified name of a record, enum, or fixed type.
///
/// # Examples
///
/// ```
/// use avro_resolve_core::TypeName;
///
/// let name = TypeName::qualify("Order", Some("example.shop"));
/// assert_eq!(name.fullname(), "example.shop.Order");
///
/// // A dotted name is already fully qualified.
/// let name = TypeName::qualify("other.Item", Some("example.shop"));
/// assert_eq!(name.namespace.as_deref(), Some("other"));
/// assert_eq!(name.name, "Item");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub struct TypeName {
    /// Namespace, `None` for the null namespace.
    pub namespace: Option<String>,
    /// Simple name (no dots).
    pub name: String,
}

impl TypeName {
    /// Creates a name from an explicit namespace and simple name.
    pub fn new(namespace: Option<&str>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.filter(|ns| !ns.is_empty()).map(String::from),
            name: name.into(),
        }
    }

    /// Qualifies `raw` against `namespace`.
    ///
    /// Dotted names carry their own namespace; undotted names inherit the
    /// given one. An empty namespace is the null namespace.
    pub fn qualify(raw: &str, namespace: Option<&str>) -> Self {
        match raw.rsplit_once('.') {
            Some((ns, simple)) => Self::new(Some(ns), simple),
            None => Self::new(namespace, raw),
        }
    }

    /// Returns `namespace.name`, or `name` in the null namespace.
    pub fn fullname(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{ns}.{}", self.name),
            None => self.name.clone(),
        }
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{ns}.{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

impl From<TypeName> for String {
    fn from(name: TypeName) -> Self {
        name.fullname()
    }
}

impl From<String> for TypeName {
    fn from(raw: String) -> Self {
        TypeName::qualify(&raw, None)
    }
}

impl From<&str> for TypeName {
    fn from(raw: &str) -> Self {
        TypeName::qualify(raw, None)
    }
}

/// Returns `true` if `segment` matches `[A-Za-z_][A-Za-z0-9_]*`.
pub fn is_valid_name(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Returns `true` if every dot-separated segment of `namespace` is a valid
/// name. The empty namespace is valid.
pub fn is_valid_namespace(namespace: &str) -> bool {
    namespace.is_empty() || namespace.split('.').all(is_valid_name)
}

/// Returns `true` for the eight Avro primitive type names.
pub fn is_primitive(name: &str) -> bool {
    PRIMITIVE_TYPES.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualify_inherits_enclosing_namespace() {
        let name = TypeName::qualify("Gender", Some("example"));
        assert_eq!(name, TypeName::new(Some("example"), "Gender"));
        assert_eq!(name.to_string(), "example.Gender");
    }

    #[test]
    fn test_qualify_empty_namespace_is_null_namespace() {
        let name = TypeName::qualify("Gender", Some(""));
        assert_eq!(name.namespace, None);
        assert_eq!(name.fullname(), "Gender");
    }

    #[test]
    fn test_qualify_dotted_name_ignores_enclosing_namespace() {
        let name = TypeName::qualify("a.b.C", Some("x.y"));
        assert_eq!(name.namespace.as_deref(), Some("a.b"));
        assert_eq!(name.name, "C");
    }

    #[test]
    fn test_name_validation() {
        assert!(is_valid_name("_Order2"));
        assert!(!is_valid_name("2Order"));
        assert!(!is_valid_name("Or-der"));
        assert!(!is_valid_name(""));
        assert!(is_valid_namespace("io.example.events"));
        assert!(is_valid_namespace(""));
        assert!(!is_valid_namespace("io..events"));
    }

    #[test]
    fn test_serde_uses_fullname() {
        let name = TypeName::qualify("example.Dog", None);
        let json = serde_json::to_string(&name).unwrap();
        assert_eq!(json, "\"example.Dog\"");
        let back: TypeName = serde_json::from_str(&json).unwrap();
        assert_eq!(back, name);
    }
}
