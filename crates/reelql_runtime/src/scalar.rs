//! Scalar codecs.
//!
//! A codec owns the three coercion directions of one scalar type:
//! `serialize` for outgoing leaf values, `parse_value` for values supplied
//! by a transport, and `parse_literal` for literals taken from a query
//! document.

use crate::schema::RegistryError;
use chrono::DateTime;
use rustc_hash::FxHashMap;
use serde_json::Value;
use thiserror::Error;

/// Failure to coerce a value through a scalar codec.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("scalar `{scalar}`: {message}")]
pub struct ScalarError {
    pub scalar: String,
    pub message: String,
}

impl ScalarError {
    /// Creates a new coercion error.
    pub fn new(scalar: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            scalar: scalar.into(),
            message: message.into(),
        }
    }
}

/// Describes a JSON value's kind for error messages.
pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

/// The serialize / parse-value / parse-literal triplet of one scalar.
///
/// `serialize` is expected to be total over well-formed internal values; an
/// error from it still surfaces as a field error, but indicates the codec
/// was registered for a type whose internal representation it does not
/// understand.
pub trait ScalarCodec: Send + Sync {
    /// The scalar name this codec serves.
    fn name(&self) -> &str;

    /// Converts an internal value to its wire form.
    fn serialize(&self, value: &Value) -> Result<Value, ScalarError>;

    /// Coerces a transport-supplied input value to the internal form.
    fn parse_value(&self, value: &Value) -> Result<Value, ScalarError>;

    /// Coerces a query-document literal to the internal form.
    fn parse_literal(&self, literal: &Value) -> Result<Value, ScalarError>;
}

fn int_in_range(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .filter(|n| *n >= i64::from(i32::MIN) && *n <= i64::from(i32::MAX))
}

/// Built-in `Int` codec: 32-bit signed integers.
pub struct IntCodec;

impl IntCodec {
    fn coerce(&self, value: &Value) -> Result<Value, ScalarError> {
        int_in_range(value).map(Value::from).ok_or_else(|| {
            ScalarError::new("Int", format!("expected a 32-bit integer, got {}", json_kind(value)))
        })
    }
}

impl ScalarCodec for IntCodec {
    fn name(&self) -> &str {
        "Int"
    }

    fn serialize(&self, value: &Value) -> Result<Value, ScalarError> {
        self.coerce(value)
    }

    fn parse_value(&self, value: &Value) -> Result<Value, ScalarError> {
        self.coerce(value)
    }

    fn parse_literal(&self, literal: &Value) -> Result<Value, ScalarError> {
        self.coerce(literal)
    }
}

/// Built-in `Float` codec. Integers widen to floats.
pub struct FloatCodec;

impl FloatCodec {
    fn coerce(&self, value: &Value) -> Result<Value, ScalarError> {
        value
            .as_f64()
            .and_then(|f| serde_json::Number::from_f64(f).map(Value::Number))
            .ok_or_else(|| {
                ScalarError::new("Float", format!("expected a number, got {}", json_kind(value)))
            })
    }
}

impl ScalarCodec for FloatCodec {
    fn name(&self) -> &str {
        "Float"
    }

    fn serialize(&self, value: &Value) -> Result<Value, ScalarError> {
        self.coerce(value)
    }

    fn parse_value(&self, value: &Value) -> Result<Value, ScalarError> {
        self.coerce(value)
    }

    fn parse_literal(&self, literal: &Value) -> Result<Value, ScalarError> {
        self.coerce(literal)
    }
}

/// Built-in `String` codec.
pub struct StringCodec;

impl StringCodec {
    fn coerce(&self, value: &Value) -> Result<Value, ScalarError> {
        match value {
            Value::String(_) => Ok(value.clone()),
            other => Err(ScalarError::new(
                "String",
                format!("expected a string, got {}", json_kind(other)),
            )),
        }
    }
}

impl ScalarCodec for StringCodec {
    fn name(&self) -> &str {
        "String"
    }

    fn serialize(&self, value: &Value) -> Result<Value, ScalarError> {
        self.coerce(value)
    }

    fn parse_value(&self, value: &Value) -> Result<Value, ScalarError> {
        self.coerce(value)
    }

    fn parse_literal(&self, literal: &Value) -> Result<Value, ScalarError> {
        self.coerce(literal)
    }
}

/// Built-in `Boolean` codec.
pub struct BooleanCodec;

impl BooleanCodec {
    fn coerce(&self, value: &Value) -> Result<Value, ScalarError> {
        match value {
            Value::Bool(_) => Ok(value.clone()),
            other => Err(ScalarError::new(
                "Boolean",
                format!("expected a boolean, got {}", json_kind(other)),
            )),
        }
    }
}

impl ScalarCodec for BooleanCodec {
    fn name(&self) -> &str {
        "Boolean"
    }

    fn serialize(&self, value: &Value) -> Result<Value, ScalarError> {
        self.coerce(value)
    }

    fn parse_value(&self, value: &Value) -> Result<Value, ScalarError> {
        self.coerce(value)
    }

    fn parse_literal(&self, literal: &Value) -> Result<Value, ScalarError> {
        self.coerce(literal)
    }
}

/// Built-in `ID` codec: strings pass through, integers stringify.
pub struct IdCodec;

impl IdCodec {
    fn coerce(&self, value: &Value) -> Result<Value, ScalarError> {
        match value {
            Value::String(_) => Ok(value.clone()),
            Value::Number(n) if n.is_i64() || n.is_u64() => Ok(Value::String(n.to_string())),
            other => Err(ScalarError::new(
                "ID",
                format!("expected a string or integer, got {}", json_kind(other)),
            )),
        }
    }
}

impl ScalarCodec for IdCodec {
    fn name(&self) -> &str {
        "ID"
    }

    fn serialize(&self, value: &Value) -> Result<Value, ScalarError> {
        self.coerce(value)
    }

    fn parse_value(&self, value: &Value) -> Result<Value, ScalarError> {
        self.coerce(value)
    }

    fn parse_literal(&self, literal: &Value) -> Result<Value, ScalarError> {
        self.coerce(literal)
    }
}

/// `Date` codec. The wire form is epoch milliseconds.
///
/// `parse_literal` only accepts an integer literal. `parse_value`
/// additionally accepts an RFC 3339 string, since transports commonly carry
/// timestamps that way. `serialize` accepts either internal form and always
/// emits epoch milliseconds.
pub struct DateCodec;

impl DateCodec {
    fn millis_from(&self, value: &Value) -> Result<Value, ScalarError> {
        match value {
            Value::Number(n) if n.is_i64() => Ok(value.clone()),
            Value::String(s) => DateTime::parse_from_rfc3339(s)
                .map(|dt| Value::from(dt.timestamp_millis()))
                .map_err(|e| ScalarError::new("Date", format!("invalid RFC 3339 timestamp: {e}"))),
            other => Err(ScalarError::new(
                "Date",
                format!("expected epoch milliseconds or an RFC 3339 string, got {}", json_kind(other)),
            )),
        }
    }
}

impl ScalarCodec for DateCodec {
    fn name(&self) -> &str {
        "Date"
    }

    fn serialize(&self, value: &Value) -> Result<Value, ScalarError> {
        self.millis_from(value)
    }

    fn parse_value(&self, value: &Value) -> Result<Value, ScalarError> {
        self.millis_from(value)
    }

    fn parse_literal(&self, literal: &Value) -> Result<Value, ScalarError> {
        match literal {
            Value::Number(n) if n.is_i64() => Ok(literal.clone()),
            other => Err(ScalarError::new(
                "Date",
                format!("literal must be epoch milliseconds, got {}", json_kind(other)),
            )),
        }
    }
}

/// The set of codecs available to an executor, one per scalar name.
pub struct CodecSet {
    codecs: FxHashMap<String, Box<dyn ScalarCodec>>,
}

impl Default for CodecSet {
    fn default() -> Self {
        Self::new()
    }
}

impl CodecSet {
    /// Creates a set holding the built-in codecs.
    pub fn new() -> Self {
        let mut codecs: FxHashMap<String, Box<dyn ScalarCodec>> = FxHashMap::default();
        codecs.insert("Int".to_string(), Box::new(IntCodec));
        codecs.insert("Float".to_string(), Box::new(FloatCodec));
        codecs.insert("String".to_string(), Box::new(StringCodec));
        codecs.insert("Boolean".to_string(), Box::new(BooleanCodec));
        codecs.insert("ID".to_string(), Box::new(IdCodec));
        Self { codecs }
    }

    /// Registers a codec. Exactly one codec may exist per scalar name.
    pub fn register(&mut self, codec: impl ScalarCodec + 'static) -> Result<(), RegistryError> {
        let name = codec.name().to_string();
        if self.codecs.contains_key(&name) {
            return Err(RegistryError::DuplicateCodec(name));
        }
        self.codecs.insert(name, Box::new(codec));
        Ok(())
    }

    /// Gets the codec for a scalar name.
    pub fn get(&self, name: &str) -> Option<&dyn ScalarCodec> {
        self.codecs.get(name).map(AsRef::as_ref)
    }

    /// Returns true if a codec is registered for `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.codecs.contains_key(name)
    }
}

impl std::fmt::Debug for CodecSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodecSet")
            .field("codec_count", &self.codecs.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_int_codec_range() {
        let codec = IntCodec;
        assert_eq!(codec.serialize(&json!(5)).unwrap(), json!(5));
        assert_eq!(codec.parse_literal(&json!(-42)).unwrap(), json!(-42));

        assert!(codec.serialize(&json!(i64::from(i32::MAX) + 1)).is_err());
        assert!(codec.parse_value(&json!("5")).is_err());
        assert!(codec.parse_literal(&json!(1.5)).is_err());
    }

    #[test]
    fn test_id_codec_accepts_integers() {
        let codec = IdCodec;
        assert_eq!(codec.serialize(&json!("321")).unwrap(), json!("321"));
        assert_eq!(codec.parse_value(&json!(321)).unwrap(), json!("321"));
        assert!(codec.parse_literal(&json!(true)).is_err());
    }

    #[test]
    fn test_date_codec_literal() {
        let codec = DateCodec;
        assert_eq!(
            codec.parse_literal(&json!(434_592_000_000_i64)).unwrap(),
            json!(434_592_000_000_i64)
        );
        // Literals never take the string form.
        assert!(codec.parse_literal(&json!("1983-10-10T00:00:00Z")).is_err());
    }

    #[test]
    fn test_date_codec_value() {
        let codec = DateCodec;
        let millis = codec.parse_value(&json!("1983-10-10T00:00:00Z")).unwrap();
        assert_eq!(millis, json!(434_592_000_000_i64));

        assert_eq!(
            codec.parse_value(&json!(434_592_000_000_i64)).unwrap(),
            json!(434_592_000_000_i64)
        );
        assert!(codec.parse_value(&json!("not a date")).is_err());
    }

    #[test]
    fn test_date_codec_serialize() {
        let codec = DateCodec;
        assert_eq!(
            codec.serialize(&json!("1983-10-10T00:00:00Z")).unwrap(),
            json!(434_592_000_000_i64)
        );
        assert_eq!(codec.serialize(&json!(0)).unwrap(), json!(0));
        assert!(codec.serialize(&json!({})).is_err());
    }

    #[test]
    fn test_codec_set_builtins() {
        let set = CodecSet::new();
        for name in ["Int", "Float", "String", "Boolean", "ID"] {
            assert!(set.contains(name), "missing built-in codec {name}");
        }
        assert!(!set.contains("Date"));
    }

    #[test]
    fn test_codec_set_duplicate_rejected() {
        let mut set = CodecSet::new();
        set.register(DateCodec).unwrap();
        let err = set.register(DateCodec).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateCodec("Date".to_string()));
    }
}
