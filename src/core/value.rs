//! Purpose: Typed field values and the converters that produce them from raw tokens.
//! Exports: `Value`, `Converter`, `ConvertFn`, `ConversionError`, token constants.
//! Role: Field Converter Set; pure functions with no knowledge of schemas or files.
//! Invariants: `\N` decodes to `Value::Missing` for built-in scalars, to an empty list for `List`.
//! Invariants: Booleans accept only the dataset tokens `0` and `1`.

use serde::ser::{Serialize, SerializeSeq, Serializer};
use std::error::Error as StdError;
use std::fmt;
use std::num::{ParseFloatError, ParseIntError};

/// Reserved token meaning "no value" in the dataset family.
pub const MISSING_TOKEN: &str = "\\N";
/// Separator between sub-values packed into one `List` field.
pub const LIST_SEPARATOR: char = ',';
/// Separator between fields of a line.
pub const FIELD_DELIMITER: char = '\t';

const TRUE_TOKEN: &str = "1";
const FALSE_TOKEN: &str = "0";

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Text(String),
    Int(i64),
    Real(f64),
    Bool(bool),
    List(Vec<String>),
    Missing,
}

impl Value {
    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Real(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Renders the value back into its raw token form, used for matching on the CLI.
    pub fn to_token(&self) -> String {
        match self {
            Value::Text(text) => text.clone(),
            Value::Int(value) => value.to_string(),
            Value::Real(value) => value.to_string(),
            Value::Bool(true) => TRUE_TOKEN.to_string(),
            Value::Bool(false) => FALSE_TOKEN.to_string(),
            Value::List(items) if items.is_empty() => MISSING_TOKEN.to_string(),
            Value::List(items) => items.join(&LIST_SEPARATOR.to_string()),
            Value::Missing => MISSING_TOKEN.to_string(),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Text(text) => serializer.serialize_str(text),
            Value::Int(value) => serializer.serialize_i64(*value),
            Value::Real(value) => serializer.serialize_f64(*value),
            Value::Bool(value) => serializer.serialize_bool(*value),
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Missing => serializer.serialize_none(),
        }
    }
}

#[derive(Debug)]
pub enum ConversionError {
    /// The line ended before this column's field.
    MissingField { index: usize },
    InvalidInt { raw: String, source: ParseIntError },
    InvalidReal { raw: String, source: ParseFloatError },
    InvalidBool { raw: String },
    /// Rejected by a caller-supplied converter.
    Rejected { raw: String, reason: String },
}

impl ConversionError {
    pub fn rejected(raw: &str, reason: impl Into<String>) -> Self {
        ConversionError::Rejected {
            raw: raw.to_string(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversionError::MissingField { index } => {
                write!(f, "line has no field at index {index}")
            }
            ConversionError::InvalidInt { raw, .. } => write!(f, "invalid integer: {raw:?}"),
            ConversionError::InvalidReal { raw, .. } => write!(f, "invalid real: {raw:?}"),
            ConversionError::InvalidBool { raw } => {
                write!(f, "invalid boolean: {raw:?} (expected 0 or 1)")
            }
            ConversionError::Rejected { raw, reason } => write!(f, "{reason}: {raw:?}"),
        }
    }
}

impl StdError for ConversionError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            ConversionError::InvalidInt { source, .. } => Some(source),
            ConversionError::InvalidReal { source, .. } => Some(source),
            _ => None,
        }
    }
}

pub type ConvertFn = fn(&str) -> Result<Value, ConversionError>;

/// How one column turns its raw token into a `Value`.
#[derive(Clone, Copy, Debug)]
pub enum Converter {
    Text,
    Int,
    Real,
    Bool,
    List,
    Custom(ConvertFn),
}

impl Converter {
    pub fn convert(&self, raw: &str) -> Result<Value, ConversionError> {
        match self {
            Converter::Custom(convert) => convert(raw),
            Converter::List if raw == MISSING_TOKEN => Ok(Value::List(Vec::new())),
            _ if raw == MISSING_TOKEN => Ok(Value::Missing),
            Converter::Text => Ok(Value::Text(raw.to_string())),
            Converter::Int => raw
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|source| ConversionError::InvalidInt {
                    raw: raw.to_string(),
                    source,
                }),
            Converter::Real => raw
                .parse::<f64>()
                .map(Value::Real)
                .map_err(|source| ConversionError::InvalidReal {
                    raw: raw.to_string(),
                    source,
                }),
            Converter::Bool => match raw {
                TRUE_TOKEN => Ok(Value::Bool(true)),
                FALSE_TOKEN => Ok(Value::Bool(false)),
                _ => Err(ConversionError::InvalidBool {
                    raw: raw.to_string(),
                }),
            },
            Converter::List => Ok(Value::List(
                raw.split(LIST_SEPARATOR).map(str::to_string).collect(),
            )),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Converter::Text => "text",
            Converter::Int => "int",
            Converter::Real => "real",
            Converter::Bool => "bool",
            Converter::List => "list",
            Converter::Custom(_) => "custom",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ConversionError, Converter, MISSING_TOKEN, Value};

    #[test]
    fn missing_token_maps_to_missing_for_scalars() {
        for converter in [Converter::Text, Converter::Int, Converter::Real, Converter::Bool] {
            assert_eq!(
                converter.convert(MISSING_TOKEN).expect("convert"),
                Value::Missing,
                "{}",
                converter.label()
            );
        }
    }

    #[test]
    fn missing_token_maps_to_empty_list() {
        assert_eq!(
            Converter::List.convert(MISSING_TOKEN).expect("convert"),
            Value::List(Vec::new())
        );
    }

    #[test]
    fn int_requires_whole_numbers() {
        assert_eq!(Converter::Int.convert("1999").expect("int"), Value::Int(1999));
        assert_eq!(Converter::Int.convert("-4").expect("int"), Value::Int(-4));
        let err = Converter::Int.convert("7.5").expect_err("fraction");
        assert!(matches!(err, ConversionError::InvalidInt { .. }));
        assert!(Converter::Int.convert("").is_err());
    }

    #[test]
    fn real_parses_doubles_and_rejects_garbage() {
        assert_eq!(Converter::Real.convert("7.5").expect("real"), Value::Real(7.5));
        assert_eq!(Converter::Real.convert("10").expect("real"), Value::Real(10.0));
        let err = Converter::Real.convert("NaN-ish").expect_err("garbage");
        assert!(matches!(err, ConversionError::InvalidReal { .. }));
    }

    #[test]
    fn bool_accepts_only_dataset_tokens() {
        assert_eq!(Converter::Bool.convert("1").expect("bool"), Value::Bool(true));
        assert_eq!(Converter::Bool.convert("0").expect("bool"), Value::Bool(false));
        assert!(Converter::Bool.convert("true").is_err());
        assert!(Converter::Bool.convert("2").is_err());
    }

    #[test]
    fn list_splits_on_commas() {
        assert_eq!(
            Converter::List.convert("Drama,Romance").expect("list"),
            Value::List(vec!["Drama".to_string(), "Romance".to_string()])
        );
        assert_eq!(
            Converter::List.convert("nm0000001").expect("list"),
            Value::List(vec!["nm0000001".to_string()])
        );
    }

    #[test]
    fn custom_converter_sees_raw_token() {
        fn upper(raw: &str) -> Result<Value, ConversionError> {
            if raw.is_empty() {
                return Err(ConversionError::rejected(raw, "empty code"));
            }
            Ok(Value::Text(raw.to_uppercase()))
        }

        let converter = Converter::Custom(upper);
        assert_eq!(
            converter.convert("us").expect("custom"),
            Value::Text("US".to_string())
        );
        assert_eq!(
            converter.convert(MISSING_TOKEN).expect("custom"),
            Value::Text("\\N".to_string())
        );
        assert!(converter.convert("").is_err());
    }

    #[test]
    fn values_serialize_to_plain_json() {
        let values = vec![
            Value::Text("tt0000001".to_string()),
            Value::Int(5),
            Value::Real(7.5),
            Value::Bool(false),
            Value::List(vec!["a".to_string()]),
            Value::Missing,
        ];
        let json = serde_json::to_string(&values).expect("json");
        assert_eq!(json, r#"["tt0000001",5,7.5,false,["a"],null]"#);
    }

    #[test]
    fn tokens_round_trip_through_to_token() {
        assert_eq!(Value::Bool(true).to_token(), "1");
        assert_eq!(Value::Missing.to_token(), "\\N");
        assert_eq!(Value::List(Vec::new()).to_token(), "\\N");
        assert_eq!(
            Value::List(vec!["a".to_string(), "b".to_string()]).to_token(),
            "a,b"
        );
    }
}
