//! Bound parameter values and their SQL-literal rendering.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Literal emitted for SQL NULL and for positions that were never bound.
pub const NULL_LITERAL: &str = "null";

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// A value bound to a statement parameter.
///
/// Rendering produces display-only SQL: text is wrapped in single quotes
/// without escaping embedded quotes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum BoundValue {
    /// SQL NULL
    Null,
    /// Any signed or unsigned integer that fits in `i64`
    Int(i64),
    /// Floating point number
    Float(f64),
    /// Boolean
    Bool(bool),
    /// Character data
    Text(String),
    /// Binary data, rendered as quoted upper-case hex
    Bytes(Vec<u8>),
    /// Timestamp without time zone
    Timestamp(NaiveDateTime),
    /// Calendar date
    Date(NaiveDate),
    /// UUID
    Uuid(Uuid),
    /// Anything else, rendered verbatim
    Other(String),
}

impl BoundValue {
    /// Wrap any displayable value as [`BoundValue::Other`].
    pub fn other(value: impl fmt::Display) -> Self {
        Self::Other(value.to_string())
    }

    /// Whether this is SQL NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Append the SQL literal for this value to `out`.
    pub fn write_literal(&self, out: &mut String) {
        match self {
            BoundValue::Null => out.push_str(NULL_LITERAL),
            BoundValue::Int(n) => out.push_str(&n.to_string()),
            // `Debug` keeps the fractional part of whole numbers (`1.0`, not `1`).
            BoundValue::Float(f) => out.push_str(&format!("{f:?}")),
            BoundValue::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            BoundValue::Text(s) => {
                out.push('\'');
                out.push_str(s);
                out.push('\'');
            }
            BoundValue::Bytes(bytes) => {
                out.reserve(bytes.len() * 2 + 2);
                out.push('\'');
                for b in bytes {
                    out.push(HEX_DIGITS[usize::from(b >> 4)] as char);
                    out.push(HEX_DIGITS[usize::from(b & 0x0f)] as char);
                }
                out.push('\'');
            }
            BoundValue::Timestamp(ts) => {
                out.push('\'');
                out.push_str(&ts.to_string());
                out.push('\'');
            }
            BoundValue::Date(d) => {
                out.push('\'');
                out.push_str(&d.to_string());
                out.push('\'');
            }
            BoundValue::Uuid(id) => {
                out.push('\'');
                out.push_str(&id.hyphenated().to_string());
                out.push('\'');
            }
            BoundValue::Other(s) => out.push_str(s),
        }
    }

    /// Render the SQL literal for this value.
    pub fn to_literal(&self) -> String {
        let mut out = String::new();
        self.write_literal(&mut out);
        out
    }
}

impl fmt::Display for BoundValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_literal())
    }
}

macro_rules! impl_from_int {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for BoundValue {
                fn from(value: $ty) -> Self {
                    BoundValue::Int(i64::from(value))
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<u64> for BoundValue {
    fn from(value: u64) -> Self {
        match i64::try_from(value) {
            Ok(n) => BoundValue::Int(n),
            Err(_) => BoundValue::Other(value.to_string()),
        }
    }
}

impl From<f32> for BoundValue {
    fn from(value: f32) -> Self {
        BoundValue::Float(f64::from(value))
    }
}

impl From<f64> for BoundValue {
    fn from(value: f64) -> Self {
        BoundValue::Float(value)
    }
}

impl From<bool> for BoundValue {
    fn from(value: bool) -> Self {
        BoundValue::Bool(value)
    }
}

impl From<&str> for BoundValue {
    fn from(value: &str) -> Self {
        BoundValue::Text(value.to_string())
    }
}

impl From<String> for BoundValue {
    fn from(value: String) -> Self {
        BoundValue::Text(value)
    }
}

impl From<&[u8]> for BoundValue {
    fn from(value: &[u8]) -> Self {
        BoundValue::Bytes(value.to_vec())
    }
}

impl From<Vec<u8>> for BoundValue {
    fn from(value: Vec<u8>) -> Self {
        BoundValue::Bytes(value)
    }
}

impl From<NaiveDateTime> for BoundValue {
    fn from(value: NaiveDateTime) -> Self {
        BoundValue::Timestamp(value)
    }
}

impl From<DateTime<Utc>> for BoundValue {
    fn from(value: DateTime<Utc>) -> Self {
        BoundValue::Timestamp(value.naive_utc())
    }
}

impl From<NaiveDate> for BoundValue {
    fn from(value: NaiveDate) -> Self {
        BoundValue::Date(value)
    }
}

impl From<Uuid> for BoundValue {
    fn from(value: Uuid) -> Self {
        BoundValue::Uuid(value)
    }
}

impl From<serde_json::Value> for BoundValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => BoundValue::Null,
            Value::Bool(b) => BoundValue::Bool(b),
            Value::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => BoundValue::Int(i),
                (None, Some(f)) if n.is_f64() => BoundValue::Float(f),
                _ => BoundValue::Other(n.to_string()),
            },
            Value::String(s) => BoundValue::Text(s),
            other @ (Value::Array(_) | Value::Object(_)) => BoundValue::Other(other.to_string()),
        }
    }
}

impl<T: Into<BoundValue>> From<Option<T>> for BoundValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(BoundValue::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_scalars_in_natural_form() {
        assert_eq!(BoundValue::from(5).to_literal(), "5");
        assert_eq!(BoundValue::from(-12i64).to_literal(), "-12");
        assert_eq!(BoundValue::from(1.5).to_literal(), "1.5");
        assert_eq!(BoundValue::from(true).to_literal(), "true");
        assert_eq!(BoundValue::from(false).to_literal(), "false");
        assert_eq!(BoundValue::Null.to_literal(), "null");
    }

    #[test]
    fn whole_floats_keep_fraction() {
        assert_eq!(BoundValue::from(1.0).to_literal(), "1.0");
        assert_eq!(BoundValue::from(-3.0f32).to_literal(), "-3.0");
        assert_eq!(BoundValue::from(0.25).to_literal(), "0.25");
    }

    #[test]
    fn quotes_text_without_escaping() {
        assert_eq!(BoundValue::from("alice").to_literal(), "'alice'");
        assert_eq!(BoundValue::from("O'Brien").to_literal(), "'O'Brien'");
        assert_eq!(BoundValue::from(String::new()).to_literal(), "''");
    }

    #[test]
    fn renders_bytes_as_quoted_hex() {
        let value = BoundValue::from(vec![0xde_u8, 0xad, 0x00, 0x0f]);
        assert_eq!(value.to_literal(), "'DEAD000F'");
        assert_eq!(BoundValue::from(&[0u8; 0][..]).to_literal(), "''");
    }

    #[test]
    fn quotes_temporal_and_uuid_values() {
        let date = NaiveDate::from_ymd_opt(2019, 1, 29).unwrap();
        let ts = date.and_hms_opt(10, 30, 0).unwrap();
        assert_eq!(BoundValue::from(date).to_literal(), "'2019-01-29'");
        assert_eq!(BoundValue::from(ts).to_literal(), "'2019-01-29 10:30:00'");

        let id = Uuid::nil();
        assert_eq!(
            BoundValue::from(id).to_literal(),
            "'00000000-0000-0000-0000-000000000000'"
        );
    }

    #[test]
    fn option_none_is_null() {
        assert_eq!(BoundValue::from(None::<i32>), BoundValue::Null);
        assert_eq!(BoundValue::from(Some("x")), BoundValue::Text("x".into()));
    }

    #[test]
    fn u64_beyond_i64_falls_back_to_other() {
        assert_eq!(BoundValue::from(7u64), BoundValue::Int(7));
        assert_eq!(
            BoundValue::from(u64::MAX),
            BoundValue::Other(u64::MAX.to_string())
        );
    }

    #[test]
    fn converts_json_values() {
        use serde_json::json;

        assert_eq!(BoundValue::from(json!(null)), BoundValue::Null);
        assert_eq!(BoundValue::from(json!(3)), BoundValue::Int(3));
        assert_eq!(BoundValue::from(json!(2.5)), BoundValue::Float(2.5));
        assert_eq!(BoundValue::from(json!("a")), BoundValue::Text("a".into()));
        assert_eq!(
            BoundValue::from(json!({"k": 1})).to_literal(),
            r#"{"k":1}"#
        );
    }

    #[test]
    fn serializes_with_type_tag() {
        let json = serde_json::to_value(BoundValue::Int(5)).unwrap();
        assert_eq!(json, serde_json::json!({"type": "int", "value": 5}));

        let back: BoundValue = serde_json::from_value(json).unwrap();
        assert_eq!(back, BoundValue::Int(5));
    }
}
