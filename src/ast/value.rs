// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use core::fmt;
use std::fmt::Write;

use bigdecimal::BigDecimal;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dialect::{Dialect, DialectDisplay};
use crate::error::Error;

/// Primitive SQL literal values such as numbers, strings, and temporals.
///
/// Numbers are kept in their canonical decimal textual form so that rendering
/// never loses precision; temporals render as ISO-8601 inside the
/// dialect-specific literal prefix.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Value {
    /// Boolean value true or false
    Boolean(bool),
    /// Numeric literal in decimal textual form
    Number(String),
    /// 'string value'
    SingleQuotedString(String),
    /// Byte string, rendered as a hex literal per dialect
    Bytes(Vec<u8>),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    /// A point on the timeline, anchored at UTC
    Timestamp(DateTime<Utc>),
    /// A point on the timeline carrying its offset
    TimestampTz(DateTime<FixedOffset>),
    Uuid(Uuid),
    /// Literal of a dialect-specific type; `tag` keys into the dialect's
    /// registered literal handlers.
    Custom { tag: String, raw: String },
    /// `NULL` value
    Null,
}

impl DialectDisplay for Value {
    fn fmt(&self, f: &mut (dyn fmt::Write), dialect: &Dialect) -> Result<(), Error> {
        match self {
            Value::Boolean(v) => write!(f, "{}", dialect.boolean_literal(*v))?,
            Value::Number(v) => write!(f, "{}", v)?,
            Value::SingleQuotedString(v) => {
                write!(f, "'{}'", escape_single_quote_string(v).sql(dialect)?)?
            }
            Value::Bytes(v) => write!(f, "{}", dialect.bytes_literal(v))?,
            Value::Date(v) => write!(f, "DATE '{}'", v.format("%Y-%m-%d"))?,
            Value::Time(v) => write!(f, "TIME '{}'", v.format("%H:%M:%S%.f"))?,
            Value::DateTime(v) => {
                write!(f, "TIMESTAMP '{}'", v.format("%Y-%m-%d %H:%M:%S%.f"))?
            }
            Value::Timestamp(v) => write!(
                f,
                "TIMESTAMP '{}'",
                v.naive_utc().format("%Y-%m-%d %H:%M:%S%.f")
            )?,
            Value::TimestampTz(v) => write!(
                f,
                "TIMESTAMP WITH TIME ZONE '{}'",
                v.format("%Y-%m-%d %H:%M:%S%.f%:z")
            )?,
            Value::Uuid(v) => write!(f, "'{}'", v)?,
            Value::Custom { tag, raw } => match dialect.custom_literal(tag, raw) {
                Some(text) => write!(f, "{}", text)?,
                None => {
                    return Err(Error::UnsupportedForDialect {
                        feature: format!("literal of custom type `{}`", tag),
                    })
                }
            },
            Value::Null => write!(f, "NULL")?,
        }
        Ok(())
    }
}

macro_rules! impl_from_integer {
    ($($t:ty),+) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::Number(v.to_string())
                }
            }
        )+
    };
}

impl_from_integer!(i8, i16, i32, i64);

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        // Rust float formatting is shortest-round-trip, which serves as the
        // full-precision decimal form.
        Value::Number(format!("{}", v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Number(format!("{}", v))
    }
}

impl From<BigDecimal> for Value {
    fn from(v: BigDecimal) -> Self {
        Value::Number(v.to_string())
    }
}

impl From<char> for Value {
    fn from(v: char) -> Self {
        Value::SingleQuotedString(v.to_string())
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::SingleQuotedString(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::SingleQuotedString(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<NaiveTime> for Value {
    fn from(v: NaiveTime) -> Self {
        Value::Time(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::DateTime(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(v: DateTime<FixedOffset>) -> Self {
        Value::TimestampTz(v)
    }
}

pub struct EscapeQuotedString<'a> {
    string: &'a str,
    quote: char,
}

impl<'a> DialectDisplay for EscapeQuotedString<'a> {
    fn fmt(&self, f: &mut (dyn fmt::Write), _dialect: &Dialect) -> Result<(), Error> {
        for c in self.string.chars() {
            if c == self.quote {
                write!(f, "{q}{q}", q = self.quote)?;
            } else {
                write!(f, "{}", c)?;
            }
        }
        Ok(())
    }
}

pub fn escape_quoted_string(string: &str, quote: char) -> EscapeQuotedString<'_> {
    EscapeQuotedString { string, quote }
}

pub fn escape_single_quote_string(s: &str) -> EscapeQuotedString<'_> {
    escape_quoted_string(s, '\'')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strings_double_embedded_quotes() {
        let v = Value::from("O'Brien");
        assert_eq!(v.sql(&Dialect::default()).unwrap(), "'O''Brien'");
    }

    #[test]
    fn temporal_literals_are_iso() {
        let d = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(
            Value::from(d).sql(&Dialect::default()).unwrap(),
            "DATE '2024-02-29'"
        );
    }

    #[test]
    fn numbers_render_without_quotes() {
        assert_eq!(Value::from(42i64).sql(&Dialect::default()).unwrap(), "42");
        assert_eq!(Value::from(1.5f64).sql(&Dialect::default()).unwrap(), "1.5");
    }
}
