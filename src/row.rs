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

//! Row decoding.
//!
//! A row shape `(A, (B, (C, ())))` decodes leaf by leaf against 1-based
//! cursor ordinals: the head reads one column, the tail continues at the
//! next ordinal, and unit terminates. `Option<T>` leaves absorb NULL cells;
//! a NULL against a non-nullable leaf is an [`Error::UnexpectedNull`].
//!
//! Temporal leaves normalize through the driver's timestamp primitive: the
//! local view feeds `NaiveDate`/`NaiveTime`/`NaiveDateTime`, the instant
//! view feeds `DateTime<Utc>`, and offset-carrying types anchor at UTC
//! unless the driver reports an offset.

use bigdecimal::BigDecimal;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, Utc};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::exec::{Cursor, Timestamp};
use crate::types::TypeTag;

/// Decodes a full row shape starting at a given ordinal.
///
/// Nested-pair impls compose: `(H, T)` reads `H` at `at`, then `T` from
/// `at + 1` on. The number of leaves equals the selection's width.
pub trait FromRow: Sized {
    /// Number of columns this shape consumes.
    const WIDTH: usize;

    fn from_row<C: Cursor>(cursor: &C, at: usize) -> Result<Self>;
}

impl FromRow for () {
    const WIDTH: usize = 0;

    fn from_row<C: Cursor>(_cursor: &C, _at: usize) -> Result<Self> {
        Ok(())
    }
}

impl<H: Decode, T: FromRow> FromRow for (H, T) {
    const WIDTH: usize = 1 + T::WIDTH;

    fn from_row<C: Cursor>(cursor: &C, at: usize) -> Result<Self> {
        Ok((H::decode(cursor, at)?, T::from_row(cursor, at + 1)?))
    }
}

/// Extracts one scalar from one cursor column.
pub trait Decode: Sized {
    /// NULL-aware extraction; `Ok(None)` is a NULL cell.
    fn decode_opt<C: Cursor>(cursor: &C, ordinal: usize) -> Result<Option<Self>>;

    /// Extraction for a non-nullable slot.
    fn decode<C: Cursor>(cursor: &C, ordinal: usize) -> Result<Self> {
        Self::decode_opt(cursor, ordinal)?.ok_or(Error::UnexpectedNull(ordinal))
    }
}

impl<T: Decode> Decode for Option<T> {
    fn decode_opt<C: Cursor>(cursor: &C, ordinal: usize) -> Result<Option<Self>> {
        Ok(T::decode_opt(cursor, ordinal)?.map(Some))
    }

    fn decode<C: Cursor>(cursor: &C, ordinal: usize) -> Result<Self> {
        T::decode_opt(cursor, ordinal)
    }
}

fn check_range<C: Cursor>(cursor: &C, ordinal: usize) -> Result<()> {
    if ordinal == 0 || ordinal > cursor.column_count() {
        return Err(Error::MissingColumn(ordinal));
    }
    Ok(())
}

macro_rules! impl_decode {
    ($($rust:ty => $getter:ident),+ $(,)?) => {
        $(
            impl Decode for $rust {
                fn decode_opt<C: Cursor>(cursor: &C, ordinal: usize) -> Result<Option<Self>> {
                    check_range(cursor, ordinal)?;
                    cursor.$getter(ordinal)
                }
            }
        )+
    };
}

impl_decode!(
    bool => get_bool,
    i8 => get_i8,
    i16 => get_i16,
    i32 => get_i32,
    i64 => get_i64,
    f32 => get_f32,
    f64 => get_f64,
    BigDecimal => get_decimal,
    String => get_string,
    Vec<u8> => get_bytes,
    NaiveTime => get_time,
);

impl Decode for char {
    fn decode_opt<C: Cursor>(cursor: &C, ordinal: usize) -> Result<Option<Self>> {
        check_range(cursor, ordinal)?;
        match cursor.get_string(ordinal)? {
            Some(s) => match s.chars().next() {
                Some(c) => Ok(Some(c)),
                None => Err(Error::UnexpectedType {
                    expected: TypeTag::Char,
                    actual: "empty string".to_string(),
                    ordinal,
                }),
            },
            None => Ok(None),
        }
    }
}

impl Decode for Uuid {
    fn decode_opt<C: Cursor>(cursor: &C, ordinal: usize) -> Result<Option<Self>> {
        check_range(cursor, ordinal)?;
        match cursor.get_string(ordinal)? {
            Some(s) => Uuid::parse_str(&s)
                .map(Some)
                .map_err(|_| Error::UnexpectedType {
                    expected: TypeTag::Uuid,
                    actual: format!("string `{}`", s),
                    ordinal,
                }),
            None => Ok(None),
        }
    }
}

fn timestamp_opt<C: Cursor>(cursor: &C, ordinal: usize) -> Result<Option<Timestamp>> {
    check_range(cursor, ordinal)?;
    cursor.get_timestamp(ordinal)
}

/// The timestamp's UTC view, honoring a driver-reported offset.
fn to_utc(ts: &Timestamp, ordinal: usize) -> Result<NaiveDateTime> {
    match ts.offset {
        Some(offset) => ts
            .local
            .checked_sub_offset(offset)
            .ok_or_else(|| Error::UnexpectedType {
                expected: TypeTag::Instant,
                actual: "timestamp out of range".to_string(),
                ordinal,
            }),
        None => Ok(ts.local),
    }
}

impl Decode for NaiveDate {
    fn decode_opt<C: Cursor>(cursor: &C, ordinal: usize) -> Result<Option<Self>> {
        Ok(timestamp_opt(cursor, ordinal)?.map(|ts| ts.local.date()))
    }
}

impl Decode for NaiveDateTime {
    fn decode_opt<C: Cursor>(cursor: &C, ordinal: usize) -> Result<Option<Self>> {
        Ok(timestamp_opt(cursor, ordinal)?.map(|ts| ts.local))
    }
}

impl Decode for DateTime<Utc> {
    fn decode_opt<C: Cursor>(cursor: &C, ordinal: usize) -> Result<Option<Self>> {
        match timestamp_opt(cursor, ordinal)? {
            Some(ts) => {
                let utc = to_utc(&ts, ordinal)?;
                Ok(Some(DateTime::from_naive_utc_and_offset(utc, Utc)))
            }
            None => Ok(None),
        }
    }
}

impl Decode for DateTime<FixedOffset> {
    fn decode_opt<C: Cursor>(cursor: &C, ordinal: usize) -> Result<Option<Self>> {
        match timestamp_opt(cursor, ordinal)? {
            Some(ts) => {
                let offset = ts.offset.unwrap_or_else(|| Utc.fix());
                let utc = to_utc(&ts, ordinal)?;
                Ok(Some(DateTime::from_naive_utc_and_offset(utc, offset)))
            }
            None => Ok(None),
        }
    }
}
