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

//! Scalar type tags and the mapping from Rust types to them.
//!
//! A [`TypeTag`] is the closed discriminator shared by the renderer (literal
//! formatting) and the row decoder (cursor extraction). The [`SqlType`] trait
//! ties each supported Rust scalar to its tag; `Option<T>` maps to
//! `Nullable` and is only implemented for non-nullable `T`, so a doubly
//! nullable column type cannot be written down.

use core::fmt;

use bigdecimal::BigDecimal;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use uuid::Uuid;

/// Discriminator over the supported scalar types.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Bool,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    BigDecimal,
    Char,
    String,
    ByteArray,
    Uuid,
    LocalDate,
    LocalTime,
    LocalDateTime,
    Instant,
    OffsetTime,
    OffsetDateTime,
    ZonedDateTime,
    /// A type only one dialect knows how to render and extract; the name
    /// keys into the dialect's registered handlers.
    Custom(&'static str),
    /// Never nests; see [`TypeTag::nullable`].
    Nullable(Box<TypeTag>),
}

impl TypeTag {
    /// Wraps `self` in `Nullable`, collapsing double wrap.
    pub fn nullable(self) -> TypeTag {
        match self {
            TypeTag::Nullable(_) => self,
            tag => TypeTag::Nullable(Box::new(tag)),
        }
    }

    /// The tag with any `Nullable` wrapper stripped.
    pub fn base(&self) -> &TypeTag {
        match self {
            TypeTag::Nullable(inner) => inner,
            tag => tag,
        }
    }

    pub fn is_nullable(&self) -> bool {
        matches!(self, TypeTag::Nullable(_))
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self.base(),
            TypeTag::Byte
                | TypeTag::Short
                | TypeTag::Int
                | TypeTag::Long
                | TypeTag::Float
                | TypeTag::Double
                | TypeTag::BigDecimal
        )
    }

    /// Equality modulo nullability, used for operand compatibility.
    pub fn compatible(&self, other: &TypeTag) -> bool {
        self.base() == other.base()
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeTag::Bool => f.write_str("bool"),
            TypeTag::Byte => f.write_str("byte"),
            TypeTag::Short => f.write_str("short"),
            TypeTag::Int => f.write_str("int"),
            TypeTag::Long => f.write_str("long"),
            TypeTag::Float => f.write_str("float"),
            TypeTag::Double => f.write_str("double"),
            TypeTag::BigDecimal => f.write_str("decimal"),
            TypeTag::Char => f.write_str("char"),
            TypeTag::String => f.write_str("string"),
            TypeTag::ByteArray => f.write_str("bytes"),
            TypeTag::Uuid => f.write_str("uuid"),
            TypeTag::LocalDate => f.write_str("date"),
            TypeTag::LocalTime => f.write_str("time"),
            TypeTag::LocalDateTime => f.write_str("datetime"),
            TypeTag::Instant => f.write_str("instant"),
            TypeTag::OffsetTime => f.write_str("time with offset"),
            TypeTag::OffsetDateTime => f.write_str("datetime with offset"),
            TypeTag::ZonedDateTime => f.write_str("zoned datetime"),
            TypeTag::Custom(name) => write!(f, "custom `{}`", name),
            TypeTag::Nullable(inner) => write!(f, "nullable {}", inner),
        }
    }
}

/// A Rust scalar usable as the static type of an expression or column.
pub trait SqlType {
    fn tag() -> TypeTag;
}

/// Marker for [`SqlType`]s that are not already nullable.
pub trait NotNull: SqlType {}

/// Marker for [`SqlType`]s with numeric tags, used by aggregations.
pub trait Numeric: SqlType {}

macro_rules! impl_sql_type {
    ($($rust:ty => $tag:ident),+ $(,)?) => {
        $(
            impl SqlType for $rust {
                fn tag() -> TypeTag {
                    TypeTag::$tag
                }
            }
            impl NotNull for $rust {}
        )+
    };
}

impl_sql_type!(
    bool => Bool,
    i8 => Byte,
    i16 => Short,
    i32 => Int,
    i64 => Long,
    f32 => Float,
    f64 => Double,
    BigDecimal => BigDecimal,
    char => Char,
    String => String,
    Vec<u8> => ByteArray,
    Uuid => Uuid,
    NaiveDate => LocalDate,
    NaiveTime => LocalTime,
    NaiveDateTime => LocalDateTime,
    DateTime<Utc> => Instant,
    DateTime<FixedOffset> => OffsetDateTime,
);

impl Numeric for i8 {}
impl Numeric for i16 {}
impl Numeric for i32 {}
impl Numeric for i64 {}
impl Numeric for f32 {}
impl Numeric for f64 {}
impl Numeric for BigDecimal {}

impl<T: NotNull> SqlType for Option<T> {
    fn tag() -> TypeTag {
        T::tag().nullable()
    }
}

/// Type-level append for right-nested row shapes.
///
/// Shapes are `(A, (B, (C, ())))`-style pair lists terminated by unit; both
/// column sets and selections grow their shape through this trait.
pub trait RowAppend<U> {
    type Out;
}

impl<U> RowAppend<U> for () {
    type Out = (U, ());
}

impl<H, T: RowAppend<U>, U> RowAppend<U> for (H, T) {
    type Out = (H, <T as RowAppend<U>>::Out);
}
