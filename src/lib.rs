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

//! Typed SQL construction, dialect-aware rendering, and row decoding.
//!
//! Tables and columns are declared once; queries compose from typed
//! expression combinators; rendering targets a [`Dialect`] descriptor; and
//! result rows decode into the nested tuple shape the selection dictates.
//! Statement trees are immutable values: construction is pure and
//! shareable across threads, and execution borrows one connection per
//! statement.
//!
//! # Example
//!
//! ```
//! use tyql::prelude::*;
//!
//! # fn main() -> tyql::Result<()> {
//! let users = ColumnSet::new()
//!     .column::<i32>("usr_id")
//!     .column::<String>("first_name")
//!     .column::<String>("last_name")
//!     .table("users")?;
//! let (usr_id, (first_name, (last_name, ()))) = users.bindings();
//!
//! let query = select((&first_name, &last_name))
//!     .from(&users)
//!     .where_(usr_id.gt(10))
//!     .order_by(last_name.asc())
//!     .limit(20)
//!     .build()?;
//!
//! assert_eq!(
//!     query.sql(&Dialect::postgres())?,
//!     "SELECT users.first_name, users.last_name FROM users \
//!      WHERE users.usr_id > 10 ORDER BY users.last_name ASC LIMIT 20"
//! );
//! # Ok(()) }
//! ```

pub mod ast;
pub mod dialect;
pub mod error;
pub mod exec;
pub mod expr;
pub mod query;
pub mod row;
pub mod schema;
pub mod select;
pub mod types;

pub use dialect::{BooleanStyle, BytesStyle, CustomLiteral, Dialect, DialectDisplay,
    FunctionTransform, LimitStyle};
pub use error::{Error, Result};
pub use exec::{ConnectionProvider, Cursor, Executor, Rows, Timestamp};
pub use expr::{lit, null, Aliased, AnyExpr, Expr, IntoExpr, IntoLiteral, OrderKey};
pub use query::{delete_from, insert_into, select, update, values, Delete, Insert, Read, Update};
pub use row::{Decode, FromRow};
pub use schema::{Col, ColumnDef, ColumnSet, Table};
pub use select::{IntoSelectItem, IntoSelection, IntoSource, Selection, Source};
pub use types::{NotNull, Numeric, SqlType, TypeTag};

/// One-stop import for building and running statements.
pub mod prelude {
    pub use crate::dialect::{Dialect, DialectDisplay};
    pub use crate::error::{Error, Result};
    pub use crate::exec::{ConnectionProvider, Cursor, Executor, Rows, Timestamp};
    pub use crate::expr::{
        abs, avg, case, ceil, coalesce, concat, cos, count, count_distinct, count_star,
        dialect_fn, floor, length, lit, ln, log, lower, max, min, null, round, sin, sqrt,
        substring, sum, trim, upper, Aliased, AnyExpr, Expr, IntoExpr, OrderKey,
    };
    pub use crate::query::{
        delete_from, insert_into, select, update, values, Delete, Insert, Read, Update,
    };
    pub use crate::row::{Decode, FromRow};
    pub use crate::schema::{Col, ColumnSet, Table};
    pub use crate::select::{IntoSelection, IntoSource, Selection, Source};
    pub use crate::types::{SqlType, TypeTag};
}
