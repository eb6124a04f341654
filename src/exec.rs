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

//! The execution seam: connection acquisition, statement submission, and
//! the cursor surface the row decoder consumes.
//!
//! Statement values own nothing here; they borrow a connection for the
//! duration of one statement. Row streams are lazy, finite, and
//! consume-once. Dropping a stream mid-way closes its cursor, so partial
//! consumption never leaks a cursor.

use std::marker::PhantomData;

use bigdecimal::BigDecimal;
use chrono::{FixedOffset, NaiveDateTime, NaiveTime};
use log::{debug, trace, warn};

use crate::dialect::Dialect;
use crate::error::{Error, Result};
use crate::query::{Delete, Insert, Read, Update};
use crate::row::FromRow;

/// A driver timestamp: a local date-time view plus the offset the driver
/// reported, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timestamp {
    pub local: NaiveDateTime,
    pub offset: Option<FixedOffset>,
}

impl Timestamp {
    pub fn local(local: NaiveDateTime) -> Self {
        Timestamp {
            local,
            offset: None,
        }
    }

    pub fn with_offset(local: NaiveDateTime, offset: FixedOffset) -> Self {
        Timestamp {
            local,
            offset: Some(offset),
        }
    }
}

/// A forward-only position over a result set, owned by the driver and
/// borrowed for row extraction. Getters are keyed by 1-based ordinal and
/// return `Ok(None)` for NULL cells; a getter asked to read an incompatible
/// column kind reports [`Error::UnexpectedType`].
pub trait Cursor {
    /// Moves to the next row; `false` once the set is exhausted.
    fn advance(&mut self) -> Result<bool>;

    fn close(&mut self) -> Result<()>;

    fn is_closed(&self) -> bool;

    fn column_count(&self) -> usize;

    fn column_name(&self, ordinal: usize) -> Option<&str>;

    /// Driver-reported kind of a column, for diagnostics.
    fn column_type_name(&self, ordinal: usize) -> Option<&str>;

    fn get_bool(&self, ordinal: usize) -> Result<Option<bool>>;
    fn get_i8(&self, ordinal: usize) -> Result<Option<i8>>;
    fn get_i16(&self, ordinal: usize) -> Result<Option<i16>>;
    fn get_i32(&self, ordinal: usize) -> Result<Option<i32>>;
    fn get_i64(&self, ordinal: usize) -> Result<Option<i64>>;
    fn get_f32(&self, ordinal: usize) -> Result<Option<f32>>;
    fn get_f64(&self, ordinal: usize) -> Result<Option<f64>>;
    fn get_decimal(&self, ordinal: usize) -> Result<Option<BigDecimal>>;
    fn get_string(&self, ordinal: usize) -> Result<Option<String>>;
    fn get_bytes(&self, ordinal: usize) -> Result<Option<Vec<u8>>>;
    fn get_timestamp(&self, ordinal: usize) -> Result<Option<Timestamp>>;
    fn get_time(&self, ordinal: usize) -> Result<Option<NaiveTime>>;
}

/// Submits rendered SQL over a connection. The core never retries; driver
/// errors pass through as the execution error kinds.
pub trait Executor {
    type Conn;
    type Cursor: Cursor;

    /// Runs a statement that returns no rows; yields the affected-row count.
    fn exec(&self, conn: &mut Self::Conn, sql: &str) -> Result<u64>;

    /// Runs a query and hands back its cursor.
    fn query(&self, conn: &mut Self::Conn, sql: &str) -> Result<Self::Cursor>;
}

/// Scoped connection acquisition with guaranteed release on all exit paths.
pub trait ConnectionProvider {
    type Conn;

    fn with_connection<R>(&self, f: impl FnOnce(&mut Self::Conn) -> Result<R>) -> Result<R>;
}

/// A lazy, finite, consume-once stream of decoded rows.
///
/// The stream ends at cursor exhaustion or at its first error; either way
/// the cursor is closed, and dropping the stream early closes it too.
pub struct Rows<C: Cursor, R> {
    cursor: Option<C>,
    _row: PhantomData<R>,
}

impl<C: Cursor, R> Rows<C, R> {
    fn new(cursor: C) -> Self {
        Rows {
            cursor: Some(cursor),
            _row: PhantomData,
        }
    }

    fn close_now(&mut self) {
        if let Some(mut cursor) = self.cursor.take() {
            if !cursor.is_closed() {
                if let Err(err) = cursor.close() {
                    warn!("failed to close cursor: {}", err);
                }
            }
        }
    }
}

impl<C: Cursor, R: FromRow> Iterator for Rows<C, R> {
    type Item = Result<R>;

    fn next(&mut self) -> Option<Self::Item> {
        let cursor = self.cursor.as_mut()?;
        if cursor.is_closed() {
            self.cursor = None;
            return Some(Err(Error::Closed));
        }
        match cursor.advance() {
            Ok(true) => {
                trace!("decoding row of width {}", R::WIDTH);
                match R::from_row(cursor, 1) {
                    Ok(row) => Some(Ok(row)),
                    Err(err) => {
                        self.close_now();
                        Some(Err(err))
                    }
                }
            }
            Ok(false) => {
                self.close_now();
                None
            }
            Err(err) => {
                self.close_now();
                Some(Err(err))
            }
        }
    }
}

impl<C: Cursor, R> Drop for Rows<C, R> {
    fn drop(&mut self) {
        self.close_now();
    }
}

impl<R: FromRow> Read<R> {
    /// Renders for `dialect`, submits over `conn`, and streams decoded rows.
    pub fn fetch<E: Executor>(
        &self,
        dialect: &Dialect,
        executor: &E,
        conn: &mut E::Conn,
    ) -> Result<Rows<E::Cursor, R>> {
        let sql = self.sql(dialect)?;
        debug!("executing query: {}", sql);
        let cursor = executor.query(conn, &sql)?;
        Ok(Rows::new(cursor))
    }

    /// Fetches and collects every row; stops at the first error, closing
    /// the cursor either way.
    pub fn fetch_all<E: Executor>(
        &self,
        dialect: &Dialect,
        executor: &E,
        conn: &mut E::Conn,
    ) -> Result<Vec<R>> {
        self.fetch(dialect, executor, conn)?.collect()
    }
}

impl Update {
    pub fn run<E: Executor>(
        &self,
        dialect: &Dialect,
        executor: &E,
        conn: &mut E::Conn,
    ) -> Result<u64> {
        let sql = self.sql(dialect)?;
        debug!("executing update: {}", sql);
        executor.exec(conn, &sql)
    }
}

impl Delete {
    pub fn run<E: Executor>(
        &self,
        dialect: &Dialect,
        executor: &E,
        conn: &mut E::Conn,
    ) -> Result<u64> {
        let sql = self.sql(dialect)?;
        debug!("executing delete: {}", sql);
        executor.exec(conn, &sql)
    }
}

impl Insert {
    pub fn run<E: Executor>(
        &self,
        dialect: &Dialect,
        executor: &E,
        conn: &mut E::Conn,
    ) -> Result<u64> {
        let sql = self.sql(dialect)?;
        debug!("executing insert: {}", sql);
        executor.exec(conn, &sql)
    }
}
