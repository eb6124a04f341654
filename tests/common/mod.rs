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

//! Shared fixtures: the users/orders/order_details schema and an in-memory
//! driver implementing the executor and cursor seams.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveTime};
use tyql::prelude::*;
use tyql::TypeTag;

/// Call at the top of a test to surface the crate's debug logging.
pub fn init_logging() {
    let _ = simple_logger::SimpleLogger::new().init();
}

pub type UsersShape = (i32, (NaiveDate, (String, (String, ()))));
pub type OrdersShape = (i32, (i32, (NaiveDate, ())));
pub type OrderDetailsShape = (i32, (i32, (f64, (f64, ()))));

pub fn users() -> Table<UsersShape> {
    ColumnSet::new()
        .column::<i32>("usr_id")
        .column::<NaiveDate>("dob")
        .column::<String>("first_name")
        .column::<String>("last_name")
        .table("users")
        .unwrap()
}

pub fn orders() -> Table<OrdersShape> {
    ColumnSet::new()
        .column::<i32>("order_id")
        .column::<i32>("usr_id")
        .column::<NaiveDate>("order_date")
        .table("orders")
        .unwrap()
}

pub fn order_details() -> Table<OrderDetailsShape> {
    ColumnSet::new()
        .column::<i32>("order_id")
        .column::<i32>("product_id")
        .column::<f64>("quantity")
        .column::<f64>("unit_price")
        .table("order_details")
        .unwrap()
}

/// One in-memory cell of a result set.
#[derive(Debug, Clone, PartialEq)]
pub enum Datum {
    Null,
    Bool(bool),
    Int(i64),
    Real(f64),
    Dec(BigDecimal),
    Text(String),
    Bytes(Vec<u8>),
    Ts(Timestamp),
    Time(NaiveTime),
}

impl Datum {
    fn kind(&self) -> &'static str {
        match self {
            Datum::Null => "null",
            Datum::Bool(_) => "bool",
            Datum::Int(_) => "int",
            Datum::Real(_) => "real",
            Datum::Dec(_) => "decimal",
            Datum::Text(_) => "text",
            Datum::Bytes(_) => "bytes",
            Datum::Ts(_) => "timestamp",
            Datum::Time(_) => "time",
        }
    }
}

/// A cursor over pre-loaded rows.
pub struct MemCursor {
    names: Vec<String>,
    rows: Vec<Vec<Datum>>,
    at: usize,
    closed: bool,
    close_witness: Rc<Cell<bool>>,
}

impl MemCursor {
    fn datum(&self, ordinal: usize) -> Result<&Datum> {
        let row = self
            .rows
            .get(self.at.wrapping_sub(1))
            .ok_or(Error::Closed)?;
        if ordinal == 0 || ordinal > row.len() {
            return Err(Error::MissingColumn(ordinal));
        }
        Ok(&row[ordinal - 1])
    }
}

macro_rules! mem_getter {
    ($fn_name:ident, $rust:ty, $variant:ident, $tag:ident) => {
        fn $fn_name(&self, ordinal: usize) -> Result<Option<$rust>> {
            match self.datum(ordinal)? {
                Datum::Null => Ok(None),
                Datum::$variant(v) => Ok(Some(v.clone())),
                other => Err(Error::UnexpectedType {
                    expected: TypeTag::$tag,
                    actual: other.kind().to_string(),
                    ordinal,
                }),
            }
        }
    };
}

impl Cursor for MemCursor {
    fn advance(&mut self) -> Result<bool> {
        if self.closed {
            return Err(Error::Closed);
        }
        self.at += 1;
        Ok(self.at <= self.rows.len())
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        self.close_witness.set(true);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    fn column_count(&self) -> usize {
        self.names.len()
    }

    fn column_name(&self, ordinal: usize) -> Option<&str> {
        self.names.get(ordinal.wrapping_sub(1)).map(|s| s.as_str())
    }

    fn column_type_name(&self, ordinal: usize) -> Option<&str> {
        self.rows
            .first()
            .and_then(|row| row.get(ordinal.wrapping_sub(1)))
            .map(|d| d.kind())
    }

    mem_getter!(get_bool, bool, Bool, Bool);
    mem_getter!(get_f64, f64, Real, Double);
    mem_getter!(get_decimal, BigDecimal, Dec, BigDecimal);
    mem_getter!(get_string, String, Text, String);
    mem_getter!(get_bytes, Vec<u8>, Bytes, ByteArray);
    mem_getter!(get_timestamp, Timestamp, Ts, LocalDateTime);
    mem_getter!(get_time, NaiveTime, Time, LocalTime);

    fn get_i8(&self, ordinal: usize) -> Result<Option<i8>> {
        self.narrow_int(ordinal, TypeTag::Byte)
    }

    fn get_i16(&self, ordinal: usize) -> Result<Option<i16>> {
        self.narrow_int(ordinal, TypeTag::Short)
    }

    fn get_i32(&self, ordinal: usize) -> Result<Option<i32>> {
        self.narrow_int(ordinal, TypeTag::Int)
    }

    fn get_i64(&self, ordinal: usize) -> Result<Option<i64>> {
        match self.datum(ordinal)? {
            Datum::Null => Ok(None),
            Datum::Int(v) => Ok(Some(*v)),
            other => Err(Error::UnexpectedType {
                expected: TypeTag::Long,
                actual: other.kind().to_string(),
                ordinal,
            }),
        }
    }

    fn get_f32(&self, ordinal: usize) -> Result<Option<f32>> {
        Ok(self.get_f64(ordinal)?.map(|v| v as f32))
    }
}

impl MemCursor {
    fn narrow_int<T: TryFrom<i64>>(&self, ordinal: usize, expected: TypeTag) -> Result<Option<T>> {
        match self.datum(ordinal)? {
            Datum::Null => Ok(None),
            Datum::Int(v) => T::try_from(*v).map(Some).map_err(|_| Error::UnexpectedType {
                expected: expected.clone(),
                actual: format!("int out of range ({})", v),
                ordinal,
            }),
            other => Err(Error::UnexpectedType {
                expected,
                actual: other.kind().to_string(),
                ordinal,
            }),
        }
    }
}

/// An executor serving pre-loaded rows and a fixed affected-row count,
/// recording every statement it sees.
pub struct MemExecutor {
    pub names: Vec<String>,
    pub rows: Vec<Vec<Datum>>,
    pub affected: u64,
    pub pre_closed: bool,
    pub executed: RefCell<Vec<String>>,
    pub close_witness: Rc<Cell<bool>>,
}

impl MemExecutor {
    pub fn with_rows(names: &[&str], rows: Vec<Vec<Datum>>) -> Self {
        MemExecutor {
            names: names.iter().map(|s| s.to_string()).collect(),
            rows,
            affected: 0,
            pre_closed: false,
            executed: RefCell::new(Vec::new()),
            close_witness: Rc::new(Cell::new(false)),
        }
    }

    pub fn with_affected(affected: u64) -> Self {
        MemExecutor {
            names: Vec::new(),
            rows: Vec::new(),
            affected,
            pre_closed: false,
            executed: RefCell::new(Vec::new()),
            close_witness: Rc::new(Cell::new(false)),
        }
    }

    pub fn last_sql(&self) -> String {
        self.executed.borrow().last().cloned().unwrap_or_default()
    }
}

impl Executor for MemExecutor {
    type Conn = ();
    type Cursor = MemCursor;

    fn exec(&self, _conn: &mut Self::Conn, sql: &str) -> Result<u64> {
        self.executed.borrow_mut().push(sql.to_string());
        Ok(self.affected)
    }

    fn query(&self, _conn: &mut Self::Conn, sql: &str) -> Result<Self::Cursor> {
        self.executed.borrow_mut().push(sql.to_string());
        Ok(MemCursor {
            names: self.names.clone(),
            rows: self.rows.clone(),
            at: 0,
            closed: self.pre_closed,
            close_witness: self.close_witness.clone(),
        })
    }
}

/// A provider handing out unit connections.
pub struct MemPool;

impl ConnectionProvider for MemPool {
    type Conn = ();

    fn with_connection<R>(&self, f: impl FnOnce(&mut Self::Conn) -> Result<R>) -> Result<R> {
        let mut conn = ();
        f(&mut conn)
    }
}
