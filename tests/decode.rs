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

mod common;

use bigdecimal::BigDecimal;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use common::{orders, users, Datum, MemExecutor, MemPool};
use matches::assert_matches;
use pretty_assertions::assert_eq;
use std::str::FromStr;
use tyql::prelude::*;
use tyql::{Error, TypeTag};

fn dialect() -> Dialect {
    Dialect::default()
}

#[test]
fn rows_decode_into_nested_tuples() {
    common::init_logging();
    let users = users();
    let (_, (_, (first_name, (last_name, ())))) = users.bindings();
    let read = select((&first_name, &last_name))
        .from(&users)
        .build()
        .unwrap();
    assert_eq!(read.column_tags(), &[TypeTag::String, TypeTag::String]);

    let executor = MemExecutor::with_rows(
        &["first_name", "last_name"],
        vec![
            vec![
                Datum::Text("Terrence".to_string()),
                Datum::Text("Smith".to_string()),
            ],
            vec![
                Datum::Text("Jane".to_string()),
                Datum::Text("Doe".to_string()),
            ],
        ],
    );
    let pool = MemPool;
    let rows = pool
        .with_connection(|conn| read.fetch_all(&dialect(), &executor, conn))
        .unwrap();
    assert_eq!(
        rows,
        vec![
            ("Terrence".to_string(), ("Smith".to_string(), ())),
            ("Jane".to_string(), ("Doe".to_string(), ())),
        ]
    );
}

#[test]
fn nullable_slots_absorb_null_cells() {
    let users = users();
    let orders = orders();
    let (u_id, (_, (first_name, _))) = users.bindings();
    let (_, (fk_usr_id, (order_date, ()))) = orders.bindings();
    let read = select((&first_name, order_date.nullable()))
        .from(users.left_outer(&orders).on(fk_usr_id.eq(&u_id)))
        .build()
        .unwrap();

    let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
    let executor = MemExecutor::with_rows(
        &["first_name", "order_date"],
        vec![
            vec![
                Datum::Text("Ada".to_string()),
                Datum::Ts(Timestamp::local(date.and_hms_opt(0, 0, 0).unwrap())),
            ],
            vec![Datum::Text("Bob".to_string()), Datum::Null],
        ],
    );
    let rows = read.fetch_all(&dialect(), &executor, &mut ()).unwrap();
    assert_eq!(
        rows,
        vec![
            ("Ada".to_string(), (Some(date), ())),
            ("Bob".to_string(), (None, ())),
        ]
    );
}

#[test]
fn null_against_non_nullable_slot_fails() {
    let users = users();
    let (_, (_, (first_name, _))) = users.bindings();
    let read = select(&first_name).from(&users).build().unwrap();

    let executor = MemExecutor::with_rows(&["first_name"], vec![vec![Datum::Null]]);
    let err = read.fetch_all(&dialect(), &executor, &mut ()).unwrap_err();
    assert_matches!(err, Error::UnexpectedNull(1));
}

#[test]
fn incompatible_driver_kind_fails() {
    let users = users();
    let (_, (_, (first_name, _))) = users.bindings();
    let read = select(&first_name).from(&users).build().unwrap();

    let executor = MemExecutor::with_rows(&["first_name"], vec![vec![Datum::Int(5)]]);
    let err = read.fetch_all(&dialect(), &executor, &mut ()).unwrap_err();
    assert_matches!(err, Error::UnexpectedType { ordinal: 1, .. });
}

#[test]
fn out_of_range_ordinal_fails() {
    let users = users();
    let (_, (_, (first_name, (last_name, ())))) = users.bindings();
    let read = select((&first_name, &last_name))
        .from(&users)
        .build()
        .unwrap();

    let executor = MemExecutor::with_rows(
        &["first_name"],
        vec![vec![Datum::Text("only one column".to_string())]],
    );
    let err = read.fetch_all(&dialect(), &executor, &mut ()).unwrap_err();
    assert_matches!(err, Error::MissingColumn(2));
}

#[test]
fn closed_cursor_is_reported() {
    let users = users();
    let (_, (_, (first_name, _))) = users.bindings();
    let read = select(&first_name).from(&users).build().unwrap();

    let mut executor = MemExecutor::with_rows(
        &["first_name"],
        vec![vec![Datum::Text("x".to_string())]],
    );
    executor.pre_closed = true;
    let mut rows = read.fetch(&dialect(), &executor, &mut ()).unwrap();
    assert_matches!(rows.next(), Some(Err(Error::Closed)));
    assert_matches!(rows.next(), None);
}

#[test]
fn dropping_a_partially_consumed_stream_closes_the_cursor() {
    let users = users();
    let (_, (_, (first_name, _))) = users.bindings();
    let read = select(&first_name).from(&users).build().unwrap();

    let executor = MemExecutor::with_rows(
        &["first_name"],
        vec![
            vec![Datum::Text("a".to_string())],
            vec![Datum::Text("b".to_string())],
            vec![Datum::Text("c".to_string())],
        ],
    );
    {
        let mut rows = read.fetch(&dialect(), &executor, &mut ()).unwrap();
        let first = rows.next().unwrap().unwrap();
        assert_eq!(first, ("a".to_string(), ()));
        assert!(!executor.close_witness.get());
    }
    assert!(executor.close_witness.get());
}

#[test]
fn first_error_terminates_the_stream_and_closes_the_cursor() {
    let users = users();
    let (_, (_, (first_name, _))) = users.bindings();
    let read = select(&first_name).from(&users).build().unwrap();

    let executor = MemExecutor::with_rows(
        &["first_name"],
        vec![vec![Datum::Text("ok".to_string())], vec![Datum::Null]],
    );
    let mut rows = read.fetch(&dialect(), &executor, &mut ()).unwrap();
    assert_matches!(rows.next(), Some(Ok(_)));
    assert_matches!(rows.next(), Some(Err(Error::UnexpectedNull(1))));
    assert_matches!(rows.next(), None);
    assert!(executor.close_witness.get());
}

#[test]
fn timestamps_normalize_through_the_driver_primitive() {
    let samples = ColumnSet::new()
        .column::<NaiveDate>("d")
        .column::<DateTime<Utc>>("at")
        .column::<DateTime<FixedOffset>>("at_tz")
        .table("samples")
        .unwrap();
    let (d, (at, (at_tz, ()))) = samples.bindings();
    let read = select((&d, &at, &at_tz)).from(&samples).build().unwrap();

    let local = NaiveDate::from_ymd_opt(2024, 6, 1)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap();
    let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
    let executor = MemExecutor::with_rows(
        &["d", "at", "at_tz"],
        vec![vec![
            Datum::Ts(Timestamp::local(local)),
            Datum::Ts(Timestamp::with_offset(local, plus_two)),
            Datum::Ts(Timestamp::local(local)),
        ]],
    );
    let rows = read.fetch_all(&dialect(), &executor, &mut ()).unwrap();
    let (date, (instant, (with_tz, ()))) = rows.into_iter().next().unwrap();

    // Local view for dates, instant view honoring the reported offset,
    // and UTC anchoring when no offset is reported.
    assert_eq!(date, local.date());
    assert_eq!(instant, Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap());
    assert_eq!(with_tz.naive_utc(), local);
    assert_eq!(with_tz.offset(), &FixedOffset::east_opt(0).unwrap());
}

#[test]
fn representative_scalars_round_trip() {
    let samples = ColumnSet::new()
        .column::<bool>("flag")
        .column::<i64>("n")
        .column::<f64>("x")
        .column::<BigDecimal>("amount")
        .column::<String>("s")
        .column::<Vec<u8>>("blob")
        .column::<NaiveTime>("t")
        .table("samples")
        .unwrap();
    let (flag, (n, (x, (amount, (s, (blob, (t, ()))))))) = samples.bindings();
    let read = select((&flag, &n, &x, &amount, &s, &blob, &t))
        .from(&samples)
        .build()
        .unwrap();

    let amount_value = BigDecimal::from_str("12.3456789").unwrap();
    let time_value = NaiveTime::from_hms_opt(23, 59, 58).unwrap();
    let executor = MemExecutor::with_rows(
        &["flag", "n", "x", "amount", "s", "blob", "t"],
        vec![vec![
            Datum::Bool(true),
            Datum::Int(-42),
            Datum::Real(2.5),
            Datum::Dec(amount_value.clone()),
            Datum::Text("héllo".to_string()),
            Datum::Bytes(vec![0xDE, 0xAD]),
            Datum::Time(time_value),
        ]],
    );
    let rows = read.fetch_all(&dialect(), &executor, &mut ()).unwrap();
    assert_eq!(
        rows,
        vec![(
            true,
            (
                -42i64,
                (2.5f64, (amount_value, ("héllo".to_string(), (vec![0xDE, 0xAD], (time_value, ())))))
            )
        )]
    );
}

#[test]
fn empty_result_sets_yield_empty_streams() {
    let users = users();
    let (usr_id, _) = users.bindings();
    let read = select(&usr_id)
        .from(&users)
        .limit(0)
        .build()
        .unwrap();

    let executor = MemExecutor::with_rows(&["usr_id"], Vec::new());
    let rows = read.fetch_all(&dialect(), &executor, &mut ()).unwrap();
    assert_eq!(rows, Vec::<(i32, ())>::new());
    assert_eq!(
        executor.last_sql(),
        "SELECT users.usr_id FROM users LIMIT 0"
    );
}
