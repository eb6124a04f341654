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

use common::{order_details, orders, users};
use matches::assert_matches;
use pretty_assertions::assert_eq;
use tyql::prelude::*;
use tyql::Error;

fn dialect() -> Dialect {
    Dialect::default()
}

#[test]
fn plain_projection() {
    common::init_logging();
    let users = users();
    let (_, (_, (first_name, (last_name, ())))) = users.bindings();
    let read = select((&first_name, &last_name))
        .from(&users)
        .build()
        .unwrap();
    assert_eq!(
        read.sql(&dialect()).unwrap(),
        "SELECT users.first_name, users.last_name FROM users"
    );
}

#[test]
fn rendering_is_deterministic() {
    let users = users();
    let (_, (_, (first_name, _))) = users.bindings();
    let read = select(&first_name).from(&users).build().unwrap();
    let first = read.sql(&dialect()).unwrap();
    let second = read.sql(&dialect()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn aliased_projection_equals_plain_modulo_alias() {
    let users = users();
    let (_, (_, (first_name, (last_name, ())))) = users.bindings();
    let aliased = select((first_name.alias("first"), last_name.alias("last")))
        .from(&users)
        .build()
        .unwrap();
    let sql = aliased.sql(&dialect()).unwrap();
    assert_eq!(
        sql,
        "SELECT users.first_name AS \"first\", users.last_name AS \"last\" FROM users"
    );

    let plain = select((&first_name, &last_name))
        .from(&users)
        .build()
        .unwrap();
    let stripped = sql.replace(" AS \"first\"", "").replace(" AS \"last\"", "");
    assert_eq!(stripped, plain.sql(&dialect()).unwrap());
}

#[test]
fn order_by_and_limit() {
    let users = users();
    let (_, (_, (first_name, (last_name, ())))) = users.bindings();
    let read = select((&first_name, &last_name))
        .from(&users)
        .order_by((last_name.asc(), first_name.desc()))
        .limit(2)
        .build()
        .unwrap();
    assert_eq!(
        read.sql(&dialect()).unwrap(),
        "SELECT users.first_name, users.last_name FROM users \
         ORDER BY users.last_name ASC, users.first_name DESC LIMIT 2"
    );
}

#[test]
fn nulls_ordering_renders_after_direction() {
    let users = users();
    let (_, (_, (_, (last_name, ())))) = users.bindings();
    let read = select(&last_name)
        .from(&users)
        .order_by(last_name.asc().nulls_last())
        .build()
        .unwrap();
    assert_eq!(
        read.sql(&dialect()).unwrap(),
        "SELECT users.last_name FROM users ORDER BY users.last_name ASC NULLS LAST"
    );
}

#[test]
fn limit_zero_still_renders() {
    let users = users();
    let (usr_id, _) = users.bindings();
    let read = select(&usr_id).from(&users).limit(0).build().unwrap();
    assert_eq!(
        read.sql(&dialect()).unwrap(),
        "SELECT users.usr_id FROM users LIMIT 0"
    );
}

#[test]
fn fetch_first_pagination() {
    let users = users();
    let (usr_id, _) = users.bindings();
    let read = select(&usr_id)
        .from(&users)
        .limit(2)
        .offset(4)
        .build()
        .unwrap();
    assert_eq!(
        read.sql(&Dialect::ansi()).unwrap(),
        "SELECT users.usr_id FROM users OFFSET 4 ROWS FETCH FIRST 2 ROWS ONLY"
    );
}

#[test]
fn delete_with_equality() {
    let users = users();
    let (_, (_, (first_name, _))) = users.bindings();
    let delete = delete_from(&users)
        .where_(first_name.eq(lit("Terrence")))
        .build()
        .unwrap();
    assert_eq!(
        delete.sql(&dialect()).unwrap(),
        "DELETE FROM users WHERE users.first_name = 'Terrence'"
    );
}

#[test]
fn delete_with_in_list() {
    let users = users();
    let (_, (_, (first_name, _))) = users.bindings();
    let delete = delete_from(&users)
        .where_(first_name.in_list(["Fred", "Terrance"]))
        .build()
        .unwrap();
    assert_eq!(
        delete.sql(&dialect()).unwrap(),
        "DELETE FROM users WHERE users.first_name IN ('Fred', 'Terrance')"
    );
}

#[test]
fn left_outer_join_requires_nullable_selection() {
    let users = users();
    let orders = orders();
    let (u_id, (_, (first_name, (last_name, ())))) = users.bindings();
    let (_, (fk_usr_id, (order_date, ()))) = orders.bindings();

    let read = select((&first_name, &last_name, order_date.nullable()))
        .from(users.left_outer(&orders).on(fk_usr_id.eq(&u_id)))
        .build()
        .unwrap();
    assert_eq!(
        read.sql(&dialect()).unwrap(),
        "SELECT users.first_name, users.last_name, orders.order_date FROM users \
         LEFT OUTER JOIN orders ON orders.usr_id = users.usr_id"
    );

    // The same selection without `.nullable()` is ill-typed for the join.
    let err = select((&first_name, &order_date))
        .from(users.left_outer(&orders).on(fk_usr_id.eq(&u_id)))
        .build()
        .unwrap_err();
    assert_matches!(err, Error::TypeMismatch { .. });
}

#[test]
fn grouped_aggregation_over_three_way_join() {
    let users = users();
    let orders = orders();
    let details = order_details();
    let (u_id, (_, (first_name, (last_name, ())))) = users.bindings();
    let (o_id, (fk_usr_id, _)) = orders.bindings();
    let (d_order_id, (_, (quantity, (unit_price, ())))) = details.bindings();

    let read = select((
        &u_id,
        &first_name,
        &last_name,
        sum(&quantity * &unit_price).alias("total_spend"),
    ))
    .from(
        users
            .join(&orders)
            .on(u_id.eq(&fk_usr_id))
            .left_outer(&details)
            .on(o_id.eq(&d_order_id)),
    )
    .group_by((&u_id, &first_name, &last_name))
    .build()
    .unwrap();

    assert_eq!(
        read.sql(&dialect()).unwrap(),
        "SELECT users.usr_id, users.first_name, users.last_name, \
         SUM(order_details.quantity * order_details.unit_price) AS \"total_spend\" \
         FROM users JOIN orders ON users.usr_id = orders.usr_id \
         LEFT OUTER JOIN order_details ON orders.order_id = order_details.order_id \
         GROUP BY users.usr_id, users.first_name, users.last_name"
    );
}

#[test]
fn group_by_legality_is_enforced() {
    let users = users();
    let orders = orders();
    let (u_id, (_, (first_name, (last_name, ())))) = users.bindings();
    let (_, (fk_usr_id, _)) = orders.bindings();

    // last_name selected but missing from the keys.
    let err = select((&u_id, &first_name, &last_name, count_star().alias("n")))
        .from(users.join(&orders).on(u_id.eq(&fk_usr_id)))
        .group_by((&u_id, &first_name))
        .build()
        .unwrap_err();
    assert_matches!(err, Error::GroupByViolation { position: 2 });
}

#[test]
fn having_reaches_the_rendered_sql() {
    let users = users();
    let orders = orders();
    let (u_id, _) = users.bindings();
    let (_, (fk_usr_id, _)) = orders.bindings();

    let read = select((&u_id, count_star().alias("orders")))
        .from(users.join(&orders).on(u_id.eq(&fk_usr_id)))
        .group_by(&u_id)
        .having(count_star().gt(lit(5i64)))
        .build()
        .unwrap();
    assert_eq!(
        read.sql(&dialect()).unwrap(),
        "SELECT users.usr_id, COUNT(*) AS \"orders\" FROM users \
         JOIN orders ON users.usr_id = orders.usr_id \
         GROUP BY users.usr_id HAVING COUNT(*) > 5"
    );
}

#[test]
fn unknown_column_is_a_construction_error() {
    let users = users();
    let orders = orders();
    let (_, (_, (order_date, ()))) = orders.bindings();
    let (usr_id, _) = users.bindings();

    let err = select(&usr_id)
        .from(&users)
        .where_(order_date.eq(order_date.expr()))
        .build()
        .unwrap_err();
    assert_matches!(err, Error::UnknownTableColumn { .. });
}

#[test]
fn union_and_union_all() {
    let users = users();
    let (_, (_, (first_name, _))) = users.bindings();
    let a = select(&first_name).from(&users).build().unwrap();
    let b = select(&first_name).from(&users).build().unwrap();
    assert_eq!(
        a.clone().union(b.clone()).sql(&dialect()).unwrap(),
        "SELECT users.first_name FROM users UNION SELECT users.first_name FROM users"
    );
    assert_eq!(
        a.union_all(b).sql(&dialect()).unwrap(),
        "SELECT users.first_name FROM users UNION ALL SELECT users.first_name FROM users"
    );
}

#[test]
fn union_operand_with_refinements_is_parenthesized() {
    let users = users();
    let (_, (_, (first_name, _))) = users.bindings();
    let a = select(&first_name)
        .from(&users)
        .order_by(first_name.asc())
        .limit(1)
        .build()
        .unwrap();
    let b = select(&first_name).from(&users).build().unwrap();
    assert_eq!(
        a.union(b).sql(&dialect()).unwrap(),
        "(SELECT users.first_name FROM users ORDER BY users.first_name ASC LIMIT 1) \
         UNION SELECT users.first_name FROM users"
    );
}

#[test]
fn literal_row_source_renders_values() {
    let read = values(vec![("Fred", ()), ("Jane", ())]).unwrap();
    assert_eq!(
        read.sql(&dialect()).unwrap(),
        "VALUES ('Fred'), ('Jane')"
    );
    let no_rows: Vec<(i64, ())> = Vec::new();
    assert_matches!(values(no_rows), Err(Error::EmptyValues));
}

#[test]
fn update_with_assignments() {
    let users = users();
    let (usr_id, (_, (first_name, (last_name, ())))) = users.bindings();
    let update = update(&users)
        .set(&first_name, lit("Bob"))
        .set(&last_name, "Smith")
        .where_(usr_id.eq(7))
        .build()
        .unwrap();
    assert_eq!(
        update.sql(&dialect()).unwrap(),
        "UPDATE users SET first_name = 'Bob', last_name = 'Smith' WHERE users.usr_id = 7"
    );
}

#[test]
fn duplicate_assignment_is_rejected() {
    let users = users();
    let (_, (_, (first_name, _))) = users.bindings();
    let err = update(&users)
        .set(&first_name, lit("a"))
        .set(&first_name, lit("b"))
        .build()
        .unwrap_err();
    assert_matches!(err, Error::DuplicateColumn(_));
}

#[test]
fn insert_literal_rows() {
    let users = users();
    let (usr_id, (_, (first_name, _))) = users.bindings();
    let insert = insert_into(&users, (&usr_id, &first_name))
        .values(vec![(1, ("Fred", ())), (2, ("Jane", ()))])
        .unwrap();
    assert_eq!(
        insert.sql(&dialect()).unwrap(),
        "INSERT INTO users (usr_id, first_name) VALUES (1, 'Fred'), (2, 'Jane')"
    );
}

#[test]
fn insert_from_select() {
    let users = users();
    let (usr_id, (_, (first_name, _))) = users.bindings();
    let source = select((&usr_id, &first_name)).from(&users).build().unwrap();
    let insert = insert_into(&users, (&usr_id, &first_name))
        .select(source)
        .unwrap();
    assert_eq!(
        insert.sql(&dialect()).unwrap(),
        "INSERT INTO users (usr_id, first_name) \
         SELECT users.usr_id, users.first_name FROM users"
    );
}

#[test]
fn subquery_membership() {
    let users = users();
    let orders = orders();
    let (u_id, _) = users.bindings();
    let (_, (fk_usr_id, _)) = orders.bindings();
    let sub = select(&fk_usr_id).from(&orders).build().unwrap();
    let read = select(&u_id)
        .from(&users)
        .where_(u_id.in_subquery(&sub))
        .build()
        .unwrap();
    assert_eq!(
        read.sql(&dialect()).unwrap(),
        "SELECT users.usr_id FROM users WHERE users.usr_id IN \
         (SELECT orders.usr_id FROM orders)"
    );
}

#[test]
fn self_join_via_alias() {
    let users = users();
    let managers = users.alias("managers");
    let (u_id, (_, (first_name, _))) = users.bindings();
    let (m_id, (_, (m_first, _))) = managers.bindings();

    let read = select((&first_name, &m_first))
        .from(users.join(&managers).on(u_id.eq(&m_id)))
        .build()
        .unwrap();
    assert_eq!(
        read.sql(&dialect()).unwrap(),
        "SELECT users.first_name, managers.first_name FROM users \
         JOIN users AS managers ON users.usr_id = managers.usr_id"
    );
}

#[test]
fn repeated_table_gets_an_auto_alias() {
    let users = users();
    let (u_id, _) = users.bindings();
    let read = select(&u_id)
        .from(users.join(&users).on(u_id.eq(&u_id)))
        .build()
        .unwrap();
    assert_eq!(
        read.sql(&dialect()).unwrap(),
        "SELECT users.usr_id FROM users JOIN users AS users_2 \
         ON users.usr_id = users.usr_id"
    );
}

#[test]
fn distinct_projection() {
    let users = users();
    let (_, (_, (first_name, _))) = users.bindings();
    let read = select(&first_name)
        .distinct()
        .from(&users)
        .build()
        .unwrap();
    assert_eq!(
        read.sql(&dialect()).unwrap(),
        "SELECT DISTINCT users.first_name FROM users"
    );
}

#[test]
fn unicode_identifiers_are_quoted() {
    let people = ColumnSet::new()
        .column::<String>("prénom")
        .table("users")
        .unwrap();
    let (prenom, ()) = people.bindings();
    let read = select(&prenom).from(&people).build().unwrap();
    assert_eq!(
        read.sql(&dialect()).unwrap(),
        "SELECT users.\"prénom\" FROM users"
    );
}

#[test]
fn reserved_table_names_are_quoted() {
    let order = ColumnSet::new()
        .column::<i32>("id")
        .table("order")
        .unwrap();
    let (id, ()) = order.bindings();
    let read = select(&id).from(&order).build().unwrap();
    assert_eq!(
        read.sql(&dialect()).unwrap(),
        "SELECT \"order\".id FROM \"order\""
    );
}

#[test]
fn sqlite_function_rewrites_apply() {
    let details = order_details();
    let (_, (_, (quantity, _))) = details.bindings();
    let read = select(floor(&quantity)).from(&details).build().unwrap();
    assert_eq!(
        read.sql(&Dialect::sqlite()).unwrap(),
        "SELECT round(order_details.quantity - 0.5) FROM order_details"
    );
}

#[test]
fn dialect_function_arity_is_checked() {
    let users = users();
    let (_, (_, (first_name, _))) = users.bindings();
    let read = select(dialect_fn::<String>(
        "concat",
        vec![AnyExpr::from(&first_name)],
    ))
    .from(&users)
    .build()
    .unwrap();
    assert_matches!(
        read.sql(&dialect()),
        Err(Error::ArityMismatch { expected: 2, actual: 1, .. })
    );
}

#[test]
fn unsupported_function_is_flagged_before_rendering() {
    let users = users();
    let (_, (_, (first_name, _))) = users.bindings();
    let read = select(dialect_fn::<String>(
        "initcap",
        vec![AnyExpr::from(&first_name)],
    ))
    .from(&users)
    .build()
    .unwrap();
    assert_matches!(
        read.sql(&Dialect::default()),
        Err(Error::UnsupportedForDialect { .. })
    );
    // postgres registers initcap.
    assert_eq!(
        read.sql(&Dialect::postgres()).unwrap(),
        "SELECT initcap(users.first_name) FROM users"
    );
}

#[test]
fn where_appears_once() {
    let users = users();
    let (usr_id, _) = users.bindings();
    let err = select(&usr_id)
        .from(&users)
        .where_(usr_id.eq(1))
        .where_(usr_id.eq(2))
        .build()
        .unwrap_err();
    assert_matches!(err, Error::DuplicateClause { clause: "WHERE" });
}

#[test]
fn predicate_sugar_renders() {
    let users = users();
    let (usr_id, (dob, (first_name, _))) = users.bindings();
    let low = chrono::NaiveDate::from_ymd_opt(1980, 1, 1).unwrap();
    let high = chrono::NaiveDate::from_ymd_opt(1989, 12, 31).unwrap();
    let read = select(&usr_id)
        .from(&users)
        .where_(
            dob.between(low, high)
                .and(first_name.like("T%"))
                .and(dob.nullable().is_not_null()),
        )
        .build()
        .unwrap();
    assert_eq!(
        read.sql(&dialect()).unwrap(),
        "SELECT users.usr_id FROM users WHERE \
         users.dob BETWEEN DATE '1980-01-01' AND DATE '1989-12-31' \
         AND users.first_name LIKE 'T%' AND users.dob IS NOT NULL"
    );
}

#[test]
fn construction_errors_are_classified() {
    let users = users();
    let orders = orders();
    let (usr_id, _) = users.bindings();
    let (_, (_, (order_date, ()))) = orders.bindings();
    let err = select(&usr_id)
        .from(&users)
        .where_(order_date.eq(order_date.expr()))
        .build()
        .unwrap_err();
    assert!(err.is_construction());
}

#[derive(Clone)]
struct Inet(String);

impl tyql::SqlType for Inet {
    fn tag() -> tyql::TypeTag {
        tyql::TypeTag::Custom("inet")
    }
}

impl tyql::NotNull for Inet {}

impl tyql::IntoLiteral for Inet {
    type Ty = Inet;
    fn into_value(self) -> tyql::ast::Value {
        tyql::ast::Value::Custom {
            tag: "inet".to_string(),
            raw: self.0,
        }
    }
}

#[derive(Debug)]
struct InetLiteral;

impl tyql::CustomLiteral for InetLiteral {
    fn render(&self, raw: &str) -> String {
        format!("INET '{}'", raw)
    }
}

#[test]
fn custom_scalar_types_render_through_the_dialect_hook() {
    let hosts = ColumnSet::new()
        .column::<i32>("host_id")
        .table("hosts")
        .unwrap();
    let (host_id, ()) = hosts.bindings();
    let read = select((&host_id, lit(Inet("10.0.0.1".to_string()))))
        .from(&hosts)
        .build()
        .unwrap();

    // No handler registered: flagged before any text is produced.
    assert_matches!(
        read.sql(&Dialect::default()),
        Err(Error::UnsupportedForDialect { .. })
    );

    let mut pg = Dialect::postgres();
    pg.custom_literals
        .insert("inet", std::sync::Arc::new(InetLiteral));
    assert_eq!(
        read.sql(&pg).unwrap(),
        "SELECT hosts.host_id, INET '10.0.0.1' FROM hosts"
    );
}

#[test]
fn exec_returns_driver_row_count() {
    let users = users();
    let (_, (_, (first_name, _))) = users.bindings();
    let delete = delete_from(&users)
        .where_(first_name.eq(lit("Terrence")))
        .build()
        .unwrap();

    let executor = common::MemExecutor::with_affected(3);
    let pool = common::MemPool;
    let affected = pool
        .with_connection(|conn| delete.run(&dialect(), &executor, conn))
        .unwrap();
    assert_eq!(affected, 3);
    assert_eq!(
        executor.last_sql(),
        "DELETE FROM users WHERE users.first_name = 'Terrence'"
    );
}
