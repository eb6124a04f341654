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

//! Typed expressions.
//!
//! An [`Expr<T>`] wraps an untyped syntax node together with its output
//! [`TypeTag`] and an aggregation marker. Combinators only compose when the
//! operand types line up, so ill-typed trees are rejected by the compiler;
//! a non-nullable expression meets a nullable slot through the explicit
//! [`nullable`](Expr::nullable) upcast.

use std::marker::PhantomData;
use std::ops::{Add, Div, Mul, Neg, Not, Rem, Sub};

use crate::ast::{self, AggregateFunction, BinaryOperator, Ident, UnaryOperator, Value};
use crate::dialect::{Dialect, DialectDisplay};
use crate::error::Result;
use crate::query::Read;
use crate::schema::Col;
use crate::types::{NotNull, Numeric, SqlType, TypeTag};

use bigdecimal::BigDecimal;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use uuid::Uuid;

/// A typed SQL expression with output type `T`.
pub struct Expr<T> {
    pub(crate) node: ast::Expr,
    pub(crate) tag: TypeTag,
    pub(crate) aggregated: bool,
    _marker: PhantomData<T>,
}

impl<T> Clone for Expr<T> {
    fn clone(&self) -> Self {
        Expr {
            node: self.node.clone(),
            tag: self.tag.clone(),
            aggregated: self.aggregated,
            _marker: PhantomData,
        }
    }
}

impl<T> Expr<T> {
    pub(crate) fn new(node: ast::Expr, tag: TypeTag, aggregated: bool) -> Self {
        Expr {
            node,
            tag,
            aggregated,
            _marker: PhantomData,
        }
    }

    pub fn tag(&self) -> &TypeTag {
        &self.tag
    }

    /// SQL text of this expression alone, mostly useful for debugging.
    pub fn sql(&self, dialect: &Dialect) -> Result<String> {
        self.node.sql(dialect)
    }
}

/// Anything convertible into an [`Expr<T>`]: expressions themselves, column
/// handles, plain Rust scalars (which become literals), and non-nullable
/// forms where a nullable expression is expected.
pub trait IntoExpr<T> {
    fn into_expr(self) -> Expr<T>;
}

impl<T> IntoExpr<T> for Expr<T> {
    fn into_expr(self) -> Expr<T> {
        self
    }
}

impl<T: SqlType> IntoExpr<T> for &Col<T> {
    fn into_expr(self) -> Expr<T> {
        self.expr()
    }
}

impl<T: SqlType> IntoExpr<T> for Col<T> {
    fn into_expr(self) -> Expr<T> {
        self.expr()
    }
}

/// A Rust scalar with a canonical literal form.
pub trait IntoLiteral {
    type Ty: SqlType;
    fn into_value(self) -> Value;
}

macro_rules! impl_into_literal {
    ($($rust:ty),+ $(,)?) => {
        $(
            impl IntoLiteral for $rust {
                type Ty = $rust;
                fn into_value(self) -> Value {
                    Value::from(self)
                }
            }

            impl IntoExpr<$rust> for $rust {
                fn into_expr(self) -> Expr<$rust> {
                    lit(self)
                }
            }
        )+
    };
}

impl_into_literal!(
    bool,
    i8,
    i16,
    i32,
    i64,
    f32,
    f64,
    BigDecimal,
    char,
    String,
    Vec<u8>,
    Uuid,
    NaiveDate,
    NaiveTime,
    NaiveDateTime,
    DateTime<Utc>,
    DateTime<FixedOffset>,
);

impl IntoLiteral for &str {
    type Ty = String;
    fn into_value(self) -> Value {
        Value::from(self)
    }
}

impl IntoExpr<String> for &str {
    fn into_expr(self) -> Expr<String> {
        lit(self)
    }
}

impl<V> IntoLiteral for Option<V>
where
    V: IntoLiteral,
    V::Ty: NotNull,
{
    type Ty = Option<V::Ty>;
    fn into_value(self) -> Value {
        match self {
            Some(v) => v.into_value(),
            None => Value::Null,
        }
    }
}

/// A constant of the scalar's SQL type.
pub fn lit<V: IntoLiteral>(v: V) -> Expr<V::Ty> {
    Expr::new(ast::Expr::Value(v.into_value()), V::Ty::tag(), false)
}

/// A typed `NULL`.
pub fn null<T: NotNull>() -> Expr<Option<T>> {
    Expr::new(ast::Expr::Value(Value::Null), T::tag().nullable(), false)
}

impl<T: SqlType> Col<T> {
    /// This column as an expression, qualified by its table.
    pub fn expr(&self) -> Expr<T> {
        Expr::new(
            ast::Expr::Column {
                table: Ident::new(&*self.table),
                column: Ident::new(&*self.name),
            },
            T::tag(),
            false,
        )
    }
}

impl<T: NotNull> Expr<T> {
    /// Upcasts to the nullable form of the same expression, for comparing
    /// against or assigning into nullable slots.
    pub fn nullable(self) -> Expr<Option<T>> {
        Expr::new(self.node, self.tag.nullable(), self.aggregated)
    }
}

impl<T: SqlType + NotNull> Col<T> {
    /// Reads this column as nullable, as required when it sits on the weak
    /// side of an outer join.
    pub fn nullable(&self) -> Expr<Option<T>> {
        self.expr().nullable()
    }
}

fn binary<L, R, O>(left: Expr<L>, op: BinaryOperator, right: Expr<R>, tag: TypeTag) -> Expr<O> {
    Expr::new(
        ast::Expr::BinaryOp {
            left: Box::new(left.node),
            op,
            right: Box::new(right.node),
        },
        tag,
        left.aggregated || right.aggregated,
    )
}

macro_rules! comparisons {
    ($($method:ident => $op:ident),+ $(,)?) => {
        impl<T: SqlType> Expr<T> {
            $(
                pub fn $method(self, rhs: impl IntoExpr<T>) -> Expr<bool> {
                    binary(self, BinaryOperator::$op, rhs.into_expr(), TypeTag::Bool)
                }
            )+
        }

        impl<T: SqlType> Col<T> {
            $(
                pub fn $method(&self, rhs: impl IntoExpr<T>) -> Expr<bool> {
                    self.expr().$method(rhs)
                }
            )+
        }
    };
}

comparisons!(
    eq => Eq,
    ne => NotEq,
    lt => Lt,
    le => LtEq,
    gt => Gt,
    ge => GtEq,
);

impl<T: SqlType> Expr<T> {
    /// `self BETWEEN low AND high`.
    pub fn between(self, low: impl IntoExpr<T>, high: impl IntoExpr<T>) -> Expr<bool> {
        let low = low.into_expr();
        let high = high.into_expr();
        let aggregated = self.aggregated || low.aggregated || high.aggregated;
        Expr::new(
            ast::Expr::Between {
                expr: Box::new(self.node),
                low: Box::new(low.node),
                high: Box::new(high.node),
                negated: false,
            },
            TypeTag::Bool,
            aggregated,
        )
    }

    /// `self IN (v, …)`. Against a NULL subject the SQL value is unknown
    /// rather than false; this renders the list as written.
    pub fn in_list<I>(self, items: I) -> Expr<bool>
    where
        I: IntoIterator,
        I::Item: IntoExpr<T>,
    {
        let list = items
            .into_iter()
            .map(|item| item.into_expr().node)
            .collect();
        Expr::new(
            ast::Expr::InList {
                expr: Box::new(self.node),
                list,
                negated: false,
            },
            TypeTag::Bool,
            self.aggregated,
        )
    }

    /// `self IN (subquery)`; the subquery selects exactly one column of the
    /// same type.
    pub fn in_subquery(self, subquery: &Read<(T, ())>) -> Expr<bool> {
        Expr::new(
            ast::Expr::InSubquery {
                expr: Box::new(self.node),
                subquery: Box::new(subquery.query().clone()),
                negated: false,
            },
            TypeTag::Bool,
            self.aggregated,
        )
    }

    /// Attaches a selection alias; only selection items may carry one.
    pub fn alias(self, alias: &str) -> Aliased<T> {
        Aliased {
            expr: self,
            alias: alias.to_owned(),
        }
    }

    pub fn asc(self) -> OrderKey {
        OrderKey {
            expr: self.node,
            asc: true,
            nulls_first: None,
        }
    }

    pub fn desc(self) -> OrderKey {
        OrderKey {
            expr: self.node,
            asc: false,
            nulls_first: None,
        }
    }
}

impl<T: SqlType> Col<T> {
    pub fn between(&self, low: impl IntoExpr<T>, high: impl IntoExpr<T>) -> Expr<bool> {
        self.expr().between(low, high)
    }

    pub fn in_list<I>(&self, items: I) -> Expr<bool>
    where
        I: IntoIterator,
        I::Item: IntoExpr<T>,
    {
        self.expr().in_list(items)
    }

    pub fn in_subquery(&self, subquery: &Read<(T, ())>) -> Expr<bool> {
        self.expr().in_subquery(subquery)
    }

    pub fn alias(&self, alias: &str) -> Aliased<T> {
        self.expr().alias(alias)
    }

    pub fn asc(&self) -> OrderKey {
        self.expr().asc()
    }

    pub fn desc(&self) -> OrderKey {
        self.expr().desc()
    }
}

impl Expr<bool> {
    pub fn and(self, rhs: impl IntoExpr<bool>) -> Expr<bool> {
        binary(self, BinaryOperator::And, rhs.into_expr(), TypeTag::Bool)
    }

    pub fn or(self, rhs: impl IntoExpr<bool>) -> Expr<bool> {
        binary(self, BinaryOperator::Or, rhs.into_expr(), TypeTag::Bool)
    }
}

impl Not for Expr<bool> {
    type Output = Expr<bool>;

    fn not(self) -> Expr<bool> {
        Expr::new(
            ast::Expr::UnaryOp {
                op: UnaryOperator::Not,
                expr: Box::new(self.node),
            },
            TypeTag::Bool,
            self.aggregated,
        )
    }
}

impl Expr<String> {
    pub fn like(self, pattern: impl IntoExpr<String>) -> Expr<bool> {
        binary(self, BinaryOperator::Like, pattern.into_expr(), TypeTag::Bool)
    }

    pub fn not_like(self, pattern: impl IntoExpr<String>) -> Expr<bool> {
        binary(
            self,
            BinaryOperator::NotLike,
            pattern.into_expr(),
            TypeTag::Bool,
        )
    }
}

impl Col<String> {
    pub fn like(&self, pattern: impl IntoExpr<String>) -> Expr<bool> {
        self.expr().like(pattern)
    }

    pub fn not_like(&self, pattern: impl IntoExpr<String>) -> Expr<bool> {
        self.expr().not_like(pattern)
    }
}

impl<T: NotNull> Expr<Option<T>> {
    pub fn is_null(self) -> Expr<bool> {
        Expr::new(
            ast::Expr::IsNull {
                expr: Box::new(self.node),
                negated: false,
            },
            TypeTag::Bool,
            self.aggregated,
        )
    }

    pub fn is_not_null(self) -> Expr<bool> {
        Expr::new(
            ast::Expr::IsNull {
                expr: Box::new(self.node),
                negated: true,
            },
            TypeTag::Bool,
            self.aggregated,
        )
    }
}

impl<T: NotNull> Col<Option<T>>
where
    Option<T>: SqlType,
{
    pub fn is_null(&self) -> Expr<bool> {
        self.expr().is_null()
    }

    pub fn is_not_null(&self) -> Expr<bool> {
        self.expr().is_not_null()
    }
}

// Arithmetic is defined over `Double`; wider numeric arithmetic is a known
// gap (see DESIGN.md).
macro_rules! impl_arith {
    ($($trait:ident :: $method:ident => $op:ident),+ $(,)?) => {
        $(
            impl<R: IntoExpr<f64>> $trait<R> for Expr<f64> {
                type Output = Expr<f64>;
                fn $method(self, rhs: R) -> Expr<f64> {
                    binary(self, BinaryOperator::$op, rhs.into_expr(), TypeTag::Double)
                }
            }

            impl<R: IntoExpr<f64>> $trait<R> for Col<f64> {
                type Output = Expr<f64>;
                fn $method(self, rhs: R) -> Expr<f64> {
                    self.expr().$method(rhs)
                }
            }

            impl<R: IntoExpr<f64>> $trait<R> for &Col<f64> {
                type Output = Expr<f64>;
                fn $method(self, rhs: R) -> Expr<f64> {
                    self.expr().$method(rhs)
                }
            }
        )+
    };
}

impl_arith!(
    Add::add => Plus,
    Sub::sub => Minus,
    Mul::mul => Multiply,
    Div::div => Divide,
    Rem::rem => Modulo,
);

impl Neg for Expr<f64> {
    type Output = Expr<f64>;

    fn neg(self) -> Expr<f64> {
        Expr::new(
            ast::Expr::UnaryOp {
                op: UnaryOperator::Minus,
                expr: Box::new(self.node),
            },
            TypeTag::Double,
            self.aggregated,
        )
    }
}

impl Neg for &Col<f64> {
    type Output = Expr<f64>;

    fn neg(self) -> Expr<f64> {
        -self.expr()
    }
}

fn function<O: SqlType>(name: &str, args: Vec<(ast::Expr, bool)>) -> Expr<O> {
    let aggregated = args.iter().any(|(_, aggregated)| *aggregated);
    Expr::new(
        ast::Expr::Function {
            name: name.to_string(),
            args: args.into_iter().map(|(node, _)| node).collect(),
        },
        O::tag(),
        aggregated,
    )
}

macro_rules! numeric_fns {
    ($($fn_name:ident),+ $(,)?) => {
        $(
            pub fn $fn_name(e: impl IntoExpr<f64>) -> Expr<f64> {
                let e = e.into_expr();
                function(stringify!($fn_name), vec![(e.node, e.aggregated)])
            }
        )+
    };
}

numeric_fns!(abs, ceil, floor, round, ln, log, sin, cos, sqrt);

macro_rules! string_fns {
    ($($fn_name:ident),+ $(,)?) => {
        $(
            pub fn $fn_name(e: impl IntoExpr<String>) -> Expr<String> {
                let e = e.into_expr();
                function(stringify!($fn_name), vec![(e.node, e.aggregated)])
            }
        )+
    };
}

string_fns!(lower, upper, trim);

pub fn length(e: impl IntoExpr<String>) -> Expr<i64> {
    let e = e.into_expr();
    function("length", vec![(e.node, e.aggregated)])
}

pub fn substring(
    e: impl IntoExpr<String>,
    start: impl IntoExpr<i64>,
    count: impl IntoExpr<i64>,
) -> Expr<String> {
    let e = e.into_expr();
    let start = start.into_expr();
    let count = count.into_expr();
    function(
        "substring",
        vec![
            (e.node, e.aggregated),
            (start.node, start.aggregated),
            (count.node, count.aggregated),
        ],
    )
}

pub fn concat(a: impl IntoExpr<String>, b: impl IntoExpr<String>) -> Expr<String> {
    let a = a.into_expr();
    let b = b.into_expr();
    function("concat", vec![(a.node, a.aggregated), (b.node, b.aggregated)])
}

/// `COALESCE(first, fallback)`: the fallback discharges the nullability.
pub fn coalesce<T: NotNull>(
    first: impl IntoExpr<Option<T>>,
    fallback: impl IntoExpr<T>,
) -> Expr<T> {
    let first = first.into_expr();
    let fallback = fallback.into_expr();
    function(
        "coalesce",
        vec![
            (first.node, first.aggregated),
            (fallback.node, fallback.aggregated),
        ],
    )
}

/// Applies a dialect-registered scalar function. The arity is checked
/// against the dialect's registry when the statement is rendered.
pub fn dialect_fn<T: SqlType>(name: &str, args: Vec<AnyExpr>) -> Expr<T> {
    let aggregated = args.iter().any(|a| a.aggregated);
    Expr::new(
        ast::Expr::Function {
            name: name.to_string(),
            args: args.into_iter().map(|a| a.node).collect(),
        },
        T::tag(),
        aggregated,
    )
}

/// A type-erased expression, used for heterogeneous argument lists.
pub struct AnyExpr {
    pub(crate) node: ast::Expr,
    pub(crate) aggregated: bool,
}

impl<T> From<Expr<T>> for AnyExpr {
    fn from(e: Expr<T>) -> Self {
        AnyExpr {
            node: e.node,
            aggregated: e.aggregated,
        }
    }
}

impl<T: SqlType> From<&Col<T>> for AnyExpr {
    fn from(c: &Col<T>) -> Self {
        AnyExpr::from(c.expr())
    }
}

fn aggregate<O: SqlType>(
    func: AggregateFunction,
    expr: Option<(ast::Expr, bool)>,
    distinct: bool,
) -> Expr<O> {
    Expr::new(
        ast::Expr::Aggregate {
            func,
            expr: expr.map(|(node, _)| Box::new(node)),
            distinct,
        },
        O::tag(),
        true,
    )
}

pub fn sum<T: Numeric>(e: impl IntoExpr<T>) -> Expr<T> {
    let e = e.into_expr();
    aggregate(AggregateFunction::Sum, Some((e.node, e.aggregated)), false)
}

pub fn avg<T: Numeric>(e: impl IntoExpr<T>) -> Expr<f64> {
    let e = e.into_expr();
    aggregate(AggregateFunction::Avg, Some((e.node, e.aggregated)), false)
}

pub fn count<T: SqlType>(e: impl IntoExpr<T>) -> Expr<i64> {
    let e = e.into_expr();
    aggregate(AggregateFunction::Count, Some((e.node, e.aggregated)), false)
}

pub fn count_distinct<T: SqlType>(e: impl IntoExpr<T>) -> Expr<i64> {
    let e = e.into_expr();
    aggregate(AggregateFunction::Count, Some((e.node, e.aggregated)), true)
}

/// `COUNT(*)`; yields 0 on empty input rather than NULL.
pub fn count_star() -> Expr<i64> {
    aggregate(AggregateFunction::Count, None, false)
}

pub fn min<T: SqlType>(e: impl IntoExpr<T>) -> Expr<T> {
    let e = e.into_expr();
    aggregate(AggregateFunction::Min, Some((e.node, e.aggregated)), false)
}

pub fn max<T: SqlType>(e: impl IntoExpr<T>) -> Expr<T> {
    let e = e.into_expr();
    aggregate(AggregateFunction::Max, Some((e.node, e.aggregated)), false)
}

/// Starts a `CASE` expression.
pub fn case() -> CaseBuilder {
    CaseBuilder { _private: () }
}

pub struct CaseBuilder {
    _private: (),
}

impl CaseBuilder {
    pub fn when<T: SqlType>(
        self,
        cond: impl IntoExpr<bool>,
        value: impl IntoExpr<T>,
    ) -> CaseWhen<T> {
        let cond = cond.into_expr();
        let value = value.into_expr();
        CaseWhen {
            branches: vec![(cond.node, value.node)],
            aggregated: cond.aggregated || value.aggregated,
            _marker: PhantomData,
        }
    }
}

/// A `CASE` with at least one branch; all branch values share a type.
pub struct CaseWhen<T> {
    branches: Vec<(ast::Expr, ast::Expr)>,
    aggregated: bool,
    _marker: PhantomData<T>,
}

impl<T: SqlType> CaseWhen<T> {
    pub fn when(mut self, cond: impl IntoExpr<bool>, value: impl IntoExpr<T>) -> Self {
        let cond = cond.into_expr();
        let value = value.into_expr();
        self.aggregated = self.aggregated || cond.aggregated || value.aggregated;
        self.branches.push((cond.node, value.node));
        self
    }

    /// Closes the `CASE` with an `ELSE` branch.
    pub fn otherwise(self, value: impl IntoExpr<T>) -> Expr<T> {
        let value = value.into_expr();
        Expr::new(
            ast::Expr::Case {
                branches: self.branches,
                else_result: Some(Box::new(value.node)),
            },
            T::tag(),
            self.aggregated || value.aggregated,
        )
    }
}

impl<T: SqlType + NotNull> CaseWhen<T> {
    /// Closes the `CASE` without an `ELSE`; unmatched rows yield NULL.
    pub fn end(self) -> Expr<Option<T>> {
        Expr::new(
            ast::Expr::Case {
                branches: self.branches,
                else_result: None,
            },
            T::tag().nullable(),
            self.aggregated,
        )
    }
}

/// A selection item carrying an output alias.
pub struct Aliased<T> {
    pub(crate) expr: Expr<T>,
    pub(crate) alias: String,
}

/// One `ORDER BY` key: an expression, a direction, and optional NULLS
/// ordering.
pub struct OrderKey {
    pub(crate) expr: ast::Expr,
    pub(crate) asc: bool,
    pub(crate) nulls_first: Option<bool>,
}

impl OrderKey {
    pub fn nulls_first(mut self) -> Self {
        self.nulls_first = Some(true);
        self
    }

    pub fn nulls_last(mut self) -> Self {
        self.nulls_first = Some(false);
        self
    }
}
