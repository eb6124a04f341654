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

use crate::ast::{display_comma_separated, Expr, Ident};
use crate::dialect::{Dialect, DialectDisplay};
use crate::error::Error;

/// A complete `SELECT` query expression: a body (plain select, literal rows,
/// or a set operation) plus `ORDER BY` and pagination.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Query {
    /// SELECT, VALUES, or UNION
    pub body: Box<SetExpr>,
    /// ORDER BY
    pub order_by: Vec<OrderByExpr>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl DialectDisplay for Query {
    fn fmt(&self, f: &mut (dyn fmt::Write), dialect: &Dialect) -> Result<(), Error> {
        write!(f, "{}", self.body.sql(dialect)?)?;
        if !self.order_by.is_empty() {
            write!(
                f,
                " ORDER BY {}",
                display_comma_separated(&self.order_by).sql(dialect)?
            )?;
        }
        if self.limit.is_some() || self.offset.is_some() {
            write!(f, " {}", dialect.limit_clause(self.limit, self.offset))?;
        }
        Ok(())
    }
}

impl Query {
    /// Visits every expression in this query, including join predicates and
    /// nested set-operation operands.
    pub(crate) fn for_each_expr(&self, f: &mut impl FnMut(&Expr)) {
        self.body.for_each_expr(f);
        for key in &self.order_by {
            f(&key.expr);
        }
    }
}

/// A node in a query body: `SELECT ... [UNION [ALL] SELECT ...]`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SetExpr {
    /// Restricted SELECT .. FROM .. HAVING (no ORDER BY or set operations)
    Select(Box<Select>),
    /// Parenthesized subquery with its own ORDER BY / pagination
    Query(Box<Query>),
    /// UNION of two bodies
    SetOperation {
        op: SetOperator,
        all: bool,
        left: Box<SetExpr>,
        right: Box<SetExpr>,
    },
    Values(Values),
}

impl DialectDisplay for SetExpr {
    fn fmt(&self, f: &mut (dyn fmt::Write), dialect: &Dialect) -> Result<(), Error> {
        match self {
            SetExpr::Select(s) => write!(f, "{}", s.sql(dialect)?)?,
            SetExpr::Query(q) => write!(f, "({})", q.sql(dialect)?)?,
            SetExpr::Values(v) => write!(f, "{}", v.sql(dialect)?)?,
            SetExpr::SetOperation {
                left,
                right,
                op,
                all,
            } => {
                let all_str = if *all { " ALL" } else { "" };
                write!(f, "{} {}{} ", left.sql(dialect)?, op.sql(dialect)?, all_str)?;
                // Keep right-nested set operations grouped as built.
                if matches!(**right, SetExpr::SetOperation { .. }) {
                    write!(f, "({})", right.sql(dialect)?)?;
                } else {
                    write!(f, "{}", right.sql(dialect)?)?;
                }
            }
        }
        Ok(())
    }
}

impl SetExpr {
    fn for_each_expr(&self, f: &mut impl FnMut(&Expr)) {
        match self {
            SetExpr::Select(s) => s.for_each_expr(f),
            SetExpr::Query(q) => q.for_each_expr(f),
            SetExpr::Values(v) => {
                for row in &v.0 {
                    for e in row {
                        f(e);
                    }
                }
            }
            SetExpr::SetOperation { left, right, .. } => {
                left.for_each_expr(f);
                right.for_each_expr(f);
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SetOperator {
    Union,
}

impl DialectDisplay for SetOperator {
    fn fmt(&self, f: &mut (dyn fmt::Write), _dialect: &Dialect) -> Result<(), Error> {
        f.write_str(match self {
            SetOperator::Union => "UNION",
        })?;
        Ok(())
    }
}

/// A restricted `SELECT` (no ORDER BY or set operations), usable both as a
/// query body and as a set-operation operand.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Select {
    pub distinct: bool,
    /// projection expressions
    pub projection: Vec<SelectItem>,
    /// FROM
    pub from: Option<TableRef>,
    /// WHERE
    pub selection: Option<Expr>,
    /// GROUP BY
    pub group_by: Vec<Expr>,
    /// HAVING
    pub having: Option<Expr>,
}

impl DialectDisplay for Select {
    fn fmt(&self, f: &mut (dyn fmt::Write), dialect: &Dialect) -> Result<(), Error> {
        write!(f, "SELECT{}", if self.distinct { " DISTINCT" } else { "" })?;
        write!(
            f,
            " {}",
            display_comma_separated(&self.projection).sql(dialect)?
        )?;
        if let Some(ref from) = self.from {
            write!(f, " FROM {}", from.sql(dialect)?)?;
        }
        if let Some(ref selection) = self.selection {
            write!(f, " WHERE {}", selection.sql(dialect)?)?;
        }
        if !self.group_by.is_empty() {
            write!(
                f,
                " GROUP BY {}",
                display_comma_separated(&self.group_by).sql(dialect)?
            )?;
        }
        if let Some(ref having) = self.having {
            write!(f, " HAVING {}", having.sql(dialect)?)?;
        }
        Ok(())
    }
}

impl Select {
    fn for_each_expr(&self, f: &mut impl FnMut(&Expr)) {
        for item in &self.projection {
            f(item.expr());
        }
        if let Some(ref from) = self.from {
            from.for_each_on_predicate(f);
        }
        if let Some(ref selection) = self.selection {
            f(selection);
        }
        for key in &self.group_by {
            f(key);
        }
        if let Some(ref having) = self.having {
            f(having);
        }
    }
}

/// One item of the comma-separated list following `SELECT`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SelectItem {
    /// Any expression, not followed by `AS alias`
    UnnamedExpr(Expr),
    /// An expression followed by `AS "alias"`; the alias is always quoted
    ExprWithAlias { expr: Expr, alias: String },
}

impl SelectItem {
    pub fn expr(&self) -> &Expr {
        match self {
            SelectItem::UnnamedExpr(expr) | SelectItem::ExprWithAlias { expr, .. } => expr,
        }
    }
}

impl DialectDisplay for SelectItem {
    fn fmt(&self, f: &mut (dyn fmt::Write), dialect: &Dialect) -> Result<(), Error> {
        match self {
            SelectItem::UnnamedExpr(expr) => write!(f, "{}", expr.sql(dialect)?)?,
            SelectItem::ExprWithAlias { expr, alias } => {
                write!(f, "{} AS {}", expr.sql(dialect)?, dialect.quoted(alias))?
            }
        }
        Ok(())
    }
}

/// A table source: a base table or a join tree.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TableRef {
    Table {
        name: Ident,
        alias: Option<Ident>,
    },
    Join {
        kind: JoinKind,
        left: Box<TableRef>,
        right: Box<TableRef>,
        on: Expr,
    },
}

impl DialectDisplay for TableRef {
    fn fmt(&self, f: &mut (dyn fmt::Write), dialect: &Dialect) -> Result<(), Error> {
        match self {
            TableRef::Table { name, alias } => {
                write!(f, "{}", name.sql(dialect)?)?;
                if let Some(alias) = alias {
                    write!(f, " AS {}", alias.sql(dialect)?)?;
                }
            }
            TableRef::Join {
                kind,
                left,
                right,
                on,
            } => {
                write!(f, "{} {} ", left.sql(dialect)?, kind.sql(dialect)?)?;
                // A bushy right side keeps its grouping.
                if matches!(**right, TableRef::Join { .. }) {
                    write!(f, "({})", right.sql(dialect)?)?;
                } else {
                    write!(f, "{}", right.sql(dialect)?)?;
                }
                write!(f, " ON {}", on.sql(dialect)?)?;
            }
        }
        Ok(())
    }
}

impl TableRef {
    pub(crate) fn for_each_on_predicate(&self, f: &mut impl FnMut(&Expr)) {
        if let TableRef::Join {
            left, right, on, ..
        } = self
        {
            left.for_each_on_predicate(f);
            right.for_each_on_predicate(f);
            f(on);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum JoinKind {
    Inner,
    LeftOuter,
    RightOuter,
    FullOuter,
}

impl JoinKind {
    /// Which operands can produce all-NULL rows under this join kind.
    pub(crate) fn weak_sides(&self) -> (bool, bool) {
        match self {
            JoinKind::Inner => (false, false),
            JoinKind::LeftOuter => (false, true),
            JoinKind::RightOuter => (true, false),
            JoinKind::FullOuter => (true, true),
        }
    }
}

impl DialectDisplay for JoinKind {
    fn fmt(&self, f: &mut (dyn fmt::Write), _dialect: &Dialect) -> Result<(), Error> {
        f.write_str(match self {
            JoinKind::Inner => "JOIN",
            JoinKind::LeftOuter => "LEFT OUTER JOIN",
            JoinKind::RightOuter => "RIGHT OUTER JOIN",
            JoinKind::FullOuter => "FULL OUTER JOIN",
        })?;
        Ok(())
    }
}

/// An `ORDER BY` key.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OrderByExpr {
    pub expr: Expr,
    pub asc: bool,
    /// Optional `NULLS FIRST` / `NULLS LAST`
    pub nulls_first: Option<bool>,
}

impl DialectDisplay for OrderByExpr {
    fn fmt(&self, f: &mut (dyn fmt::Write), dialect: &Dialect) -> Result<(), Error> {
        write!(f, "{}", self.expr.sql(dialect)?)?;
        write!(f, " {}", if self.asc { "ASC" } else { "DESC" })?;
        match self.nulls_first {
            Some(true) => write!(f, " NULLS FIRST")?,
            Some(false) => write!(f, " NULLS LAST")?,
            None => (),
        }
        Ok(())
    }
}

/// Literal rows: `VALUES (…), (…)`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Values(pub Vec<Vec<Expr>>);

impl DialectDisplay for Values {
    fn fmt(&self, f: &mut (dyn fmt::Write), dialect: &Dialect) -> Result<(), Error> {
        write!(f, "VALUES ")?;
        let mut delim = "";
        for row in &self.0 {
            write!(f, "{}", delim)?;
            delim = ", ";
            write!(f, "({})", display_comma_separated(row).sql(dialect)?)?;
        }
        Ok(())
    }
}

/// `INSERT INTO T (c, …) VALUES … | <select>`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Insert {
    pub table: Ident,
    pub columns: Vec<Ident>,
    pub source: InsertSource,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InsertSource {
    Values(Values),
    Query(Box<Query>),
}

impl DialectDisplay for Insert {
    fn fmt(&self, f: &mut (dyn fmt::Write), dialect: &Dialect) -> Result<(), Error> {
        write!(
            f,
            "INSERT INTO {} ({}) ",
            self.table.sql(dialect)?,
            display_comma_separated(&self.columns).sql(dialect)?
        )?;
        match &self.source {
            InsertSource::Values(values) => write!(f, "{}", values.sql(dialect)?)?,
            InsertSource::Query(query) => write!(f, "{}", query.sql(dialect)?)?,
        }
        Ok(())
    }
}

impl Insert {
    pub(crate) fn for_each_expr(&self, f: &mut impl FnMut(&Expr)) {
        match &self.source {
            InsertSource::Values(values) => {
                for row in &values.0 {
                    for e in row {
                        f(e);
                    }
                }
            }
            InsertSource::Query(query) => query.for_each_expr(f),
        }
    }
}

/// `UPDATE T SET c = e, … WHERE …`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Update {
    pub table: Ident,
    pub assignments: Vec<Assignment>,
    pub selection: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Assignment {
    pub column: Ident,
    pub value: Expr,
}

impl DialectDisplay for Assignment {
    fn fmt(&self, f: &mut (dyn fmt::Write), dialect: &Dialect) -> Result<(), Error> {
        write!(
            f,
            "{} = {}",
            self.column.sql(dialect)?,
            self.value.sql(dialect)?
        )?;
        Ok(())
    }
}

impl DialectDisplay for Update {
    fn fmt(&self, f: &mut (dyn fmt::Write), dialect: &Dialect) -> Result<(), Error> {
        write!(
            f,
            "UPDATE {} SET {}",
            self.table.sql(dialect)?,
            display_comma_separated(&self.assignments).sql(dialect)?
        )?;
        if let Some(ref selection) = self.selection {
            write!(f, " WHERE {}", selection.sql(dialect)?)?;
        }
        Ok(())
    }
}

impl Update {
    pub(crate) fn for_each_expr(&self, f: &mut impl FnMut(&Expr)) {
        for a in &self.assignments {
            f(&a.value);
        }
        if let Some(ref selection) = self.selection {
            f(selection);
        }
    }
}

/// `DELETE FROM T WHERE …`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Delete {
    pub table: Ident,
    pub selection: Option<Expr>,
}

impl DialectDisplay for Delete {
    fn fmt(&self, f: &mut (dyn fmt::Write), dialect: &Dialect) -> Result<(), Error> {
        write!(f, "DELETE FROM {}", self.table.sql(dialect)?)?;
        if let Some(ref selection) = self.selection {
            write!(f, " WHERE {}", selection.sql(dialect)?)?;
        }
        Ok(())
    }
}

impl Delete {
    pub(crate) fn for_each_expr(&self, f: &mut impl FnMut(&Expr)) {
        if let Some(ref selection) = self.selection {
            f(selection);
        }
    }
}
