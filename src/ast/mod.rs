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

//! Untyped statement syntax trees and their dialect-aware rendering.
//!
//! The typed builder layer constructs these trees; rendering walks them with
//! an explicit operator precedence table, inserting parentheses whenever a
//! child binds less tightly than its parent (or equally, in a
//! non-associative position).

pub mod query;
pub mod value;

use core::fmt;
use std::fmt::Write;

pub use query::*;
pub use value::{escape_quoted_string, escape_single_quote_string, Value};

use crate::dialect::{Dialect, DialectDisplay};
use crate::error::Error;

/// An identifier, quoted on demand per dialect.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Ident {
    pub value: String,
}

impl Ident {
    pub fn new(value: impl Into<String>) -> Self {
        Ident {
            value: value.into(),
        }
    }
}

impl DialectDisplay for Ident {
    fn fmt(&self, f: &mut (dyn fmt::Write), dialect: &Dialect) -> Result<(), Error> {
        if dialect.needs_quote(&self.value) {
            write!(f, "{}", dialect.quoted(&self.value))?;
        } else {
            write!(f, "{}", self.value)?;
        }
        Ok(())
    }
}

/// An SQL expression of any type.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Expr {
    /// Literal value
    Value(Value),
    /// Table-qualified column reference
    Column { table: Ident, column: Ident },
    UnaryOp {
        op: UnaryOperator,
        expr: Box<Expr>,
    },
    BinaryOp {
        left: Box<Expr>,
        op: BinaryOperator,
        right: Box<Expr>,
    },
    /// Scalar function application, resolved through the dialect's function
    /// registry at render time
    Function { name: String, args: Vec<Expr> },
    /// Aggregation; `expr` is `None` for `COUNT(*)`
    Aggregate {
        func: AggregateFunction,
        expr: Option<Box<Expr>>,
        distinct: bool,
    },
    Case {
        branches: Vec<(Expr, Expr)>,
        else_result: Option<Box<Expr>>,
    },
    InList {
        expr: Box<Expr>,
        list: Vec<Expr>,
        negated: bool,
    },
    InSubquery {
        expr: Box<Expr>,
        subquery: Box<Query>,
        negated: bool,
    },
    Between {
        expr: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
        negated: bool,
    },
    IsNull {
        expr: Box<Expr>,
        negated: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum UnaryOperator {
    Not,
    Minus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BinaryOperator {
    Plus,
    Minus,
    Multiply,
    Divide,
    Modulo,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
    Like,
    NotLike,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AggregateFunction {
    Sum,
    Avg,
    Min,
    Max,
    Count,
}

// Binding strengths, loosest first. OR < AND < NOT < comparisons <
// additive < multiplicative < unary minus < atoms.
pub(crate) const PREC_OR: u8 = 1;
pub(crate) const PREC_AND: u8 = 2;
pub(crate) const PREC_NOT: u8 = 3;
pub(crate) const PREC_CMP: u8 = 4;
pub(crate) const PREC_ADD: u8 = 5;
pub(crate) const PREC_MUL: u8 = 6;
pub(crate) const PREC_NEG: u8 = 7;
pub(crate) const PREC_ATOM: u8 = 10;

impl BinaryOperator {
    pub(crate) fn precedence(&self) -> u8 {
        match self {
            BinaryOperator::Or => PREC_OR,
            BinaryOperator::And => PREC_AND,
            BinaryOperator::Eq
            | BinaryOperator::NotEq
            | BinaryOperator::Lt
            | BinaryOperator::LtEq
            | BinaryOperator::Gt
            | BinaryOperator::GtEq
            | BinaryOperator::Like
            | BinaryOperator::NotLike => PREC_CMP,
            BinaryOperator::Plus | BinaryOperator::Minus => PREC_ADD,
            BinaryOperator::Multiply | BinaryOperator::Divide | BinaryOperator::Modulo => PREC_MUL,
        }
    }

    /// An associative operator's right operand may share its precedence
    /// without parentheses.
    pub(crate) fn is_associative(&self) -> bool {
        matches!(
            self,
            BinaryOperator::And
                | BinaryOperator::Or
                | BinaryOperator::Plus
                | BinaryOperator::Multiply
        )
    }
}

impl DialectDisplay for BinaryOperator {
    fn fmt(&self, f: &mut (dyn fmt::Write), _dialect: &Dialect) -> Result<(), Error> {
        f.write_str(match self {
            BinaryOperator::Plus => "+",
            BinaryOperator::Minus => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
            BinaryOperator::Eq => "=",
            BinaryOperator::NotEq => "<>",
            BinaryOperator::Lt => "<",
            BinaryOperator::LtEq => "<=",
            BinaryOperator::Gt => ">",
            BinaryOperator::GtEq => ">=",
            BinaryOperator::And => "AND",
            BinaryOperator::Or => "OR",
            BinaryOperator::Like => "LIKE",
            BinaryOperator::NotLike => "NOT LIKE",
        })?;
        Ok(())
    }
}

impl DialectDisplay for AggregateFunction {
    fn fmt(&self, f: &mut (dyn fmt::Write), _dialect: &Dialect) -> Result<(), Error> {
        f.write_str(match self {
            AggregateFunction::Sum => "SUM",
            AggregateFunction::Avg => "AVG",
            AggregateFunction::Min => "MIN",
            AggregateFunction::Max => "MAX",
            AggregateFunction::Count => "COUNT",
        })?;
        Ok(())
    }
}

impl Expr {
    pub(crate) fn precedence(&self) -> u8 {
        match self {
            Expr::BinaryOp { op, .. } => op.precedence(),
            Expr::UnaryOp {
                op: UnaryOperator::Not,
                ..
            } => PREC_NOT,
            Expr::UnaryOp {
                op: UnaryOperator::Minus,
                ..
            } => PREC_NEG,
            Expr::InList { .. }
            | Expr::InSubquery { .. }
            | Expr::Between { .. }
            | Expr::IsNull { .. } => PREC_CMP,
            _ => PREC_ATOM,
        }
    }

    /// Pre-order walk over this expression and all sub-expressions. Does not
    /// descend into subqueries; those carry their own scope.
    pub(crate) fn visit(&self, f: &mut impl FnMut(&Expr)) {
        f(self);
        match self {
            Expr::UnaryOp { expr, .. } | Expr::IsNull { expr, .. } => expr.visit(f),
            Expr::BinaryOp { left, right, .. } => {
                left.visit(f);
                right.visit(f);
            }
            Expr::Function { args, .. } => {
                for arg in args {
                    arg.visit(f);
                }
            }
            Expr::Aggregate { expr, .. } => {
                if let Some(expr) = expr {
                    expr.visit(f);
                }
            }
            Expr::Case {
                branches,
                else_result,
            } => {
                for (when, then) in branches {
                    when.visit(f);
                    then.visit(f);
                }
                if let Some(els) = else_result {
                    els.visit(f);
                }
            }
            Expr::InList { expr, list, .. } => {
                expr.visit(f);
                for item in list {
                    item.visit(f);
                }
            }
            Expr::InSubquery { expr, .. } => expr.visit(f),
            Expr::Between {
                expr, low, high, ..
            } => {
                expr.visit(f);
                low.visit(f);
                high.visit(f);
            }
            Expr::Value(_) | Expr::Column { .. } => {}
        }
    }

    /// Every `(table, column)` pair referenced outside of subqueries.
    pub(crate) fn column_refs(&self, out: &mut Vec<(String, String)>) {
        self.visit(&mut |e| {
            if let Expr::Column { table, column } = e {
                out.push((table.value.clone(), column.value.clone()));
            }
        });
    }

}

/// Writes `expr`, parenthesized if it binds less tightly than `min_prec`.
fn write_operand(
    expr: &Expr,
    f: &mut (dyn fmt::Write),
    dialect: &Dialect,
    min_prec: u8,
) -> Result<(), Error> {
    if expr.precedence() < min_prec {
        write!(f, "({})", expr.sql(dialect)?)?;
    } else {
        write!(f, "{}", expr.sql(dialect)?)?;
    }
    Ok(())
}

impl DialectDisplay for Expr {
    fn fmt(&self, f: &mut (dyn fmt::Write), dialect: &Dialect) -> Result<(), Error> {
        match self {
            Expr::Value(value) => write!(f, "{}", value.sql(dialect)?)?,
            Expr::Column { table, column } => {
                write!(f, "{}.{}", table.sql(dialect)?, column.sql(dialect)?)?
            }
            Expr::UnaryOp { op, expr } => match op {
                UnaryOperator::Not => {
                    write!(f, "NOT ")?;
                    write_operand(expr, f, dialect, PREC_CMP)?;
                }
                UnaryOperator::Minus => {
                    write!(f, "-")?;
                    write_operand(expr, f, dialect, PREC_NEG + 1)?;
                }
            },
            Expr::BinaryOp { left, op, right } => {
                let prec = op.precedence();
                write_operand(left, f, dialect, prec)?;
                write!(f, " {} ", op.sql(dialect)?)?;
                let right_min = if op.is_associative() { prec } else { prec + 1 };
                write_operand(right, f, dialect, right_min)?;
            }
            Expr::Function { name, args } => {
                let mut rendered = Vec::with_capacity(args.len());
                for arg in args {
                    rendered.push(arg.sql(dialect)?);
                }
                write!(f, "{}", dialect.render_function(name, &rendered)?)?;
            }
            Expr::Aggregate {
                func,
                expr,
                distinct,
            } => {
                write!(f, "{}(", func.sql(dialect)?)?;
                if *distinct {
                    write!(f, "DISTINCT ")?;
                }
                match expr {
                    Some(expr) => write!(f, "{}", expr.sql(dialect)?)?,
                    None => write!(f, "*")?,
                }
                write!(f, ")")?;
            }
            Expr::Case {
                branches,
                else_result,
            } => {
                write!(f, "CASE")?;
                for (when, then) in branches {
                    write!(f, " WHEN {} THEN {}", when.sql(dialect)?, then.sql(dialect)?)?;
                }
                if let Some(els) = else_result {
                    write!(f, " ELSE {}", els.sql(dialect)?)?;
                }
                write!(f, " END")?;
            }
            Expr::InList {
                expr,
                list,
                negated,
            } => {
                write_operand(expr, f, dialect, PREC_CMP + 1)?;
                write!(
                    f,
                    " {}IN ({})",
                    if *negated { "NOT " } else { "" },
                    display_comma_separated(list).sql(dialect)?
                )?;
            }
            Expr::InSubquery {
                expr,
                subquery,
                negated,
            } => {
                write_operand(expr, f, dialect, PREC_CMP + 1)?;
                write!(
                    f,
                    " {}IN ({})",
                    if *negated { "NOT " } else { "" },
                    subquery.sql(dialect)?
                )?;
            }
            Expr::Between {
                expr,
                low,
                high,
                negated,
            } => {
                write_operand(expr, f, dialect, PREC_CMP + 1)?;
                write!(f, " {}BETWEEN ", if *negated { "NOT " } else { "" })?;
                write_operand(low, f, dialect, PREC_ADD)?;
                write!(f, " AND ")?;
                write_operand(high, f, dialect, PREC_ADD)?;
            }
            Expr::IsNull { expr, negated } => {
                write_operand(expr, f, dialect, PREC_CMP + 1)?;
                write!(f, " IS {}NULL", if *negated { "NOT " } else { "" })?;
            }
        }
        Ok(())
    }
}

pub(crate) struct DisplayCommaSeparated<'a, T>(&'a [T]);

impl<'a, T: DialectDisplay> DialectDisplay for DisplayCommaSeparated<'a, T> {
    fn fmt(&self, f: &mut (dyn fmt::Write), dialect: &Dialect) -> Result<(), Error> {
        let mut delim = "";
        for item in self.0 {
            write!(f, "{}", delim)?;
            delim = ", ";
            write!(f, "{}", item.sql(dialect)?)?;
        }
        Ok(())
    }
}

pub(crate) fn display_comma_separated<T: DialectDisplay>(slice: &[T]) -> DisplayCommaSeparated<'_, T> {
    DisplayCommaSeparated(slice)
}
