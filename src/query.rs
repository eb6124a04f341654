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

//! Statement trees and their staged builders.
//!
//! `select(…).from(…)` opens a read builder whose refinements each appear at
//! most once; `having` is only reachable after `group_by`. Terminal
//! `build()` calls run the construction checks (column membership, group-by
//! legality, outer-join nullability) and yield immutable statement values
//! that render with [`sql`](Read::sql) and execute through the traits in
//! [`crate::exec`].

use std::fmt;
use std::marker::PhantomData;

use log::debug;

use crate::ast::{self, Ident};
use crate::dialect::{Dialect, DialectDisplay};
use crate::error::{Error, Result};
use crate::expr::{IntoExpr, IntoLiteral};
use crate::schema::{Col, Table};
use crate::select::{
    IntoGroupKeys, IntoOrderKeys, IntoSelection, IntoSource, Selection, Source, TableMeta,
};
use crate::types::{SqlType, TypeTag};

/// An immutable read statement whose rows decode to `R`.
pub struct Read<R> {
    pub(crate) query: ast::Query,
    pub(crate) tags: Vec<TypeTag>,
    _row: PhantomData<R>,
}

impl<R> Clone for Read<R> {
    fn clone(&self) -> Self {
        Read {
            query: self.query.clone(),
            tags: self.tags.clone(),
            _row: PhantomData,
        }
    }
}

impl<R> fmt::Debug for Read<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Read")
            .field("query", &self.query)
            .field("tags", &self.tags)
            .finish()
    }
}

impl<R> Read<R> {
    pub(crate) fn from_parts(query: ast::Query, tags: Vec<TypeTag>) -> Self {
        Read {
            query,
            tags,
            _row: PhantomData,
        }
    }

    pub(crate) fn query(&self) -> &ast::Query {
        &self.query
    }

    /// Type tags of the selected columns, in order.
    pub fn column_tags(&self) -> &[TypeTag] {
        &self.tags
    }

    /// Renders this read for a dialect. Rendering is deterministic; the
    /// only failure mode is a dialect missing a handler for something the
    /// tree uses, which is reported before any text is produced.
    pub fn sql(&self, dialect: &Dialect) -> Result<String> {
        let mut err = None;
        self.query
            .for_each_expr(&mut |e| check_expr(e, dialect, &mut err));
        if let Some(err) = err {
            return Err(err);
        }
        let text = self.query.sql(dialect)?;
        debug!("rendered read: {}", text);
        Ok(text)
    }

    /// `self UNION other`, set semantics.
    pub fn union(self, other: Read<R>) -> Read<R> {
        set_op(self, other, false)
    }

    /// `self UNION ALL other`, bag semantics.
    pub fn union_all(self, other: Read<R>) -> Read<R> {
        set_op(self, other, true)
    }
}

fn set_op<R>(left: Read<R>, right: Read<R>, all: bool) -> Read<R> {
    fn operand(query: ast::Query) -> ast::SetExpr {
        if query.order_by.is_empty() && query.limit.is_none() && query.offset.is_none() {
            *query.body
        } else {
            ast::SetExpr::Query(Box::new(query))
        }
    }
    let tags = left.tags.clone();
    Read::from_parts(
        ast::Query {
            body: Box::new(ast::SetExpr::SetOperation {
                op: ast::SetOperator::Union,
                all,
                left: Box::new(operand(left.query)),
                right: Box::new(operand(right.query)),
            }),
            order_by: Vec::new(),
            limit: None,
            offset: None,
        },
        tags,
    )
}

/// A literal row for `VALUES` sources, written as a right-nested tuple of
/// scalars: `(5, ("Fred", ()))`.
pub trait LiteralRow {
    type Shape;
    fn push_exprs(self, out: &mut Vec<ast::Expr>);
    fn push_tags(out: &mut Vec<TypeTag>);
}

impl LiteralRow for () {
    type Shape = ();
    fn push_exprs(self, _out: &mut Vec<ast::Expr>) {}
    fn push_tags(_out: &mut Vec<TypeTag>) {}
}

impl<H: IntoLiteral, T: LiteralRow> LiteralRow for (H, T) {
    type Shape = (H::Ty, T::Shape);

    fn push_exprs(self, out: &mut Vec<ast::Expr>) {
        let (head, tail) = self;
        out.push(ast::Expr::Value(head.into_value()));
        tail.push_exprs(out);
    }

    fn push_tags(out: &mut Vec<TypeTag>) {
        out.push(H::Ty::tag());
        T::push_tags(out);
    }
}

/// A read whose rows are literals: `VALUES (…), (…)`.
pub fn values<Rw: LiteralRow>(rows: impl IntoIterator<Item = Rw>) -> Result<Read<Rw::Shape>> {
    let rows: Vec<Vec<ast::Expr>> = rows
        .into_iter()
        .map(|row| {
            let mut out = Vec::new();
            row.push_exprs(&mut out);
            out
        })
        .collect();
    if rows.is_empty() {
        return Err(Error::EmptyValues);
    }
    let mut tags = Vec::new();
    Rw::push_tags(&mut tags);
    Ok(Read::from_parts(
        ast::Query {
            body: Box::new(ast::SetExpr::Values(ast::Values(rows))),
            order_by: Vec::new(),
            limit: None,
            offset: None,
        },
        tags,
    ))
}

/// Opens a select over the given projection.
pub fn select<S: IntoSelection>(items: S) -> SelectBuilder<S::Row> {
    SelectBuilder {
        selection: items.into_selection(),
        distinct: false,
    }
}

/// A projection waiting for its `FROM`.
pub struct SelectBuilder<R> {
    selection: Selection<R>,
    distinct: bool,
}

impl<R> SelectBuilder<R> {
    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    pub fn from(self, source: impl IntoSource) -> ReadBuilder<R> {
        ReadBuilder {
            selection: self.selection,
            distinct: self.distinct,
            source: source.into_source(),
            where_: None,
            order_by: Vec::new(),
            limit: None,
            offset: None,
            dup: None,
        }
    }
}

/// A read under construction; each refinement may appear at most once.
pub struct ReadBuilder<R> {
    selection: Selection<R>,
    distinct: bool,
    source: Source,
    where_: Option<ast::Expr>,
    order_by: Vec<ast::OrderByExpr>,
    limit: Option<u64>,
    offset: Option<u64>,
    dup: Option<&'static str>,
}

impl<R> ReadBuilder<R> {
    pub fn where_(mut self, predicate: impl IntoExpr<bool>) -> Self {
        if self.where_.is_some() {
            self.dup.get_or_insert("WHERE");
        }
        self.where_ = Some(predicate.into_expr().node);
        self
    }

    /// Moves to the grouped stage, where `having` becomes available.
    pub fn group_by(self, keys: impl IntoGroupKeys) -> GroupedReadBuilder<R> {
        GroupedReadBuilder {
            inner: self,
            keys: keys.into_group_keys(),
            having: None,
        }
    }

    pub fn order_by(mut self, keys: impl IntoOrderKeys) -> Self {
        if !self.order_by.is_empty() {
            self.dup.get_or_insert("ORDER BY");
        }
        self.order_by = keys
            .into_order_keys()
            .into_iter()
            .map(|key| ast::OrderByExpr {
                expr: key.expr,
                asc: key.asc,
                nulls_first: key.nulls_first,
            })
            .collect();
        self
    }

    pub fn limit(mut self, n: u64) -> Self {
        if self.limit.is_some() {
            self.dup.get_or_insert("LIMIT");
        }
        self.limit = Some(n);
        self
    }

    pub fn offset(mut self, n: u64) -> Self {
        if self.offset.is_some() {
            self.dup.get_or_insert("OFFSET");
        }
        self.offset = Some(n);
        self
    }

    /// Runs the construction checks and fixes the tree.
    pub fn build(self) -> Result<Read<R>> {
        self.finish(Vec::new(), None)
    }

    fn finish(self, group_by: Vec<ast::Expr>, having: Option<ast::Expr>) -> Result<Read<R>> {
        if let Some(clause) = self.dup {
            return Err(Error::DuplicateClause { clause });
        }

        // Every column reference must resolve within the table source.
        let mut refs = Vec::new();
        for item in &self.selection.items {
            item.expr().column_refs(&mut refs);
        }
        if let Some(ref predicate) = self.where_ {
            predicate.column_refs(&mut refs);
        }
        for key in &group_by {
            key.column_refs(&mut refs);
        }
        if let Some(ref predicate) = having {
            predicate.column_refs(&mut refs);
        }
        for key in &self.order_by {
            key.expr.column_refs(&mut refs);
        }
        self.source.root.for_each_on_predicate(&mut |on| {
            on.column_refs(&mut refs);
        });
        for (table, column) in &refs {
            resolve(&self.source.tables, table, column)?;
        }

        // Under GROUP BY, every selection item is either aggregated or a
        // function of the keys alone.
        if !group_by.is_empty() {
            let mut key_refs = Vec::new();
            for key in &group_by {
                key.column_refs(&mut key_refs);
            }
            for (position, item) in self.selection.items.iter().enumerate() {
                if self.selection.aggregated[position] {
                    continue;
                }
                let mut item_refs = Vec::new();
                item.expr().column_refs(&mut item_refs);
                if item_refs.iter().any(|r| !key_refs.contains(r)) {
                    return Err(Error::GroupByViolation { position });
                }
            }
        }

        // Columns read off the weak side of an outer join must be selected
        // through `.nullable()`.
        for (position, item) in self.selection.items.iter().enumerate() {
            if let ast::Expr::Column { table, .. } = item.expr() {
                let weak = self
                    .source
                    .tables
                    .iter()
                    .any(|meta| meta.qualifier == table.value && meta.weak);
                if weak && !self.selection.tags[position].is_nullable() {
                    let actual = self.selection.tags[position].clone();
                    return Err(Error::TypeMismatch {
                        expected: actual.clone().nullable(),
                        actual,
                    });
                }
            }
        }

        let select = ast::Select {
            distinct: self.distinct,
            projection: self.selection.items,
            from: Some(self.source.root),
            selection: self.where_,
            group_by,
            having,
        };
        Ok(Read::from_parts(
            ast::Query {
                body: Box::new(ast::SetExpr::Select(Box::new(select))),
                order_by: self.order_by,
                limit: self.limit,
                offset: self.offset,
            },
            self.selection.tags,
        ))
    }
}

/// A read under construction that has a `GROUP BY`.
pub struct GroupedReadBuilder<R> {
    inner: ReadBuilder<R>,
    keys: Vec<ast::Expr>,
    having: Option<ast::Expr>,
}

impl<R> GroupedReadBuilder<R> {
    pub fn having(mut self, predicate: impl IntoExpr<bool>) -> Self {
        if self.having.is_some() {
            self.inner.dup.get_or_insert("HAVING");
        }
        self.having = Some(predicate.into_expr().node);
        self
    }

    pub fn order_by(mut self, keys: impl IntoOrderKeys) -> Self {
        self.inner = self.inner.order_by(keys);
        self
    }

    pub fn limit(mut self, n: u64) -> Self {
        self.inner = self.inner.limit(n);
        self
    }

    pub fn offset(mut self, n: u64) -> Self {
        self.inner = self.inner.offset(n);
        self
    }

    pub fn build(self) -> Result<Read<R>> {
        self.inner.finish(self.keys, self.having)
    }
}

fn resolve(tables: &[TableMeta], table: &str, column: &str) -> Result<()> {
    match tables.iter().find(|meta| meta.qualifier == table) {
        Some(meta) if meta.columns.iter().any(|c| c == column) => Ok(()),
        _ => Err(Error::UnknownTableColumn {
            table: table.to_string(),
            column: column.to_string(),
        }),
    }
}

/// An immutable update statement.
#[derive(Debug)]
pub struct Update {
    stmt: ast::Update,
}

impl Update {
    pub fn sql(&self, dialect: &Dialect) -> Result<String> {
        let mut err = None;
        self.stmt
            .for_each_expr(&mut |e| check_expr(e, dialect, &mut err));
        if let Some(err) = err {
            return Err(err);
        }
        let text = self.stmt.sql(dialect)?;
        debug!("rendered update: {}", text);
        Ok(text)
    }
}

/// Opens an update of the given table.
pub fn update<S>(table: &Table<S>) -> UpdateBuilder {
    UpdateBuilder {
        table: table.qualifier().to_string(),
        columns: table.columns().iter().map(|d| d.name.clone()).collect(),
        assignments: Vec::new(),
        where_: None,
    }
}

/// An update under construction.
pub struct UpdateBuilder {
    table: String,
    columns: Vec<String>,
    assignments: Vec<(usize, String, ast::Assignment)>,
    where_: Option<ast::Expr>,
}

impl UpdateBuilder {
    /// Assigns `value` to `column`; the types must agree. A non-nullable
    /// value feeds a nullable column through [`Expr::nullable`].
    ///
    /// [`Expr::nullable`]: crate::expr::Expr::nullable
    pub fn set<T: SqlType>(mut self, column: &Col<T>, value: impl IntoExpr<T>) -> Self {
        self.assignments.push((
            column.ordinal(),
            column.table().to_string(),
            ast::Assignment {
                column: Ident::new(column.name()),
                value: value.into_expr().node,
            },
        ));
        self
    }

    pub fn where_(mut self, predicate: impl IntoExpr<bool>) -> Self {
        self.where_ = Some(predicate.into_expr().node);
        self
    }

    pub fn build(self) -> Result<Update> {
        let mut seen = Vec::new();
        let mut assignments = Vec::with_capacity(self.assignments.len());
        let mut refs = Vec::new();
        for (ordinal, table, assignment) in self.assignments {
            if table != self.table {
                return Err(Error::UnknownTableColumn {
                    table,
                    column: assignment.column.value,
                });
            }
            if seen.contains(&ordinal) {
                return Err(Error::DuplicateColumn(assignment.column.value));
            }
            seen.push(ordinal);
            assignment.value.column_refs(&mut refs);
            assignments.push(assignment);
        }
        if let Some(ref predicate) = self.where_ {
            predicate.column_refs(&mut refs);
        }
        for (table, column) in &refs {
            if *table != self.table || !self.columns.iter().any(|c| c == column) {
                return Err(Error::UnknownTableColumn {
                    table: table.clone(),
                    column: column.clone(),
                });
            }
        }
        Ok(Update {
            stmt: ast::Update {
                table: Ident::new(self.table.as_str()),
                assignments,
                selection: self.where_,
            },
        })
    }
}

/// An immutable delete statement.
pub struct Delete {
    stmt: ast::Delete,
}

impl Delete {
    pub fn sql(&self, dialect: &Dialect) -> Result<String> {
        let mut err = None;
        self.stmt
            .for_each_expr(&mut |e| check_expr(e, dialect, &mut err));
        if let Some(err) = err {
            return Err(err);
        }
        let text = self.stmt.sql(dialect)?;
        debug!("rendered delete: {}", text);
        Ok(text)
    }
}

/// Opens a delete from the given table.
pub fn delete_from<S>(table: &Table<S>) -> DeleteBuilder {
    DeleteBuilder {
        table: table.qualifier().to_string(),
        columns: table.columns().iter().map(|d| d.name.clone()).collect(),
        where_: None,
    }
}

/// A delete under construction.
pub struct DeleteBuilder {
    table: String,
    columns: Vec<String>,
    where_: Option<ast::Expr>,
}

impl DeleteBuilder {
    pub fn where_(mut self, predicate: impl IntoExpr<bool>) -> Self {
        self.where_ = Some(predicate.into_expr().node);
        self
    }

    pub fn build(self) -> Result<Delete> {
        if let Some(ref predicate) = self.where_ {
            let mut refs = Vec::new();
            predicate.column_refs(&mut refs);
            for (table, column) in &refs {
                if *table != self.table || !self.columns.iter().any(|c| c == column) {
                    return Err(Error::UnknownTableColumn {
                        table: table.clone(),
                        column: column.clone(),
                    });
                }
            }
        }
        Ok(Delete {
            stmt: ast::Delete {
                table: Ident::new(self.table.as_str()),
                selection: self.where_,
            },
        })
    }
}

/// An immutable insert statement.
pub struct Insert {
    stmt: ast::Insert,
}

impl Insert {
    pub fn sql(&self, dialect: &Dialect) -> Result<String> {
        let mut err = None;
        self.stmt
            .for_each_expr(&mut |e| check_expr(e, dialect, &mut err));
        if let Some(err) = err {
            return Err(err);
        }
        let text = self.stmt.sql(dialect)?;
        debug!("rendered insert: {}", text);
        Ok(text)
    }
}

/// An ordered list of target columns for an insert; a single handle or a
/// flat tuple of handles.
pub trait ColumnList {
    type Shape;
    fn collect(self, out: &mut Vec<(String, String, usize)>);
}

impl<T: SqlType> ColumnList for &Col<T> {
    type Shape = (T, ());
    fn collect(self, out: &mut Vec<(String, String, usize)>) {
        out.push((
            self.table().to_string(),
            self.name().to_string(),
            self.ordinal(),
        ));
    }
}

macro_rules! col_shape {
    () => { () };
    ($head:ident $(, $tail:ident)*) => { ($head, col_shape!($($tail),*)) };
}

macro_rules! impl_column_list {
    ($($name:ident),+) => {
        impl<'a, $($name: SqlType),+> ColumnList for ($(&'a Col<$name>,)+) {
            type Shape = col_shape!($($name),+);

            #[allow(non_snake_case)]
            fn collect(self, out: &mut Vec<(String, String, usize)>) {
                let ($($name,)+) = self;
                $(
                    out.push((
                        $name.table().to_string(),
                        $name.name().to_string(),
                        $name.ordinal(),
                    ));
                )+
            }
        }
    };
}

impl_column_list!(A);
impl_column_list!(A, B);
impl_column_list!(A, B, C);
impl_column_list!(A, B, C, D);
impl_column_list!(A, B, C, D, E);
impl_column_list!(A, B, C, D, E, F);
impl_column_list!(A, B, C, D, E, F, G);
impl_column_list!(A, B, C, D, E, F, G, H);

/// Opens an insert into the given table and columns. Row sources must match
/// the column list's shape.
pub fn insert_into<S, C: ColumnList>(table: &Table<S>, columns: C) -> InsertBuilder<C::Shape> {
    let mut cols = Vec::new();
    columns.collect(&mut cols);
    InsertBuilder {
        table: table.qualifier().to_string(),
        columns: cols,
        _shape: PhantomData,
    }
}

/// An insert waiting for its row source.
pub struct InsertBuilder<Shape> {
    table: String,
    columns: Vec<(String, String, usize)>,
    _shape: PhantomData<Shape>,
}

impl<Shape> InsertBuilder<Shape> {
    fn check_columns(&self) -> Result<Vec<Ident>> {
        let mut seen = Vec::new();
        let mut idents = Vec::with_capacity(self.columns.len());
        for (table, name, ordinal) in &self.columns {
            if *table != self.table {
                return Err(Error::UnknownTableColumn {
                    table: table.clone(),
                    column: name.clone(),
                });
            }
            if seen.contains(ordinal) {
                return Err(Error::DuplicateColumn(name.clone()));
            }
            seen.push(*ordinal);
            idents.push(Ident::new(name.as_str()));
        }
        Ok(idents)
    }

    /// `INSERT INTO … VALUES (…), (…)`.
    pub fn values<Rw>(self, rows: impl IntoIterator<Item = Rw>) -> Result<Insert>
    where
        Rw: LiteralRow<Shape = Shape>,
    {
        let columns = self.check_columns()?;
        let rows: Vec<Vec<ast::Expr>> = rows
            .into_iter()
            .map(|row| {
                let mut out = Vec::new();
                row.push_exprs(&mut out);
                out
            })
            .collect();
        if rows.is_empty() {
            return Err(Error::EmptyValues);
        }
        Ok(Insert {
            stmt: ast::Insert {
                table: Ident::new(self.table.as_str()),
                columns,
                source: ast::InsertSource::Values(ast::Values(rows)),
            },
        })
    }

    /// `INSERT INTO … <select>`; the read's row shape matches the columns.
    pub fn select(self, read: Read<Shape>) -> Result<Insert> {
        let columns = self.check_columns()?;
        Ok(Insert {
            stmt: ast::Insert {
                table: Ident::new(self.table.as_str()),
                columns,
                source: ast::InsertSource::Query(Box::new(read.query)),
            },
        })
    }
}

/// Flags anything in the expression a dialect has no handler for, before
/// any SQL text is produced.
fn check_expr(expr: &ast::Expr, dialect: &Dialect, err: &mut Option<Error>) {
    expr.visit(&mut |node| {
        if err.is_some() {
            return;
        }
        match node {
            ast::Expr::Function { name, args } => {
                if let Some(expected) = dialect.arity_of(name) {
                    if expected != args.len() {
                        *err = Some(Error::ArityMismatch {
                            function: name.clone(),
                            expected,
                            actual: args.len(),
                        });
                        return;
                    }
                }
                if !dialect.functions.contains(name)
                    && !dialect.function_transforms.contains_key(name)
                {
                    *err = Some(Error::UnsupportedForDialect {
                        feature: format!("function `{}`", name),
                    });
                }
            }
            ast::Expr::Value(ast::Value::Custom { tag, .. }) => {
                if !dialect.custom_literals.contains_key(tag.as_str()) {
                    *err = Some(Error::UnsupportedForDialect {
                        feature: format!("literal of custom type `{}`", tag),
                    });
                }
            }
            ast::Expr::InSubquery { subquery, .. } => {
                subquery.for_each_expr(&mut |e| check_expr(e, dialect, err));
            }
            _ => {}
        }
    });
}
