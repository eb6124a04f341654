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

//! Selections and table sources.
//!
//! A selection is an ordered heterogeneous list of expressions; its row
//! shape is the right-nested pair list of the expression types, so a
//! selection of `(Expr<i32>, Expr<String>)` decodes rows of type
//! `(i32, (String, ()))`. Flat tuples up to 16 items convert into
//! selections; empty selections cannot be written.
//!
//! A table source is a base [`Table`] or a join tree; joins are themselves
//! sources and compose into left-deep or bushy trees. The `on` predicate is
//! mandatory: a join builder without it is not yet a source.

use std::marker::PhantomData;

use crate::ast::{self, Ident, JoinKind};
use crate::expr::{Aliased, Expr, IntoExpr, OrderKey};
use crate::schema::{Col, Table};
use crate::types::{SqlType, TypeTag};

/// An ordered, typed projection with row shape `R`.
pub struct Selection<R> {
    pub(crate) items: Vec<ast::SelectItem>,
    pub(crate) tags: Vec<TypeTag>,
    pub(crate) aggregated: Vec<bool>,
    pub(crate) _row: PhantomData<R>,
}

/// One selectable item: a bare expression, an aliased expression, or a
/// column handle.
pub trait IntoSelectItem {
    type Ty;
    fn into_select_item(self) -> (ast::SelectItem, TypeTag, bool);
}

impl<T> IntoSelectItem for Expr<T> {
    type Ty = T;
    fn into_select_item(self) -> (ast::SelectItem, TypeTag, bool) {
        (
            ast::SelectItem::UnnamedExpr(self.node),
            self.tag,
            self.aggregated,
        )
    }
}

impl<T> IntoSelectItem for Aliased<T> {
    type Ty = T;
    fn into_select_item(self) -> (ast::SelectItem, TypeTag, bool) {
        (
            ast::SelectItem::ExprWithAlias {
                expr: self.expr.node,
                alias: self.alias,
            },
            self.expr.tag,
            self.expr.aggregated,
        )
    }
}

impl<T: SqlType> IntoSelectItem for &Col<T> {
    type Ty = T;
    fn into_select_item(self) -> (ast::SelectItem, TypeTag, bool) {
        self.expr().into_select_item()
    }
}

impl<T: SqlType> IntoSelectItem for Col<T> {
    type Ty = T;
    fn into_select_item(self) -> (ast::SelectItem, TypeTag, bool) {
        self.expr().into_select_item()
    }
}

/// Conversion into a [`Selection`]; implemented for single items and flat
/// tuples of up to 16 items.
pub trait IntoSelection {
    type Row;
    fn into_selection(self) -> Selection<Self::Row>;
}

fn selection_of<R>(parts: Vec<(ast::SelectItem, TypeTag, bool)>) -> Selection<R> {
    let mut items = Vec::with_capacity(parts.len());
    let mut tags = Vec::with_capacity(parts.len());
    let mut aggregated = Vec::with_capacity(parts.len());
    for (item, tag, agg) in parts {
        items.push(item);
        tags.push(tag);
        aggregated.push(agg);
    }
    Selection {
        items,
        tags,
        aggregated,
        _row: PhantomData,
    }
}

impl<T> IntoSelection for Expr<T> {
    type Row = (T, ());
    fn into_selection(self) -> Selection<Self::Row> {
        selection_of(vec![self.into_select_item()])
    }
}

impl<T> IntoSelection for Aliased<T> {
    type Row = (T, ());
    fn into_selection(self) -> Selection<Self::Row> {
        selection_of(vec![self.into_select_item()])
    }
}

impl<T: SqlType> IntoSelection for &Col<T> {
    type Row = (T, ());
    fn into_selection(self) -> Selection<Self::Row> {
        selection_of(vec![self.into_select_item()])
    }
}

impl<T: SqlType> IntoSelection for Col<T> {
    type Row = (T, ());
    fn into_selection(self) -> Selection<Self::Row> {
        selection_of(vec![self.into_select_item()])
    }
}

macro_rules! row_shape {
    () => { () };
    ($head:ident $(, $tail:ident)*) => { ($head::Ty, row_shape!($($tail),*)) };
}

macro_rules! impl_into_selection {
    ($($name:ident),+) => {
        impl<$($name: IntoSelectItem),+> IntoSelection for ($($name,)+) {
            type Row = row_shape!($($name),+);

            #[allow(non_snake_case)]
            fn into_selection(self) -> Selection<Self::Row> {
                let ($($name,)+) = self;
                selection_of(vec![$($name.into_select_item()),+])
            }
        }
    };
}

impl_into_selection!(A);
impl_into_selection!(A, B);
impl_into_selection!(A, B, C);
impl_into_selection!(A, B, C, D);
impl_into_selection!(A, B, C, D, E);
impl_into_selection!(A, B, C, D, E, F);
impl_into_selection!(A, B, C, D, E, F, G);
impl_into_selection!(A, B, C, D, E, F, G, H);
impl_into_selection!(A, B, C, D, E, F, G, H, I);
impl_into_selection!(A, B, C, D, E, F, G, H, I, J);
impl_into_selection!(A, B, C, D, E, F, G, H, I, J, K);
impl_into_selection!(A, B, C, D, E, F, G, H, I, J, K, L);
impl_into_selection!(A, B, C, D, E, F, G, H, I, J, K, L, M);
impl_into_selection!(A, B, C, D, E, F, G, H, I, J, K, L, M, N);
impl_into_selection!(A, B, C, D, E, F, G, H, I, J, K, L, M, N, O);
impl_into_selection!(A, B, C, D, E, F, G, H, I, J, K, L, M, N, O, P);

/// Scope metadata for one relation occurrence inside a source tree.
#[derive(Debug, Clone)]
pub(crate) struct TableMeta {
    pub qualifier: String,
    pub columns: Vec<String>,
    /// Whether this occurrence sits on the weak side of an outer join, i.e.
    /// its columns may come back NULL regardless of their declared type.
    pub weak: bool,
}

/// A table source: a base table or a join tree with predicates.
pub struct Source {
    pub(crate) root: ast::TableRef,
    pub(crate) tables: Vec<TableMeta>,
}

/// Conversion into a table source.
pub trait IntoSource {
    fn into_source(self) -> Source;
}

impl IntoSource for Source {
    fn into_source(self) -> Source {
        self
    }
}

impl<S> IntoSource for &Table<S> {
    fn into_source(self) -> Source {
        Source {
            root: ast::TableRef::Table {
                name: Ident::new(&*self.name),
                alias: self.alias.as_deref().map(Ident::new),
            },
            tables: vec![TableMeta {
                qualifier: self.qualifier().to_string(),
                columns: self.defs.iter().map(|d| d.name.clone()).collect(),
                weak: false,
            }],
        }
    }
}

impl<S> IntoSource for Table<S> {
    fn into_source(self) -> Source {
        (&self).into_source()
    }
}

impl<S> Table<S> {
    pub fn join(&self, right: impl IntoSource) -> JoinBuilder {
        JoinBuilder::new(JoinKind::Inner, self.into_source(), right.into_source())
    }

    pub fn left_outer(&self, right: impl IntoSource) -> JoinBuilder {
        JoinBuilder::new(JoinKind::LeftOuter, self.into_source(), right.into_source())
    }

    pub fn right_outer(&self, right: impl IntoSource) -> JoinBuilder {
        JoinBuilder::new(JoinKind::RightOuter, self.into_source(), right.into_source())
    }

    pub fn full_outer(&self, right: impl IntoSource) -> JoinBuilder {
        JoinBuilder::new(JoinKind::FullOuter, self.into_source(), right.into_source())
    }
}

impl Source {
    pub fn join(self, right: impl IntoSource) -> JoinBuilder {
        JoinBuilder::new(JoinKind::Inner, self, right.into_source())
    }

    pub fn left_outer(self, right: impl IntoSource) -> JoinBuilder {
        JoinBuilder::new(JoinKind::LeftOuter, self, right.into_source())
    }

    pub fn right_outer(self, right: impl IntoSource) -> JoinBuilder {
        JoinBuilder::new(JoinKind::RightOuter, self, right.into_source())
    }

    pub fn full_outer(self, right: impl IntoSource) -> JoinBuilder {
        JoinBuilder::new(JoinKind::FullOuter, self, right.into_source())
    }
}

/// A join waiting for its `ON` predicate.
pub struct JoinBuilder {
    kind: JoinKind,
    left: Source,
    right: Source,
}

impl JoinBuilder {
    fn new(kind: JoinKind, left: Source, right: Source) -> Self {
        JoinBuilder { kind, left, right }
    }

    /// Completes the join with its predicate, producing a composable source.
    pub fn on(self, predicate: impl IntoExpr<bool>) -> Source {
        let JoinBuilder {
            kind,
            left,
            mut right,
        } = self;
        let (weak_left, weak_right) = kind.weak_sides();

        let mut tables = left.tables;
        if weak_left {
            for meta in &mut tables {
                meta.weak = true;
            }
        }
        if weak_right {
            for meta in &mut right.tables {
                meta.weak = true;
            }
        }

        // Self-joins: a repeated qualifier on the right gets an auto alias
        // (`T`, `T_2`, ...) so the rendered FROM stays unambiguous.
        let mut right_root = right.root;
        for meta in &mut right.tables {
            if tables.iter().any(|t| t.qualifier == meta.qualifier) {
                let mut n = 2;
                let mut candidate = format!("{}_{}", meta.qualifier, n);
                while tables.iter().any(|t| t.qualifier == candidate) {
                    n += 1;
                    candidate = format!("{}_{}", meta.qualifier, n);
                }
                if let ast::TableRef::Table { ref mut alias, .. } = right_root {
                    *alias = Some(Ident::new(candidate.as_str()));
                }
                meta.qualifier = candidate;
            }
        }
        tables.extend(right.tables);

        Source {
            root: ast::TableRef::Join {
                kind,
                left: Box::new(left.root),
                right: Box::new(right_root),
                on: predicate.into_expr().node,
            },
            tables,
        }
    }
}

/// One `GROUP BY` key.
pub trait IntoGroupKey {
    fn into_group_key(self) -> ast::Expr;
}

impl<T> IntoGroupKey for Expr<T> {
    fn into_group_key(self) -> ast::Expr {
        self.node
    }
}

impl<T: SqlType> IntoGroupKey for &Col<T> {
    fn into_group_key(self) -> ast::Expr {
        self.expr().node
    }
}

impl<T: SqlType> IntoGroupKey for Col<T> {
    fn into_group_key(self) -> ast::Expr {
        self.expr().node
    }
}

/// One or more `GROUP BY` keys.
pub trait IntoGroupKeys {
    fn into_group_keys(self) -> Vec<ast::Expr>;
}

impl<T> IntoGroupKeys for Expr<T> {
    fn into_group_keys(self) -> Vec<ast::Expr> {
        vec![self.into_group_key()]
    }
}

impl<T: SqlType> IntoGroupKeys for &Col<T> {
    fn into_group_keys(self) -> Vec<ast::Expr> {
        vec![self.into_group_key()]
    }
}

impl<T: SqlType> IntoGroupKeys for Col<T> {
    fn into_group_keys(self) -> Vec<ast::Expr> {
        vec![self.into_group_key()]
    }
}

macro_rules! impl_into_group_keys {
    ($($name:ident),+) => {
        impl<$($name: IntoGroupKey),+> IntoGroupKeys for ($($name,)+) {
            #[allow(non_snake_case)]
            fn into_group_keys(self) -> Vec<ast::Expr> {
                let ($($name,)+) = self;
                vec![$($name.into_group_key()),+]
            }
        }
    };
}

impl_into_group_keys!(A);
impl_into_group_keys!(A, B);
impl_into_group_keys!(A, B, C);
impl_into_group_keys!(A, B, C, D);
impl_into_group_keys!(A, B, C, D, E);
impl_into_group_keys!(A, B, C, D, E, F);
impl_into_group_keys!(A, B, C, D, E, F, G);
impl_into_group_keys!(A, B, C, D, E, F, G, H);

/// One or more `ORDER BY` keys.
pub trait IntoOrderKeys {
    fn into_order_keys(self) -> Vec<OrderKey>;
}

impl IntoOrderKeys for OrderKey {
    fn into_order_keys(self) -> Vec<OrderKey> {
        vec![self]
    }
}

impl IntoOrderKeys for (OrderKey, OrderKey) {
    fn into_order_keys(self) -> Vec<OrderKey> {
        vec![self.0, self.1]
    }
}

impl IntoOrderKeys for (OrderKey, OrderKey, OrderKey) {
    fn into_order_keys(self) -> Vec<OrderKey> {
        vec![self.0, self.1, self.2]
    }
}

impl IntoOrderKeys for (OrderKey, OrderKey, OrderKey, OrderKey) {
    fn into_order_keys(self) -> Vec<OrderKey> {
        vec![self.0, self.1, self.2, self.3]
    }
}

impl IntoOrderKeys for (OrderKey, OrderKey, OrderKey, OrderKey, OrderKey) {
    fn into_order_keys(self) -> Vec<OrderKey> {
        vec![self.0, self.1, self.2, self.3, self.4]
    }
}

impl IntoOrderKeys for (OrderKey, OrderKey, OrderKey, OrderKey, OrderKey, OrderKey) {
    fn into_order_keys(self) -> Vec<OrderKey> {
        vec![self.0, self.1, self.2, self.3, self.4, self.5]
    }
}
