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

//! Column sets and tables.
//!
//! A [`ColumnSet`] is an ordered, heterogeneous list of columns built by
//! right-append; binding it to a relation name produces a [`Table`] whose
//! [`bindings`](Table::bindings) mirror the set's shape as a nested tuple of
//! typed column handles.
//!
//! ```
//! use tyql::{ColumnSet, Table};
//!
//! let users: Table<_> = ColumnSet::new()
//!     .column::<i32>("usr_id")
//!     .column::<String>("first_name")
//!     .table("users")
//!     .unwrap();
//! let (_usr_id, (first_name, ())) = users.bindings();
//! assert_eq!(first_name.name(), "first_name");
//! ```

use std::collections::HashSet;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::types::{RowAppend, SqlType, TypeTag};

/// A named, typed column definition; its position in the owning set is its
/// stable identity.
#[derive(Debug, Clone)]
pub struct ColumnDef {
    pub name: String,
    pub tag: TypeTag,
}

/// An ordered heterogeneous list of columns not yet bound to a table name.
pub struct ColumnSet<S = ()> {
    defs: Vec<ColumnDef>,
    _shape: PhantomData<S>,
}

impl ColumnSet<()> {
    pub fn new() -> Self {
        ColumnSet {
            defs: Vec::new(),
            _shape: PhantomData,
        }
    }
}

impl Default for ColumnSet<()> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> ColumnSet<S> {
    /// Appends a column of Rust type `U` on the right.
    pub fn column<U: SqlType>(mut self, name: &str) -> ColumnSet<<S as RowAppend<U>>::Out>
    where
        S: RowAppend<U>,
    {
        self.defs.push(ColumnDef {
            name: name.to_owned(),
            tag: U::tag(),
        });
        ColumnSet {
            defs: self.defs,
            _shape: PhantomData,
        }
    }

    /// Binds the set to a relation name, fixing every column's ordinal.
    ///
    /// Fails with [`Error::DuplicateColumn`] if two columns share a name and
    /// with [`Error::EmptyColumnSet`] on an empty set.
    pub fn table(self, name: &str) -> Result<Table<S>> {
        if self.defs.is_empty() {
            return Err(Error::EmptyColumnSet);
        }
        let mut seen = HashSet::new();
        for def in &self.defs {
            if !seen.insert(def.name.as_str()) {
                return Err(Error::DuplicateColumn(def.name.clone()));
            }
        }
        Ok(Table {
            name: Arc::from(name),
            alias: None,
            defs: self.defs.into(),
            _shape: PhantomData,
        })
    }
}

/// A named relation with a fixed column set.
pub struct Table<S> {
    pub(crate) name: Arc<str>,
    pub(crate) alias: Option<Arc<str>>,
    pub(crate) defs: Arc<[ColumnDef]>,
    _shape: PhantomData<S>,
}

impl<S> Clone for Table<S> {
    fn clone(&self) -> Self {
        Table {
            name: self.name.clone(),
            alias: self.alias.clone(),
            defs: self.defs.clone(),
            _shape: PhantomData,
        }
    }
}

impl<S> fmt::Debug for Table<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("name", &self.name)
            .field("alias", &self.alias)
            .field("defs", &self.defs)
            .finish()
    }
}

impl<S> Table<S> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The name column references are qualified with: the alias when one is
    /// set, the table name otherwise.
    pub fn qualifier(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    /// A copy of this table under an alias, for self-joins. Its bindings
    /// qualify columns with the alias.
    pub fn alias(&self, alias: &str) -> Table<S> {
        Table {
            name: self.name.clone(),
            alias: Some(Arc::from(alias)),
            defs: self.defs.clone(),
            _shape: PhantomData,
        }
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.defs
    }

    /// Typed column handles, shaped exactly like the declared column set.
    pub fn bindings(&self) -> S::Bindings
    where
        S: ColumnShape,
    {
        let qualifier: Arc<str> = Arc::from(self.qualifier());
        S::bind(&qualifier, &self.defs, 0)
    }
}

/// A typed handle to one column of one table instance.
pub struct Col<T> {
    pub(crate) table: Arc<str>,
    pub(crate) name: Arc<str>,
    pub(crate) ordinal: usize,
    _marker: PhantomData<T>,
}

impl<T> Clone for Col<T> {
    fn clone(&self) -> Self {
        Col {
            table: self.table.clone(),
            name: self.name.clone(),
            ordinal: self.ordinal,
            _marker: PhantomData,
        }
    }
}

impl<T> Col<T> {
    pub(crate) fn new(table: Arc<str>, name: Arc<str>, ordinal: usize) -> Self {
        Col {
            table,
            name,
            ordinal,
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Position within the declared column set; the column's stable identity.
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }
}

/// Type-level recursion producing a table's bindings from its shape.
pub trait ColumnShape {
    type Bindings;
    fn bind(table: &Arc<str>, defs: &[ColumnDef], at: usize) -> Self::Bindings;
}

impl ColumnShape for () {
    type Bindings = ();
    fn bind(_table: &Arc<str>, _defs: &[ColumnDef], _at: usize) -> Self::Bindings {}
}

impl<H: SqlType, T: ColumnShape> ColumnShape for (H, T) {
    type Bindings = (Col<H>, T::Bindings);

    fn bind(table: &Arc<str>, defs: &[ColumnDef], at: usize) -> Self::Bindings {
        let def = &defs[at];
        (
            Col::new(table.clone(), Arc::from(def.name.as_str()), at),
            T::bind(table, defs, at + 1),
        )
    }
}
