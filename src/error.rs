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

use thiserror::Error;

use crate::types::TypeTag;

/// All error conditions surfaced by the crate.
///
/// Construction errors are programmer errors detected while a statement tree
/// is being built (or pre-validated against a dialect); they never reach
/// execution. Execution errors come from the driver seam. Decoding errors are
/// row-scoped and terminate the row stream they occur in.
#[derive(Debug, Error)]
pub enum Error {
    // -- construction ------------------------------------------------------
    #[error("duplicate column `{0}`")]
    DuplicateColumn(String),

    #[error("column `{table}.{column}` is not part of the statement's table source")]
    UnknownTableColumn { table: String, column: String },

    #[error("selection item {position} is neither aggregated nor a function of the GROUP BY keys")]
    GroupByViolation { position: usize },

    #[error("type mismatch: expected {expected}, found {actual}")]
    TypeMismatch { expected: TypeTag, actual: TypeTag },

    #[error("`{function}` expects {expected} argument(s), got {actual}")]
    ArityMismatch {
        function: String,
        expected: usize,
        actual: usize,
    },

    #[error("nested nullable types are not representable")]
    NullableNesting,

    #[error("{feature} is not supported by this dialect")]
    UnsupportedForDialect { feature: String },

    #[error("a table must declare at least one column")]
    EmptyColumnSet,

    #[error("a literal row source must contain at least one row")]
    EmptyValues,

    #[error("`{clause}` may appear at most once per statement")]
    DuplicateClause { clause: &'static str },

    // -- execution ---------------------------------------------------------
    #[error("failed to acquire a connection: {0}")]
    ConnectionFailed(String),

    #[error("statement failed: {0}")]
    StatementFailed(String),

    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    // -- decoding ----------------------------------------------------------
    #[error("unexpected NULL in column {0}")]
    UnexpectedNull(usize),

    #[error("column {ordinal} cannot be read as {expected} (driver reports {actual})")]
    UnexpectedType {
        expected: TypeTag,
        actual: String,
        ordinal: usize,
    },

    #[error("column {0} is out of range for this result set")]
    MissingColumn(usize),

    #[error("cursor is closed")]
    Closed,

    #[error(transparent)]
    Format(#[from] std::fmt::Error),
}

impl Error {
    /// Whether this error belongs to the construction class (§ build time).
    pub fn is_construction(&self) -> bool {
        matches!(
            self,
            Error::DuplicateColumn(_)
                | Error::UnknownTableColumn { .. }
                | Error::GroupByViolation { .. }
                | Error::TypeMismatch { .. }
                | Error::ArityMismatch { .. }
                | Error::NullableNesting
                | Error::UnsupportedForDialect { .. }
                | Error::EmptyColumnSet
                | Error::EmptyValues
                | Error::DuplicateClause { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
