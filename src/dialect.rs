use core::fmt::Debug;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fmt::Write as _;
use std::sync::Arc;

use crate::error::Error;

/// Customization bundle for one target SQL engine: identifier quoting,
/// literal formatting, pagination syntax, and the scalar function registry.
///
/// The renderer only ever talks to these hooks; it never branches on which
/// engine a `Dialect` describes.
#[derive(Clone, Debug)]
pub struct Dialect {
    /// Identifier quote character. Valid quote characters are the double
    /// quote, backtick, and opening square bracket.
    pub quote_style: char,
    pub quote_functions: bool,
    /// Scalar functions this engine accepts as-is.
    pub functions: HashSet<String>,
    /// Per-function rewrites for engines that spell a function differently.
    pub function_transforms: HashMap<String, Arc<dyn FunctionTransform>>,
    /// Arity table consulted when dynamically-registered functions are used.
    pub function_arity: HashMap<String, usize>,
    /// Literal renderers for dialect-specific scalar types.
    pub custom_literals: HashMap<&'static str, Arc<dyn CustomLiteral>>,
    pub limit_style: LimitStyle,
    pub bytes_style: BytesStyle,
    pub boolean_style: BooleanStyle,
}

/// How pagination renders.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LimitStyle {
    /// `LIMIT n OFFSET m`
    LimitOffset,
    /// `OFFSET m ROWS FETCH FIRST n ROWS ONLY`
    FetchFirst,
}

/// How byte strings render.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BytesStyle {
    /// `X'DEADBEEF'`
    HexString,
    /// `'\xDEADBEEF'` (postgres bytea)
    PostgresEscape,
}

/// How boolean literals render.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BooleanStyle {
    /// `TRUE` / `FALSE`
    Keyword,
    /// `1` / `0`
    Numeric,
}

/// Rewrites one function application into engine-specific SQL text.
pub trait FunctionTransform: Debug + Send + Sync {
    fn transform(&self, name: &str, args: &[String]) -> String;
}

/// Renders literals of a dialect-specific scalar type from their canonical
/// textual form.
pub trait CustomLiteral: Debug + Send + Sync {
    fn render(&self, raw: &str) -> String;
}

/// Keywords that force identifier quoting in any dialect.
const RESERVED_KEYWORDS: &[&str] = &[
    "ALL", "AND", "AS", "ASC", "BETWEEN", "BY", "CASE", "CROSS", "DELETE", "DESC", "DISTINCT",
    "ELSE", "END", "EXCEPT", "EXISTS", "FALSE", "FETCH", "FIRST", "FROM", "FULL", "GROUP",
    "HAVING", "IN", "INNER", "INSERT", "INTERSECT", "INTO", "IS", "JOIN", "LEFT", "LIKE", "LIMIT",
    "NOT", "NULL", "NULLS", "OFFSET", "ON", "OR", "ORDER", "OUTER", "RIGHT", "ROW", "ROWS",
    "SELECT", "SET", "TABLE", "THEN", "TRUE", "UNION", "UPDATE", "USER", "VALUES", "WHEN",
    "WHERE", "WITH",
];

fn baseline_functions() -> HashSet<String> {
    [
        "abs",
        "ceil",
        "floor",
        "round",
        "ln",
        "log",
        "sin",
        "cos",
        "sqrt",
        "lower",
        "upper",
        "trim",
        "length",
        "substring",
        "concat",
        "coalesce",
    ]
    .iter()
    .map(|name| name.to_string())
    .collect()
}

fn baseline_arity() -> HashMap<String, usize> {
    [
        ("abs", 1),
        ("ceil", 1),
        ("floor", 1),
        ("round", 1),
        ("ln", 1),
        ("log", 1),
        ("sin", 1),
        ("cos", 1),
        ("sqrt", 1),
        ("lower", 1),
        ("upper", 1),
        ("trim", 1),
        ("length", 1),
        ("substring", 3),
        ("concat", 2),
        ("coalesce", 2),
    ]
    .iter()
    .map(|(name, arity)| (name.to_string(), *arity))
    .collect()
}

impl Dialect {
    /// ANSI-flavored dialect using `OFFSET … FETCH FIRST …` pagination.
    pub fn ansi() -> Self {
        Self {
            limit_style: LimitStyle::FetchFirst,
            ..Self::default()
        }
    }

    pub fn postgres() -> Self {
        let mut functions = baseline_functions();
        for name in [
            "ascii",
            "btrim",
            "char_length",
            "chr",
            "initcap",
            "left",
            "lpad",
            "ltrim",
            "md5",
            "repeat",
            "replace",
            "reverse",
            "right",
            "rpad",
            "rtrim",
            "split_part",
            "strpos",
            "to_hex",
            "translate",
        ] {
            functions.insert(name.to_string());
        }
        Self {
            functions,
            bytes_style: BytesStyle::PostgresEscape,
            ..Self::default()
        }
    }

    pub fn sqlite() -> Self {
        let mut function_transforms: HashMap<String, Arc<dyn FunctionTransform>> =
            Default::default();
        function_transforms.insert("floor".to_string(), Arc::new(SqliteFloorTransform));
        function_transforms.insert("ceil".to_string(), Arc::new(SqliteCeilTransform));

        let mut functions = baseline_functions();
        for name in ["instr", "hex", "quote", "replace", "substr", "typeof"] {
            functions.insert(name.to_string());
        }
        Self {
            quote_functions: true,
            functions,
            function_transforms,
            ..Self::default()
        }
    }

    /// Whether `ident` must be quoted: reserved keywords and anything that
    /// is not a plain `[A-Za-z_][A-Za-z0-9_]*` word (Unicode included).
    pub fn needs_quote(&self, ident: &str) -> bool {
        let mut chars = ident.chars();
        let plain = match chars.next() {
            Some(first) => {
                (first.is_ascii_alphabetic() || first == '_')
                    && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
            }
            None => false,
        };
        !plain
            || RESERVED_KEYWORDS
                .iter()
                .any(|kw| kw.eq_ignore_ascii_case(ident))
    }

    /// Quotes and escapes unconditionally (doubling embedded quote chars).
    pub fn quoted(&self, ident: &str) -> String {
        let mut out = String::with_capacity(ident.len() + 2);
        out.push(self.quote_style);
        for c in ident.chars() {
            if c == self.quote_style {
                out.push(c);
            }
            out.push(c);
        }
        out.push(self.quote_style);
        out
    }

    pub fn boolean_literal(&self, value: bool) -> &'static str {
        match (self.boolean_style, value) {
            (BooleanStyle::Keyword, true) => "TRUE",
            (BooleanStyle::Keyword, false) => "FALSE",
            (BooleanStyle::Numeric, true) => "1",
            (BooleanStyle::Numeric, false) => "0",
        }
    }

    pub fn bytes_literal(&self, bytes: &[u8]) -> String {
        let mut hex = String::with_capacity(bytes.len() * 2);
        for b in bytes {
            // Writing to a String cannot fail.
            let _ = write!(hex, "{:02X}", b);
        }
        match self.bytes_style {
            BytesStyle::HexString => format!("X'{}'", hex),
            BytesStyle::PostgresEscape => format!("'\\x{}'", hex),
        }
    }

    /// Pagination clause for the given limit and offset, at least one of
    /// which is present.
    pub fn limit_clause(&self, limit: Option<u64>, offset: Option<u64>) -> String {
        let mut parts = Vec::with_capacity(2);
        match self.limit_style {
            LimitStyle::LimitOffset => {
                if let Some(limit) = limit {
                    parts.push(format!("LIMIT {}", limit));
                }
                if let Some(offset) = offset {
                    parts.push(format!("OFFSET {}", offset));
                }
            }
            LimitStyle::FetchFirst => {
                if let Some(offset) = offset {
                    parts.push(format!("OFFSET {} ROWS", offset));
                }
                if let Some(limit) = limit {
                    parts.push(format!("FETCH FIRST {} ROWS ONLY", limit));
                }
            }
        }
        parts.join(" ")
    }

    /// Renders one scalar function application from already-rendered
    /// arguments, applying any registered rewrite.
    pub fn render_function(&self, name: &str, args: &[String]) -> Result<String, Error> {
        if let Some(transform) = self.function_transforms.get(name) {
            return Ok(transform.transform(name, args));
        }
        if !self.functions.contains(name) {
            return Err(Error::UnsupportedForDialect {
                feature: format!("function `{}`", name),
            });
        }
        let rendered_name = if self.quote_functions {
            self.quoted(name)
        } else {
            name.to_string()
        };
        Ok(format!("{}({})", rendered_name, args.join(", ")))
    }

    pub fn custom_literal(&self, tag: &str, raw: &str) -> Option<String> {
        self.custom_literals
            .get(tag)
            .map(|handler| handler.render(raw))
    }

    /// Registered arity for a function name, if any.
    pub fn arity_of(&self, name: &str) -> Option<usize> {
        self.function_arity.get(name).copied()
    }
}

#[derive(Clone, Debug)]
struct SqliteFloorTransform;
impl FunctionTransform for SqliteFloorTransform {
    fn transform(&self, _name: &str, args: &[String]) -> String {
        format!("round({} - 0.5)", &args[0])
    }
}

#[derive(Clone, Debug)]
struct SqliteCeilTransform;
impl FunctionTransform for SqliteCeilTransform {
    fn transform(&self, _name: &str, args: &[String]) -> String {
        format!("round({} + 0.5)", &args[0])
    }
}

impl Default for Dialect {
    fn default() -> Self {
        Self {
            quote_style: '"',
            quote_functions: false,
            functions: baseline_functions(),
            function_transforms: Default::default(),
            function_arity: baseline_arity(),
            custom_literals: Default::default(),
            limit_style: LimitStyle::LimitOffset,
            bytes_style: BytesStyle::HexString,
            boolean_style: BooleanStyle::Keyword,
        }
    }
}

/// Renders a syntax node as SQL text for a given dialect.
pub trait DialectDisplay {
    fn fmt(&self, f: &mut (dyn fmt::Write), dialect: &Dialect) -> Result<(), Error>;

    fn sql(&self, dialect: &Dialect) -> Result<String, Error>
    where
        Self: Sized,
    {
        let mut repr = String::new();
        DialectDisplay::fmt(self, &mut repr, dialect)?;
        Ok(repr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_and_unicode_force_quoting() {
        let dialect = Dialect::default();
        assert!(!dialect.needs_quote("users"));
        assert!(dialect.needs_quote("order"));
        assert!(dialect.needs_quote("first name"));
        assert!(dialect.needs_quote("prénom"));
        assert_eq!(dialect.quoted("na\"me"), "\"na\"\"me\"");
    }

    #[test]
    fn limit_styles() {
        let pg = Dialect::postgres();
        assert_eq!(pg.limit_clause(Some(2), Some(4)), "LIMIT 2 OFFSET 4");
        let ansi = Dialect::ansi();
        assert_eq!(
            ansi.limit_clause(Some(2), Some(4)),
            "OFFSET 4 ROWS FETCH FIRST 2 ROWS ONLY"
        );
    }

    #[test]
    fn sqlite_rewrites_floor() {
        let dialect = Dialect::sqlite();
        let rendered = dialect
            .render_function("floor", &["x".to_string()])
            .unwrap();
        assert_eq!(rendered, "round(x - 0.5)");
    }

    #[test]
    fn unknown_function_is_rejected() {
        let dialect = Dialect::default();
        assert!(matches!(
            dialect.render_function("date_trunc", &[]),
            Err(Error::UnsupportedForDialect { .. })
        ));
    }
}
