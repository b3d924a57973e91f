//! Query building: the lookup table, keyword translation, and SQL rendering.

mod condition;
mod lookup;
mod statement;

pub use condition::{parse_conditions, render_where, Condition};
pub use lookup::Lookup;
pub use statement::{build_insert, Query, Statement};

/// Quotes an SQL identifier.
#[must_use]
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
