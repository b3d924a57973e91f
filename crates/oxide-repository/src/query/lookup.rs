//! The lookup table: keyword suffixes and the predicates they render.

use std::fmt;

use crate::error::{RepositoryError, Result};
use crate::value::SqlValue;

/// A comparison selected by the `__suffix` of a search key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lookup {
    /// `col = v`, or `col IS NULL` for a null value.
    Exact,
    /// Case-insensitive equality.
    ///
    /// SQLite's `lower()` folds ASCII letters only, so non-ASCII text
    /// compares case-sensitively.
    IExact,
    /// Case-sensitive substring match.
    Contains,
    /// Case-insensitive substring match.
    ///
    /// As with `IExact`, only ASCII letters are folded; the same holds for
    /// `IStartsWith` and `IEndsWith`.
    IContains,
    /// Membership in a list; a scalar is a one-item list.
    In,
    /// `col > v`
    Gt,
    /// `col >= v`
    Gte,
    /// `col < v`
    Lt,
    /// `col <= v`
    Lte,
    /// Case-sensitive prefix match.
    StartsWith,
    /// Case-insensitive prefix match.
    IStartsWith,
    /// Case-sensitive suffix match.
    EndsWith,
    /// Case-insensitive suffix match.
    IEndsWith,
}

impl Lookup {
    /// Every lookup, in table order.
    pub const ALL: [Self; 13] = [
        Self::Exact,
        Self::IExact,
        Self::Contains,
        Self::IContains,
        Self::In,
        Self::Gt,
        Self::Gte,
        Self::Lt,
        Self::Lte,
        Self::StartsWith,
        Self::IStartsWith,
        Self::EndsWith,
        Self::IEndsWith,
    ];

    /// Returns the keyword suffix for this lookup.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::IExact => "iexact",
            Self::Contains => "contains",
            Self::IContains => "icontains",
            Self::In => "in",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::StartsWith => "startswith",
            Self::IStartsWith => "istartswith",
            Self::EndsWith => "endswith",
            Self::IEndsWith => "iendswith",
        }
    }

    /// Looks up a suffix in the table.
    #[must_use]
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|l| l.as_str() == suffix)
    }

    /// Renders `column <lookup> value` and pushes its parameters.
    ///
    /// `column` is an already quoted column reference.
    pub fn render(
        self,
        column: &str,
        value: SqlValue,
        params: &mut Vec<SqlValue>,
    ) -> Result<String> {
        let sql = match self {
            Self::Exact if value.is_null() => format!("{column} IS NULL"),
            Self::Exact => {
                params.push(value);
                format!("{column} = ?")
            }
            Self::IExact => {
                params.push(value);
                format!("lower({column}) = lower(?)")
            }
            Self::Contains => {
                params.push(value);
                format!("instr({column}, ?) > 0")
            }
            Self::StartsWith => {
                params.push(value.clone());
                params.push(value);
                format!("substr({column}, 1, length(?)) = ?")
            }
            Self::EndsWith => {
                params.push(value.clone());
                params.push(value);
                format!("substr({column}, length({column}) - length(?) + 1) = ?")
            }
            Self::IContains | Self::IStartsWith | Self::IEndsWith => {
                let escaped = escape_like(self.text_operand(&value)?);
                let pattern = match self {
                    Self::IContains => format!("%{escaped}%"),
                    Self::IStartsWith => format!("{escaped}%"),
                    _ => format!("%{escaped}"),
                };
                params.push(SqlValue::Text(pattern));
                format!("lower({column}) LIKE lower(?) ESCAPE '\\'")
            }
            Self::In => {
                let values = value.into_list();
                if values.is_empty() {
                    return Ok("0 = 1".to_string());
                }
                let placeholders = vec!["?"; values.len()].join(", ");
                params.extend(values);
                format!("{column} IN ({placeholders})")
            }
            Self::Gt | Self::Gte | Self::Lt | Self::Lte => {
                params.push(value);
                format!("{column} {} ?", self.comparison_operator())
            }
        };
        Ok(sql)
    }

    const fn comparison_operator(self) -> &'static str {
        match self {
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            _ => "<=",
        }
    }

    fn text_operand(self, value: &SqlValue) -> Result<&str> {
        value.as_text().ok_or_else(|| {
            RepositoryError::InvalidValue(format!(
                "`{}` lookup needs a text value, got {value}",
                self.as_str()
            ))
        })
    }
}

impl fmt::Display for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Escapes LIKE wildcards so the value matches literally.
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
