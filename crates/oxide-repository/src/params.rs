//! Keyword parameters and query options accepted by the repository.

use std::fmt;

use crate::error::{RepositoryError, Result};
use crate::model::Relation;
use crate::value::{SqlValue, ToSqlValue};

/// Default page size for `where_`.
pub const DEFAULT_LIMIT: i64 = 100;

/// Ordered `key => value` search parameters.
///
/// Keys are `field`, `field__lookup`, or `relation__field__lookup`.
/// Insertion order is kept so generated SQL is stable.
///
/// # Example
///
/// ```ignore
/// let params = SearchParams::new()
///     .with("age__gte", 18)
///     .with("name__icontains", "smith")
///     .with("posts__title__startswith", "Rust");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchParams {
    entries: Vec<(String, SqlValue)>,
}

/// Column assignments for `create`, `update` and `update_all`.
///
/// Keys are plain column names.
pub type Values = SearchParams;

impl SearchParams {
    /// Creates an empty parameter set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Adds a parameter.
    #[must_use]
    pub fn with<V: ToSqlValue>(mut self, key: impl Into<String>, value: V) -> Self {
        self.insert(key, value);
        self
    }

    /// Adds a parameter in place.
    pub fn insert<V: ToSqlValue>(&mut self, key: impl Into<String>, value: V) {
        self.entries.push((key.into(), value.to_sql_value()));
    }

    /// Appends every entry of `other`, after the existing ones.
    pub fn extend(&mut self, other: &Self) {
        self.entries.extend(other.entries.iter().cloned());
    }

    /// Iterates over the entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the value of the first entry with this key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&SqlValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Builds parameters from a JSON object, as received by a web handler.
    ///
    /// JSON arrays become lists, usable with the `in` lookup.
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        let serde_json::Value::Object(map) = value else {
            return Err(RepositoryError::InvalidValue(
                "search parameters must be a JSON object".to_string(),
            ));
        };
        map.into_iter()
            .map(|(key, value)| Ok((key, SqlValue::try_from(value)?)))
            .collect::<Result<Vec<_>>>()
            .map(|entries| Self { entries })
    }
}

impl<K: Into<String>, V: ToSqlValue> FromIterator<(K, V)> for SearchParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.to_sql_value()))
                .collect(),
        }
    }
}

impl fmt::Display for SearchParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (key, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{key}: {value}")?;
        }
        write!(f, "}}")
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Ascending order (ASC)
    #[default]
    Asc,
    /// Descending order (DESC)
    Desc,
}

impl SortOrder {
    /// Parses a sort order keyword.
    ///
    /// `asc` in any case is ascending; every other value is descending.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("asc") {
            Self::Asc
        } else {
            Self::Desc
        }
    }

    /// Returns the SQL keyword.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl From<&str> for SortOrder {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

/// A chain of relation names, e.g. `posts.comments`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LoadPath {
    segments: Vec<String>,
}

impl LoadPath {
    /// Parses a dotted (`posts.comments`) or underscore-joined
    /// (`posts__comments`) path.
    #[must_use]
    pub fn parse(path: &str) -> Self {
        Self {
            segments: path
                .split('.')
                .flat_map(|part| part.split("__"))
                .map(str::to_string)
                .collect(),
        }
    }

    /// Returns the relation names, outermost first.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Returns whether `self` equals `other` or lies below it.
    #[must_use]
    pub fn starts_with(&self, other: &Self) -> bool {
        self.segments.starts_with(&other.segments)
    }
}

impl From<&str> for LoadPath {
    fn from(path: &str) -> Self {
        Self::parse(path)
    }
}

impl From<String> for LoadPath {
    fn from(path: String) -> Self {
        Self::parse(&path)
    }
}

impl From<&Relation> for LoadPath {
    fn from(relation: &Relation) -> Self {
        Self {
            segments: vec![relation.name.to_string()],
        }
    }
}

impl From<Relation> for LoadPath {
    fn from(relation: Relation) -> Self {
        Self::from(&relation)
    }
}

impl fmt::Display for LoadPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

/// Pagination, sorting, loading and scoping options for finders.
///
/// # Example
///
/// ```ignore
/// let options = QueryOptions::new()
///     .limit(20)
///     .offset(40)
///     .sorted_by("created_at")
///     .sorted_order("desc")
///     .joinedload("posts.comments")
///     .disable_default_scope(true);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOptions {
    /// LIMIT clause; single-row finders always use 1.
    pub limit: i64,
    /// OFFSET clause; single-row finders always use 0.
    pub offset: i64,
    /// Column to sort by.
    pub sorted_by: Option<String>,
    /// Sort direction.
    pub sorted_order: SortOrder,
    /// Relation paths to load eagerly.
    pub joined: Vec<LoadPath>,
    /// Relation paths to leave unloaded.
    pub lazy: Vec<LoadPath>,
    /// Skip the repository's default scope.
    pub disable_default_scope: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: 0,
            sorted_by: None,
            sorted_order: SortOrder::Asc,
            joined: Vec::new(),
            lazy: Vec::new(),
            disable_default_scope: false,
        }
    }
}

impl QueryOptions {
    /// Creates the default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the page size.
    #[must_use]
    pub const fn limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    /// Sets the page offset.
    #[must_use]
    pub const fn offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }

    /// Sorts by the given column.
    #[must_use]
    pub fn sorted_by(mut self, column: impl Into<String>) -> Self {
        self.sorted_by = Some(column.into());
        self
    }

    /// Sets the sort direction (`"asc"`, `"desc"`, or a `SortOrder`).
    #[must_use]
    pub fn sorted_order(mut self, order: impl Into<SortOrder>) -> Self {
        self.sorted_order = order.into();
        self
    }

    /// Loads the relation path eagerly.
    #[must_use]
    pub fn joinedload(mut self, path: impl Into<LoadPath>) -> Self {
        self.joined.push(path.into());
        self
    }

    /// Leaves the relation path unloaded, overriding a joined default.
    #[must_use]
    pub fn lazyload(mut self, path: impl Into<LoadPath>) -> Self {
        self.lazy.push(path.into());
        self
    }

    /// Enables or disables the default scope.
    #[must_use]
    pub const fn disable_default_scope(mut self, disabled: bool) -> Self {
        self.disable_default_scope = disabled;
        self
    }

    /// Returns a copy restricted to a single row, as used by single-row finders.
    #[must_use]
    pub(crate) fn single_row(&self) -> Self {
        Self {
            limit: 1,
            offset: 0,
            ..self.clone()
        }
    }
}
