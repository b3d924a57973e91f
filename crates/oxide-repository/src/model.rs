//! Model trait and relation metadata.
//!
//! A model is a plain struct that sqlx can decode from a row. The static
//! metadata on the `Model` trait tells the repository which table to query,
//! which names are valid columns, and how relations join.

use sqlx::sqlite::SqliteRow;
use sqlx::FromRow;

use crate::error::{RepositoryError, Result};
use crate::loader::RelatedRow;
use crate::value::SqlValue;

/// A database model usable with a [`Repository`](crate::Repository).
///
/// # Example
///
/// ```ignore
/// use oxide_repository::{Model, Relation};
///
/// #[derive(sqlx::FromRow)]
/// struct User {
///     id: i64,
///     name: String,
///     #[sqlx(skip)]
///     posts: Vec<Post>,
/// }
///
/// impl Model for User {
///     const NAME: &'static str = "User";
///     const TABLE: &'static str = "users";
///     const COLUMNS: &'static [&'static str] = &["id", "name"];
///     const RELATIONS: &'static [Relation] = &[Relation::has_many("posts", Post::meta, "user_id")];
///
///     fn attach(&mut self, relation: &str, rows: &[RelatedRow]) -> oxide_repository::Result<()> {
///         match relation {
///             "posts" => self.posts = RelatedRow::decode_all(rows)?,
///             _ => return Err(Self::unknown_relation(relation)),
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait Model: for<'r> FromRow<'r, SqliteRow> + Send + Sync + Unpin + Sized + 'static {
    /// Human-readable model name used in error messages.
    const NAME: &'static str;

    /// The SQL table name.
    const TABLE: &'static str;

    /// All column names, in the order they are selected.
    const COLUMNS: &'static [&'static str];

    /// The primary key column name.
    const PRIMARY_KEY: &'static str = "id";

    /// Relations to other models.
    const RELATIONS: &'static [Relation] = &[];

    /// Values for columns that the caller did not set on insert.
    fn column_defaults() -> Vec<(&'static str, SqlValue)> {
        Vec::new()
    }

    /// Stores eagerly loaded rows for `relation` on this instance.
    ///
    /// Called once per loaded relation. Models without relations keep the
    /// default, which rejects every name.
    fn attach(&mut self, relation: &str, rows: &[RelatedRow]) -> Result<()> {
        let _ = rows;
        Err(Self::unknown_relation(relation))
    }

    /// Returns the static metadata of this model.
    fn meta() -> ModelMeta {
        ModelMeta {
            name: Self::NAME,
            table: Self::TABLE,
            columns: Self::COLUMNS,
            primary_key: Self::PRIMARY_KEY,
            relations: Self::RELATIONS,
        }
    }

    /// Builds the error for a relation name this model does not know.
    fn unknown_relation(relation: &str) -> RepositoryError {
        RepositoryError::UnknownRelation {
            model: Self::NAME,
            relation: relation.to_string(),
        }
    }
}

/// Type-erased model metadata.
///
/// Relations refer to their target through a `fn() -> ModelMeta`, so models
/// may point at each other without the metadata becoming recursive.
#[derive(Debug, Clone, Copy)]
pub struct ModelMeta {
    /// Human-readable model name.
    pub name: &'static str,
    /// SQL table name.
    pub table: &'static str,
    /// Column names.
    pub columns: &'static [&'static str],
    /// Primary key column.
    pub primary_key: &'static str,
    /// Relations to other models.
    pub relations: &'static [Relation],
}

impl ModelMeta {
    /// Returns the column with this name, or an unknown-field error.
    pub fn column(&self, name: &str) -> Result<&'static str> {
        self.columns
            .iter()
            .copied()
            .find(|c| *c == name)
            .ok_or_else(|| RepositoryError::UnknownField {
                model: self.name,
                field: name.to_string(),
            })
    }

    /// Returns the relation with this name, or an unknown-relation error.
    pub fn relation(&self, name: &str) -> Result<&'static Relation> {
        self.relations
            .iter()
            .find(|r| r.name == name)
            .ok_or_else(|| RepositoryError::UnknownRelation {
                model: self.name,
                relation: name.to_string(),
            })
    }
}

/// Cardinality of a relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// The target rows hold a foreign key to this model.
    HasMany,
    /// Like `HasMany`, with at most one target row.
    HasOne,
    /// This model holds a foreign key to the target.
    BelongsTo,
}

impl RelationKind {
    /// Returns whether at most one target row is attached per source row.
    #[must_use]
    pub const fn is_to_one(self) -> bool {
        matches!(self, Self::HasOne | Self::BelongsTo)
    }
}

/// How a relation is loaded when no directive says otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadStrategy {
    /// Not loaded unless requested.
    #[default]
    Lazy,
    /// Loaded together with the parent rows.
    Joined,
}

/// A relation from one model to another.
///
/// The join condition is `target.remote_key = source.local_key`.
#[derive(Debug, Clone, Copy)]
pub struct Relation {
    /// Relation name, used in search keys and load paths.
    pub name: &'static str,
    /// Relation cardinality.
    pub kind: RelationKind,
    /// Metadata of the target model.
    pub target: fn() -> ModelMeta,
    /// Join column on the source model.
    pub local_key: &'static str,
    /// Join column on the target model.
    pub remote_key: &'static str,
    /// Default loader strategy.
    pub strategy: LoadStrategy,
}

impl Relation {
    /// A one-to-many relation; `foreign_key` lives on the target.
    #[must_use]
    pub const fn has_many(
        name: &'static str,
        target: fn() -> ModelMeta,
        foreign_key: &'static str,
    ) -> Self {
        Self {
            name,
            kind: RelationKind::HasMany,
            target,
            local_key: "id",
            remote_key: foreign_key,
            strategy: LoadStrategy::Lazy,
        }
    }

    /// A one-to-one relation; `foreign_key` lives on the target.
    #[must_use]
    pub const fn has_one(
        name: &'static str,
        target: fn() -> ModelMeta,
        foreign_key: &'static str,
    ) -> Self {
        Self {
            kind: RelationKind::HasOne,
            ..Self::has_many(name, target, foreign_key)
        }
    }

    /// A many-to-one relation; `foreign_key` lives on this model.
    #[must_use]
    pub const fn belongs_to(
        name: &'static str,
        target: fn() -> ModelMeta,
        foreign_key: &'static str,
    ) -> Self {
        Self {
            name,
            kind: RelationKind::BelongsTo,
            target,
            local_key: foreign_key,
            remote_key: "id",
            strategy: LoadStrategy::Lazy,
        }
    }

    /// Overrides the join column on the source model.
    #[must_use]
    pub const fn local_key(mut self, column: &'static str) -> Self {
        self.local_key = column;
        self
    }

    /// Overrides the join column on the target model.
    #[must_use]
    pub const fn remote_key(mut self, column: &'static str) -> Self {
        self.remote_key = column;
        self
    }

    /// Marks the relation as loaded by default.
    #[must_use]
    pub const fn joined(mut self) -> Self {
        self.strategy = LoadStrategy::Joined;
        self
    }

    /// Returns the target model metadata.
    #[must_use]
    pub fn target(&self) -> ModelMeta {
        (self.target)()
    }
}
