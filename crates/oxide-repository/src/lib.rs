//! # oxide-repository
//!
//! A generic async repository over sqlx and SQLite, driven by keyword
//! lookups.
//!
//! This crate provides:
//! - `Model` trait describing a table, its columns and its relations
//! - `Repository` with `find`, `find_by`, `where_`, `count`, `create`,
//!   `update`, `destroy` and their bulk variants
//! - Keyword lookups (`age__gte`, `name__icontains`, `posts__title__in`)
//!   translated into parameterized SQL
//! - Eager loading of relations, per call or by default on the relation
//! - A default scope merged into every finder
//!
//! ## Quick Start
//!
//! ```ignore
//! use oxide_repository::{DatabaseConfig, QueryOptions, Repository, SearchParams, Values};
//!
//! async fn example() -> oxide_repository::Result<()> {
//!     let pool = DatabaseConfig::from_env()?.connect().await?;
//!     let users = Repository::<User>::new(pool);
//!
//!     let alice = users
//!         .create(&Values::new().with("name", "Alice").with("age", 31))
//!         .await?;
//!
//!     // Filter, sort and paginate
//!     let adults = users
//!         .where_(
//!             &SearchParams::new().with("age__gte", 18),
//!             &QueryOptions::new().sorted_by("age").sorted_order("desc").limit(10),
//!         )
//!         .await?;
//!
//!     // Get a specific user with their posts
//!     let alice = users
//!         .find(alice.id, &QueryOptions::new().joinedload("posts"))
//!         .await?;
//!
//!     // Bulk operations return affected row counts
//!     let renamed = users
//!         .update_all(
//!             &Values::new().with("name", "minor"),
//!             &SearchParams::new().with("age__lt", 18),
//!         )
//!         .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Lookups
//!
//! | Suffix        | SQL                                   |
//! |---------------|---------------------------------------|
//! | *(none)*      | `col = ?`, or `col IS NULL` for null  |
//! | `exact`       | same as no suffix                     |
//! | `iexact`      | `lower(col) = lower(?)`               |
//! | `contains`    | case-sensitive substring              |
//! | `icontains`   | case-insensitive substring            |
//! | `in`          | `col IN (?, ...)`                     |
//! | `gt` `gte`    | `col > ?`, `col >= ?`                 |
//! | `lt` `lte`    | `col < ?`, `col <= ?`                 |
//! | `startswith`  | case-sensitive prefix                 |
//! | `istartswith` | case-insensitive prefix               |
//! | `endswith`    | case-sensitive suffix                 |
//! | `iendswith`   | case-insensitive suffix               |
//!
//! A key with more than one `__` segment before the lookup names a relation
//! path: `posts__comments__body__icontains` matches users with any post that
//! has any comment whose body contains the value.

mod config;
mod error;
pub mod loader;
mod model;
mod params;
pub mod query;
mod repository;
mod value;

pub use config::{DatabaseConfig, DEFAULT_DATABASE_URL};
pub use error::{RepositoryError, Result};
pub use loader::RelatedRow;
pub use model::{LoadStrategy, Model, ModelMeta, Relation, RelationKind};
pub use params::{LoadPath, QueryOptions, SearchParams, SortOrder, Values, DEFAULT_LIMIT};
pub use query::Lookup;
pub use repository::Repository;
pub use value::{SqlValue, ToSqlValue};
