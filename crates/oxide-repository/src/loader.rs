//! Eager loading of relations.
//!
//! Each relation hop runs one `SELECT ... WHERE key IN (...)` over the keys
//! of the rows loaded so far. Fetched rows are grouped by join key and
//! handed to [`Model::attach`] as [`RelatedRow`]s, which the model decodes
//! into whatever field it keeps them in.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool, TypeInfo, ValueRef};
use tracing::{debug, warn};

use crate::error::Result;
use crate::model::{LoadStrategy, Model, ModelMeta, Relation};
use crate::params::{LoadPath, SortOrder};
use crate::query::{Condition, Lookup, Query};
use crate::value::{bind_all, SqlValue};

/// Upper bound on keys bound into a single `IN` list.
const MAX_KEYS_PER_QUERY: usize = 500;

/// A row loaded through a relation, with its own loaded relations.
#[derive(Clone)]
pub struct RelatedRow {
    row: Arc<SqliteRow>,
    children: BTreeMap<&'static str, Vec<RelatedRow>>,
}

impl fmt::Debug for RelatedRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelatedRow")
            .field("columns", &self.row.len())
            .field("children", &self.children)
            .finish()
    }
}

impl RelatedRow {
    /// Returns the raw row.
    #[must_use]
    pub fn row(&self) -> &SqliteRow {
        &self.row
    }

    /// Returns the rows loaded for `relation` on this row.
    #[must_use]
    pub fn related(&self, relation: &str) -> &[Self] {
        self.children.get(relation).map_or(&[][..], Vec::as_slice)
    }

    /// Returns whether `relation` was loaded on this row.
    #[must_use]
    pub fn is_loaded(&self, relation: &str) -> bool {
        self.children.contains_key(relation)
    }

    /// Decodes the row into a model and attaches its loaded relations.
    pub fn decode<M: Model>(&self) -> Result<M> {
        let mut model = M::from_row(self.row.as_ref())?;
        for (relation, rows) in &self.children {
            model.attach(relation, rows)?;
        }
        Ok(model)
    }

    /// Decodes every row; for to-many relations.
    pub fn decode_all<M: Model>(rows: &[Self]) -> Result<Vec<M>> {
        rows.iter().map(Self::decode::<M>).collect()
    }

    /// Decodes the first row, if any; for to-one relations.
    pub fn decode_one<M: Model>(rows: &[Self]) -> Result<Option<M>> {
        rows.first().map(Self::decode::<M>).transpose()
    }
}

/// One relation to load, with the relations to load below it.
#[derive(Debug, Clone)]
pub struct LoadNode {
    relation: &'static Relation,
    target: ModelMeta,
    children: Vec<LoadNode>,
}

impl LoadNode {
    /// Returns the relation this node loads.
    #[must_use]
    pub const fn relation(&self) -> &'static Relation {
        self.relation
    }

    /// Returns the nested nodes.
    #[must_use]
    pub fn children(&self) -> &[Self] {
        &self.children
    }
}

/// Resolves loading directives into a tree of relations to load.
///
/// Relations declared `Joined` are loaded by default at every depth, and a
/// joined cycle stops at the first repeated hop. `joined` paths add
/// themselves and their prefixes. `lazy` paths remove themselves and
/// everything below them, leaving the prefixes above in place.
pub fn plan(meta: &ModelMeta, joined: &[LoadPath], lazy: &[LoadPath]) -> Result<Vec<LoadNode>> {
    for path in lazy.iter().chain(joined) {
        resolve(meta, path)?;
    }

    let mut nodes = Vec::new();
    for path in joined {
        let segments = path.segments();
        let kept = (1..=segments.len())
            .find(|&len| is_lazy(&segments[..len], lazy))
            .map_or(segments.len(), |len| len - 1);
        insert(&mut nodes, meta, &segments[..kept])?;
    }
    expand_joined(&mut nodes, meta, lazy, &mut Vec::new(), &mut Vec::new())?;
    Ok(nodes)
}

fn is_lazy(segments: &[String], lazy: &[LoadPath]) -> bool {
    lazy.iter().any(|l| segments.starts_with(l.segments()))
}

/// Adds `Joined` relations of `meta` to `nodes`, then recurses into every
/// node. `chain` holds the `(model, relation)` hops above `nodes`.
fn expand_joined(
    nodes: &mut Vec<LoadNode>,
    meta: &ModelMeta,
    lazy: &[LoadPath],
    path: &mut Vec<String>,
    chain: &mut Vec<(&'static str, &'static str)>,
) -> Result<()> {
    for relation in meta
        .relations
        .iter()
        .filter(|r| r.strategy == LoadStrategy::Joined)
    {
        if chain.contains(&(meta.name, relation.name)) {
            continue;
        }
        path.push(relation.name.to_string());
        let skipped = is_lazy(path, lazy);
        path.pop();
        if !skipped {
            insert(nodes, meta, &[relation.name.to_string()])?;
        }
    }

    for node in nodes.iter_mut() {
        let target = node.target;
        path.push(node.relation.name.to_string());
        chain.push((meta.name, node.relation.name));
        expand_joined(&mut node.children, &target, lazy, path, chain)?;
        chain.pop();
        path.pop();
    }
    Ok(())
}

fn resolve(meta: &ModelMeta, path: &LoadPath) -> Result<()> {
    let mut current = *meta;
    for segment in path.segments() {
        current = current.relation(segment)?.target();
    }
    Ok(())
}

fn insert(nodes: &mut Vec<LoadNode>, meta: &ModelMeta, segments: &[String]) -> Result<()> {
    let Some((first, rest)) = segments.split_first() else {
        return Ok(());
    };
    let index = match nodes.iter().position(|n| n.relation.name == first) {
        Some(index) => index,
        None => {
            let relation = meta.relation(first)?;
            nodes.push(LoadNode {
                relation,
                target: relation.target(),
                children: Vec::new(),
            });
            nodes.len() - 1
        }
    };
    let node = &mut nodes[index];
    let target = node.target;
    insert(&mut node.children, &target, rest)
}

/// Loads the planned relations and attaches them to `models`.
///
/// `rows` are the raw rows `models` were decoded from, in the same order.
pub async fn load_into<M: Model>(
    pool: &SqlitePool,
    rows: &[SqliteRow],
    models: &mut [M],
    plan: &[LoadNode],
) -> Result<()> {
    for node in plan {
        let keys = distinct_keys(rows.iter(), node.relation.local_key)?;
        let related = fetch(pool, node, keys).await?;
        for (row, model) in rows.iter().zip(models.iter_mut()) {
            let loaded: &[RelatedRow] = match key_of(row, node.relation.local_key)? {
                Some(key) => related.get(&key).map_or(&[][..], Vec::as_slice),
                None => &[],
            };
            model.attach(node.relation.name, loaded)?;
        }
    }
    Ok(())
}

fn fetch<'a>(
    pool: &'a SqlitePool,
    node: &'a LoadNode,
    keys: Vec<Key>,
) -> BoxFuture<'a, Result<HashMap<Key, Vec<RelatedRow>>>> {
    async move {
        if keys.is_empty() {
            return Ok(HashMap::new());
        }

        let remote_key = node.target.column(node.relation.remote_key)?;
        let mut rows = Vec::new();
        for chunk in keys.chunks(MAX_KEYS_PER_QUERY) {
            let condition = Condition::Compare {
                column: remote_key,
                lookup: Lookup::In,
                value: SqlValue::List(chunk.iter().map(Key::to_sql_value).collect()),
            };
            let stmt = Query::new(node.target)
                .filter([condition])
                .order_by(node.target.primary_key, SortOrder::Asc)?
                .build_select()?;
            debug!(
                relation = node.relation.name,
                keys = chunk.len(),
                sql = %stmt.sql,
                "Loading relation"
            );
            let fetched = sqlx::query_with(&stmt.sql, bind_all(stmt.params)?)
                .fetch_all(pool)
                .await?;
            rows.extend(fetched.into_iter().map(Arc::new));
        }

        let mut nested = Vec::with_capacity(node.children.len());
        for child in &node.children {
            let keys = distinct_keys(rows.iter().map(|row| &**row), child.relation.local_key)?;
            nested.push((child, fetch(pool, child, keys).await?));
        }

        let mut grouped: HashMap<Key, Vec<RelatedRow>> = HashMap::new();
        for row in rows {
            let mut children = BTreeMap::new();
            for (child, loaded) in &nested {
                let items = key_of(&row, child.relation.local_key)?
                    .and_then(|key| loaded.get(&key).cloned())
                    .unwrap_or_default();
                children.insert(child.relation.name, items);
            }
            if let Some(key) = key_of(&row, remote_key)? {
                grouped
                    .entry(key)
                    .or_default()
                    .push(RelatedRow { row, children });
            }
        }

        if node.relation.kind.is_to_one() {
            for (key, rows) in &mut grouped {
                if rows.len() > 1 {
                    warn!(
                        relation = node.relation.name,
                        key = ?key,
                        rows = rows.len(),
                        "To-one relation matched several rows, keeping the first"
                    );
                    rows.truncate(1);
                }
            }
        }
        Ok(grouped)
    }
    .boxed()
}

/// A join-key value that can be hashed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Key {
    Int(i64),
    Real(u64),
    Text(String),
    Blob(Vec<u8>),
}

impl Key {
    fn to_sql_value(&self) -> SqlValue {
        match self {
            Self::Int(i) => SqlValue::Int(*i),
            Self::Real(bits) => SqlValue::Float(f64::from_bits(*bits)),
            Self::Text(s) => SqlValue::Text(s.clone()),
            Self::Blob(b) => SqlValue::Blob(b.clone()),
        }
    }
}

/// Reads a join key by storage class; `None` for NULL.
fn key_of(row: &SqliteRow, column: &str) -> Result<Option<Key>> {
    let storage = {
        let raw = row.try_get_raw(column)?;
        if raw.is_null() {
            return Ok(None);
        }
        raw.type_info().name().to_string()
    };
    let key = match storage.as_str() {
        "INTEGER" | "BOOLEAN" => Key::Int(row.try_get_unchecked(column)?),
        "REAL" => Key::Real(row.try_get_unchecked::<f64, _>(column)?.to_bits()),
        "BLOB" => Key::Blob(row.try_get_unchecked(column)?),
        _ => Key::Text(row.try_get_unchecked(column)?),
    };
    Ok(Some(key))
}

fn distinct_keys<'r>(rows: impl Iterator<Item = &'r SqliteRow>, column: &str) -> Result<Vec<Key>> {
    let mut seen = HashSet::new();
    let mut keys = Vec::new();
    for row in rows {
        if let Some(key) = key_of(row, column)? {
            if seen.insert(key.clone()) {
                keys.push(key);
            }
        }
    }
    Ok(keys)
}
