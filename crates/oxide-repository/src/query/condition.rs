//! Translation of search keywords into SQL predicates.
//!
//! Keys follow the `field`, `field__lookup` and `relation__field__lookup`
//! conventions. Relation hops render as correlated `EXISTS` subqueries, so
//! a parent row matches when any related row matches.

use crate::error::Result;
use crate::model::{ModelMeta, Relation};
use crate::params::SearchParams;
use crate::query::lookup::Lookup;
use crate::query::quote_ident;
use crate::value::SqlValue;

/// A single predicate against a model's columns.
#[derive(Debug, Clone)]
pub enum Condition {
    /// `column <lookup> value` on the current table.
    Compare {
        /// Column name, validated against the model.
        column: &'static str,
        /// The comparison.
        lookup: Lookup,
        /// The operand.
        value: SqlValue,
    },
    /// A predicate that must hold for some row reachable through `relation`.
    Related {
        /// The relation to traverse.
        relation: &'static Relation,
        /// Metadata of the relation's target.
        target: ModelMeta,
        /// The predicate evaluated on the target.
        inner: Box<Condition>,
    },
}

impl Condition {
    /// Parses one `key => value` pair against `meta`.
    pub fn parse(meta: &ModelMeta, key: &str, value: SqlValue) -> Result<Self> {
        let mut parts: Vec<&str> = key.split("__").collect();
        let mut lookup = Lookup::Exact;
        if parts.len() > 1 {
            if let Some(found) = parts.last().and_then(|last| Lookup::from_suffix(last)) {
                lookup = found;
                parts.pop();
            }
        }
        Self::build(meta, &parts, lookup, value)
    }

    fn build(meta: &ModelMeta, parts: &[&str], lookup: Lookup, value: SqlValue) -> Result<Self> {
        match parts {
            [relation, rest @ ..] if !rest.is_empty() => {
                let relation = meta.relation(relation)?;
                let target = relation.target();
                let inner = Self::build(&target, rest, lookup, value)?;
                Ok(Self::Related {
                    relation,
                    target,
                    inner: Box::new(inner),
                })
            }
            _ => {
                let column = meta.column(parts.first().copied().unwrap_or_default())?;
                Ok(Self::Compare {
                    column,
                    lookup,
                    value,
                })
            }
        }
    }

    /// Renders the predicate with columns qualified by `scope`.
    ///
    /// `scope` is the quoted name or alias of the table the predicate is
    /// evaluated on. `depth` numbers the aliases of nested subqueries.
    pub fn render(&self, scope: &str, depth: usize, params: &mut Vec<SqlValue>) -> Result<String> {
        match self {
            Self::Compare {
                column,
                lookup,
                value,
            } => {
                let column = format!("{scope}.{}", quote_ident(column));
                lookup.render(&column, value.clone(), params)
            }
            Self::Related {
                relation,
                target,
                inner,
            } => {
                let alias = quote_ident(&format!("r{}", depth + 1));
                let inner_sql = inner.render(&alias, depth + 1, params)?;
                Ok(format!(
                    "EXISTS (SELECT 1 FROM {table} AS {alias} WHERE {alias}.{remote} = {scope}.{local} AND {inner_sql})",
                    table = quote_ident(target.table),
                    remote = quote_ident(relation.remote_key),
                    local = quote_ident(relation.local_key),
                ))
            }
        }
    }
}

/// Parses every search parameter against `meta`, in order.
pub fn parse_conditions(meta: &ModelMeta, params: &SearchParams) -> Result<Vec<Condition>> {
    params
        .iter()
        .map(|(key, value)| Condition::parse(meta, key, value.clone()))
        .collect()
}

/// Renders conditions joined with `AND`; empty when there are none.
pub fn render_where(
    conditions: &[Condition],
    scope: &str,
    params: &mut Vec<SqlValue>,
) -> Result<String> {
    let parts = conditions
        .iter()
        .map(|c| c.render(scope, 0, params))
        .collect::<Result<Vec<_>>>()?;
    Ok(parts.join(" AND "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RepositoryError;

    const USER_RELATIONS: &[Relation] = &[Relation::has_many("posts", post_meta, "user_id")];
    const POST_RELATIONS: &[Relation] = &[
        Relation::belongs_to("author", user_meta, "user_id"),
        Relation::has_many("comments", comment_meta, "post_id"),
    ];

    fn user_meta() -> ModelMeta {
        ModelMeta {
            name: "User",
            table: "users",
            columns: &["id", "name", "age", "email"],
            primary_key: "id",
            relations: USER_RELATIONS,
        }
    }

    fn post_meta() -> ModelMeta {
        ModelMeta {
            name: "Post",
            table: "posts",
            columns: &["id", "user_id", "title"],
            primary_key: "id",
            relations: POST_RELATIONS,
        }
    }

    fn comment_meta() -> ModelMeta {
        ModelMeta {
            name: "Comment",
            table: "comments",
            columns: &["id", "post_id", "body"],
            primary_key: "id",
            relations: &[],
        }
    }

    fn render(key: &str, value: SqlValue) -> Result<(String, Vec<SqlValue>)> {
        let condition = Condition::parse(&user_meta(), key, value)?;
        let mut params = Vec::new();
        let sql = condition.render("\"users\"", 0, &mut params)?;
        Ok((sql, params))
    }

    #[test]
    fn test_plain_key_is_equality() {
        let (sql, params) = render("name", SqlValue::Text("Bob".into())).unwrap();
        assert_eq!(sql, "\"users\".\"name\" = ?");
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn test_lookup_suffix() {
        let (sql, _) = render("age__gte", SqlValue::Int(18)).unwrap();
        assert_eq!(sql, "\"users\".\"age\" >= ?");

        let (sql, _) = render("age__exact", SqlValue::Int(18)).unwrap();
        assert_eq!(sql, "\"users\".\"age\" = ?");
    }

    #[test]
    fn test_unknown_field() {
        let err = render("nickname__icontains", SqlValue::Text("x".into())).unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::UnknownField { model: "User", ref field } if field == "nickname"
        ));
    }

    #[test]
    fn test_operator_name_alone_is_a_column() {
        let err = render("gt", SqlValue::Int(1)).unwrap_err();
        assert!(matches!(err, RepositoryError::UnknownField { ref field, .. } if field == "gt"));
    }

    #[test]
    fn test_relation_filter() {
        let (sql, params) = render("posts__title__icontains", SqlValue::Text("rust".into())).unwrap();
        assert_eq!(
            sql,
            "EXISTS (SELECT 1 FROM \"posts\" AS \"r1\" WHERE \"r1\".\"user_id\" = \"users\".\"id\" \
             AND lower(\"r1\".\"title\") LIKE lower(?) ESCAPE '\\')"
        );
        assert_eq!(params, vec![SqlValue::Text("%rust%".into())]);
    }

    #[test]
    fn test_relation_without_lookup_is_exact() {
        let (sql, _) = render("posts__title", SqlValue::Text("Hello".into())).unwrap();
        assert!(sql.ends_with("AND \"r1\".\"title\" = ?)"));
    }

    #[test]
    fn test_nested_relation_filter() {
        let (sql, _) = render("posts__comments__body__contains", SqlValue::Text("hi".into())).unwrap();
        assert_eq!(
            sql,
            "EXISTS (SELECT 1 FROM \"posts\" AS \"r1\" WHERE \"r1\".\"user_id\" = \"users\".\"id\" \
             AND EXISTS (SELECT 1 FROM \"comments\" AS \"r2\" WHERE \"r2\".\"post_id\" = \"r1\".\"id\" \
             AND instr(\"r2\".\"body\", ?) > 0))"
        );
    }

    #[test]
    fn test_belongs_to_filter() {
        let condition =
            Condition::parse(&post_meta(), "author__name", SqlValue::Text("Ann".into())).unwrap();
        let mut params = Vec::new();
        let sql = condition.render("\"posts\"", 0, &mut params).unwrap();
        assert_eq!(
            sql,
            "EXISTS (SELECT 1 FROM \"users\" AS \"r1\" WHERE \"r1\".\"id\" = \"posts\".\"user_id\" \
             AND \"r1\".\"name\" = ?)"
        );
    }

    #[test]
    fn test_unknown_relation() {
        let err = render("groups__name", SqlValue::Text("x".into())).unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::UnknownRelation { model: "User", ref relation } if relation == "groups"
        ));

        let err = render("posts__missing", SqlValue::Int(1)).unwrap_err();
        assert!(matches!(err, RepositoryError::UnknownField { model: "Post", .. }));
    }

    #[test]
    fn test_render_where_joins_with_and() {
        let params = SearchParams::new().with("age__gt", 20).with("age__lt", 40);
        let conditions = parse_conditions(&user_meta(), &params).unwrap();
        let mut bound = Vec::new();
        let sql = render_where(&conditions, "\"users\"", &mut bound).unwrap();
        assert_eq!(sql, "\"users\".\"age\" > ? AND \"users\".\"age\" < ?");
        assert_eq!(bound, vec![SqlValue::Int(20), SqlValue::Int(40)]);
    }
}
