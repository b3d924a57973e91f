//! Tests for keyword lookups: every suffix, NULL handling, lists, wildcard
//! escaping, relation filters and invalid keys.

mod common;
use common::*;

use oxide_repository::{QueryOptions, Repository, RepositoryError, SearchParams, SqlValue, Values};

#[tokio::test]
async fn exact_and_plain_key() {
    let repo = users().await;
    assert_eq!(names(&repo, SearchParams::new().with("name", "Bob")).await, ["Bob"]);
    assert_eq!(
        names(&repo, SearchParams::new().with("name__exact", "Bob")).await,
        ["Bob"]
    );
    assert!(names(&repo, SearchParams::new().with("name", "bob")).await.is_empty());
}

#[tokio::test]
async fn exact_null_is_null_check() {
    let repo = users().await;
    assert_eq!(
        names(&repo, SearchParams::new().with("age", SqlValue::Null)).await,
        ["Dave"]
    );
    assert_eq!(
        names(&repo, SearchParams::new().with("age__exact", None::<i64>)).await,
        ["Dave"]
    );
}

#[tokio::test]
async fn iexact() {
    let repo = users().await;
    assert_eq!(
        names(&repo, SearchParams::new().with("email__iexact", "CAROL@EXAMPLE.ORG")).await,
        ["Carol"]
    );
    // Equality, not a pattern.
    assert!(names(&repo, SearchParams::new().with("email__iexact", "%example%"))
        .await
        .is_empty());
}

#[tokio::test]
async fn case_folding_is_ascii_only() {
    let repo = users().await;
    repo.create(
        &Values::new()
            .with("name", "Émile")
            .with("email", "emile@example.com"),
    )
    .await
    .unwrap();
    assert_eq!(
        names(&repo, SearchParams::new().with("name__iexact", "ÉMILE")).await,
        ["Émile"]
    );
    assert!(names(&repo, SearchParams::new().with("name__iexact", "émile"))
        .await
        .is_empty());
    assert!(names(&repo, SearchParams::new().with("name__icontains", "émi"))
        .await
        .is_empty());
}

#[tokio::test]
async fn contains_is_case_sensitive() {
    let repo = users().await;
    assert_eq!(
        names(&repo, SearchParams::new().with("name__contains", "a")).await,
        ["Carol", "Dave"]
    );
    assert_eq!(
        names(&repo, SearchParams::new().with("name__icontains", "a")).await,
        ["Alice", "Carol", "Dave"]
    );
}

#[tokio::test]
async fn in_list() {
    let repo = users().await;
    assert_eq!(
        names(&repo, SearchParams::new().with("age__in", vec![17, 45])).await,
        ["Bob", "Carol"]
    );
    assert_eq!(
        names(&repo, SearchParams::new().with("name__in", ["Alice", "Zed"])).await,
        ["Alice"]
    );
    // A scalar is a one-item list.
    assert_eq!(names(&repo, SearchParams::new().with("id__in", 4)).await, ["Dave"]);
}

#[tokio::test]
async fn in_empty_list_matches_nothing() {
    let repo = users().await;
    assert!(names(&repo, SearchParams::new().with("id__in", Vec::<i64>::new()))
        .await
        .is_empty());
    assert_eq!(
        repo.count(&SearchParams::new().with("id__in", Vec::<i64>::new()), false)
            .await
            .unwrap(),
        0
    );
}

#[tokio::test]
async fn comparisons() {
    let repo = users().await;
    assert_eq!(names(&repo, SearchParams::new().with("age__gt", 31)).await, ["Carol"]);
    assert_eq!(
        names(&repo, SearchParams::new().with("age__gte", 31)).await,
        ["Alice", "Carol"]
    );
    assert_eq!(names(&repo, SearchParams::new().with("age__lt", 31)).await, ["Bob"]);
    assert_eq!(
        names(&repo, SearchParams::new().with("age__lte", 31)).await,
        ["Alice", "Bob"]
    );
    assert_eq!(
        names(
            &repo,
            SearchParams::new().with("age__gt", 20).with("age__lt", 40)
        )
        .await,
        ["Alice"]
    );
}

#[tokio::test]
async fn prefix_and_suffix() {
    let repo = users().await;
    assert_eq!(
        names(&repo, SearchParams::new().with("name__startswith", "Da")).await,
        ["Dave"]
    );
    assert!(names(&repo, SearchParams::new().with("name__startswith", "da"))
        .await
        .is_empty());
    assert_eq!(
        names(&repo, SearchParams::new().with("name__istartswith", "da")).await,
        ["Dave"]
    );
    assert_eq!(
        names(&repo, SearchParams::new().with("name__endswith", "ob")).await,
        ["Bob"]
    );
    assert!(names(&repo, SearchParams::new().with("name__endswith", "OB"))
        .await
        .is_empty());
    assert_eq!(
        names(&repo, SearchParams::new().with("name__iendswith", "OB")).await,
        ["Bob"]
    );
}

#[tokio::test]
async fn wildcards_match_literally() {
    let posts = Repository::<Post>::new(seeded_pool().await);
    let found = posts
        .where_(
            &SearchParams::new().with("title__icontains", "0%"),
            &QueryOptions::new(),
        )
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].title, "Gardening 100%");

    let found = posts
        .where_(
            &SearchParams::new().with("title__icontains", "_"),
            &QueryOptions::new(),
        )
        .await
        .unwrap();
    assert!(found.is_empty());
}

#[tokio::test]
async fn relation_filter_has_many() {
    let repo = users().await;
    assert_eq!(
        names(&repo, SearchParams::new().with("posts__title__icontains", "rust")).await,
        ["Alice"]
    );
    // Alice has two posts but matches once.
    assert_eq!(
        names(&repo, SearchParams::new().with("posts__published", true)).await,
        ["Alice", "Bob", "Carol"]
    );
}

#[tokio::test]
async fn relation_filter_nested() {
    let repo = users().await;
    assert_eq!(
        names(
            &repo,
            SearchParams::new().with("posts__comments__body__icontains", "WELCOME")
        )
        .await,
        ["Bob"]
    );
}

#[tokio::test]
async fn relation_filter_belongs_to() {
    let posts = Repository::<Post>::new(seeded_pool().await);
    let found = posts
        .where_(
            &SearchParams::new().with("author__name", "Carol"),
            &QueryOptions::new(),
        )
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, 4);
}

#[tokio::test]
async fn unknown_field_is_rejected() {
    let repo = users().await;
    let err = repo
        .where_(
            &SearchParams::new().with("nickname__icontains", "x"),
            &QueryOptions::new(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "User has no attribute 'nickname'");
}

#[tokio::test]
async fn unknown_relation_is_rejected() {
    let repo = users().await;
    let err = repo
        .count(&SearchParams::new().with("groups__name", "admins"), false)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RepositoryError::UnknownRelation { model: "User", ref relation } if relation == "groups"
    ));
}

#[tokio::test]
async fn pattern_lookup_needs_text() {
    let repo = users().await;
    let err = repo
        .where_(
            &SearchParams::new().with("name__icontains", 3),
            &QueryOptions::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::InvalidValue(_)));
}

#[tokio::test]
async fn params_from_json() {
    let repo = users().await;
    let params = SearchParams::from_json(serde_json::json!({
        "age__in": [17, 31],
        "is_active": true
    }))
    .unwrap();
    assert_eq!(names(&repo, params).await, ["Alice", "Bob"]);
}
