#![allow(dead_code)]

use oxide_repository::{
    Model, QueryOptions, RelatedRow, Relation, Repository, SearchParams, SqlValue,
};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub age: Option<i64>,
    pub is_active: bool,
    pub role: String,
    #[sqlx(skip)]
    pub posts: Vec<Post>,
    #[sqlx(skip)]
    pub profile: Option<Profile>,
}

impl Model for User {
    const NAME: &'static str = "User";
    const TABLE: &'static str = "users";
    const COLUMNS: &'static [&'static str] = &["id", "name", "email", "age", "is_active", "role"];
    const RELATIONS: &'static [Relation] = &[
        Relation::has_many("posts", Post::meta, "user_id"),
        Relation::has_one("profile", Profile::meta, "user_id").joined(),
    ];

    fn column_defaults() -> Vec<(&'static str, SqlValue)> {
        vec![("role", SqlValue::Text("member".to_string()))]
    }

    fn attach(&mut self, relation: &str, rows: &[RelatedRow]) -> oxide_repository::Result<()> {
        match relation {
            "posts" => self.posts = RelatedRow::decode_all(rows)?,
            "profile" => self.profile = RelatedRow::decode_one(rows)?,
            _ => return Err(Self::unknown_relation(relation)),
        }
        Ok(())
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Profile {
    pub id: i64,
    pub user_id: i64,
    pub bio: String,
}

impl Model for Profile {
    const NAME: &'static str = "Profile";
    const TABLE: &'static str = "profiles";
    const COLUMNS: &'static [&'static str] = &["id", "user_id", "bio"];
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Post {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub published: bool,
    #[sqlx(skip)]
    pub author: Option<Box<User>>,
    #[sqlx(skip)]
    pub comments: Vec<Comment>,
}

impl Model for Post {
    const NAME: &'static str = "Post";
    const TABLE: &'static str = "posts";
    const COLUMNS: &'static [&'static str] = &["id", "user_id", "title", "published"];
    const RELATIONS: &'static [Relation] = &[
        Relation::belongs_to("author", User::meta, "user_id"),
        Relation::has_many("comments", Comment::meta, "post_id"),
    ];

    fn attach(&mut self, relation: &str, rows: &[RelatedRow]) -> oxide_repository::Result<()> {
        match relation {
            "author" => self.author = RelatedRow::decode_one(rows)?.map(Box::new),
            "comments" => self.comments = RelatedRow::decode_all(rows)?,
            _ => return Err(Self::unknown_relation(relation)),
        }
        Ok(())
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub body: String,
}

impl Model for Comment {
    const NAME: &'static str = "Comment";
    const TABLE: &'static str = "comments";
    const COLUMNS: &'static [&'static str] = &["id", "post_id", "body"];
}

const SCHEMA: &str = r"
CREATE TABLE users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    email TEXT NOT NULL,
    age INTEGER,
    is_active BOOLEAN NOT NULL DEFAULT 1,
    role TEXT NOT NULL DEFAULT 'guest'
);
CREATE TABLE profiles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    bio TEXT NOT NULL
);
CREATE TABLE posts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    title TEXT NOT NULL,
    published BOOLEAN NOT NULL DEFAULT 0
);
CREATE TABLE comments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    post_id INTEGER NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
    body TEXT NOT NULL
);
";

const SEED: &str = r"
INSERT INTO users (name, email, age, is_active, role) VALUES
    ('Alice', 'alice@example.com', 31, 1, 'admin'),
    ('Bob', 'bob@example.com', 17, 1, 'member'),
    ('Carol', 'carol@Example.org', 45, 0, 'member'),
    ('Dave', 'dave@example.com', NULL, 1, 'member');
INSERT INTO profiles (user_id, bio) VALUES
    (1, 'Rustacean'),
    (2, 'Student');
INSERT INTO posts (user_id, title, published) VALUES
    (1, 'Hello Rust', 1),
    (1, 'Async in depth', 0),
    (2, 'My first post', 1),
    (3, 'Gardening 100%', 1);
INSERT INTO comments (post_id, body) VALUES
    (1, 'Great post'),
    (1, 'thanks!'),
    (3, 'welcome Bob');
";

pub async fn create_test_pool() -> SqlitePool {
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect(":memory:")
        .await
        .expect("Failed to create in-memory SQLite pool")
}

/// Pool with the schema and the four seeded users.
///
/// | id | name  | age  | active | posts | profile |
/// |----|-------|------|--------|-------|---------|
/// | 1  | Alice | 31   | yes    | 1, 2  | yes     |
/// | 2  | Bob   | 17   | yes    | 3     | yes     |
/// | 3  | Carol | 45   | no     | 4     | no      |
/// | 4  | Dave  | NULL | yes    |       | no      |
pub async fn seeded_pool() -> SqlitePool {
    let pool = create_test_pool().await;
    sqlx::raw_sql(SCHEMA).execute(&pool).await.unwrap();
    sqlx::raw_sql(SEED).execute(&pool).await.unwrap();
    pool
}

pub async fn users() -> Repository<User> {
    Repository::new(seeded_pool().await)
}

/// Runs `where_` sorted by id and returns the matching names.
pub async fn names(repo: &Repository<User>, params: SearchParams) -> Vec<String> {
    repo.where_(&params, &QueryOptions::new().sorted_by("id"))
        .await
        .unwrap()
        .into_iter()
        .map(|u| u.name)
        .collect()
}
