//! Shared fixtures for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use elif_relations::{
    EagerInclude, HasMany, ManyToMany, MemoryExecutor, Model, ModelResult, PrimaryKey, QueryExecutor,
    RelatedSets, Relationship, RelationshipError, Row,
};

/// Initialise tracing once per test binary; `RUST_LOG` controls the filter
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Debug, Clone, Default)]
pub struct Post {
    pub id: Option<i64>,
    pub title: String,
    pub relations: RelatedSets,
}

impl Post {
    pub fn new(id: i64) -> Self {
        Self {
            id: Some(id),
            title: format!("post {}", id),
            relations: RelatedSets::new(),
        }
    }

    pub fn tags(&self) -> ManyToMany<Post, Tag> {
        ManyToMany::new(self)
    }

    pub fn comments(&self) -> HasMany<Post, Comment> {
        HasMany::new(self)
    }
}

#[async_trait]
impl Model for Post {
    fn table_name() -> &'static str {
        "posts"
    }

    fn primary_key(&self) -> Option<PrimaryKey> {
        self.id.map(PrimaryKey::from)
    }

    fn from_row(row: Row) -> ModelResult<Self> {
        Ok(Self {
            id: row.get_as("id")?,
            title: row.get_as("title")?,
            relations: RelatedSets::new(),
        })
    }

    fn to_row(&self) -> Row {
        Row::new().with("id", self.id).with("title", self.title.clone())
    }

    fn relations(&self) -> &RelatedSets {
        &self.relations
    }

    fn relations_mut(&mut self) -> &mut RelatedSets {
        &mut self.relations
    }

    async fn load_relation(
        records: &mut [Self],
        include: &EagerInclude,
        executor: &dyn QueryExecutor,
    ) -> ModelResult<()> {
        match include.relation() {
            "tags" => {
                ManyToMany::<Post, Tag>::unbound()
                    .load_include(executor, records, include)
                    .await
            }
            "comments" => {
                HasMany::<Post, Comment>::unbound()
                    .load_include(executor, records, include)
                    .await
            }
            other => Err(RelationshipError::NotFound(format!("posts.{}", other)).into()),
        }
    }
}

/// Keeps every column it was hydrated from, so tests can inspect them
#[derive(Debug, Clone, Default)]
pub struct Tag {
    pub id: Option<i64>,
    pub name: String,
    pub columns: Row,
    pub relations: RelatedSets,
}

#[async_trait]
impl Model for Tag {
    fn table_name() -> &'static str {
        "tags"
    }

    fn primary_key(&self) -> Option<PrimaryKey> {
        self.id.map(PrimaryKey::from)
    }

    fn from_row(row: Row) -> ModelResult<Self> {
        Ok(Self {
            id: row.get_as("id")?,
            name: row.get_as("name")?,
            columns: row,
            relations: RelatedSets::new(),
        })
    }

    fn to_row(&self) -> Row {
        Row::new().with("id", self.id).with("name", self.name.clone())
    }

    fn relations(&self) -> &RelatedSets {
        &self.relations
    }

    fn relations_mut(&mut self) -> &mut RelatedSets {
        &mut self.relations
    }

    async fn load_relation(
        records: &mut [Self],
        include: &EagerInclude,
        executor: &dyn QueryExecutor,
    ) -> ModelResult<()> {
        match include.relation() {
            "posts" => {
                ManyToMany::<Tag, Post>::unbound()
                    .load_include(executor, records, include)
                    .await
            }
            other => Err(RelationshipError::NotFound(format!("tags.{}", other)).into()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Comment {
    pub id: Option<i64>,
    pub post_id: i64,
    pub relations: RelatedSets,
}

impl Model for Comment {
    fn table_name() -> &'static str {
        "comments"
    }

    fn primary_key(&self) -> Option<PrimaryKey> {
        self.id.map(PrimaryKey::from)
    }

    fn from_row(row: Row) -> ModelResult<Self> {
        Ok(Self {
            id: row.get_as("id")?,
            post_id: row.get_as("post_id")?,
            relations: RelatedSets::new(),
        })
    }

    fn to_row(&self) -> Row {
        Row::new().with("id", self.id).with("post_id", self.post_id)
    }

    fn relations(&self) -> &RelatedSets {
        &self.relations
    }

    fn relations_mut(&mut self) -> &mut RelatedSets {
        &mut self.relations
    }
}

pub fn tag_row(id: i64, name: &str) -> Row {
    Row::new().with("id", id).with("name", name)
}

pub fn link_row(post_id: i64, tag_id: i64) -> Row {
    Row::new().with("post_id", post_id).with("tag_id", tag_id)
}

/// `count` posts and tags 1..=5 with a unique `(post_id, tag_id)` junction
pub fn blog(count: i64, links: Vec<Row>) -> MemoryExecutor {
    MemoryExecutor::new()
        .with_table(
            "posts",
            (1..=count).map(|id| Post::new(id).to_row()).collect(),
        )
        .with_table(
            "tags",
            vec![
                tag_row(1, "rust"),
                tag_row(2, "sql"),
                tag_row(3, "async"),
                tag_row(4, "web"),
                tag_row(5, "orm"),
            ],
        )
        .with_table("posts_tags", links)
        .with_unique("posts_tags", &["post_id", "tag_id"])
        .with_table("comments", vec![])
}

pub fn ids<'a, M: Model + 'a>(records: impl IntoIterator<Item = &'a M>) -> Vec<i64> {
    records
        .into_iter()
        .filter_map(|record| record.primary_key().and_then(|key| key.as_i64()))
        .collect()
}
