//! Blog fixtures: posts have tags (many-to-many) and comments (has-many)

use async_trait::async_trait;

use crate::backends::{MemoryExecutor, QueryExecutor};
use crate::error::{ModelResult, RelationshipError};
use crate::model::{Model, PrimaryKey};
use crate::row::Row;

use super::eager::EagerInclude;
use super::has_many::HasMany;
use super::many_to_many::ManyToMany;
use super::result_set::RelatedSets;
use super::traits::Relationship;

#[derive(Debug, Clone, Default)]
pub struct Post {
    pub id: Option<i64>,
    pub title: String,
    pub relations: RelatedSets,
}

impl Post {
    pub fn persisted(id: i64) -> Self {
        Self {
            id: Some(id),
            title: format!("post {}", id),
            relations: RelatedSets::default(),
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
        self.id.map(PrimaryKey::Integer)
    }

    fn from_row(row: Row) -> ModelResult<Self> {
        Ok(Self {
            id: row.get_as("id")?,
            title: row.get_as("title")?,
            relations: RelatedSets::default(),
        })
    }

    fn to_row(&self) -> Row {
        Row::new().with("id", self.id).with("title", self.title.as_str())
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

#[derive(Debug, Clone, Default)]
pub struct Tag {
    pub id: Option<i64>,
    pub name: String,
    pub relations: RelatedSets,
}

impl Tag {
    pub fn persisted(id: i64, name: &str) -> Self {
        Self {
            id: Some(id),
            name: name.to_string(),
            relations: RelatedSets::default(),
        }
    }
}

#[async_trait]
impl Model for Tag {
    fn table_name() -> &'static str {
        "tags"
    }

    fn primary_key(&self) -> Option<PrimaryKey> {
        self.id.map(PrimaryKey::Integer)
    }

    fn from_row(row: Row) -> ModelResult<Self> {
        Ok(Self {
            id: row.get_as("id")?,
            name: row.get_as("name")?,
            relations: RelatedSets::default(),
        })
    }

    fn to_row(&self) -> Row {
        Row::new().with("id", self.id).with("name", self.name.as_str())
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
    pub body: String,
    pub relations: RelatedSets,
}

impl Model for Comment {
    fn table_name() -> &'static str {
        "comments"
    }

    fn primary_key(&self) -> Option<PrimaryKey> {
        self.id.map(PrimaryKey::Integer)
    }

    fn from_row(row: Row) -> ModelResult<Self> {
        Ok(Self {
            id: row.get_as("id")?,
            post_id: row.get_as("post_id")?,
            body: row.get_as("body")?,
            relations: RelatedSets::default(),
        })
    }

    fn to_row(&self) -> Row {
        Row::new()
            .with("id", self.id)
            .with("post_id", self.post_id)
            .with("body", self.body.as_str())
    }

    fn relations(&self) -> &RelatedSets {
        &self.relations
    }

    fn relations_mut(&mut self) -> &mut RelatedSets {
        &mut self.relations
    }
}

fn post_row(id: i64) -> Row {
    Row::new().with("id", id).with("title", format!("post {}", id))
}

fn tag_row(id: i64, name: &str) -> Row {
    Row::new().with("id", id).with("name", name)
}

pub fn link_row(post_id: i64, tag_id: i64) -> Row {
    Row::new().with("post_id", post_id).with("tag_id", tag_id)
}

/// Posts 1..=3, tags 1..=5; post 1 has tags {1, 2}, post 2 has {2, 3}, post 3 has none
pub fn blog() -> MemoryExecutor {
    MemoryExecutor::new()
        .with_table("posts", (1..=3).map(post_row).collect())
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
        .with_table(
            "posts_tags",
            vec![link_row(1, 1), link_row(1, 2), link_row(2, 2), link_row(2, 3)],
        )
        .with_unique("posts_tags", &["post_id", "tag_id"])
        .with_table(
            "comments",
            vec![
                Row::new().with("id", 1i64).with("post_id", 1i64).with("body", "first"),
                Row::new().with("id", 2i64).with("post_id", 2i64).with("body", "second"),
                Row::new().with("id", 3i64).with("post_id", 1i64).with("body", "third"),
            ],
        )
}

/// Ids of the records in `records`, in order
pub fn ids<'a, M: Model + 'a>(records: impl IntoIterator<Item = &'a M>) -> Vec<i64> {
    records
        .into_iter()
        .filter_map(|record| record.primary_key().and_then(|key| key.as_i64()))
        .collect()
}
