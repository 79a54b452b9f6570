//! Tests for batched eager loading and result grouping

use std::sync::Arc;

use crate::backends::{MemoryExecutor, StatementKind};
use crate::error::ModelError;
use crate::model::{Model, PrimaryKey};
use crate::query::QueryBuilder;
use crate::row::Row;

use super::eager::{EagerConstraint, EagerInclude};
use super::grouping::{GroupingColumn, ResultGrouper};
use super::has_many::HasMany;
use super::many_to_many::ManyToMany;
use super::test_models::{blog, ids, Comment, Post, Tag};
use super::traits::Relationship;

fn tags_of(post: &Post) -> Vec<i64> {
    ids(post.related::<Tag>("tags").expect("tags slot attached"))
}

#[tokio::test]
async fn test_eager_load_attaches_groups_in_one_query() {
    let executor = blog();
    let mut posts = vec![Post::persisted(1), Post::persisted(2), Post::persisted(3)];

    ManyToMany::<Post, Tag>::unbound()
        .eager_load(&executor, &mut posts, "tags", None, &[])
        .await
        .unwrap();

    assert_eq!(executor.statement_count(StatementKind::Select).await, 1);
    assert_eq!(tags_of(&posts[0]), vec![1, 2]);
    assert_eq!(tags_of(&posts[1]), vec![2, 3]);

    // Present and empty, never absent
    assert!(posts[2].relations().is_loaded("tags"));
    assert!(tags_of(&posts[2]).is_empty());
}

#[tokio::test]
async fn test_pivot_column_is_stripped_before_hydration() {
    let executor = blog();
    let rows = ManyToMany::<Post, Tag>::unbound()
        .plan(super::traits::LoadMode::Eager)
        .unwrap()
        .where_in("posts_tags.post_id", vec![1i64])
        .rows(&executor)
        .await
        .unwrap();
    assert!(rows.iter().all(|row| row.contains("__pivot_post_id")));

    let mut grouper = ResultGrouper::new();
    grouper
        .group_rows(rows, &GroupingColumn::stripped("__pivot_post_id"), "tags", |row| {
            assert_eq!(row.column_names(), vec!["id", "name"]);
            Tag::from_row(row)
        })
        .unwrap();
    assert_eq!(grouper.len(), 2);
}

#[tokio::test]
async fn test_batch_size_does_not_change_query_count() {
    for size in [1usize, 10, 1000] {
        let posts_tags: Vec<Row> = (1..=size as i64)
            .map(|id| Row::new().with("post_id", id).with("tag_id", (id % 5) + 1))
            .collect();
        let executor = MemoryExecutor::new()
            .with_table(
                "tags",
                (1..=5i64).map(|id| Row::new().with("id", id).with("name", format!("t{}", id))).collect(),
            )
            .with_table("posts_tags", posts_tags);

        let mut posts: Vec<Post> = (1..=size as i64).map(Post::persisted).collect();
        ManyToMany::<Post, Tag>::unbound()
            .eager_load(&executor, &mut posts, "tags", None, &[])
            .await
            .unwrap();

        assert_eq!(executor.statements().await.len(), 1, "batch of {}", size);
        assert!(posts.iter().all(|post| tags_of(post).len() == 1));
        assert_eq!(tags_of(&posts[size - 1]), vec![(size as i64 % 5) + 1]);
    }
}

#[tokio::test]
async fn test_duplicate_parents_share_keys_and_groups() {
    let executor = blog();
    let mut posts = vec![Post::persisted(1), Post::persisted(1), Post::persisted(2)];

    ManyToMany::<Post, Tag>::unbound()
        .eager_load(&executor, &mut posts, "tags", None, &[])
        .await
        .unwrap();

    let statements = executor.statements().await;
    assert_eq!(statements[0].params.len(), 2);
    assert_eq!(tags_of(&posts[0]), vec![1, 2]);
    assert_eq!(tags_of(&posts[1]), vec![1, 2]);
}

#[tokio::test]
async fn test_empty_batch_issues_no_query() {
    let executor = blog();
    let mut posts: Vec<Post> = Vec::new();

    ManyToMany::<Post, Tag>::unbound()
        .eager_load(&executor, &mut posts, "tags", None, &[])
        .await
        .unwrap();

    assert!(executor.statements().await.is_empty());
}

#[tokio::test]
async fn test_unsaved_parent_in_batch_fails_before_query() {
    let executor = blog();
    let mut posts = vec![Post::persisted(1), Post::default()];

    let err = ManyToMany::<Post, Tag>::unbound()
        .eager_load(&executor, &mut posts, "tags", None, &[])
        .await
        .unwrap_err();

    assert_eq!(err, ModelError::missing_primary_key("eager_load", "posts"));
    assert!(executor.statements().await.is_empty());
    assert!(!posts[0].relations().is_loaded("tags"));
}

#[tokio::test]
async fn test_constraint_runs_before_batch_predicate() {
    let executor = blog();
    let mut posts = vec![Post::persisted(1), Post::persisted(2)];
    let constraint: EagerConstraint = Arc::new(|query: QueryBuilder| query.where_ne("tags.name", "sql"));

    ManyToMany::<Post, Tag>::unbound()
        .eager_load(&executor, &mut posts, "tags", Some(&constraint), &[])
        .await
        .unwrap();

    let sql = &executor.statements().await[0].sql;
    assert!(sql.ends_with("WHERE tags.name != $1 AND posts_tags.post_id IN ($2, $3)"), "{}", sql);
    assert_eq!(tags_of(&posts[0]), vec![1]);
    assert_eq!(tags_of(&posts[1]), vec![3]);
}

#[tokio::test]
async fn test_query_with_resolves_includes() {
    let executor = blog();

    let posts = Post::query()
        .with("tags")
        .with("comments")
        .order_by("id")
        .all(&executor)
        .await
        .unwrap();

    // posts, tags, comments
    assert_eq!(executor.statement_count(StatementKind::Select).await, 3);
    assert_eq!(tags_of(posts.get(1).unwrap()), vec![2, 3]);

    let comments = posts.first().unwrap().related::<Comment>("comments").unwrap();
    let bodies: Vec<&str> = comments.iter().map(|c| c.body.as_str()).collect();
    assert_eq!(bodies, vec!["first", "third"]);
    assert!(posts.get(2).unwrap().related::<Comment>("comments").unwrap().is_empty());
}

#[tokio::test]
async fn test_nested_include_costs_one_query_per_level() {
    let executor = blog();

    let posts = Post::query().with("tags.posts").all(&executor).await.unwrap();

    assert_eq!(executor.statement_count(StatementKind::Select).await, 3);

    // Tag 2 belongs to posts 1 and 2
    let tags = posts.first().unwrap().related::<Tag>("tags").unwrap();
    let sql_tag = tags.iter().find(|tag| tag.name == "sql").unwrap();
    assert_eq!(ids(sql_tag.related::<Post>("posts").unwrap()), vec![1, 2]);
}

#[tokio::test]
async fn test_with_constraint_narrows_related_rows() {
    let executor = blog();

    let posts = Post::query()
        .with_constraint("tags", |query| query.where_like("tags.name", "%s%"))
        .all(&executor)
        .await
        .unwrap();

    assert_eq!(tags_of(posts.first().unwrap()), vec![1, 2]);
    assert_eq!(tags_of(posts.get(1).unwrap()), vec![2, 3]);

    let posts = Post::query()
        .with_constraint("tags", |query| query.where_eq("tags.name", "async"))
        .all(&executor)
        .await
        .unwrap();
    assert!(tags_of(posts.first().unwrap()).is_empty());
    assert_eq!(tags_of(posts.get(1).unwrap()), vec![3]);
}

#[tokio::test]
async fn test_unknown_include_is_a_relationship_error() {
    let executor = blog();
    let err = Post::query().with("authors").all(&executor).await.unwrap_err();
    assert!(matches!(err, ModelError::Relationship(msg) if msg.contains("posts.authors")));
}

#[tokio::test]
async fn test_has_many_groups_by_foreign_key() {
    let executor = blog();
    let mut posts = vec![Post::persisted(1), Post::persisted(2), Post::persisted(3)];

    let include = EagerInclude::new("comments");
    HasMany::<Post, Comment>::unbound()
        .load_include(&executor, &mut posts, &include)
        .await
        .unwrap();

    let first = posts[0].related::<Comment>("comments").unwrap();
    assert_eq!(ids(first), vec![1, 3]);
    // The foreign key is part of the comment and stays
    assert!(first.iter().all(|comment| comment.post_id == 1));
    assert!(posts[2].related::<Comment>("comments").unwrap().is_empty());

    let lazy = posts[1].comments().all(&executor).await.unwrap();
    assert_eq!(ids(&lazy), vec![2]);
}

#[test]
fn test_grouper_reports_missing_grouping_column() {
    let mut grouper: ResultGrouper<Row> = ResultGrouper::new();
    let rows = vec![Row::new().with("id", 1i64)];

    let err = grouper
        .group_rows(rows, &GroupingColumn::stripped("__pivot_post_id"), "tags", Ok)
        .unwrap_err();
    assert!(matches!(err, ModelError::Relationship(msg) if msg.contains("__pivot_post_id")));
}

#[test]
fn test_grouper_preserves_row_order_within_groups() {
    let mut grouper = ResultGrouper::new();
    grouper.push(PrimaryKey::Integer(2), "b1");
    grouper.push(PrimaryKey::Integer(1), "a1");
    grouper.push(PrimaryKey::Integer(2), "b2");

    let groups = grouper.into_groups();
    assert_eq!(groups[&PrimaryKey::Integer(2)], vec!["b1", "b2"]);
    assert_eq!(groups[&PrimaryKey::Integer(1)], vec!["a1"]);
}
