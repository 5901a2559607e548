use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::postgres::PgPool;
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::card::ArticleCard;
use crate::stats::Stats;

pub async fn init_db(pool: &PgPool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS articles (
            id BIGSERIAL PRIMARY KEY,
            title VARCHAR(255) NOT NULL,
            link VARCHAR(512) NOT NULL UNIQUE,
            description TEXT,
            published_time VARCHAR(64),
            view_count BIGINT NOT NULL DEFAULT 0,
            upvote BIGINT NOT NULL DEFAULT 0,
            comments BIGINT NOT NULL DEFAULT 0,
            bookmarks BIGINT NOT NULL DEFAULT 0,
            likes BIGINT NOT NULL DEFAULT 0,
            status SMALLINT NOT NULL DEFAULT 1,
            created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP
        );
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Inserts new articles and refreshes the counters of known ones. Title,
/// description and publish time of an existing row are left untouched.
pub async fn upsert_articles(pool: &PgPool, articles: &[ArticleCard]) -> Result<u64> {
    if articles.is_empty() {
        return Ok(0);
    }

    let mut tx = pool.begin().await?;
    let mut written = 0;

    for article in articles {
        let result = sqlx::query(
            r#"
            INSERT INTO articles (
                title, link, description, published_time,
                view_count, upvote, comments, bookmarks, likes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (link) DO UPDATE SET
                view_count = EXCLUDED.view_count,
                upvote = EXCLUDED.upvote,
                comments = EXCLUDED.comments,
                bookmarks = EXCLUDED.bookmarks,
                likes = EXCLUDED.likes,
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(&article.title)
        .bind(&article.link)
        .bind(&article.description)
        .bind(&article.published_time)
        .bind(i64::from(article.stats.reads))
        .bind(i64::from(article.stats.upvotes))
        .bind(i64::from(article.stats.comments))
        .bind(i64::from(article.stats.bookmarks))
        .bind(i64::from(article.stats.likes))
        .execute(&mut *tx)
        .await?;

        written += result.rows_affected();
    }

    tx.commit().await?;
    tracing::info!(count = articles.len(), written, "articles saved");
    Ok(written)
}

#[derive(Debug, Clone, FromRow)]
struct ArticleRow {
    id: i64,
    title: String,
    link: String,
    description: Option<String>,
    published_time: Option<String>,
    view_count: i64,
    upvote: i64,
    comments: i64,
    bookmarks: i64,
    likes: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// An article as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct StoredArticle {
    pub id: i64,
    #[serde(flatten)]
    pub article: ArticleCard,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn counter(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}

impl From<ArticleRow> for StoredArticle {
    fn from(row: ArticleRow) -> Self {
        Self {
            id: row.id,
            article: ArticleCard {
                title: row.title,
                link: row.link,
                description: row.description.unwrap_or_default(),
                published_time: row.published_time.unwrap_or_default(),
                stats: Stats {
                    reads: counter(row.view_count),
                    upvotes: counter(row.upvote),
                    comments: counter(row.comments),
                    bookmarks: counter(row.bookmarks),
                    likes: counter(row.likes),
                },
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Every stored article, newest first.
pub async fn list_articles(pool: &PgPool) -> Result<Vec<StoredArticle>> {
    let rows: Vec<ArticleRow> = sqlx::query_as(
        r#"
        SELECT id, title, link, description, published_time,
               view_count, upvote, comments, bookmarks, likes,
               created_at, updated_at
        FROM articles
        ORDER BY created_at DESC, id DESC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(StoredArticle::from).collect())
}
