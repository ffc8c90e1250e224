use futures::TryStreamExt as _;
use garde::Validate;
use serde::{Deserialize, Serialize};

use crate::{error::Result, Error};

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub struct CreateReview {
    #[garde(length(min = 1, max = 5000))]
    pub text: String,
    #[garde(range(min = 0, max = 10))]
    pub score: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, Validate)]
pub struct UpdateReview {
    #[garde(length(min = 1, max = 5000))]
    pub text: Option<String>,
    #[garde(inner(range(min = 0, max = 10)))]
    pub score: Option<i64>,
}

/// Serialized with the author's username, the way the API exposes reviews.
/// The raw ids stay available for ownership checks.
#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct Review {
    pub id: i64,
    #[serde(skip)]
    pub title_id: i64,
    #[serde(skip)]
    pub author_id: i64,
    pub author: String,
    pub text: String,
    pub score: i64,
    pub pub_date: time::PrimitiveDateTime,
}

const SELECT_REVIEW: &str = "SELECT r.id, r.title_id, r.author_id, u.username AS author, \
    r.text, r.score, r.pub_date FROM review r JOIN users u ON r.author_id = u.id";

pub type ReviewRepository = ReviewRepositoryImpl<crate::Pool>;

pub struct ReviewRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> ReviewRepositoryImpl<E>
where
    for<'a> &'a E: sqlx::Executor<'c, Database = crate::ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub async fn exists_for_author(&self, title_id: i64, author_id: i64) -> Result<bool> {
        let found: Option<i64> =
            sqlx::query_scalar("SELECT id FROM review WHERE title_id = ? AND author_id = ?")
                .bind(title_id)
                .bind(author_id)
                .fetch_optional(&self.executor)
                .await?;
        Ok(found.is_some())
    }

    pub async fn create(
        &self,
        title_id: i64,
        author_id: i64,
        payload: CreateReview,
    ) -> Result<Review> {
        // Fast path for a friendly message, the unique constraint below stays
        // authoritative under concurrent requests.
        if self.exists_for_author(title_id, author_id).await? {
            return Err(Error::AlreadyExists(
                "Review for this title by this author".to_string(),
            ));
        }
        let result =
            sqlx::query("INSERT INTO review (title_id, author_id, text, score) VALUES (?, ?, ?, ?)")
                .bind(title_id)
                .bind(author_id)
                .bind(&payload.text)
                .bind(payload.score)
                .execute(&self.executor)
                .await
                .map_err(|e| {
                    crate::error::on_unique_violation(e, "Review for this title by this author")
                })?;

        self.get(result.last_insert_rowid()).await
    }

    pub async fn get(&self, id: i64) -> Result<Review> {
        sqlx::query_as::<_, Review>(&format!("{SELECT_REVIEW} WHERE r.id = ?"))
            .bind(id)
            .fetch_optional(&self.executor)
            .await?
            .ok_or_else(|| Error::RecordNotFound("Review".to_string()))
    }

    /// Lookup scoped by title, so a review reached through the wrong title
    /// path is absent rather than leaked.
    pub async fn get_for_title(&self, title_id: i64, id: i64) -> Result<Review> {
        sqlx::query_as::<_, Review>(&format!(
            "{SELECT_REVIEW} WHERE r.id = ? AND r.title_id = ?"
        ))
        .bind(id)
        .bind(title_id)
        .fetch_optional(&self.executor)
        .await?
        .ok_or_else(|| Error::RecordNotFound("Review".to_string()))
    }

    pub async fn list_for_title(&self, title_id: i64) -> Result<Vec<Review>> {
        let reviews = sqlx::query_as::<_, Review>(&format!(
            "{SELECT_REVIEW} WHERE r.title_id = ? ORDER BY r.pub_date DESC, r.id DESC"
        ))
        .bind(title_id)
        .fetch(&self.executor)
        .try_collect::<Vec<_>>()
        .await?;
        Ok(reviews)
    }

    pub async fn update(&self, id: i64, payload: UpdateReview) -> Result<Review> {
        let current = self.get(id).await?;
        let text = payload.text.unwrap_or(current.text);
        let score = payload.score.unwrap_or(current.score);
        sqlx::query("UPDATE review SET text = ?, score = ? WHERE id = ?")
            .bind(&text)
            .bind(score)
            .bind(id)
            .execute(&self.executor)
            .await?;
        self.get(id).await
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        let res = sqlx::query("DELETE FROM review WHERE id = ?")
            .bind(id)
            .execute(&self.executor)
            .await?;

        if res.rows_affected() == 0 {
            Err(Error::RecordNotFound("Review".to_string()))
        } else {
            Ok(())
        }
    }
}
