use futures::TryStreamExt as _;
use garde::Validate;
use serde::{Deserialize, Serialize};

use crate::{error::Result, Error};

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub struct CreateComment {
    #[garde(length(min = 1, max = 5000))]
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, Validate)]
pub struct UpdateComment {
    #[garde(length(min = 1, max = 5000))]
    pub text: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct Comment {
    pub id: i64,
    #[serde(skip)]
    pub review_id: i64,
    #[serde(skip)]
    pub author_id: i64,
    pub author: String,
    pub text: String,
    pub pub_date: time::PrimitiveDateTime,
}

const SELECT_COMMENT: &str = "SELECT c.id, c.review_id, c.author_id, u.username AS author, \
    c.text, c.pub_date FROM comment c JOIN users u ON c.author_id = u.id";

pub type CommentRepository = CommentRepositoryImpl<crate::Pool>;

pub struct CommentRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> CommentRepositoryImpl<E>
where
    for<'a> &'a E: sqlx::Executor<'c, Database = crate::ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub async fn create(
        &self,
        review_id: i64,
        author_id: i64,
        payload: CreateComment,
    ) -> Result<Comment> {
        let result = sqlx::query("INSERT INTO comment (review_id, author_id, text) VALUES (?, ?, ?)")
            .bind(review_id)
            .bind(author_id)
            .bind(&payload.text)
            .execute(&self.executor)
            .await?;

        self.get(result.last_insert_rowid()).await
    }

    pub async fn get(&self, id: i64) -> Result<Comment> {
        sqlx::query_as::<_, Comment>(&format!("{SELECT_COMMENT} WHERE c.id = ?"))
            .bind(id)
            .fetch_optional(&self.executor)
            .await?
            .ok_or_else(|| Error::RecordNotFound("Comment".to_string()))
    }

    pub async fn get_for_review(&self, review_id: i64, id: i64) -> Result<Comment> {
        sqlx::query_as::<_, Comment>(&format!(
            "{SELECT_COMMENT} WHERE c.id = ? AND c.review_id = ?"
        ))
        .bind(id)
        .bind(review_id)
        .fetch_optional(&self.executor)
        .await?
        .ok_or_else(|| Error::RecordNotFound("Comment".to_string()))
    }

    pub async fn list_for_review(&self, review_id: i64) -> Result<Vec<Comment>> {
        let comments = sqlx::query_as::<_, Comment>(&format!(
            "{SELECT_COMMENT} WHERE c.review_id = ? ORDER BY c.pub_date DESC, c.id DESC"
        ))
        .bind(review_id)
        .fetch(&self.executor)
        .try_collect::<Vec<_>>()
        .await?;
        Ok(comments)
    }

    pub async fn update(&self, id: i64, payload: UpdateComment) -> Result<Comment> {
        let current = self.get(id).await?;
        let text = payload.text.unwrap_or(current.text);
        sqlx::query("UPDATE comment SET text = ? WHERE id = ?")
            .bind(&text)
            .bind(id)
            .execute(&self.executor)
            .await?;
        self.get(id).await
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        let res = sqlx::query("DELETE FROM comment WHERE id = ?")
            .bind(id)
            .execute(&self.executor)
            .await?;

        if res.rows_affected() == 0 {
            Err(Error::RecordNotFound("Comment".to_string()))
        } else {
            Ok(())
        }
    }
}
