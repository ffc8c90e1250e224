use garde::Validate;
use kritika_types::general::ValidSlug;
use serde::{Deserialize, Serialize};
use sqlx::{Acquire as _, QueryBuilder, Row as _};

use crate::{category::Category, error::Result, genre::Genre, Batch, ChosenRow, Error,
    ListingParams};

const VALID_ORDER_FIELDS: &[&str] = &["id", "name", "year"];

fn year_not_future(value: &i64, _ctx: &()) -> garde::Result {
    let current = time::OffsetDateTime::now_utc().year() as i64;
    if *value > current {
        Err(garde::Error::new("year cannot be in the future"))
    } else {
        Ok(())
    }
}

/// Write shape: taxonomy referenced by slug, resolved against existing
/// records on insert.
#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub struct CreateTitle {
    #[garde(length(min = 1, max = 256))]
    pub name: String,
    #[garde(custom(year_not_future))]
    pub year: i64,
    #[garde(inner(length(max = 5000)))]
    pub description: Option<String>,
    #[garde(dive)]
    pub category: ValidSlug,
    #[garde(dive)]
    pub genre: Vec<ValidSlug>,
}

/// Read shape: nested taxonomy plus the derived rating, which is the mean
/// review score and absent while the title has no reviews.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Title {
    pub id: i64,
    pub name: String,
    pub year: i64,
    pub description: Option<String>,
    pub category: Category,
    pub genre: Vec<Genre>,
    pub rating: Option<f64>,
}

#[derive(Debug)]
struct TitleRow {
    id: i64,
    name: String,
    year: i64,
    description: Option<String>,
    category: Category,
    rating: Option<f64>,
}

impl sqlx::FromRow<'_, ChosenRow> for TitleRow {
    fn from_row(row: &ChosenRow) -> Result<Self, sqlx::Error> {
        let category = Category {
            id: row.try_get("category_id")?,
            name: row.try_get("category_name")?,
            slug: row.try_get("category_slug")?,
        };
        Ok(TitleRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            year: row.try_get("year")?,
            description: row.try_get("description")?,
            category,
            rating: row.try_get("rating")?,
        })
    }
}

impl TitleRow {
    fn into_title(self, genre: Vec<Genre>) -> Title {
        Title {
            id: self.id,
            name: self.name,
            year: self.year,
            description: self.description,
            category: self.category,
            genre,
            rating: self.rating,
        }
    }
}

/// Listing filters, matching the lookup fields the catalog exposes.
#[derive(Debug, Default, Clone)]
pub struct TitleFilter {
    pub category: Option<String>,
    pub genre: Option<String>,
    pub name: Option<String>,
    pub year: Option<i64>,
}

const SELECT_TITLE: &str = "SELECT t.id, t.name, t.year, t.description, \
    c.id AS category_id, c.name AS category_name, c.slug AS category_slug, \
    (SELECT AVG(r.score) FROM review r WHERE r.title_id = t.id) AS rating \
    FROM title t JOIN category c ON t.category_id = c.id";

fn push_filter(builder: &mut QueryBuilder<'_, crate::ChosenDB>, filter: &TitleFilter) {
    if let Some(category) = &filter.category {
        builder.push(" AND c.slug = ").push_bind(category.clone());
    }
    if let Some(genre) = &filter.genre {
        builder
            .push(
                " AND EXISTS (SELECT 1 FROM title_genre tg JOIN genre g ON tg.genre_id = g.id \
                 WHERE tg.title_id = t.id AND g.slug = ",
            )
            .push_bind(genre.clone())
            .push(")");
    }
    if let Some(name) = &filter.name {
        builder
            .push(" AND t.name LIKE ")
            .push_bind(format!("%{}%", name));
    }
    if let Some(year) = filter.year {
        builder.push(" AND t.year = ").push_bind(year);
    }
}

pub type TitleRepository = TitleRepositoryImpl<crate::Pool>;

pub struct TitleRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> TitleRepositoryImpl<E>
where
    for<'a> &'a E: sqlx::Executor<'c, Database = crate::ChosenDB>
        + sqlx::Acquire<'c, Database = crate::ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    async fn resolve_category(&self, slug: &str) -> Result<i64> {
        sqlx::query_scalar::<_, i64>("SELECT id FROM category WHERE slug = ?")
            .bind(slug)
            .fetch_optional(&self.executor)
            .await?
            .ok_or_else(|| Error::UnknownReference(format!("Category '{slug}'")))
    }

    async fn resolve_genres(&self, slugs: &[ValidSlug]) -> Result<Vec<i64>> {
        let mut ids = Vec::with_capacity(slugs.len());
        for slug in slugs {
            let id = sqlx::query_scalar::<_, i64>("SELECT id FROM genre WHERE slug = ?")
                .bind(slug.as_ref())
                .fetch_optional(&self.executor)
                .await?
                .ok_or_else(|| Error::UnknownReference(format!("Genre '{}'", slug.as_ref())))?;
            ids.push(id);
        }
        Ok(ids)
    }

    pub async fn create(&self, payload: CreateTitle) -> Result<Title> {
        let category_id = self.resolve_category(payload.category.as_ref()).await?;
        let genre_ids = self.resolve_genres(&payload.genre).await?;

        let mut conn = self.executor.acquire().await?;
        let mut transaction = conn.begin().await?;
        let result =
            sqlx::query("INSERT INTO title (name, year, description, category_id) VALUES (?, ?, ?, ?)")
                .bind(&payload.name)
                .bind(payload.year)
                .bind(&payload.description)
                .bind(category_id)
                .execute(&mut *transaction)
                .await?;
        let id = result.last_insert_rowid();
        for genre_id in genre_ids {
            sqlx::query("INSERT INTO title_genre (title_id, genre_id) VALUES (?, ?)")
                .bind(id)
                .bind(genre_id)
                .execute(&mut *transaction)
                .await?;
        }
        transaction.commit().await?;

        self.get(id).await
    }

    pub async fn update(&self, id: i64, payload: CreateTitle) -> Result<Title> {
        let category_id = self.resolve_category(payload.category.as_ref()).await?;
        let genre_ids = self.resolve_genres(&payload.genre).await?;

        let mut conn = self.executor.acquire().await?;
        let mut transaction = conn.begin().await?;
        let result =
            sqlx::query("UPDATE title SET name = ?, year = ?, description = ?, category_id = ? WHERE id = ?")
                .bind(&payload.name)
                .bind(payload.year)
                .bind(&payload.description)
                .bind(category_id)
                .bind(id)
                .execute(&mut *transaction)
                .await?;
        if result.rows_affected() == 0 {
            return Err(Error::RecordNotFound("Title".to_string()));
        }
        sqlx::query("DELETE FROM title_genre WHERE title_id = ?")
            .bind(id)
            .execute(&mut *transaction)
            .await?;
        for genre_id in genre_ids {
            sqlx::query("INSERT INTO title_genre (title_id, genre_id) VALUES (?, ?)")
                .bind(id)
                .bind(genre_id)
                .execute(&mut *transaction)
                .await?;
        }
        transaction.commit().await?;

        self.get(id).await
    }

    async fn genres_of(&self, title_id: i64) -> Result<Vec<Genre>> {
        let genres = sqlx::query_as::<_, Genre>(
            "SELECT g.id, g.name, g.slug FROM genre g \
             JOIN title_genre tg ON tg.genre_id = g.id WHERE tg.title_id = ? ORDER BY g.id",
        )
        .bind(title_id)
        .fetch_all(&self.executor)
        .await?;
        Ok(genres)
    }

    pub async fn get(&self, id: i64) -> Result<Title> {
        let row = sqlx::query_as::<_, TitleRow>(&format!("{SELECT_TITLE} WHERE t.id = ?"))
            .bind(id)
            .fetch_optional(&self.executor)
            .await?
            .ok_or_else(|| Error::RecordNotFound("Title".to_string()))?;
        let genres = self.genres_of(id).await?;
        Ok(row.into_title(genres))
    }

    pub async fn exists(&self, id: i64) -> Result<()> {
        sqlx::query_scalar::<_, i64>("SELECT id FROM title WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.executor)
            .await?
            .map(|_| ())
            .ok_or_else(|| Error::RecordNotFound("Title".to_string()))
    }

    pub async fn list(&self, params: ListingParams, filter: TitleFilter) -> Result<Batch<Title>> {
        let mut count_builder =
            QueryBuilder::new("SELECT count(*) FROM title t JOIN category c ON t.category_id = c.id WHERE 1=1");
        push_filter(&mut count_builder, &filter);
        let total: u64 = count_builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.executor)
            .await? as u64;

        let ordering = params.ordering(VALID_ORDER_FIELDS)?;
        let mut builder = QueryBuilder::new(SELECT_TITLE);
        builder.push(" WHERE 1=1");
        push_filter(&mut builder, &filter);
        if ordering.is_empty() {
            builder.push(" ORDER BY t.id");
        } else {
            // Field names are whitelisted above, safe to splice.
            builder.push(format!(" ORDER BY {ordering}"));
        }
        builder
            .push(" LIMIT ")
            .push_bind(params.limit)
            .push(" OFFSET ")
            .push_bind(params.offset);
        let rows = builder
            .build_query_as::<TitleRow>()
            .fetch_all(&self.executor)
            .await?;

        let mut titles = Vec::with_capacity(rows.len());
        for row in rows {
            let genres = self.genres_of(row.id).await?;
            titles.push(row.into_title(genres));
        }

        Ok(Batch {
            offset: params.offset,
            total,
            rows: titles,
        })
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        let res = sqlx::query("DELETE FROM title WHERE id = ?")
            .bind(id)
            .execute(&self.executor)
            .await?;

        if res.rows_affected() == 0 {
            Err(Error::RecordNotFound("Title".to_string()))
        } else {
            Ok(())
        }
    }
}
