/// Taxonomy entities (Category, Genre) share one shape: a name plus a unique,
/// immutable slug used as the lookup key. The repository is generated once
/// here instead of being written out per entity.
#[macro_export]
macro_rules! value_repository {
    ($entity:ident, $table:literal) => {
        paste::paste! {
            #[derive(Debug, serde::Serialize, serde::Deserialize, Clone, sqlx::FromRow)]
            pub struct $entity {
                pub id: i64,
                pub name: String,
                pub slug: String,
            }

            #[derive(Debug, serde::Serialize, serde::Deserialize, Clone, garde::Validate)]
            pub struct [<Create $entity>] {
                #[garde(length(min = 1, max = 256))]
                pub name: String,
                #[garde(dive)]
                pub slug: ::kritika_types::general::ValidSlug,
            }

            pub type [<$entity Repository>] = [<$entity RepositoryImpl>]<$crate::Pool>;

            pub struct [<$entity RepositoryImpl>]<E> {
                executor: E,
            }

            impl<'c, E> [<$entity RepositoryImpl>]<E>
            where
                for<'a> &'a E: sqlx::Executor<'c, Database = $crate::ChosenDB>,
            {
                pub fn new(executor: E) -> Self {
                    Self { executor }
                }

                pub async fn create(
                    &self,
                    payload: [<Create $entity>],
                ) -> $crate::error::Result<$entity> {
                    let result = sqlx::query(concat!(
                        "INSERT INTO ",
                        $table,
                        " (name, slug) VALUES (?, ?)"
                    ))
                    .bind(&payload.name)
                    .bind(payload.slug.as_ref())
                    .execute(&self.executor)
                    .await
                    .map_err(|e| {
                        $crate::error::on_unique_violation(
                            e,
                            concat!(stringify!($entity), " with this slug"),
                        )
                    })?;

                    let id = result.last_insert_rowid();
                    self.get(id).await
                }

                pub async fn list(
                    &self,
                    search: Option<&str>,
                ) -> $crate::error::Result<Vec<$entity>> {
                    use futures::{StreamExt as _, TryStreamExt as _};
                    let query = match search {
                        Some(term) => {
                            let pattern = format!("%{}%", term);
                            sqlx::query_as::<_, $entity>(concat!(
                                "SELECT id, name, slug FROM ",
                                $table,
                                " WHERE name LIKE ? OR slug LIKE ? ORDER BY id"
                            ))
                            .bind(pattern.clone())
                            .bind(pattern)
                        }
                        None => sqlx::query_as::<_, $entity>(concat!(
                            "SELECT id, name, slug FROM ",
                            $table,
                            " ORDER BY id"
                        )),
                    };
                    let records = query
                        .fetch(&self.executor)
                        .take($crate::MAX_LIMIT)
                        .try_collect::<Vec<_>>()
                        .await?;
                    Ok(records)
                }

                pub async fn get(&self, id: i64) -> $crate::error::Result<$entity> {
                    sqlx::query_as::<_, $entity>(concat!(
                        "SELECT id, name, slug FROM ",
                        $table,
                        " WHERE id = ?"
                    ))
                    .bind(id)
                    .fetch_optional(&self.executor)
                    .await?
                    .ok_or_else(|| {
                        $crate::Error::RecordNotFound(stringify!($entity).to_string())
                    })
                }

                pub async fn get_by_slug(&self, slug: &str) -> $crate::error::Result<$entity> {
                    sqlx::query_as::<_, $entity>(concat!(
                        "SELECT id, name, slug FROM ",
                        $table,
                        " WHERE slug = ?"
                    ))
                    .bind(slug)
                    .fetch_optional(&self.executor)
                    .await?
                    .ok_or_else(|| {
                        $crate::Error::RecordNotFound(stringify!($entity).to_string())
                    })
                }

                pub async fn delete_by_slug(&self, slug: &str) -> $crate::error::Result<()> {
                    let res = sqlx::query(concat!("DELETE FROM ", $table, " WHERE slug = ?"))
                        .bind(slug)
                        .execute(&self.executor)
                        .await?;

                    if res.rows_affected() == 0 {
                        Err($crate::Error::RecordNotFound(stringify!($entity).to_string()))
                    } else {
                        Ok(())
                    }
                }
            }
        }
    };
}
