use futures::TryStreamExt as _;
use garde::Validate;
use kritika_types::{
    claim::Role,
    general::{ValidEmail, ValidUsername},
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{error::Result, Error};

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub struct CreateUser {
    #[garde(dive)]
    pub username: ValidUsername,
    #[garde(dive)]
    pub email: ValidEmail,
    #[garde(skip)]
    pub role: Option<Role>,
    #[garde(skip)]
    pub superuser: Option<bool>,
    #[garde(length(max = 5000))]
    pub bio: Option<String>,
}

/// Partial update, absent fields keep their stored value. Role changes come
/// through here only on the admin path, the self-profile endpoint rejects
/// them before this layer.
#[derive(Debug, Serialize, Deserialize, Clone, Default, Validate)]
pub struct UpdateUser {
    #[garde(dive)]
    pub username: Option<ValidUsername>,
    #[garde(dive)]
    pub email: Option<ValidEmail>,
    #[garde(skip)]
    pub role: Option<Role>,
    #[garde(skip)]
    pub superuser: Option<bool>,
    #[garde(length(max = 5000))]
    pub bio: Option<String>,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct UserInt {
    id: i64,
    username: String,
    email: String,
    role: String,
    is_superuser: bool,
    bio: String,
    created: time::PrimitiveDateTime,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub is_superuser: bool,
    pub bio: String,
    pub created: time::PrimitiveDateTime,
}

impl From<UserInt> for User {
    fn from(value: UserInt) -> Self {
        let role = value.role.parse().unwrap_or_else(|e| {
            warn!("Invalid role stored for user {}: {e}", value.id);
            Role::User
        });
        Self {
            id: value.id,
            username: value.username,
            email: value.email,
            role,
            is_superuser: value.is_superuser,
            bio: value.bio,
            created: value.created,
        }
    }
}

const USER_COLUMNS: &str = "id, username, email, role, is_superuser, bio, created";

pub type UserRepository = UserRepositoryImpl<crate::Pool>;

pub struct UserRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> UserRepositoryImpl<E>
where
    for<'a> &'a E: sqlx::Executor<'c, Database = crate::ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub async fn create(&self, payload: CreateUser) -> Result<User> {
        if self.find_by_email(payload.email.as_ref()).await?.is_some() {
            return Err(Error::AlreadyExists("User with this email".to_string()));
        }
        let role = payload.role.unwrap_or_default();
        let result = sqlx::query(
            "INSERT INTO users (username, email, role, is_superuser, bio) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(payload.username.as_ref())
        .bind(payload.email.as_ref())
        .bind(role.as_str())
        .bind(payload.superuser.unwrap_or(false))
        .bind(payload.bio.unwrap_or_default())
        .execute(&self.executor)
        .await
        .map_err(|e| crate::error::on_unique_violation(e, "User with this username"))?;

        let id = result.last_insert_rowid();
        self.get(id).await
    }

    pub async fn list(&self, limit: usize) -> Result<Vec<User>> {
        let users = sqlx::query_as::<_, UserInt>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY username LIMIT ?"
        ))
        .bind(limit as i64)
        .fetch(&self.executor)
        .map_ok(User::from)
        .try_collect::<Vec<_>>()
        .await?;
        Ok(users)
    }

    pub async fn get(&self, id: i64) -> Result<User> {
        sqlx::query_as::<_, UserInt>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.executor)
            .await?
            .map(User::from)
            .ok_or_else(|| Error::RecordNotFound("User".to_string()))
    }

    pub async fn get_by_username(&self, username: &str) -> Result<User> {
        sqlx::query_as::<_, UserInt>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = ?"
        ))
        .bind(username)
        .fetch_optional(&self.executor)
        .await?
        .map(User::from)
        .ok_or_else(|| Error::RecordNotFound("User".to_string()))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, UserInt>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = ?"
        ))
        .bind(email)
        .fetch_optional(&self.executor)
        .await?
        .map(User::from);
        Ok(user)
    }

    pub async fn update(&self, id: i64, payload: UpdateUser) -> Result<User> {
        let current = self.get(id).await?;
        let username = payload
            .username
            .map(|u| u.as_ref().to_string())
            .unwrap_or(current.username);
        let email = payload
            .email
            .map(|e| e.as_ref().to_string())
            .unwrap_or(current.email);
        let role = payload.role.unwrap_or(current.role);
        let superuser = payload.superuser.unwrap_or(current.is_superuser);
        let bio = payload.bio.unwrap_or(current.bio);

        sqlx::query(
            "UPDATE users SET username = ?, email = ?, role = ?, is_superuser = ?, bio = ? WHERE id = ?",
        )
        .bind(&username)
        .bind(&email)
        .bind(role.as_str())
        .bind(superuser)
        .bind(&bio)
        .bind(id)
        .execute(&self.executor)
        .await
        .map_err(|e| crate::error::on_unique_violation(e, "User with this username or email"))?;

        self.get(id).await
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        let res = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.executor)
            .await?;

        if res.rows_affected() == 0 {
            Err(Error::RecordNotFound("User".to_string()))
        } else {
            Ok(())
        }
    }

    /// Single identity-matching rule for signup: an email or username that is
    /// already taken must belong to the same record as the other supplied
    /// field, otherwise the request is ambiguous and rejected. A full match
    /// makes repeated signup idempotent.
    pub async fn ensure_identity(
        &self,
        email: &ValidEmail,
        username: &ValidUsername,
    ) -> Result<User> {
        if let Some(user) = self.find_by_email(email.as_ref()).await? {
            return if user.username == username.as_ref() {
                Ok(user)
            } else {
                Err(Error::IdentityConflict(
                    "Another user with this email already exists".to_string(),
                ))
            };
        }

        match self.get_by_username(username.as_ref()).await {
            // Email lookup missed, so an existing record owns a different email.
            Ok(_) => Err(Error::IdentityConflict(
                "Another user with this username already exists".to_string(),
            )),
            Err(Error::RecordNotFound(_)) => {
                self.create(CreateUser {
                    username: username.clone(),
                    email: email.clone(),
                    role: None,
                    superuser: None,
                    bio: None,
                })
                .await
            }
            Err(e) => Err(e),
        }
    }

    pub async fn set_confirmation(&self, id: i64, digest: &str) -> Result<()> {
        let res = sqlx::query("UPDATE users SET confirmation_code = ? WHERE id = ?")
            .bind(digest)
            .bind(id)
            .execute(&self.executor)
            .await?;
        if res.rows_affected() == 0 {
            Err(Error::RecordNotFound("User".to_string()))
        } else {
            Ok(())
        }
    }

    pub async fn confirmation_digest(&self, id: i64) -> Result<Option<String>> {
        let digest: Option<Option<String>> =
            sqlx::query_scalar("SELECT confirmation_code FROM users WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.executor)
                .await?;
        digest.ok_or_else(|| Error::RecordNotFound("User".to_string()))
    }

    pub async fn clear_confirmation(&self, id: i64) -> Result<()> {
        sqlx::query("UPDATE users SET confirmation_code = NULL WHERE id = ?")
            .bind(id)
            .execute(&self.executor)
            .await?;
        Ok(())
    }
}
