use secrecy::Secret;

use sqlx::prelude::FromRow;
use sqlx::PgExecutor;

use uuid::Uuid;

/// New API user record. Account management itself is owned by the user
/// directory service; this table only backs request authentication.
#[derive(Debug)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub is_admin: bool,
}

#[derive(Debug, FromRow)]
pub struct UserCredentials {
    pub id: Uuid,
    pub password_hash: String,
    pub is_admin: bool,
}

impl UserCredentials {
    pub fn password_hash(&self) -> Secret<String> {
        Secret::new(self.password_hash.clone())
    }
}

pub struct UsersRepo;

impl UsersRepo {
    #[tracing::instrument("Insert a new user record", skip(executor, new_user))]
    pub async fn insert<'conn>(
        executor: impl PgExecutor<'conn>,
        new_user: &NewUser,
    ) -> sqlx::Result<Uuid> {
        sqlx::query_scalar::<_, Uuid>(
            "insert into users(username, password_hash, is_admin) \
             values ($1, $2, $3) returning id",
        )
        .bind(&new_user.username)
        .bind(&new_user.password_hash)
        .bind(new_user.is_admin)
        .fetch_one(executor)
        .await
    }

    pub async fn fetch_credentials_by_username<'conn>(
        executor: impl PgExecutor<'conn>,
        username: &str,
    ) -> sqlx::Result<Option<UserCredentials>> {
        sqlx::query_as::<_, UserCredentials>(
            "select id, password_hash, is_admin from users where username=$1",
        )
        .bind(username)
        .fetch_optional(executor)
        .await
    }
}
