use crate::{
    error::{Error, QueryError},
    schema::{Id, NewUser, User},
};

use sqlx::{Pool, Postgres};

pub async fn get_user_by_email(email: &str, pool: &Pool<Postgres>) -> Result<Option<User>, Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
        .bind(email)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn get_user_by_id(user_id: Id, pool: &Pool<Postgres>) -> Result<Option<User>, Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

/// Inserts a user whose password is already hashed. Returns `None` when the
/// email or username is taken.
pub async fn register_user(user: NewUser, pool: &Pool<Postgres>) -> Result<Option<User>, Error> {
    let row: Option<User> = sqlx::query_as(
        "
        INSERT INTO users (email, username, first_name, last_name, password, role)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT DO NOTHING RETURNING *;
    ",
    )
    .bind(user.email)
    .bind(user.username)
    .bind(user.first_name)
    .bind(user.last_name)
    .bind(user.password)
    .bind(user.role)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(row)
}

/// Rewrites the mutable columns of an existing user. Returns `None` when the
/// new email or username collides with another account.
pub async fn update_user(user: &User, pool: &Pool<Postgres>) -> Result<Option<User>, Error> {
    let result: Result<Option<User>, sqlx::Error> = sqlx::query_as(
        "
        UPDATE users
        SET email = $2, username = $3, first_name = $4, last_name = $5, password = $6
        WHERE id = $1
        RETURNING *;
    ",
    )
    .bind(user.id)
    .bind(&user.email)
    .bind(&user.username)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(&user.password)
    .fetch_optional(pool)
    .await;

    match result {
        Ok(row) => Ok(row),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Ok(None),
        Err(e) => Err(QueryError::from(e).into()),
    }
}

pub async fn list_users(
    limit: i64,
    offset: i64,
    pool: &Pool<Postgres>,
) -> Result<(Vec<User>, i64), Error> {
    let rows: Vec<User> = sqlx::query_as("SELECT * FROM users ORDER BY id LIMIT $1 OFFSET $2")
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await
        .map_err(QueryError::from)?;

    Ok((rows, total.0))
}

pub async fn list_subscriptions(
    user_id: Id,
    limit: i64,
    offset: i64,
    pool: &Pool<Postgres>,
) -> Result<(Vec<User>, i64), Error> {
    let rows: Vec<User> = sqlx::query_as(
        "
        SELECT u.*
        FROM subscriptions s
        INNER JOIN users u ON u.id = s.author_id
        WHERE s.user_id = $1
        ORDER BY u.id
        LIMIT $2 OFFSET $3
    ",
    )
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM subscriptions WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await
        .map_err(QueryError::from)?;

    Ok((rows, total.0))
}
