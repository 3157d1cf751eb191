use crate::{
    error::{Error, QueryError},
    schema::{Id, Ledger},
};

use sqlx::{Pool, Postgres};

// Table and column names come from `Ledger`, never from user input.

pub async fn is_in_ledger(
    ledger: Ledger,
    user_id: Id,
    target_id: Id,
    pool: &Pool<Postgres>,
) -> Result<bool, Error> {
    let (table, column) = (ledger.table(), ledger.target_column());

    let result: Option<(Id,)> = sqlx::query_as(&format!(
        "SELECT user_id FROM {table} WHERE user_id = $1 AND {column} = $2"
    ))
    .bind(user_id)
    .bind(target_id)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(result.is_some())
}

pub async fn add_to_ledger(
    ledger: Ledger,
    user_id: Id,
    target_id: Id,
    pool: &Pool<Postgres>,
) -> Result<bool, Error> {
    let (table, column) = (ledger.table(), ledger.target_column());

    let result = sqlx::query(&format!(
        "INSERT INTO {table} (user_id, {column}) VALUES ($1, $2) ON CONFLICT DO NOTHING"
    ))
    .bind(user_id)
    .bind(target_id)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(result.rows_affected() > 0)
}

pub async fn remove_from_ledger(
    ledger: Ledger,
    user_id: Id,
    target_id: Id,
    pool: &Pool<Postgres>,
) -> Result<bool, Error> {
    let (table, column) = (ledger.table(), ledger.target_column());

    let result = sqlx::query(&format!(
        "DELETE FROM {table} WHERE user_id = $1 AND {column} = $2"
    ))
    .bind(user_id)
    .bind(target_id)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(result.rows_affected() > 0)
}
