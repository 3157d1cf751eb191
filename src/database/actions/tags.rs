use crate::{
    error::{Error, QueryError},
    schema::{Id, NewTag, Tag},
};

use sqlx::{Pool, Postgres, Transaction};

/// Returns `None` when the name, color or slug is already in use.
pub async fn create_tag(tag: &NewTag, pool: &Pool<Postgres>) -> Result<Option<Tag>, Error> {
    let row: Option<Tag> = sqlx::query_as(
        "INSERT INTO tags (name, color, slug) VALUES ($1, $2, $3) ON CONFLICT DO NOTHING RETURNING *",
    )
    .bind(&tag.name)
    .bind(&tag.color)
    .bind(&tag.slug)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn get_tag(id: Id, pool: &Pool<Postgres>) -> Result<Option<Tag>, Error> {
    let tag: Option<Tag> = sqlx::query_as("SELECT * FROM tags WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(tag)
}

pub async fn list_tags(pool: &Pool<Postgres>) -> Result<Vec<Tag>, Error> {
    let list: Vec<Tag> = sqlx::query_as("SELECT * FROM tags ORDER BY id")
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(list)
}

pub async fn list_recipe_tags(recipe_id: Id, pool: &Pool<Postgres>) -> Result<Vec<Tag>, Error> {
    let list: Vec<Tag> = sqlx::query_as(
        "
        SELECT t.*
        FROM tags t
        INNER JOIN recipe_tags rt ON rt.tag_id = t.id
        WHERE rt.recipe_id = $1
        ORDER BY t.id
    ",
    )
    .bind(recipe_id)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(list)
}

/// Clears the recipe's tag links and sets `tag_ids` in their place.
pub async fn set_recipe_tags(
    recipe_id: Id,
    tag_ids: &[Id],
    tx: &mut Transaction<'_, Postgres>,
) -> Result<(), Error> {
    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut **tx)
        .await
        .map_err(QueryError::from)?;

    sqlx::query(
        "
        INSERT INTO recipe_tags (recipe_id, tag_id)
        SELECT $1, UNNEST($2::INTEGER[])
        ON CONFLICT DO NOTHING
    ",
    )
    .bind(recipe_id)
    .bind(tag_ids)
    .execute(&mut **tx)
    .await
    .map_err(QueryError::from)?;

    Ok(())
}
