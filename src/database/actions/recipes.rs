use crate::{
    error::{Error, QueryError},
    schema::{Id, Recipe, RecipeFilter, RecipePart, ShoppingListRow},
    store::ValidatedRecipe,
};

use sqlx::{Pool, Postgres, QueryBuilder, Transaction};

use super::tags::set_recipe_tags;

fn push_recipe_filter(query_builder: &mut QueryBuilder<'_, Postgres>, filter: &RecipeFilter) {
    query_builder.push(" WHERE TRUE");

    if let Some(author) = filter.author {
        query_builder.push(" AND r.author_id = ").push_bind(author);
    }
    if !filter.tags.is_empty() {
        query_builder
            .push(
                " AND EXISTS (SELECT 1 FROM recipe_tags rt INNER JOIN tags t ON t.id = rt.tag_id WHERE rt.recipe_id = r.id AND t.slug = ANY(",
            )
            .push_bind(filter.tags.clone())
            .push("))");
    }
    if let Some(user_id) = filter.favorited_by {
        query_builder
            .push(" AND EXISTS (SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = ")
            .push_bind(user_id)
            .push(")");
    }
    if let Some(user_id) = filter.in_cart_of {
        query_builder
            .push(" AND EXISTS (SELECT 1 FROM shopping_cart c WHERE c.recipe_id = r.id AND c.user_id = ")
            .push_bind(user_id)
            .push(")");
    }
}

pub async fn fetch_recipes(
    filter: &RecipeFilter,
    limit: i64,
    offset: i64,
    pool: &Pool<Postgres>,
) -> Result<(Vec<Recipe>, i64), Error> {
    let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new("SELECT r.* FROM recipes r");
    push_recipe_filter(&mut query_builder, filter);
    query_builder
        .push(" ORDER BY r.pub_date DESC, r.id DESC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);

    let rows: Vec<Recipe> = query_builder
        .build_query_as()
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    let mut count_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT COUNT(*) FROM recipes r");
    push_recipe_filter(&mut count_builder, filter);

    let total: (i64,) = count_builder
        .build_query_as()
        .fetch_one(pool)
        .await
        .map_err(QueryError::from)?;

    Ok((rows, total.0))
}

pub async fn get_recipe(id: Id, pool: &Pool<Postgres>) -> Result<Option<Recipe>, Error> {
    let row: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn list_author_recipes(
    author_id: Id,
    limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<Vec<Recipe>, Error> {
    let rows: Vec<Recipe> = sqlx::query_as(
        "SELECT * FROM recipes WHERE author_id = $1 ORDER BY pub_date DESC, id DESC LIMIT $2",
    )
    .bind(author_id)
    .bind(limit)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

pub async fn count_author_recipes(author_id: Id, pool: &Pool<Postgres>) -> Result<i64, Error> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM recipes WHERE author_id = $1")
        .bind(author_id)
        .fetch_one(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(count.0)
}

pub async fn list_recipe_parts(
    recipe_id: Id,
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipePart>, Error> {
    let rows: Vec<RecipePart> = sqlx::query_as(
        "
        SELECT rp.recipe_id AS recipe_id, i.id AS ingredient_id, i.name AS name,
            i.measurement_unit AS measurement_unit, rp.amount AS amount
        FROM recipe_parts rp
        INNER JOIN ingredients i ON i.id = rp.ingredient_id
        WHERE rp.recipe_id = $1
        ORDER BY rp.id
    ",
    )
    .bind(recipe_id)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

async fn insert_recipe_parts(
    recipe_id: Id,
    parts: &[(Id, i32)],
    tx: &mut Transaction<'_, Postgres>,
) -> Result<(), Error> {
    if parts.is_empty() {
        return Ok(());
    }

    let mut query_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO recipe_parts (recipe_id, ingredient_id, amount) ");

    query_builder.push_values(parts, |mut b, (ingredient_id, amount)| {
        b.push_bind(recipe_id)
            .push_bind(*ingredient_id)
            .push_bind(*amount);
    });

    query_builder
        .build()
        .execute(&mut **tx)
        .await
        .map_err(QueryError::from)?;

    Ok(())
}

/// Writes the recipe row, its tag links and its ingredient lines in one
/// transaction.
pub async fn create_recipe(
    author_id: Id,
    recipe: &ValidatedRecipe,
    pool: &Pool<Postgres>,
) -> Result<Id, Error> {
    let mut tx = pool.begin().await.map_err(QueryError::from)?;

    let id: (Id,) = sqlx::query_as(
        "
        INSERT INTO recipes (author_id, name, image, text, cooking_time)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
    ",
    )
    .bind(author_id)
    .bind(&recipe.name)
    .bind(recipe.image.as_deref().unwrap_or_default())
    .bind(&recipe.text)
    .bind(recipe.cooking_time)
    .fetch_one(&mut *tx)
    .await
    .map_err(QueryError::from)?;

    set_recipe_tags(id.0, &recipe.tags, &mut tx).await?;
    insert_recipe_parts(id.0, &recipe.parts, &mut tx).await?;

    tx.commit().await.map_err(QueryError::from)?;

    Ok(id.0)
}

/// Updates the scalar fields and replaces tags and ingredient lines
/// wholesale, in one transaction.
pub async fn update_recipe(
    recipe_id: Id,
    recipe: &ValidatedRecipe,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    let mut tx = pool.begin().await.map_err(QueryError::from)?;

    sqlx::query(
        "UPDATE recipes SET name = $1, text = $2, cooking_time = $3, image = COALESCE($4, image) WHERE id = $5",
    )
    .bind(&recipe.name)
    .bind(&recipe.text)
    .bind(recipe.cooking_time)
    .bind(recipe.image.as_deref())
    .bind(recipe_id)
    .execute(&mut *tx)
    .await
    .map_err(QueryError::from)?;

    set_recipe_tags(recipe_id, &recipe.tags, &mut tx).await?;

    sqlx::query("DELETE FROM recipe_parts WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *tx)
        .await
        .map_err(QueryError::from)?;

    insert_recipe_parts(recipe_id, &recipe.parts, &mut tx).await?;

    tx.commit().await.map_err(QueryError::from)?;

    Ok(())
}

pub async fn delete_recipe(recipe_id: Id, pool: &Pool<Postgres>) -> Result<bool, Error> {
    let result = sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(recipe_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(result.rows_affected() > 0)
}

pub async fn fetch_shopping_list(
    user_id: Id,
    pool: &Pool<Postgres>,
) -> Result<Vec<ShoppingListRow>, Error> {
    let rows: Vec<ShoppingListRow> = sqlx::query_as(
        "
        SELECT i.name AS name, i.measurement_unit AS measurement_unit, SUM(rp.amount)::BIGINT AS total
        FROM recipe_parts rp
        INNER JOIN shopping_cart c ON c.recipe_id = rp.recipe_id
        INNER JOIN ingredients i ON i.id = rp.ingredient_id
        WHERE c.user_id = $1
        GROUP BY i.name, i.measurement_unit
        ORDER BY i.name, i.measurement_unit
    ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}
