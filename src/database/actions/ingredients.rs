use crate::{
    error::{Error, QueryError},
    schema::{Id, Ingredient, NewIngredient},
};

use sqlx::{Pool, Postgres, QueryBuilder};

const INSERT_CHUNK: usize = 1000;

pub async fn list_ingredients(
    name_prefix: Option<&str>,
    pool: &Pool<Postgres>,
) -> Result<Vec<Ingredient>, Error> {
    let rows: Vec<Ingredient> = match name_prefix {
        Some(prefix) => {
            sqlx::query_as("SELECT * FROM ingredients WHERE name ILIKE $1 ORDER BY name, id")
                .bind(format!("{}%", escape_like(prefix)))
                .fetch_all(pool)
                .await
                .map_err(QueryError::from)?
        }
        None => sqlx::query_as("SELECT * FROM ingredients ORDER BY name, id")
            .fetch_all(pool)
            .await
            .map_err(QueryError::from)?,
    };

    Ok(rows)
}

pub async fn get_ingredient(id: Id, pool: &Pool<Postgres>) -> Result<Option<Ingredient>, Error> {
    let row: Option<Ingredient> = sqlx::query_as("SELECT * FROM ingredients WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn count_ingredients(pool: &Pool<Postgres>) -> Result<i64, Error> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM ingredients")
        .fetch_one(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(count.0)
}

pub async fn insert_ingredients(
    ingredients: &[NewIngredient],
    pool: &Pool<Postgres>,
) -> Result<u64, Error> {
    let mut inserted = 0;

    for chunk in ingredients.chunks(INSERT_CHUNK) {
        let mut query_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO ingredients (name, measurement_unit) ");

        query_builder.push_values(chunk, |mut b, ingredient| {
            b.push_bind(ingredient.name.to_owned())
                .push_bind(ingredient.measurement_unit.to_owned());
        });

        let result = query_builder
            .build()
            .execute(pool)
            .await
            .map_err(QueryError::from)?;

        inserted += result.rows_affected();
    }

    Ok(inserted)
}

fn escape_like(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::escape_like;

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("sugar"), "sugar");
    }
}
