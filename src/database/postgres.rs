use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, Executor, Pool, Postgres};

use super::{
    actions,
    error::{Error, QueryError},
    schema::{
        Id, Ingredient, Ledger, NewIngredient, NewTag, NewUser, Recipe, RecipeFilter, RecipePart,
        ShoppingListRow, Tag, User,
    },
    store::{Store, ValidatedRecipe},
};

const SCHEMA: &str = include_str!("../../sql/schema.sql");

pub struct PgStore {
    pool: Pool<Postgres>,
}

impl PgStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(QueryError::from)?;

        Ok(Self::new(pool))
    }

    /// Creates missing tables. Every statement in the schema is idempotent.
    pub async fn init_schema(&self) -> Result<(), Error> {
        self.pool.execute(SCHEMA).await.map_err(QueryError::from)?;
        log::info!("Database schema ready");
        Ok(())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn insert_user(&self, user: NewUser) -> Result<Option<User>, Error> {
        actions::register_user(user, &self.pool).await
    }

    async fn get_user_by_id(&self, id: Id) -> Result<Option<User>, Error> {
        actions::get_user_by_id(id, &self.pool).await
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, Error> {
        actions::get_user_by_email(email, &self.pool).await
    }

    async fn update_user(&self, user: &User) -> Result<Option<User>, Error> {
        actions::update_user(user, &self.pool).await
    }

    async fn list_users(&self, limit: i64, offset: i64) -> Result<(Vec<User>, i64), Error> {
        actions::list_users(limit, offset, &self.pool).await
    }

    async fn list_ingredients(&self, name_prefix: Option<&str>) -> Result<Vec<Ingredient>, Error> {
        actions::list_ingredients(name_prefix, &self.pool).await
    }

    async fn get_ingredient(&self, id: Id) -> Result<Option<Ingredient>, Error> {
        actions::get_ingredient(id, &self.pool).await
    }

    async fn count_ingredients(&self) -> Result<i64, Error> {
        actions::count_ingredients(&self.pool).await
    }

    async fn insert_ingredients(&self, ingredients: &[NewIngredient]) -> Result<u64, Error> {
        actions::insert_ingredients(ingredients, &self.pool).await
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, Error> {
        actions::list_tags(&self.pool).await
    }

    async fn get_tag(&self, id: Id) -> Result<Option<Tag>, Error> {
        actions::get_tag(id, &self.pool).await
    }

    async fn insert_tag(&self, tag: &NewTag) -> Result<Option<Tag>, Error> {
        actions::create_tag(tag, &self.pool).await
    }

    async fn get_recipe(&self, id: Id) -> Result<Option<Recipe>, Error> {
        actions::get_recipe(id, &self.pool).await
    }

    async fn list_recipes(
        &self,
        filter: &RecipeFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Recipe>, i64), Error> {
        actions::fetch_recipes(filter, limit, offset, &self.pool).await
    }

    async fn list_author_recipes(
        &self,
        author_id: Id,
        limit: Option<i64>,
    ) -> Result<Vec<Recipe>, Error> {
        actions::list_author_recipes(author_id, limit, &self.pool).await
    }

    async fn count_author_recipes(&self, author_id: Id) -> Result<i64, Error> {
        actions::count_author_recipes(author_id, &self.pool).await
    }

    async fn list_recipe_parts(&self, recipe_id: Id) -> Result<Vec<RecipePart>, Error> {
        actions::list_recipe_parts(recipe_id, &self.pool).await
    }

    async fn list_recipe_tags(&self, recipe_id: Id) -> Result<Vec<Tag>, Error> {
        actions::list_recipe_tags(recipe_id, &self.pool).await
    }

    async fn insert_recipe(&self, author_id: Id, recipe: &ValidatedRecipe) -> Result<Id, Error> {
        actions::create_recipe(author_id, recipe, &self.pool).await
    }

    async fn replace_recipe(&self, recipe_id: Id, recipe: &ValidatedRecipe) -> Result<(), Error> {
        actions::update_recipe(recipe_id, recipe, &self.pool).await
    }

    async fn delete_recipe(&self, recipe_id: Id) -> Result<bool, Error> {
        actions::delete_recipe(recipe_id, &self.pool).await
    }

    async fn ledger_contains(
        &self,
        ledger: Ledger,
        user_id: Id,
        target_id: Id,
    ) -> Result<bool, Error> {
        actions::is_in_ledger(ledger, user_id, target_id, &self.pool).await
    }

    async fn ledger_insert(
        &self,
        ledger: Ledger,
        user_id: Id,
        target_id: Id,
    ) -> Result<bool, Error> {
        actions::add_to_ledger(ledger, user_id, target_id, &self.pool).await
    }

    async fn ledger_delete(
        &self,
        ledger: Ledger,
        user_id: Id,
        target_id: Id,
    ) -> Result<bool, Error> {
        actions::remove_from_ledger(ledger, user_id, target_id, &self.pool).await
    }

    async fn list_subscriptions(
        &self,
        user_id: Id,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<User>, i64), Error> {
        actions::list_subscriptions(user_id, limit, offset, &self.pool).await
    }

    async fn shopping_list(&self, user_id: Id) -> Result<Vec<ShoppingListRow>, Error> {
        actions::fetch_shopping_list(user_id, &self.pool).await
    }
}
