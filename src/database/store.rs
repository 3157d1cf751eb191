//! Persistence seam.
//!
//! Core operations talk to a `Store` so they run unchanged against
//! PostgreSQL in production and against [`MemoryStore`](super::memory::MemoryStore)
//! in tests. Writes that touch several tables (`insert_recipe`,
//! `replace_recipe`) must be atomic.

use std::sync::Arc;

use async_trait::async_trait;

use super::{
    error::Error,
    schema::{
        Id, Ingredient, Ledger, NewIngredient, NewTag, NewUser, Recipe, RecipeFilter, RecipePart,
        ShoppingListRow, Tag, User,
    },
};

/// A recipe that passed validation and is ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRecipe {
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
    /// `None` keeps the stored image on update.
    pub image: Option<String>,
    pub tags: Vec<Id>,
    /// `(ingredient_id, amount)` in payload order, ingredient ids unique.
    pub parts: Vec<(Id, i32)>,
}

pub type SharedStore = Arc<dyn Store>;

#[async_trait]
pub trait Store: Send + Sync {
    // Users
    async fn insert_user(&self, user: NewUser) -> Result<Option<User>, Error>;
    async fn get_user_by_id(&self, id: Id) -> Result<Option<User>, Error>;
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, Error>;
    /// Rewrites email, username, names and password hash. `None` when the
    /// email or username belongs to another account, or the user is gone.
    async fn update_user(&self, user: &User) -> Result<Option<User>, Error>;
    async fn list_users(&self, limit: i64, offset: i64) -> Result<(Vec<User>, i64), Error>;

    // Catalog
    async fn list_ingredients(&self, name_prefix: Option<&str>) -> Result<Vec<Ingredient>, Error>;
    async fn get_ingredient(&self, id: Id) -> Result<Option<Ingredient>, Error>;
    async fn count_ingredients(&self) -> Result<i64, Error>;
    async fn insert_ingredients(&self, ingredients: &[NewIngredient]) -> Result<u64, Error>;
    async fn list_tags(&self) -> Result<Vec<Tag>, Error>;
    async fn get_tag(&self, id: Id) -> Result<Option<Tag>, Error>;
    /// `None` when name, color or slug is already taken.
    async fn insert_tag(&self, tag: &NewTag) -> Result<Option<Tag>, Error>;

    // Recipes
    async fn get_recipe(&self, id: Id) -> Result<Option<Recipe>, Error>;
    async fn list_recipes(
        &self,
        filter: &RecipeFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Recipe>, i64), Error>;
    /// Newest first, at most `limit` when given.
    async fn list_author_recipes(
        &self,
        author_id: Id,
        limit: Option<i64>,
    ) -> Result<Vec<Recipe>, Error>;
    async fn count_author_recipes(&self, author_id: Id) -> Result<i64, Error>;
    async fn list_recipe_parts(&self, recipe_id: Id) -> Result<Vec<RecipePart>, Error>;
    async fn list_recipe_tags(&self, recipe_id: Id) -> Result<Vec<Tag>, Error>;
    async fn insert_recipe(&self, author_id: Id, recipe: &ValidatedRecipe) -> Result<Id, Error>;
    async fn replace_recipe(&self, recipe_id: Id, recipe: &ValidatedRecipe) -> Result<(), Error>;
    async fn delete_recipe(&self, recipe_id: Id) -> Result<bool, Error>;

    // Ledgers
    async fn ledger_contains(&self, ledger: Ledger, user_id: Id, target_id: Id)
        -> Result<bool, Error>;
    /// `false` when the pair already existed.
    async fn ledger_insert(&self, ledger: Ledger, user_id: Id, target_id: Id)
        -> Result<bool, Error>;
    /// `false` when there was nothing to delete.
    async fn ledger_delete(&self, ledger: Ledger, user_id: Id, target_id: Id)
        -> Result<bool, Error>;
    async fn list_subscriptions(
        &self,
        user_id: Id,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<User>, i64), Error>;

    /// Ingredient totals over every recipe in the user's cart, ordered by
    /// name then unit.
    async fn shopping_list(&self, user_id: Id) -> Result<Vec<ShoppingListRow>, Error>;
}
