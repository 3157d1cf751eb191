//! Client-facing projections.
//!
//! Every recipe leaving the service goes through [`recipe_view`], which is
//! a function of the stored recipe and the identity looking at it.

use serde::Serialize;

use crate::{
    error::{Error, HtmlError},
    form::RecipeQuery,
    jwt::Identity,
    pagination::{PageContext, PageRequest},
    schema::{Id, Ledger, Recipe, RecipeFilter, RecipePart, Tag, User},
    store::Store,
};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UserView {
    pub email: String,
    pub id: Id,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct IngredientLineView {
    pub id: Id,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

impl From<RecipePart> for IngredientLineView {
    fn from(part: RecipePart) -> Self {
        Self {
            id: part.ingredient_id,
            name: part.name,
            measurement_unit: part.measurement_unit,
            amount: part.amount,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RecipeView {
    pub id: Id,
    pub tags: Vec<Tag>,
    pub author: Option<UserView>,
    pub ingredients: Vec<IngredientLineView>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
}

/// Compact recipe used by ledger responses and subscription listings.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ShortRecipe {
    pub id: Id,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

impl From<&Recipe> for ShortRecipe {
    fn from(recipe: &Recipe) -> Self {
        Self {
            id: recipe.id,
            name: recipe.name.to_owned(),
            image: recipe.image.to_owned(),
            cooking_time: recipe.cooking_time,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SubscriptionView {
    #[serde(flatten)]
    pub author: UserView,
    pub recipes: Vec<ShortRecipe>,
    pub recipes_count: i64,
}

/// Why a recipe is being projected. A freshly created recipe never reports
/// viewer memberships.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    Read,
    Creation,
}

async fn in_ledger(
    store: &dyn Store,
    ledger: Ledger,
    viewer: &Identity,
    target_id: Id,
) -> Result<bool, Error> {
    match viewer.user_id() {
        Some(user_id) => store.ledger_contains(ledger, user_id, target_id).await,
        None => Ok(false),
    }
}

pub async fn user_view(
    store: &dyn Store,
    user: &User,
    viewer: &Identity,
) -> Result<UserView, Error> {
    let is_subscribed = match viewer.user_id() {
        Some(user_id) if user_id == user.id => false,
        _ => in_ledger(store, Ledger::Subscriptions, viewer, user.id).await?,
    };

    Ok(UserView {
        email: user.email.to_owned(),
        id: user.id,
        username: user.username.to_owned(),
        first_name: user.first_name.to_owned(),
        last_name: user.last_name.to_owned(),
        is_subscribed,
    })
}

pub async fn recipe_view(
    store: &dyn Store,
    recipe: &Recipe,
    viewer: &Identity,
    projection: Projection,
) -> Result<RecipeView, Error> {
    let author = match recipe.author_id {
        Some(author_id) => match store.get_user_by_id(author_id).await? {
            Some(user) => Some(user_view(store, &user, viewer).await?),
            None => None,
        },
        None => None,
    };

    let (is_favorited, is_in_shopping_cart) = match projection {
        Projection::Creation => (false, false),
        Projection::Read => (
            in_ledger(store, Ledger::Favorites, viewer, recipe.id).await?,
            in_ledger(store, Ledger::ShoppingCart, viewer, recipe.id).await?,
        ),
    };

    let ingredients = store
        .list_recipe_parts(recipe.id)
        .await?
        .into_iter()
        .map(IngredientLineView::from)
        .collect();

    Ok(RecipeView {
        id: recipe.id,
        tags: store.list_recipe_tags(recipe.id).await?,
        author,
        ingredients,
        is_favorited,
        is_in_shopping_cart,
        name: recipe.name.to_owned(),
        image: recipe.image.to_owned(),
        text: recipe.text.to_owned(),
        cooking_time: recipe.cooking_time,
    })
}

pub async fn subscription_view(
    store: &dyn Store,
    author: &User,
    viewer: &Identity,
    recipes_limit: Option<i64>,
) -> Result<SubscriptionView, Error> {
    let recipes = store
        .list_author_recipes(author.id, recipes_limit.map(|limit| limit.max(0)))
        .await?;

    Ok(SubscriptionView {
        author: user_view(store, author, viewer).await?,
        recipes: recipes.iter().map(ShortRecipe::from).collect(),
        recipes_count: store.count_author_recipes(author.id).await?,
    })
}

pub async fn find_recipe(store: &dyn Store, recipe_id: Id) -> Result<Recipe, Error> {
    store
        .get_recipe(recipe_id)
        .await?
        .ok_or_else(|| HtmlError::NotFound.new("No recipe exists with specified id"))
}

pub async fn retrieve_recipe(
    store: &dyn Store,
    recipe_id: Id,
    viewer: &Identity,
) -> Result<RecipeView, Error> {
    let recipe = find_recipe(store, recipe_id).await?;
    recipe_view(store, &recipe, viewer, Projection::Read).await
}

/// Paginated recipe listing, newest first. Membership filters only apply
/// to authenticated viewers.
pub async fn list_recipes(
    store: &dyn Store,
    query: &RecipeQuery,
    viewer: &Identity,
) -> Result<PageContext<RecipeView>, Error> {
    let (favorited, in_cart) = (query.favorited()?, query.in_shopping_cart()?);
    let viewer_id = viewer.user_id();
    let filter = RecipeFilter {
        author: query.author,
        tags: query.tag_slugs(),
        favorited_by: viewer_id.filter(|_| favorited),
        in_cart_of: viewer_id.filter(|_| in_cart),
    };

    let request = PageRequest::new(query.page, query.limit);
    let (recipes, total) = store
        .list_recipes(&filter, request.page_size, request.offset())
        .await?;

    let mut views = Vec::with_capacity(recipes.len());
    for recipe in &recipes {
        views.push(recipe_view(store, recipe, viewer, Projection::Read).await?);
    }

    Ok(PageContext::from_rows(views, total, request))
}
