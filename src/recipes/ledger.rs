use crate::{
    error::{Error, HtmlError},
    form::SubscriptionQuery,
    jwt::Identity,
    pagination::{PageContext, PageRequest},
    permissions::ActionType,
    schema::{Id, Ledger, User},
    store::Store,
};

use super::read_model::{find_recipe, subscription_view, ShortRecipe, SubscriptionView};

fn messages(ledger: Ledger) -> (&'static str, &'static str) {
    match ledger {
        Ledger::Favorites => (
            "Recipe is already in favorites",
            "Recipe is not in favorites",
        ),
        Ledger::ShoppingCart => (
            "Recipe is already in the shopping cart",
            "Recipe is not in the shopping cart",
        ),
        Ledger::Subscriptions => (
            "You are already subscribed to this author",
            "You are not subscribed to this author",
        ),
    }
}

/// Inserts the pair, reporting a conflict when it is already present.
/// The unique constraint covers the race between the check and the insert.
async fn add_entry(
    store: &dyn Store,
    ledger: Ledger,
    user_id: Id,
    target_id: Id,
) -> Result<(), Error> {
    let (exists, _) = messages(ledger);

    if store.ledger_contains(ledger, user_id, target_id).await?
        || !store.ledger_insert(ledger, user_id, target_id).await?
    {
        return Err(HtmlError::Conflict.new(exists));
    }
    Ok(())
}

/// Removal is not idempotent: a missing pair is a 400.
async fn remove_entry(
    store: &dyn Store,
    ledger: Ledger,
    user_id: Id,
    target_id: Id,
) -> Result<(), Error> {
    let (_, missing) = messages(ledger);

    if !store.ledger_delete(ledger, user_id, target_id).await? {
        return Err(HtmlError::InvalidRequest.new(missing));
    }
    Ok(())
}

/// Adds a recipe to the viewer's favorites or shopping cart.
pub async fn add_recipe(
    store: &dyn Store,
    ledger: Ledger,
    recipe_id: Id,
    identity: &Identity,
) -> Result<ShortRecipe, Error> {
    identity.authenticate(ActionType::ManageOwnLedgers)?;
    let recipe = find_recipe(store, recipe_id).await?;

    add_entry(store, ledger, identity.id, recipe.id).await?;
    Ok(ShortRecipe::from(&recipe))
}

pub async fn remove_recipe(
    store: &dyn Store,
    ledger: Ledger,
    recipe_id: Id,
    identity: &Identity,
) -> Result<(), Error> {
    identity.authenticate(ActionType::ManageOwnLedgers)?;
    let recipe = find_recipe(store, recipe_id).await?;

    remove_entry(store, ledger, identity.id, recipe.id).await
}

pub async fn find_user(store: &dyn Store, user_id: Id) -> Result<User, Error> {
    store
        .get_user_by_id(user_id)
        .await?
        .ok_or_else(|| HtmlError::NotFound.new("No user exists with specified id"))
}

pub async fn subscribe(
    store: &dyn Store,
    author_id: Id,
    identity: &Identity,
    recipes_limit: Option<i64>,
) -> Result<SubscriptionView, Error> {
    identity.authenticate(ActionType::ManageOwnLedgers)?;
    if author_id == identity.id {
        return Err(HtmlError::InvalidRequest.new("You cannot subscribe to yourself"));
    }
    let author = find_user(store, author_id).await?;

    add_entry(store, Ledger::Subscriptions, identity.id, author.id).await?;
    subscription_view(store, &author, identity, recipes_limit).await
}

pub async fn unsubscribe(
    store: &dyn Store,
    author_id: Id,
    identity: &Identity,
) -> Result<(), Error> {
    identity.authenticate(ActionType::ManageOwnLedgers)?;
    let author = find_user(store, author_id).await?;

    remove_entry(store, Ledger::Subscriptions, identity.id, author.id).await
}

pub async fn list_subscriptions(
    store: &dyn Store,
    query: &SubscriptionQuery,
    identity: &Identity,
) -> Result<PageContext<SubscriptionView>, Error> {
    let user_id = identity.require()?;
    let request = PageRequest::new(query.page, query.limit);

    let (authors, total) = store
        .list_subscriptions(user_id, request.page_size, request.offset())
        .await?;

    let mut views = Vec::with_capacity(authors.len());
    for author in &authors {
        views.push(subscription_view(store, author, identity, query.recipes_limit).await?);
    }

    Ok(PageContext::from_rows(views, total, request))
}
