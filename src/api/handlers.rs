use std::sync::Arc;

use serde::Serialize;
use warp::{
    http::StatusCode,
    reject::Rejection,
    reply::{self, Reply, Response},
};

use crate::{
    accounts, catalog,
    constants::SHOPPING_LIST_FILENAME,
    form::{
        IngredientQuery, LoginForm, ProfileForm, RecipeForm, RecipeQuery, RegisterForm,
        SetPasswordForm, SubscriptionQuery, UserQuery,
    },
    jwt::Identity,
    ledger, read_model,
    schema::{Id, Ledger, NewTag},
    shopping_list::{cart_totals, render_shopping_list},
    upsert,
};

use super::state::State;

type HandlerResult = Result<Response, Rejection>;

fn json<T: Serialize>(body: &T, status: StatusCode) -> Response {
    reply::with_status(reply::json(body), status).into_response()
}

fn ok<T: Serialize>(body: &T) -> HandlerResult {
    Ok(json(body, StatusCode::OK))
}

fn created<T: Serialize>(body: &T) -> HandlerResult {
    Ok(json(body, StatusCode::CREATED))
}

fn no_content() -> HandlerResult {
    Ok(StatusCode::NO_CONTENT.into_response())
}

// Recipes

pub async fn list_recipes(
    query: RecipeQuery,
    identity: Identity,
    state: Arc<State>,
) -> HandlerResult {
    ok(&read_model::list_recipes(state.store.as_ref(), &query, &identity).await?)
}

pub async fn retrieve_recipe(
    recipe_id: Id,
    identity: Identity,
    state: Arc<State>,
) -> HandlerResult {
    ok(&read_model::retrieve_recipe(state.store.as_ref(), recipe_id, &identity).await?)
}

pub async fn create_recipe(
    identity: Identity,
    form: RecipeForm,
    state: Arc<State>,
) -> HandlerResult {
    created(&upsert::create_recipe(state.store.as_ref(), &form, &identity).await?)
}

pub async fn update_recipe(
    recipe_id: Id,
    identity: Identity,
    form: RecipeForm,
    state: Arc<State>,
) -> HandlerResult {
    ok(&upsert::update_recipe(state.store.as_ref(), recipe_id, &form, &identity).await?)
}

pub async fn delete_recipe(recipe_id: Id, identity: Identity, state: Arc<State>) -> HandlerResult {
    upsert::delete_recipe(state.store.as_ref(), recipe_id, &identity).await?;
    no_content()
}

pub async fn add_to_ledger(
    recipe_id: Id,
    kind: Ledger,
    identity: Identity,
    state: Arc<State>,
) -> HandlerResult {
    created(&ledger::add_recipe(state.store.as_ref(), kind, recipe_id, &identity).await?)
}

pub async fn remove_from_ledger(
    recipe_id: Id,
    kind: Ledger,
    identity: Identity,
    state: Arc<State>,
) -> HandlerResult {
    ledger::remove_recipe(state.store.as_ref(), kind, recipe_id, &identity).await?;
    no_content()
}

pub async fn download_shopping_cart(identity: Identity, state: Arc<State>) -> HandlerResult {
    let rows = cart_totals(state.store.as_ref(), &identity).await?;

    Ok(reply::with_header(
        render_shopping_list(&rows),
        "Content-Disposition",
        format!("attachment; filename={SHOPPING_LIST_FILENAME}"),
    )
    .into_response())
}

// Users

pub async fn register(form: RegisterForm, state: Arc<State>) -> HandlerResult {
    created(&accounts::register(state.store.as_ref(), &form).await?)
}

pub async fn login(form: LoginForm, state: Arc<State>) -> HandlerResult {
    ok(&accounts::login(state.store.as_ref(), &state.sessions, &form).await?)
}

pub async fn me(identity: Identity, state: Arc<State>) -> HandlerResult {
    ok(&accounts::me(state.store.as_ref(), &identity).await?)
}

pub async fn update_profile(
    identity: Identity,
    form: ProfileForm,
    state: Arc<State>,
) -> HandlerResult {
    ok(&accounts::update_profile(state.store.as_ref(), &form, &identity).await?)
}

pub async fn set_password(
    identity: Identity,
    form: SetPasswordForm,
    state: Arc<State>,
) -> HandlerResult {
    accounts::set_password(state.store.as_ref(), &form, &identity).await?;
    no_content()
}

pub async fn list_users(query: UserQuery, identity: Identity, state: Arc<State>) -> HandlerResult {
    ok(&accounts::list_users(state.store.as_ref(), &query, &identity).await?)
}

pub async fn retrieve_user(user_id: Id, identity: Identity, state: Arc<State>) -> HandlerResult {
    ok(&accounts::retrieve_user(state.store.as_ref(), user_id, &identity).await?)
}

pub async fn subscribe(
    author_id: Id,
    query: SubscriptionQuery,
    identity: Identity,
    state: Arc<State>,
) -> HandlerResult {
    let view =
        ledger::subscribe(state.store.as_ref(), author_id, &identity, query.recipes_limit).await?;
    created(&view)
}

pub async fn unsubscribe(author_id: Id, identity: Identity, state: Arc<State>) -> HandlerResult {
    ledger::unsubscribe(state.store.as_ref(), author_id, &identity).await?;
    no_content()
}

pub async fn list_subscriptions(
    query: SubscriptionQuery,
    identity: Identity,
    state: Arc<State>,
) -> HandlerResult {
    ok(&ledger::list_subscriptions(state.store.as_ref(), &query, &identity).await?)
}

// Catalog

pub async fn list_ingredients(query: IngredientQuery, state: Arc<State>) -> HandlerResult {
    ok(&catalog::list_ingredients(state.store.as_ref(), query.name.as_deref()).await?)
}

pub async fn retrieve_ingredient(ingredient_id: Id, state: Arc<State>) -> HandlerResult {
    ok(&catalog::get_ingredient(state.store.as_ref(), ingredient_id).await?)
}

pub async fn list_tags(state: Arc<State>) -> HandlerResult {
    ok(&catalog::list_tags(state.store.as_ref()).await?)
}

pub async fn retrieve_tag(tag_id: Id, state: Arc<State>) -> HandlerResult {
    ok(&catalog::get_tag(state.store.as_ref(), tag_id).await?)
}

pub async fn create_tag(identity: Identity, tag: NewTag, state: Arc<State>) -> HandlerResult {
    created(&catalog::create_tag(state.store.as_ref(), &tag, &identity).await?)
}
