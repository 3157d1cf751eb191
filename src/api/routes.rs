use std::{convert::Infallible, sync::Arc};

use serde::de::DeserializeOwned;
use warp::{
    filters::BoxedFilter,
    reply::{Reply, Response},
    Filter, Rejection,
};

use crate::{
    constants::MAX_BODY_BYTES,
    form::{IngredientQuery, RecipeQuery, SubscriptionQuery, UserQuery},
    jwt::Identity,
    middleware::with_identity,
    schema::{Id, Ledger},
};

use super::{handlers, rejection::handle_rejection, state::State};

fn with_state(
    state: Arc<State>,
) -> impl Filter<Extract = (Arc<State>,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

fn json_body<T: DeserializeOwned + Send>(
) -> impl Filter<Extract = (T,), Error = Rejection> + Clone {
    warp::body::content_length_limit(MAX_BODY_BYTES).and(warp::body::json())
}

fn identity(state: &Arc<State>) -> impl Filter<Extract = (Identity,), Error = Rejection> + Clone {
    with_identity(state.sessions.clone())
}

fn ledger_routes(
    segment: &'static str,
    kind: Ledger,
    state: &Arc<State>,
) -> BoxedFilter<(Response,)> {
    let path = warp::path("recipes")
        .and(warp::path::param::<Id>())
        .and(warp::path(segment))
        .and(warp::path::end());
    let kind = warp::any().map(move || kind);

    let add = path
        .clone()
        .and(warp::post())
        .and(kind.clone())
        .and(identity(state))
        .and(with_state(state.clone()))
        .and_then(handlers::add_to_ledger);

    let remove = path
        .and(warp::delete())
        .and(kind)
        .and(identity(state))
        .and(with_state(state.clone()))
        .and_then(handlers::remove_from_ledger);

    add.or(remove).unify().boxed()
}

fn recipe_routes(state: &Arc<State>) -> BoxedFilter<(Response,)> {
    let download = warp::path!("recipes" / "download_shopping_cart")
        .and(warp::get())
        .and(identity(state))
        .and(with_state(state.clone()))
        .and_then(handlers::download_shopping_cart);

    let list = warp::path!("recipes")
        .and(warp::get())
        .and(warp::query::<RecipeQuery>())
        .and(identity(state))
        .and(with_state(state.clone()))
        .and_then(handlers::list_recipes);

    let create = warp::path!("recipes")
        .and(warp::post())
        .and(identity(state))
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(handlers::create_recipe);

    let retrieve = warp::path!("recipes" / Id)
        .and(warp::get())
        .and(identity(state))
        .and(with_state(state.clone()))
        .and_then(handlers::retrieve_recipe);

    let update = warp::path!("recipes" / Id)
        .and(warp::patch())
        .and(identity(state))
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(handlers::update_recipe);

    let delete = warp::path!("recipes" / Id)
        .and(warp::delete())
        .and(identity(state))
        .and(with_state(state.clone()))
        .and_then(handlers::delete_recipe);

    download
        .or(list)
        .unify()
        .or(create)
        .unify()
        .or(retrieve)
        .unify()
        .or(update)
        .unify()
        .or(delete)
        .unify()
        .or(ledger_routes("favorite", Ledger::Favorites, state))
        .unify()
        .or(ledger_routes("shopping_cart", Ledger::ShoppingCart, state))
        .unify()
        .boxed()
}

fn user_routes(state: &Arc<State>) -> BoxedFilter<(Response,)> {
    let register = warp::path!("users")
        .and(warp::post())
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(handlers::register);

    let login = warp::path!("auth" / "token" / "login")
        .and(warp::post())
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(handlers::login);

    let list = warp::path!("users")
        .and(warp::get())
        .and(warp::query::<UserQuery>())
        .and(identity(state))
        .and(with_state(state.clone()))
        .and_then(handlers::list_users);

    let me = warp::path!("users" / "me")
        .and(warp::get())
        .and(identity(state))
        .and(with_state(state.clone()))
        .and_then(handlers::me);

    let update_me = warp::path!("users" / "me")
        .and(warp::patch())
        .and(identity(state))
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(handlers::update_profile);

    let set_password = warp::path!("users" / "set_password")
        .and(warp::post())
        .and(identity(state))
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(handlers::set_password);

    let subscriptions = warp::path!("users" / "subscriptions")
        .and(warp::get())
        .and(warp::query::<SubscriptionQuery>())
        .and(identity(state))
        .and(with_state(state.clone()))
        .and_then(handlers::list_subscriptions);

    let retrieve = warp::path!("users" / Id)
        .and(warp::get())
        .and(identity(state))
        .and(with_state(state.clone()))
        .and_then(handlers::retrieve_user);

    let subscribe = warp::path!("users" / Id / "subscribe")
        .and(warp::post())
        .and(warp::query::<SubscriptionQuery>())
        .and(identity(state))
        .and(with_state(state.clone()))
        .and_then(handlers::subscribe);

    let unsubscribe = warp::path!("users" / Id / "subscribe")
        .and(warp::delete())
        .and(identity(state))
        .and(with_state(state.clone()))
        .and_then(handlers::unsubscribe);

    register
        .or(list)
        .unify()
        .or(login)
        .unify()
        .or(me)
        .unify()
        .or(update_me)
        .unify()
        .or(set_password)
        .unify()
        .or(subscriptions)
        .unify()
        .or(retrieve)
        .unify()
        .or(subscribe)
        .unify()
        .or(unsubscribe)
        .unify()
        .boxed()
}

fn catalog_routes(state: &Arc<State>) -> BoxedFilter<(Response,)> {
    let ingredients = warp::path!("ingredients")
        .and(warp::get())
        .and(warp::query::<IngredientQuery>())
        .and(with_state(state.clone()))
        .and_then(handlers::list_ingredients);

    let ingredient = warp::path!("ingredients" / Id)
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(handlers::retrieve_ingredient);

    let tags = warp::path!("tags")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(handlers::list_tags);

    let tag = warp::path!("tags" / Id)
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(handlers::retrieve_tag);

    let create_tag = warp::path!("tags")
        .and(warp::post())
        .and(identity(state))
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(handlers::create_tag);

    ingredients
        .or(ingredient)
        .unify()
        .or(tags)
        .unify()
        .or(tag)
        .unify()
        .or(create_tag)
        .unify()
        .boxed()
}

/// The whole HTTP surface, with every rejection rendered as a JSON error.
pub fn routes(
    state: Arc<State>,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    recipe_routes(&state)
        .or(user_routes(&state))
        .unify()
        .or(catalog_routes(&state))
        .unify()
        .recover(handle_rejection)
        .unify()
        .with(warp::log("foodgram"))
}
