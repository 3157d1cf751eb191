use std::collections::HashSet;

use crate::{
    constants::{MAX_AMOUNT, MAX_COOKING_TIME, MAX_NAME_LENGTH, MIN_AMOUNT, MIN_COOKING_TIME},
    error::{Error, HtmlError},
    form::RecipeForm,
    jwt::Identity,
    permissions::ActionType,
    schema::{Id, Recipe},
    store::{Store, ValidatedRecipe},
};

use super::read_model::{find_recipe, recipe_view, Projection, RecipeView};

fn required_text(value: Option<&str>, field: &str, info: &str) -> Result<String, Error> {
    match value.map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value.to_string()),
        _ => Err(HtmlError::InvalidRequest.field(field, info)),
    }
}

/// Checks a payload against the catalog. The first violation wins, in the
/// order ingredients, tags, image, name, text, cooking time.
///
/// `existing` is the stored recipe on update; its image is kept when the
/// payload carries none.
pub async fn validate_recipe(
    store: &dyn Store,
    existing: Option<&Recipe>,
    form: &RecipeForm,
) -> Result<ValidatedRecipe, Error> {
    if form.ingredients.is_empty() {
        return Err(HtmlError::InvalidRequest.field("ingredients", "Specify ingredients"));
    }

    let mut seen = HashSet::new();
    let mut parts = Vec::with_capacity(form.ingredients.len());
    for line in &form.ingredients {
        if store.get_ingredient(line.id).await?.is_none() {
            return Err(HtmlError::NotFound.new(&format!(
                "No ingredient exists with id {}",
                line.id
            )));
        }
        if !(MIN_AMOUNT..=MAX_AMOUNT).contains(&line.amount) {
            return Err(HtmlError::InvalidRequest.field(
                "ingredients",
                &format!("Quantity must be between {MIN_AMOUNT} and {MAX_AMOUNT}"),
            ));
        }
        if !seen.insert(line.id) {
            return Err(HtmlError::InvalidRequest.field(
                "ingredients",
                "Ingredients must not repeat within a recipe",
            ));
        }
        parts.push((line.id, line.amount as i32));
    }

    if form.tags.is_empty() {
        return Err(HtmlError::InvalidRequest.field("tags", "Select tags"));
    }

    let mut tags: Vec<Id> = Vec::with_capacity(form.tags.len());
    for tag_id in &form.tags {
        if tags.contains(tag_id) {
            continue;
        }
        if store.get_tag(*tag_id).await?.is_none() {
            return Err(HtmlError::InvalidRequest.field(
                "tags",
                &format!("Tag with id {tag_id} does not exist"),
            ));
        }
        tags.push(*tag_id);
    }

    let image = match (form.image.as_deref(), existing) {
        (None, Some(_)) => None,
        (image, _) => Some(required_text(image, "image", "Upload a photo")?),
    };

    let name = required_text(form.name.as_deref(), "name", "Name required")?;
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(HtmlError::InvalidRequest.field(
            "name",
            &format!("Name must be at most {MAX_NAME_LENGTH} characters"),
        ));
    }

    let text = required_text(form.text.as_deref(), "text", "Description required")?;

    let cooking_time = match form.cooking_time {
        Some(minutes) if (MIN_COOKING_TIME..=MAX_COOKING_TIME).contains(&minutes) => minutes as i32,
        Some(_) => {
            return Err(HtmlError::InvalidRequest.field(
                "cooking_time",
                &format!("Cooking time must be between {MIN_COOKING_TIME} and {MAX_COOKING_TIME}"),
            ))
        }
        None => {
            return Err(HtmlError::InvalidRequest.field("cooking_time", "Cooking time required"))
        }
    };

    Ok(ValidatedRecipe {
        name,
        text,
        cooking_time,
        image,
        tags,
        parts,
    })
}

/// Creates (`existing == None`) or fully replaces a recipe, then reads it back.
pub async fn upsert_recipe(
    store: &dyn Store,
    existing: Option<&Recipe>,
    form: &RecipeForm,
    identity: &Identity,
) -> Result<RecipeView, Error> {
    let author_id = identity.require()?;
    let recipe = validate_recipe(store, existing, form).await?;

    let (recipe_id, projection) = match existing {
        Some(existing) => {
            store.replace_recipe(existing.id, &recipe).await?;
            (existing.id, Projection::Read)
        }
        None => (
            store.insert_recipe(author_id, &recipe).await?,
            Projection::Creation,
        ),
    };

    let stored = find_recipe(store, recipe_id).await?;
    recipe_view(store, &stored, identity, projection).await
}

pub async fn create_recipe(
    store: &dyn Store,
    form: &RecipeForm,
    identity: &Identity,
) -> Result<RecipeView, Error> {
    identity.authenticate(ActionType::CreateRecipes)?;

    let view = upsert_recipe(store, None, form, identity).await?;
    log::info!("User {} created recipe {}", identity.id, view.id);
    Ok(view)
}

/// The author, or anyone allowed to manage every recipe.
fn authorize_recipe_owner(recipe: &Recipe, identity: &Identity) -> Result<(), Error> {
    identity.authenticate(ActionType::ManageOwnRecipes)?;

    if recipe.author_id == Some(identity.id)
        || ActionType::ManageAllRecipes.authenticate(identity)
    {
        return Ok(());
    }
    Err(HtmlError::Forbidden.default())
}

pub async fn update_recipe(
    store: &dyn Store,
    recipe_id: Id,
    form: &RecipeForm,
    identity: &Identity,
) -> Result<RecipeView, Error> {
    identity.require()?;
    let recipe = find_recipe(store, recipe_id).await?;
    authorize_recipe_owner(&recipe, identity)?;

    upsert_recipe(store, Some(&recipe), form, identity).await
}

pub async fn delete_recipe(
    store: &dyn Store,
    recipe_id: Id,
    identity: &Identity,
) -> Result<(), Error> {
    identity.require()?;
    let recipe = find_recipe(store, recipe_id).await?;
    authorize_recipe_owner(&recipe, identity)?;

    if !store.delete_recipe(recipe.id).await? {
        return Err(HtmlError::NotFound.new("No recipe exists with specified id"));
    }
    log::info!("User {} deleted recipe {}", identity.id, recipe.id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        form::IngredientAmountForm,
        memory::MemoryStore,
        schema::{NewIngredient, NewTag, RecipeFilter, UserRole},
    };

    struct Fixture {
        store: MemoryStore,
        sugar: Id,
        flour: Id,
        breakfast: Id,
        dinner: Id,
    }

    async fn fixture() -> Fixture {
        let store = MemoryStore::new();
        store
            .insert_ingredients(&[
                NewIngredient {
                    name: String::from("Sugar"),
                    measurement_unit: String::from("g"),
                },
                NewIngredient {
                    name: String::from("Flour"),
                    measurement_unit: String::from("g"),
                },
            ])
            .await
            .unwrap();
        let ingredients = store.list_ingredients(None).await.unwrap();
        let id_of = |name: &str| ingredients.iter().find(|i| i.name == name).unwrap().id;
        let (sugar, flour) = (id_of("Sugar"), id_of("Flour"));

        let mut tag_ids = Vec::new();
        let tags = [
            ("Breakfast", "#E26C2D", "breakfast"),
            ("Dinner", "#49B64E", "dinner"),
        ];
        for (name, color, slug) in tags {
            let tag = store
                .insert_tag(&NewTag {
                    name: name.to_string(),
                    color: color.to_string(),
                    slug: slug.to_string(),
                })
                .await
                .unwrap()
                .unwrap();
            tag_ids.push(tag.id);
        }

        Fixture {
            store,
            sugar,
            flour,
            breakfast: tag_ids[0],
            dinner: tag_ids[1],
        }
    }

    fn form(fixture: &Fixture, lines: &[(Id, i64)]) -> RecipeForm {
        RecipeForm {
            name: Some(String::from("Pancakes")),
            text: Some(String::from("Mix and fry")),
            cooking_time: Some(20),
            image: Some(String::from("data:image/png;base64,AAAA")),
            tags: vec![fixture.breakfast],
            ingredients: lines
                .iter()
                .map(|(id, amount)| IngredientAmountForm {
                    id: *id,
                    amount: *amount,
                })
                .collect(),
        }
    }

    fn cook() -> Identity {
        Identity::user(100, UserRole::User)
    }

    async fn recipe_count(store: &MemoryStore) -> i64 {
        store
            .list_recipes(&RecipeFilter::default(), 100, 0)
            .await
            .unwrap()
            .1
    }

    #[tokio::test]
    async fn created_recipe_reads_back_its_lines() {
        let fixture = fixture().await;
        let payload = form(&fixture, &[(fixture.sugar, 100), (fixture.flour, 250)]);

        let view = create_recipe(&fixture.store, &payload, &cook()).await.unwrap();

        let lines: Vec<(Id, i32)> = view.ingredients.iter().map(|l| (l.id, l.amount)).collect();
        assert_eq!(lines, vec![(fixture.sugar, 100), (fixture.flour, 250)]);
        assert_eq!(view.tags.len(), 1);
        assert_eq!(view.name, "Pancakes");
        assert!(!view.is_favorited);
        assert!(!view.is_in_shopping_cart);
    }

    #[tokio::test]
    async fn anonymous_users_cannot_create() {
        let fixture = fixture().await;
        let payload = form(&fixture, &[(fixture.sugar, 100)]);

        let error = create_recipe(&fixture.store, &payload, &Identity::anonymous())
            .await
            .unwrap_err();
        assert_eq!(error.code(), 403);
        assert_eq!(recipe_count(&fixture.store).await, 0);
    }

    #[tokio::test]
    async fn zero_amount_is_rejected_and_nothing_persists() {
        let fixture = fixture().await;
        let payload = form(&fixture, &[(fixture.sugar, 0)]);

        let error = create_recipe(&fixture.store, &payload, &cook())
            .await
            .unwrap_err();
        assert_eq!(error.code(), 400);
        assert_eq!(error.field.as_deref(), Some("ingredients"));
        assert_eq!(recipe_count(&fixture.store).await, 0);
    }

    #[tokio::test]
    async fn first_violation_wins() {
        let fixture = fixture().await;

        let payload = form(&fixture, &[]);
        let error = create_recipe(&fixture.store, &payload, &cook()).await.unwrap_err();
        assert_eq!(error.info, "Specify ingredients");

        // Missing ingredient is reported before the bad amount of the same line.
        let payload = form(&fixture, &[(9999, 0)]);
        let error = create_recipe(&fixture.store, &payload, &cook()).await.unwrap_err();
        assert_eq!(error.code(), 404);

        let payload = form(&fixture, &[(fixture.sugar, 10), (fixture.sugar, 20)]);
        let error = create_recipe(&fixture.store, &payload, &cook()).await.unwrap_err();
        assert_eq!(error.info, "Ingredients must not repeat within a recipe");

        let mut payload = form(&fixture, &[(fixture.sugar, 10)]);
        payload.tags.clear();
        payload.name = None;
        let error = create_recipe(&fixture.store, &payload, &cook()).await.unwrap_err();
        assert_eq!(error.field.as_deref(), Some("tags"));

        let mut payload = form(&fixture, &[(fixture.sugar, 10)]);
        payload.image = None;
        payload.name = Some(String::from("   "));
        let error = create_recipe(&fixture.store, &payload, &cook()).await.unwrap_err();
        assert_eq!(error.field.as_deref(), Some("image"));

        let mut payload = form(&fixture, &[(fixture.sugar, 10)]);
        payload.name = Some(String::from("   "));
        payload.cooking_time = Some(0);
        let error = create_recipe(&fixture.store, &payload, &cook()).await.unwrap_err();
        assert_eq!(error.field.as_deref(), Some("name"));

        let mut payload = form(&fixture, &[(fixture.sugar, 10)]);
        payload.text = Some(String::new());
        let error = create_recipe(&fixture.store, &payload, &cook()).await.unwrap_err();
        assert_eq!(error.field.as_deref(), Some("text"));

        let mut payload = form(&fixture, &[(fixture.sugar, 10)]);
        payload.cooking_time = None;
        let error = create_recipe(&fixture.store, &payload, &cook()).await.unwrap_err();
        assert_eq!(error.field.as_deref(), Some("cooking_time"));

        assert_eq!(recipe_count(&fixture.store).await, 0);
    }

    #[tokio::test]
    async fn unknown_tags_are_rejected_and_repeats_collapse() {
        let fixture = fixture().await;

        let mut payload = form(&fixture, &[(fixture.sugar, 10)]);
        payload.tags = vec![fixture.breakfast, 9999];
        let error = create_recipe(&fixture.store, &payload, &cook()).await.unwrap_err();
        assert_eq!(error.field.as_deref(), Some("tags"));

        payload.tags = vec![fixture.dinner, fixture.dinner];
        let view = create_recipe(&fixture.store, &payload, &cook()).await.unwrap();
        assert_eq!(view.tags.len(), 1);
    }

    #[tokio::test]
    async fn update_replaces_lines_and_tags() {
        let fixture = fixture().await;
        let payload = form(&fixture, &[(fixture.sugar, 100), (fixture.flour, 250)]);
        let created = create_recipe(&fixture.store, &payload, &cook()).await.unwrap();

        let mut payload = form(&fixture, &[(fixture.flour, 50)]);
        payload.tags = vec![fixture.dinner];
        payload.image = None;
        payload.name = Some(String::from("Crepes"));
        let updated = update_recipe(&fixture.store, created.id, &payload, &cook())
            .await
            .unwrap();

        let lines: Vec<(Id, i32)> = updated.ingredients.iter().map(|l| (l.id, l.amount)).collect();
        assert_eq!(lines, vec![(fixture.flour, 50)]);
        assert_eq!(updated.tags.iter().map(|t| t.id).collect::<Vec<_>>(), vec![fixture.dinner]);
        assert_eq!(updated.name, "Crepes");
        assert_eq!(updated.image, created.image);
    }

    #[tokio::test]
    async fn only_authors_and_admins_change_recipes() {
        let fixture = fixture().await;
        let payload = form(&fixture, &[(fixture.sugar, 100)]);
        let created = create_recipe(&fixture.store, &payload, &cook()).await.unwrap();

        let stranger = Identity::user(200, UserRole::User);
        let error = update_recipe(&fixture.store, created.id, &payload, &stranger)
            .await
            .unwrap_err();
        assert_eq!(error.code(), 403);
        let error = delete_recipe(&fixture.store, created.id, &stranger)
            .await
            .unwrap_err();
        assert_eq!(error.code(), 403);

        let admin = Identity::user(300, UserRole::Admin);
        update_recipe(&fixture.store, created.id, &payload, &admin)
            .await
            .unwrap();
        delete_recipe(&fixture.store, created.id, &admin).await.unwrap();

        let error = delete_recipe(&fixture.store, created.id, &cook())
            .await
            .unwrap_err();
        assert_eq!(error.code(), 404);
    }
}
