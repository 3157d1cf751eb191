use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use super::{
    error::Error,
    schema::{
        Id, Ingredient, Ledger, NewIngredient, NewTag, NewUser, Recipe, RecipeFilter, RecipePart,
        ShoppingListRow, Tag, User,
    },
    store::{Store, ValidatedRecipe},
};
use crate::recipes::shopping_list::aggregate;

#[derive(Debug, Clone)]
struct PartRow {
    id: Id,
    recipe_id: Id,
    ingredient_id: Id,
    amount: i32,
}

#[derive(Default)]
struct Tables {
    sequence: Id,
    users: Vec<User>,
    ingredients: Vec<Ingredient>,
    tags: Vec<Tag>,
    recipes: Vec<Recipe>,
    recipe_tags: BTreeSet<(Id, Id)>,
    parts: Vec<PartRow>,
    favorites: BTreeSet<(Id, Id)>,
    shopping_cart: BTreeSet<(Id, Id)>,
    subscriptions: BTreeSet<(Id, Id)>,
}

impl Tables {
    fn next_id(&mut self) -> Id {
        self.sequence += 1;
        self.sequence
    }

    fn ledger(&self, ledger: Ledger) -> &BTreeSet<(Id, Id)> {
        match ledger {
            Ledger::Favorites => &self.favorites,
            Ledger::ShoppingCart => &self.shopping_cart,
            Ledger::Subscriptions => &self.subscriptions,
        }
    }

    fn ledger_mut(&mut self, ledger: Ledger) -> &mut BTreeSet<(Id, Id)> {
        match ledger {
            Ledger::Favorites => &mut self.favorites,
            Ledger::ShoppingCart => &mut self.shopping_cart,
            Ledger::Subscriptions => &mut self.subscriptions,
        }
    }

    fn write_links(&mut self, recipe_id: Id, recipe: &ValidatedRecipe) {
        self.recipe_tags.retain(|(r, _)| *r != recipe_id);
        for tag_id in &recipe.tags {
            self.recipe_tags.insert((recipe_id, *tag_id));
        }

        self.parts.retain(|part| part.recipe_id != recipe_id);
        for (ingredient_id, amount) in &recipe.parts {
            let id = self.next_id();
            self.parts.push(PartRow {
                id,
                recipe_id,
                ingredient_id: *ingredient_id,
                amount: *amount,
            });
        }
    }

    fn matches(&self, recipe: &Recipe, filter: &RecipeFilter) -> bool {
        if filter.author.is_some() && recipe.author_id != filter.author {
            return false;
        }
        if !filter.tags.is_empty() {
            let tagged = self.tags.iter().any(|tag| {
                filter.tags.contains(&tag.slug) && self.recipe_tags.contains(&(recipe.id, tag.id))
            });
            if !tagged {
                return false;
            }
        }
        if let Some(user_id) = filter.favorited_by {
            if !self.favorites.contains(&(user_id, recipe.id)) {
                return false;
            }
        }
        if let Some(user_id) = filter.in_cart_of {
            if !self.shopping_cart.contains(&(user_id, recipe.id)) {
                return false;
            }
        }
        true
    }

    fn newest_first(mut recipes: Vec<Recipe>) -> Vec<Recipe> {
        recipes.sort_by(|a, b| b.pub_date.cmp(&a.pub_date).then(b.id.cmp(&a.id)));
        recipes
    }
}

/// Store kept entirely in memory behind one lock, so every call is atomic.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes a user together with everything that cascades from it.
    pub async fn delete_user(&self, user_id: Id) -> bool {
        let mut tables = self.tables.lock().await;
        let before = tables.users.len();
        tables.users.retain(|user| user.id != user_id);
        if tables.users.len() == before {
            return false;
        }

        let owned: Vec<Id> = tables
            .recipes
            .iter()
            .filter(|recipe| recipe.author_id == Some(user_id))
            .map(|recipe| recipe.id)
            .collect();
        for recipe_id in owned {
            remove_recipe(&mut tables, recipe_id);
        }
        tables.favorites.retain(|(user, _)| *user != user_id);
        tables.shopping_cart.retain(|(user, _)| *user != user_id);
        tables
            .subscriptions
            .retain(|(user, author)| *user != user_id && *author != user_id);
        true
    }
}

fn remove_recipe(tables: &mut Tables, recipe_id: Id) -> bool {
    let before = tables.recipes.len();
    tables.recipes.retain(|recipe| recipe.id != recipe_id);
    if tables.recipes.len() == before {
        return false;
    }

    tables.recipe_tags.retain(|(recipe, _)| *recipe != recipe_id);
    tables.parts.retain(|part| part.recipe_id != recipe_id);
    tables.favorites.retain(|(_, recipe)| *recipe != recipe_id);
    tables.shopping_cart.retain(|(_, recipe)| *recipe != recipe_id);
    true
}

fn page<T: Clone>(rows: &[T], limit: i64, offset: i64) -> Vec<T> {
    rows.iter()
        .skip(offset.max(0) as usize)
        .take(limit.max(0) as usize)
        .cloned()
        .collect()
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_user(&self, user: NewUser) -> Result<Option<User>, Error> {
        let mut tables = self.tables.lock().await;
        let email = user.email.to_lowercase();
        let taken = tables
            .users
            .iter()
            .any(|u| u.email.to_lowercase() == email || u.username == user.username);
        if taken {
            return Ok(None);
        }

        let row = User {
            id: tables.next_id(),
            email: user.email,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            password: user.password,
            role: user.role,
        };
        tables.users.push(row.clone());
        Ok(Some(row))
    }

    async fn get_user_by_id(&self, id: Id) -> Result<Option<User>, Error> {
        let tables = self.tables.lock().await;
        Ok(tables.users.iter().find(|user| user.id == id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, Error> {
        let tables = self.tables.lock().await;
        let email = email.to_lowercase();
        Ok(tables
            .users
            .iter()
            .find(|user| user.email.to_lowercase() == email)
            .cloned())
    }

    async fn update_user(&self, user: &User) -> Result<Option<User>, Error> {
        let mut tables = self.tables.lock().await;
        let email = user.email.to_lowercase();
        let taken = tables.users.iter().any(|u| {
            u.id != user.id && (u.email.to_lowercase() == email || u.username == user.username)
        });
        if taken {
            return Ok(None);
        }

        Ok(tables.users.iter_mut().find(|u| u.id == user.id).map(|row| {
            row.email = user.email.to_owned();
            row.username = user.username.to_owned();
            row.first_name = user.first_name.to_owned();
            row.last_name = user.last_name.to_owned();
            row.password = user.password.to_owned();
            row.clone()
        }))
    }

    async fn list_users(&self, limit: i64, offset: i64) -> Result<(Vec<User>, i64), Error> {
        let tables = self.tables.lock().await;
        Ok((
            page(&tables.users, limit, offset),
            tables.users.len() as i64,
        ))
    }

    async fn list_ingredients(&self, name_prefix: Option<&str>) -> Result<Vec<Ingredient>, Error> {
        let tables = self.tables.lock().await;
        let prefix = name_prefix.map(str::to_lowercase);

        let mut rows: Vec<Ingredient> = tables
            .ingredients
            .iter()
            .filter(|ingredient| match &prefix {
                Some(prefix) => ingredient.name.to_lowercase().starts_with(prefix.as_str()),
                None => true,
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(rows)
    }

    async fn get_ingredient(&self, id: Id) -> Result<Option<Ingredient>, Error> {
        let tables = self.tables.lock().await;
        Ok(tables.ingredients.iter().find(|i| i.id == id).cloned())
    }

    async fn count_ingredients(&self) -> Result<i64, Error> {
        let tables = self.tables.lock().await;
        Ok(tables.ingredients.len() as i64)
    }

    async fn insert_ingredients(&self, ingredients: &[NewIngredient]) -> Result<u64, Error> {
        let mut tables = self.tables.lock().await;
        for ingredient in ingredients {
            let id = tables.next_id();
            tables.ingredients.push(Ingredient {
                id,
                name: ingredient.name.to_owned(),
                measurement_unit: ingredient.measurement_unit.to_owned(),
            });
        }
        Ok(ingredients.len() as u64)
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, Error> {
        let tables = self.tables.lock().await;
        Ok(tables.tags.clone())
    }

    async fn get_tag(&self, id: Id) -> Result<Option<Tag>, Error> {
        let tables = self.tables.lock().await;
        Ok(tables.tags.iter().find(|tag| tag.id == id).cloned())
    }

    async fn insert_tag(&self, tag: &NewTag) -> Result<Option<Tag>, Error> {
        let mut tables = self.tables.lock().await;
        let taken = tables
            .tags
            .iter()
            .any(|t| t.name == tag.name || t.color == tag.color || t.slug == tag.slug);
        if taken {
            return Ok(None);
        }

        let row = Tag {
            id: tables.next_id(),
            name: tag.name.to_owned(),
            color: tag.color.to_owned(),
            slug: tag.slug.to_owned(),
        };
        tables.tags.push(row.clone());
        Ok(Some(row))
    }

    async fn get_recipe(&self, id: Id) -> Result<Option<Recipe>, Error> {
        let tables = self.tables.lock().await;
        Ok(tables.recipes.iter().find(|recipe| recipe.id == id).cloned())
    }

    async fn list_recipes(
        &self,
        filter: &RecipeFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Recipe>, i64), Error> {
        let tables = self.tables.lock().await;
        let matching: Vec<Recipe> = tables
            .recipes
            .iter()
            .filter(|recipe| tables.matches(recipe, filter))
            .cloned()
            .collect();
        let matching = Tables::newest_first(matching);

        Ok((page(&matching, limit, offset), matching.len() as i64))
    }

    async fn list_author_recipes(
        &self,
        author_id: Id,
        limit: Option<i64>,
    ) -> Result<Vec<Recipe>, Error> {
        let tables = self.tables.lock().await;
        let owned: Vec<Recipe> = tables
            .recipes
            .iter()
            .filter(|recipe| recipe.author_id == Some(author_id))
            .cloned()
            .collect();
        let owned = Tables::newest_first(owned);

        Ok(match limit {
            Some(limit) => page(&owned, limit, 0),
            None => owned,
        })
    }

    async fn count_author_recipes(&self, author_id: Id) -> Result<i64, Error> {
        let tables = self.tables.lock().await;
        Ok(tables
            .recipes
            .iter()
            .filter(|recipe| recipe.author_id == Some(author_id))
            .count() as i64)
    }

    async fn list_recipe_parts(&self, recipe_id: Id) -> Result<Vec<RecipePart>, Error> {
        let tables = self.tables.lock().await;
        let mut parts: Vec<&PartRow> = tables
            .parts
            .iter()
            .filter(|part| part.recipe_id == recipe_id)
            .collect();
        parts.sort_by_key(|part| part.id);

        Ok(parts
            .into_iter()
            .filter_map(|part| {
                tables
                    .ingredients
                    .iter()
                    .find(|i| i.id == part.ingredient_id)
                    .map(|ingredient| RecipePart {
                        recipe_id,
                        ingredient_id: ingredient.id,
                        name: ingredient.name.to_owned(),
                        measurement_unit: ingredient.measurement_unit.to_owned(),
                        amount: part.amount,
                    })
            })
            .collect())
    }

    async fn list_recipe_tags(&self, recipe_id: Id) -> Result<Vec<Tag>, Error> {
        let tables = self.tables.lock().await;
        Ok(tables
            .tags
            .iter()
            .filter(|tag| tables.recipe_tags.contains(&(recipe_id, tag.id)))
            .cloned()
            .collect())
    }

    async fn insert_recipe(&self, author_id: Id, recipe: &ValidatedRecipe) -> Result<Id, Error> {
        let mut tables = self.tables.lock().await;
        let id = tables.next_id();
        tables.recipes.push(Recipe {
            id,
            author_id: Some(author_id),
            name: recipe.name.to_owned(),
            image: recipe.image.to_owned().unwrap_or_default(),
            text: recipe.text.to_owned(),
            cooking_time: recipe.cooking_time,
            pub_date: Utc::now(),
        });
        tables.write_links(id, recipe);
        Ok(id)
    }

    async fn replace_recipe(&self, recipe_id: Id, recipe: &ValidatedRecipe) -> Result<(), Error> {
        let mut tables = self.tables.lock().await;
        if let Some(row) = tables.recipes.iter_mut().find(|r| r.id == recipe_id) {
            row.name = recipe.name.to_owned();
            row.text = recipe.text.to_owned();
            row.cooking_time = recipe.cooking_time;
            if let Some(image) = &recipe.image {
                row.image = image.to_owned();
            }
        }
        tables.write_links(recipe_id, recipe);
        Ok(())
    }

    async fn delete_recipe(&self, recipe_id: Id) -> Result<bool, Error> {
        let mut tables = self.tables.lock().await;
        Ok(remove_recipe(&mut tables, recipe_id))
    }

    async fn ledger_contains(
        &self,
        ledger: Ledger,
        user_id: Id,
        target_id: Id,
    ) -> Result<bool, Error> {
        let tables = self.tables.lock().await;
        Ok(tables.ledger(ledger).contains(&(user_id, target_id)))
    }

    async fn ledger_insert(
        &self,
        ledger: Ledger,
        user_id: Id,
        target_id: Id,
    ) -> Result<bool, Error> {
        let mut tables = self.tables.lock().await;
        Ok(tables.ledger_mut(ledger).insert((user_id, target_id)))
    }

    async fn ledger_delete(
        &self,
        ledger: Ledger,
        user_id: Id,
        target_id: Id,
    ) -> Result<bool, Error> {
        let mut tables = self.tables.lock().await;
        Ok(tables.ledger_mut(ledger).remove(&(user_id, target_id)))
    }

    async fn list_subscriptions(
        &self,
        user_id: Id,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<User>, i64), Error> {
        let tables = self.tables.lock().await;
        let authors: Vec<User> = tables
            .users
            .iter()
            .filter(|author| tables.subscriptions.contains(&(user_id, author.id)))
            .cloned()
            .collect();

        Ok((page(&authors, limit, offset), authors.len() as i64))
    }

    async fn shopping_list(&self, user_id: Id) -> Result<Vec<ShoppingListRow>, Error> {
        let tables = self.tables.lock().await;
        let lines = tables
            .parts
            .iter()
            .filter(|part| tables.shopping_cart.contains(&(user_id, part.recipe_id)))
            .filter_map(|part| {
                tables
                    .ingredients
                    .iter()
                    .find(|i| i.id == part.ingredient_id)
                    .map(|i| (i.name.to_owned(), i.measurement_unit.to_owned(), part.amount))
            });

        Ok(aggregate(lines))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::UserRole;

    async fn seed(store: &MemoryStore) -> (User, User, Id) {
        let mut users = Vec::new();
        for username in ["author", "reader"] {
            let user = store
                .insert_user(NewUser {
                    email: format!("{username}@example.com"),
                    username: username.to_string(),
                    first_name: String::new(),
                    last_name: String::new(),
                    password: String::new(),
                    role: UserRole::User,
                })
                .await
                .unwrap()
                .unwrap();
            users.push(user);
        }
        let reader = users.pop().unwrap();
        let author = users.pop().unwrap();

        store
            .insert_ingredients(&[NewIngredient {
                name: String::from("Salt"),
                measurement_unit: String::from("g"),
            }])
            .await
            .unwrap();
        let salt = store.list_ingredients(None).await.unwrap()[0].id;

        let recipe_id = store
            .insert_recipe(
                author.id,
                &ValidatedRecipe {
                    name: String::from("Soup"),
                    text: String::from("Boil"),
                    cooking_time: 10,
                    image: Some(String::from("image")),
                    tags: Vec::new(),
                    parts: vec![(salt, 5)],
                },
            )
            .await
            .unwrap();

        (author, reader, recipe_id)
    }

    #[tokio::test]
    async fn duplicate_accounts_are_refused() {
        let store = MemoryStore::new();
        seed(&store).await;

        let duplicate = store
            .insert_user(NewUser {
                email: String::from("author@example.com"),
                username: String::from("someone"),
                first_name: String::new(),
                last_name: String::new(),
                password: String::new(),
                role: UserRole::User,
            })
            .await
            .unwrap();
        assert!(duplicate.is_none());
    }

    #[tokio::test]
    async fn deleting_an_author_cascades() {
        let store = MemoryStore::new();
        let (author, reader, recipe_id) = seed(&store).await;

        store
            .ledger_insert(Ledger::ShoppingCart, reader.id, recipe_id)
            .await
            .unwrap();
        store
            .ledger_insert(Ledger::Subscriptions, reader.id, author.id)
            .await
            .unwrap();
        assert_eq!(store.shopping_list(reader.id).await.unwrap().len(), 1);

        assert!(store.delete_user(author.id).await);
        assert!(store.get_recipe(recipe_id).await.unwrap().is_none());
        assert!(store.shopping_list(reader.id).await.unwrap().is_empty());
        assert!(!store
            .ledger_contains(Ledger::Subscriptions, reader.id, author.id)
            .await
            .unwrap());
        assert!(!store.delete_user(author.id).await);
    }

    #[tokio::test]
    async fn deleting_a_recipe_drops_its_lines_and_memberships() {
        let store = MemoryStore::new();
        let (_, reader, recipe_id) = seed(&store).await;
        store
            .ledger_insert(Ledger::Favorites, reader.id, recipe_id)
            .await
            .unwrap();

        assert!(store.delete_recipe(recipe_id).await.unwrap());
        assert!(store.list_recipe_parts(recipe_id).await.unwrap().is_empty());
        assert!(!store
            .ledger_contains(Ledger::Favorites, reader.id, recipe_id)
            .await
            .unwrap());
        assert!(!store.delete_recipe(recipe_id).await.unwrap());
    }
}
