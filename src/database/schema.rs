use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type Id = i32;

#[derive(
    Clone, Debug, PartialEq, PartialOrd, sqlx::Type, Serialize, Eq, Ord, Hash, Deserialize,
)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    User,
    Admin,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct User {
    pub id: Id,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub role: UserRole,
}

/// A user row about to be inserted. `password` is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    pub role: UserRole,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Ingredient {
    pub id: Id,
    pub name: String,
    pub measurement_unit: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct NewIngredient {
    pub name: String,
    pub measurement_unit: String,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Tag {
    pub id: Id,
    pub name: String,
    pub color: String,
    pub slug: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTag {
    pub name: String,
    pub color: String,
    pub slug: String,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct Recipe {
    pub id: Id,
    pub author_id: Option<Id>,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    pub pub_date: DateTime<Utc>,
}

/// One ingredient line joined with its catalog entry.
#[derive(sqlx::FromRow, Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RecipePart {
    pub recipe_id: Id,
    pub ingredient_id: Id,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

/// One aggregated line of a shopping list.
#[derive(sqlx::FromRow, Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ShoppingListRow {
    pub name: String,
    pub measurement_unit: String,
    pub total: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeFilter {
    pub author: Option<Id>,
    pub tags: Vec<String>,
    pub favorited_by: Option<Id>,
    pub in_cart_of: Option<Id>,
}

/// The three user-owned membership tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Ledger {
    Favorites,
    ShoppingCart,
    Subscriptions,
}

impl Ledger {
    pub fn table(&self) -> &'static str {
        match self {
            Ledger::Favorites => "favorites",
            Ledger::ShoppingCart => "shopping_cart",
            Ledger::Subscriptions => "subscriptions",
        }
    }

    pub fn target_column(&self) -> &'static str {
        match self {
            Ledger::Favorites | Ledger::ShoppingCart => "recipe_id",
            Ledger::Subscriptions => "author_id",
        }
    }
}
