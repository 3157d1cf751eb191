use serde::Deserialize;

use super::{error::TypeError, schema::Id};

/// Incoming recipe payload, shared by create and update.
///
/// Every field is optional at the deserialization level so that missing
/// values surface as field-level validation errors instead of body
/// deserialization failures.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipeForm {
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i64>,
    pub image: Option<String>,
    #[serde(default)]
    pub tags: Vec<Id>,
    #[serde(default)]
    pub ingredients: Vec<IngredientAmountForm>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct IngredientAmountForm {
    #[serde(alias = "ingredient_id")]
    pub id: Id,
    pub amount: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterForm {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Partial profile update; absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileForm {
    pub email: Option<String>,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetPasswordForm {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipeQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub author: Option<Id>,
    pub tags: Option<String>,
    pub is_favorited: Option<String>,
    pub is_in_shopping_cart: Option<String>,
}

impl RecipeQuery {
    /// Comma separated tag slugs, blanks dropped.
    pub fn tag_slugs(&self) -> Vec<String> {
        self.tags
            .as_deref()
            .unwrap_or("")
            .split(',')
            .map(str::trim)
            .filter(|slug| !slug.is_empty())
            .map(String::from)
            .collect()
    }

    pub fn favorited(&self) -> Result<bool, TypeError> {
        parse_flag(self.is_favorited.as_deref())
    }

    pub fn in_shopping_cart(&self) -> Result<bool, TypeError> {
        parse_flag(self.is_in_shopping_cart.as_deref())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubscriptionQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub recipes_limit: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IngredientQuery {
    pub name: Option<String>,
}

fn parse_flag(value: Option<&str>) -> Result<bool, TypeError> {
    match value {
        None | Some("") => Ok(false),
        Some("1") | Some("true") => Ok(true),
        Some("0") | Some("false") => Ok(false),
        Some(_) => Err(TypeError::new("Invalid flag value; expected 0 or 1")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ingredient_lines_accept_both_id_keys() {
        let form: RecipeForm = serde_json::from_str(
            r#"{"ingredients": [{"id": 1, "amount": 10}, {"ingredient_id": 2, "amount": 5}]}"#,
        )
        .unwrap();

        assert_eq!(
            form.ingredients,
            vec![
                IngredientAmountForm { id: 1, amount: 10 },
                IngredientAmountForm { id: 2, amount: 5 },
            ]
        );
        assert!(form.tags.is_empty());
        assert!(form.name.is_none());
    }

    #[test]
    fn tag_slugs_are_split_and_trimmed() {
        let query = RecipeQuery {
            tags: Some(String::from("breakfast, dinner,,")),
            ..Default::default()
        };
        assert_eq!(query.tag_slugs(), vec!["breakfast", "dinner"]);
    }

    #[test]
    fn flags_parse_numeric_and_boolean_forms() {
        let mut query = RecipeQuery::default();
        assert!(!query.favorited().unwrap());

        query.is_favorited = Some(String::from("1"));
        assert!(query.favorited().unwrap());

        query.is_in_shopping_cart = Some(String::from("yes"));
        assert!(query.in_shopping_cart().is_err());
    }
}
