//! Ingredient and tag reference data.

use std::path::Path;

use crate::{
    constants::MAX_NAME_LENGTH,
    error::{Error, HtmlError},
    jwt::Identity,
    permissions::ActionType,
    schema::{Id, Ingredient, NewIngredient, NewTag, Tag},
    store::Store,
};

pub async fn list_ingredients(
    store: &dyn Store,
    name_prefix: Option<&str>,
) -> Result<Vec<Ingredient>, Error> {
    let prefix = name_prefix.map(str::trim).filter(|prefix| !prefix.is_empty());
    store.list_ingredients(prefix).await
}

pub async fn get_ingredient(store: &dyn Store, id: Id) -> Result<Ingredient, Error> {
    store
        .get_ingredient(id)
        .await?
        .ok_or_else(|| HtmlError::NotFound.new("No ingredient exists with specified id"))
}

pub async fn list_tags(store: &dyn Store) -> Result<Vec<Tag>, Error> {
    store.list_tags().await
}

pub async fn get_tag(store: &dyn Store, id: Id) -> Result<Tag, Error> {
    store
        .get_tag(id)
        .await?
        .ok_or_else(|| HtmlError::NotFound.new("No tag exists with specified id"))
}

fn is_hex_color(color: &str) -> bool {
    let mut chars = color.chars();
    chars.next() == Some('#') && color.len() == 7 && chars.all(|c| c.is_ascii_hexdigit())
}

fn is_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn validate_tag(tag: &NewTag) -> Result<NewTag, Error> {
    let name = tag.name.trim();
    if name.is_empty() || name.chars().count() > MAX_NAME_LENGTH {
        return Err(HtmlError::InvalidRequest.field(
            "name",
            &format!("Name must be 1 to {MAX_NAME_LENGTH} characters"),
        ));
    }
    if !is_hex_color(&tag.color) {
        return Err(HtmlError::InvalidRequest.field("color", "Color must look like #RRGGBB"));
    }
    if !is_slug(&tag.slug) || tag.slug.chars().count() > MAX_NAME_LENGTH {
        return Err(HtmlError::InvalidRequest.field(
            "slug",
            "Slug may only contain letters, digits, hyphens and underscores",
        ));
    }
    if name == tag.slug {
        return Err(HtmlError::InvalidRequest.field("slug", "Name and slug must differ"));
    }

    Ok(NewTag {
        name: name.to_string(),
        color: tag.color.to_uppercase(),
        slug: tag.slug.to_owned(),
    })
}

pub async fn create_tag(
    store: &dyn Store,
    tag: &NewTag,
    identity: &Identity,
) -> Result<Tag, Error> {
    identity.authenticate(ActionType::ManageTags)?;
    let tag = validate_tag(tag)?;

    let created = store.insert_tag(&tag).await?.ok_or_else(|| {
        HtmlError::Conflict.new("A tag with this name, color or slug already exists")
    })?;
    log::info!("Created tag {} ({})", created.slug, created.id);
    Ok(created)
}

fn parse_ingredients(contents: &[u8]) -> Result<Vec<NewIngredient>, csv::Error> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_reader(contents)
        .deserialize()
        .collect()
}

/// Loads header-less `name,measurement_unit` rows from a CSV file into an
/// empty catalog. Returns the number of rows inserted.
pub async fn seed_ingredients(store: &dyn Store, path: &Path) -> Result<u64, Error> {
    if store.count_ingredients().await? > 0 {
        log::info!("Ingredient catalog already populated, skipping {}", path.display());
        return Ok(0);
    }

    let contents = tokio::fs::read(path).await.map_err(|e| {
        HtmlError::InternalServerError.new(&format!("Failed to read {}: {e}", path.display()))
    })?;
    let ingredients = parse_ingredients(&contents).map_err(|e| {
        HtmlError::InternalServerError.new(&format!("Failed to parse {}: {e}", path.display()))
    })?;

    let inserted = store.insert_ingredients(&ingredients).await?;
    log::info!("Seeded {inserted} ingredients from {}", path.display());
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{memory::MemoryStore, schema::UserRole};

    fn tag(name: &str, color: &str, slug: &str) -> NewTag {
        NewTag {
            name: name.to_string(),
            color: color.to_string(),
            slug: slug.to_string(),
        }
    }

    fn admin() -> Identity {
        Identity::user(1, UserRole::Admin)
    }

    #[test]
    fn tag_fields_are_checked() {
        assert!(validate_tag(&tag("Lunch", "#49b64e", "lunch")).is_ok());
        assert_eq!(
            validate_tag(&tag("Lunch", "49B64E", "lunch")).unwrap_err().field.as_deref(),
            Some("color")
        );
        assert_eq!(
            validate_tag(&tag("Lunch", "#49B64E", "lunch time")).unwrap_err().field.as_deref(),
            Some("slug")
        );
        assert_eq!(
            validate_tag(&tag("lunch", "#49B64E", "lunch")).unwrap_err().info,
            "Name and slug must differ"
        );
    }

    #[tokio::test]
    async fn only_admins_create_tags() {
        let store = MemoryStore::new();
        let user = Identity::user(2, UserRole::User);

        let error = create_tag(&store, &tag("Lunch", "#49B64E", "lunch"), &user)
            .await
            .unwrap_err();
        assert_eq!(error.code(), 403);

        let created = create_tag(&store, &tag("Lunch", "#49b64e", "lunch"), &admin())
            .await
            .unwrap();
        assert_eq!(created.color, "#49B64E");
        assert_eq!(get_tag(&store, created.id).await.unwrap(), created);
    }

    #[tokio::test]
    async fn duplicate_tag_fields_conflict() {
        let store = MemoryStore::new();
        create_tag(&store, &tag("Lunch", "#49B64E", "lunch"), &admin())
            .await
            .unwrap();

        let error = create_tag(&store, &tag("Brunch", "#49B64E", "brunch"), &admin())
            .await
            .unwrap_err();
        assert_eq!(error.code(), 400);
        assert_eq!(list_tags(&store).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn ingredient_search_is_a_case_insensitive_prefix() {
        let store = MemoryStore::new();
        store
            .insert_ingredients(&[
                NewIngredient {
                    name: String::from("Sugar"),
                    measurement_unit: String::from("g"),
                },
                NewIngredient {
                    name: String::from("Brown sugar"),
                    measurement_unit: String::from("g"),
                },
            ])
            .await
            .unwrap();

        let found = list_ingredients(&store, Some("su")).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Sugar");
        assert_eq!(list_ingredients(&store, Some(" ")).await.unwrap().len(), 2);
        assert_eq!(get_ingredient(&store, 999).await.unwrap_err().code(), 404);
    }

    #[tokio::test]
    async fn seeding_only_fills_an_empty_catalog() {
        let path = std::env::temp_dir().join(format!("ingredients-{}.csv", std::process::id()));
        tokio::fs::write(&path, "Salt,g\n\"Milk, whole\",ml\n")
            .await
            .unwrap();

        let store = MemoryStore::new();
        assert_eq!(seed_ingredients(&store, &path).await.unwrap(), 2);
        assert_eq!(seed_ingredients(&store, &path).await.unwrap(), 0);
        assert_eq!(store.count_ingredients().await.unwrap(), 2);
        assert_eq!(list_ingredients(&store, Some("milk")).await.unwrap()[0].name, "Milk, whole");

        tokio::fs::remove_file(&path).await.unwrap();
    }

    #[test]
    fn malformed_csv_rows_are_rejected() {
        let rows = parse_ingredients(b"Flour, g\nWater,ml\n").unwrap();
        assert_eq!(rows[0].measurement_unit, "g");
        assert_eq!(rows[1].name, "Water");
        assert!(parse_ingredients(b"Flour\n").is_err());
    }
}
