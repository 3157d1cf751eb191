//! Registration, login, profile lookups and self-service profile changes.

use serde::Serialize;

use crate::{
    constants::{MAX_EMAIL_LENGTH, MAX_USERNAME_LENGTH, MIN_PASSWORD_LENGTH},
    cryptography::{hash_password, verify_password},
    error::{Error, HtmlError},
    form::{LoginForm, ProfileForm, RegisterForm, SetPasswordForm, UserQuery},
    jwt::{Identity, SessionSigner},
    ledger::find_user,
    pagination::{PageContext, PageRequest},
    read_model::{user_view, UserView},
    schema::{Id, NewUser, User, UserRole},
    store::Store,
};

/// Response body of a successful registration.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RegisteredUser {
    pub email: String,
    pub id: Id,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AuthToken {
    pub auth_token: String,
}

fn is_username(username: &str) -> bool {
    !username.is_empty()
        && username
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | '@' | '+' | '-'))
}

fn required(value: &str, field: &str) -> Result<String, Error> {
    let value = value.trim();
    if value.is_empty() {
        return Err(HtmlError::InvalidRequest.field(field, "This field may not be blank"));
    }
    Ok(value.to_string())
}

fn validate_email(email: &str) -> Result<String, Error> {
    let email = required(email, "email")?;
    if !email.contains('@') || email.chars().count() > MAX_EMAIL_LENGTH {
        return Err(HtmlError::InvalidRequest.field("email", "Enter a valid email address"));
    }
    Ok(email)
}

fn validate_username(username: &str) -> Result<String, Error> {
    let username = required(username, "username")?;
    if !is_username(&username) || username.chars().count() > MAX_USERNAME_LENGTH {
        return Err(HtmlError::InvalidRequest.field(
            "username",
            "Username may contain only letters, digits and @/./+/-/_",
        ));
    }
    Ok(username)
}

fn validate_password(password: &str, field: &str) -> Result<(), Error> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(HtmlError::InvalidRequest.field(
            field,
            &format!("Password must be at least {MIN_PASSWORD_LENGTH} characters"),
        ));
    }
    Ok(())
}

fn validate_registration(form: &RegisterForm) -> Result<RegisterForm, Error> {
    let email = validate_email(&form.email)?;
    let username = validate_username(&form.username)?;
    validate_password(&form.password, "password")?;

    Ok(RegisterForm {
        email,
        username,
        first_name: required(&form.first_name, "first_name")?,
        last_name: required(&form.last_name, "last_name")?,
        password: form.password.to_owned(),
    })
}

/// The caller's own row. A token whose user is gone is no longer a session.
async fn current_user(store: &dyn Store, identity: &Identity) -> Result<User, Error> {
    let user_id = identity.require()?;
    store
        .get_user_by_id(user_id)
        .await?
        .ok_or_else(|| HtmlError::InvalidSession.new("Invalid session; User no longer exists"))
}

pub async fn register(store: &dyn Store, form: &RegisterForm) -> Result<RegisteredUser, Error> {
    let form = validate_registration(form)?;

    let user = store
        .insert_user(NewUser {
            email: form.email,
            username: form.username,
            first_name: form.first_name,
            last_name: form.last_name,
            password: hash_password(&form.password)?,
            role: UserRole::User,
        })
        .await?
        .ok_or_else(|| HtmlError::Conflict.new("Email or username is already taken"))?;

    log::info!("Registered user {} ({})", user.username, user.id);
    Ok(RegisteredUser {
        email: user.email,
        id: user.id,
        username: user.username,
        first_name: user.first_name,
        last_name: user.last_name,
    })
}

pub async fn login(
    store: &dyn Store,
    signer: &SessionSigner,
    form: &LoginForm,
) -> Result<AuthToken, Error> {
    let invalid = || HtmlError::InvalidRequest.new("Unable to log in with provided credentials");

    let user = store
        .get_user_by_email(form.email.trim())
        .await?
        .ok_or_else(invalid)?;
    if !verify_password(&form.password, &user.password)? {
        log::warn!("Failed login for user {}", user.id);
        return Err(invalid());
    }

    Ok(AuthToken {
        auth_token: signer.generate_jwt_session(&user)?,
    })
}

pub async fn me(store: &dyn Store, identity: &Identity) -> Result<UserView, Error> {
    let user = current_user(store, identity).await?;
    user_view(store, &user, identity).await
}

/// Applies the fields present in `form` to the caller's profile.
pub async fn update_profile(
    store: &dyn Store,
    form: &ProfileForm,
    identity: &Identity,
) -> Result<UserView, Error> {
    let mut user = current_user(store, identity).await?;

    if let Some(email) = &form.email {
        user.email = validate_email(email)?;
    }
    if let Some(username) = &form.username {
        user.username = validate_username(username)?;
    }
    if let Some(first_name) = &form.first_name {
        user.first_name = required(first_name, "first_name")?;
    }
    if let Some(last_name) = &form.last_name {
        user.last_name = required(last_name, "last_name")?;
    }

    let user = store
        .update_user(&user)
        .await?
        .ok_or_else(|| HtmlError::Conflict.new("Email or username is already taken"))?;
    user_view(store, &user, identity).await
}

pub async fn set_password(
    store: &dyn Store,
    form: &SetPasswordForm,
    identity: &Identity,
) -> Result<(), Error> {
    let mut user = current_user(store, identity).await?;

    if !verify_password(&form.current_password, &user.password)? {
        log::warn!("Rejected password change for user {}", user.id);
        return Err(HtmlError::InvalidRequest.field("current_password", "Invalid password"));
    }
    validate_password(&form.new_password, "new_password")?;

    user.password = hash_password(&form.new_password)?;
    store
        .update_user(&user)
        .await?
        .ok_or_else(|| HtmlError::InvalidSession.new("Invalid session; User no longer exists"))?;
    log::info!("User {} changed their password", user.id);
    Ok(())
}

pub async fn list_users(
    store: &dyn Store,
    query: &UserQuery,
    identity: &Identity,
) -> Result<PageContext<UserView>, Error> {
    let request = PageRequest::new(query.page, query.limit);
    let (users, total) = store.list_users(request.page_size, request.offset()).await?;

    let mut views = Vec::with_capacity(users.len());
    for user in &users {
        views.push(user_view(store, user, identity).await?);
    }
    Ok(PageContext::from_rows(views, total, request))
}

pub async fn retrieve_user(
    store: &dyn Store,
    user_id: Id,
    identity: &Identity,
) -> Result<UserView, Error> {
    let user = find_user(store, user_id).await?;
    user_view(store, &user, identity).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    fn form(email: &str, username: &str, password: &str) -> RegisterForm {
        RegisterForm {
            email: email.to_string(),
            username: username.to_string(),
            first_name: String::from("Ada"),
            last_name: String::from("Cook"),
            password: password.to_string(),
        }
    }

    #[test]
    fn registration_fields_are_checked() {
        let error = validate_registration(&form("nope", "ada", "long enough")).unwrap_err();
        assert_eq!(error.field.as_deref(), Some("email"));

        let error = validate_registration(&form("a@b.c", "ada cook", "long enough")).unwrap_err();
        assert_eq!(error.field.as_deref(), Some("username"));

        let error = validate_registration(&form("a@b.c", "ada", "short")).unwrap_err();
        assert_eq!(error.field.as_deref(), Some("password"));

        assert!(validate_registration(&form("a@b.c", "ada.cook+1", "long enough")).is_ok());
    }

    #[tokio::test]
    async fn registered_users_can_log_in() {
        let store = MemoryStore::new();
        let signer = SessionSigner::new("secret", 1).unwrap();

        let user = register(&store, &form("ada@example.com", "ada", "long enough"))
            .await
            .unwrap();
        let error = register(&store, &form("ada@example.com", "other", "long enough"))
            .await
            .unwrap_err();
        assert_eq!(error.code(), 400);

        let login_form = LoginForm {
            email: String::from("ADA@example.com"),
            password: String::from("long enough"),
        };
        let token = login(&store, &signer, &login_form).await.unwrap();
        let identity: Identity = signer.verify_jwt_session(&token.auth_token).unwrap().into();
        assert_eq!(identity.id, user.id);

        let profile = me(&store, &identity).await.unwrap();
        assert_eq!(profile.username, "ada");
        assert!(!profile.is_subscribed);

        let wrong = LoginForm {
            password: String::from("wrong password"),
            ..login_form
        };
        assert_eq!(login(&store, &signer, &wrong).await.unwrap_err().code(), 400);
    }

    #[tokio::test]
    async fn unknown_users_are_not_found() {
        let store = MemoryStore::new();
        let error = retrieve_user(&store, 7, &Identity::anonymous()).await.unwrap_err();
        assert_eq!(error.code(), 404);
        assert_eq!(me(&store, &Identity::anonymous()).await.unwrap_err().code(), 403);
    }

    #[tokio::test]
    async fn emails_differing_in_case_are_one_account() {
        let store = MemoryStore::new();
        let signer = SessionSigner::new("secret", 1).unwrap();

        let user = register(&store, &form("Ada@example.com", "ada", "long enough"))
            .await
            .unwrap();
        let error = register(&store, &form("ada@example.com", "ada2", "other password"))
            .await
            .unwrap_err();
        assert_eq!(error.info, "Email or username is already taken");

        let login_form = LoginForm {
            email: String::from("ada@EXAMPLE.com"),
            password: String::from("long enough"),
        };
        let token = login(&store, &signer, &login_form).await.unwrap();
        let identity: Identity = signer.verify_jwt_session(&token.auth_token).unwrap().into();
        assert_eq!(identity.id, user.id);
    }

    #[tokio::test]
    async fn profile_updates_are_partial() {
        let store = MemoryStore::new();
        let ada = register(&store, &form("ada@example.com", "ada", "long enough"))
            .await
            .unwrap();
        register(&store, &form("bob@example.com", "bob", "long enough"))
            .await
            .unwrap();
        let identity = Identity::user(ada.id, UserRole::User);

        let patch = ProfileForm {
            first_name: Some(String::from("Augusta")),
            ..Default::default()
        };
        let view = update_profile(&store, &patch, &identity).await.unwrap();
        assert_eq!(view.first_name, "Augusta");
        assert_eq!(view.last_name, "Cook");
        assert_eq!(view.username, "ada");

        let taken = ProfileForm {
            email: Some(String::from("BOB@example.com")),
            ..Default::default()
        };
        let error = update_profile(&store, &taken, &identity).await.unwrap_err();
        assert_eq!(error.code(), 400);

        let blank = ProfileForm {
            last_name: Some(String::from("  ")),
            ..Default::default()
        };
        let error = update_profile(&store, &blank, &identity).await.unwrap_err();
        assert_eq!(error.field.as_deref(), Some("last_name"));

        let error = update_profile(&store, &patch, &Identity::anonymous())
            .await
            .unwrap_err();
        assert_eq!(error.code(), 403);
    }

    #[tokio::test]
    async fn password_changes_require_the_current_password() {
        let store = MemoryStore::new();
        let signer = SessionSigner::new("secret", 1).unwrap();
        let ada = register(&store, &form("ada@example.com", "ada", "long enough"))
            .await
            .unwrap();
        let identity = Identity::user(ada.id, UserRole::User);

        let wrong = SetPasswordForm {
            current_password: String::from("not it at all"),
            new_password: String::from("brand new secret"),
        };
        let error = set_password(&store, &wrong, &identity).await.unwrap_err();
        assert_eq!(error.field.as_deref(), Some("current_password"));

        let short = SetPasswordForm {
            current_password: String::from("long enough"),
            new_password: String::from("short"),
        };
        let error = set_password(&store, &short, &identity).await.unwrap_err();
        assert_eq!(error.field.as_deref(), Some("new_password"));

        let change = SetPasswordForm {
            current_password: String::from("long enough"),
            new_password: String::from("brand new secret"),
        };
        set_password(&store, &change, &identity).await.unwrap();

        let old = LoginForm {
            email: String::from("ada@example.com"),
            password: String::from("long enough"),
        };
        assert!(login(&store, &signer, &old).await.is_err());
        let new = LoginForm {
            password: String::from("brand new secret"),
            ..old
        };
        assert!(login(&store, &signer, &new).await.is_ok());
    }

    #[tokio::test]
    async fn users_are_listed_in_pages() {
        let store = MemoryStore::new();
        for name in ["ada", "bob", "cy"] {
            register(&store, &form(&format!("{name}@example.com"), name, "long enough"))
                .await
                .unwrap();
        }

        let query = UserQuery {
            page: Some(2),
            limit: Some(2),
        };
        let page = list_users(&store, &query, &Identity::anonymous()).await.unwrap();
        assert_eq!(page.count, 3);
        assert_eq!(page.previous, Some(1));
        assert_eq!(page.next, None);
        assert_eq!(page.results.len(), 1);
        assert_eq!(page.results[0].username, "cy");
    }
}
