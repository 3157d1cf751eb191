use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use jwt::{SignWithKey, VerifyWithKey};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::{
    error::{Error, HtmlError},
    schema::{Id, User, UserRole},
};

use super::permissions::ActionType;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtSessionData {
    pub user_id: Id,
    pub username: String,
    pub role: UserRole,
    iat: i64,
    exp: i64,
}

impl JwtSessionData {
    pub fn new(id: Id, username: String, role: UserRole, lifetime: Duration) -> Self {
        let now = Utc::now();

        Self {
            user_id: id,
            username,
            role,
            iat: now.timestamp(),
            exp: (now + lifetime).timestamp(),
        }
    }
}

/// The principal a request acts as. Anonymous requests carry `authenticated: false`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: Id,
    pub authenticated: bool,
    pub role: UserRole,
}

impl Identity {
    pub fn anonymous() -> Self {
        Self {
            id: 0,
            authenticated: false,
            role: UserRole::User,
        }
    }

    pub fn user(id: Id, role: UserRole) -> Self {
        Self {
            id,
            authenticated: true,
            role,
        }
    }

    pub fn user_id(&self) -> Option<Id> {
        self.authenticated.then_some(self.id)
    }

    /// The user id, or 403 for anonymous requests.
    pub fn require(&self) -> Result<Id, Error> {
        self.user_id()
            .ok_or_else(|| HtmlError::Forbidden.new("Authentication credentials were not provided"))
    }

    pub fn authenticate(&self, action: ActionType) -> Result<(), Error> {
        self.require()?;
        if !action.authenticate(self) {
            return Err(HtmlError::Forbidden.default());
        }
        Ok(())
    }
}

impl From<JwtSessionData> for Identity {
    fn from(session: JwtSessionData) -> Self {
        Identity::user(session.user_id, session.role)
    }
}

/// Issues and checks HMAC-SHA256 signed session tokens.
#[derive(Clone)]
pub struct SessionSigner {
    key: Hmac<Sha256>,
    lifetime: Duration,
}

impl SessionSigner {
    pub fn new(secret: &str, lifetime_hours: i64) -> Result<Self, Error> {
        let key = Hmac::new_from_slice(secret.as_bytes())
            .map_err(|_| HtmlError::InternalServerError.new("Invalid session secret"))?;

        Ok(Self {
            key,
            lifetime: Duration::hours(lifetime_hours),
        })
    }

    pub fn generate_jwt_session(&self, user: &User) -> Result<String, Error> {
        let claims = JwtSessionData::new(
            user.id,
            user.username.to_owned(),
            user.role.to_owned(),
            self.lifetime,
        );

        claims.sign_with_key(&self.key).map_err(|e| {
            log::error!("Failed to sign session: {e}");
            HtmlError::InternalServerError.default()
        })
    }

    pub fn verify_jwt_session(&self, token: &str) -> Result<JwtSessionData, Error> {
        let session: JwtSessionData = token
            .verify_with_key(&self.key)
            .map_err(|_| HtmlError::InvalidSession.new("Invalid session; Invalid token"))?;

        if session.exp < Utc::now().timestamp() {
            return Err(HtmlError::InvalidSession.new("Invalid session; Token expired"));
        }
        Ok(session)
    }
}
