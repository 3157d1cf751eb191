use std::sync::Arc;

use warp::{reject::Rejection, Filter};

use crate::{
    constants::SESSION_COOKIE,
    error::{Error, HtmlError},
};

use super::jwt::{Identity, SessionSigner};

/// Token from `Authorization: Token <jwt>` (or `Bearer`), falling back to the session cookie.
fn session_token<'a>(
    header: Option<&'a str>,
    cookie: Option<&'a str>,
) -> Result<Option<&'a str>, Error> {
    let Some(header) = header else {
        return Ok(cookie.filter(|token| !token.is_empty()));
    };

    match header.trim().split_once(' ') {
        Some((scheme, token))
            if scheme.eq_ignore_ascii_case("token") || scheme.eq_ignore_ascii_case("bearer") =>
        {
            Ok(Some(token.trim()))
        }
        _ => Err(HtmlError::InvalidSession.new("Invalid session; Malformed authorization header")),
    }
}

fn resolve_identity(
    signer: &SessionSigner,
    header: Option<&str>,
    cookie: Option<&str>,
) -> Result<Identity, Error> {
    match session_token(header, cookie)? {
        Some(token) => Ok(signer.verify_jwt_session(token)?.into()),
        None => Ok(Identity::anonymous()),
    }
}

/// Resolves the caller. Missing credentials give an anonymous identity;
/// present but invalid credentials reject with 401.
pub fn with_identity(
    signer: Arc<SessionSigner>,
) -> impl Filter<Extract = (Identity,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization")
        .and(warp::cookie::optional::<String>(SESSION_COOKIE))
        .and_then(move |header: Option<String>, cookie: Option<String>| {
            let signer = signer.clone();
            async move {
                resolve_identity(&signer, header.as_deref(), cookie.as_deref())
                    .map_err(Rejection::from)
            }
        })
}
