use std::convert::Infallible;

use warp::{
    body::BodyDeserializeError,
    http::StatusCode,
    reject::{
        InvalidQuery, LengthRequired, MethodNotAllowed, PayloadTooLarge, Rejection,
        UnsupportedMediaType,
    },
    reply::{self, Reply, Response},
};

use crate::error::{Error, HtmlError};

fn classify(rejection: &Rejection) -> Error {
    if rejection.is_not_found() {
        return HtmlError::NotFound.default();
    }
    if let Some(error) = rejection.find::<Error>() {
        return error.clone();
    }
    if let Some(error) = rejection.find::<BodyDeserializeError>() {
        return HtmlError::InvalidRequest.new(&error.to_string());
    }
    if rejection.find::<InvalidQuery>().is_some() {
        return HtmlError::InvalidRequest.new("Invalid query string");
    }
    if rejection.find::<UnsupportedMediaType>().is_some()
        || rejection.find::<LengthRequired>().is_some()
    {
        return HtmlError::InvalidRequest.new("Expected a JSON request body");
    }
    if rejection.find::<PayloadTooLarge>().is_some() {
        return HtmlError::PayloadTooLarge.default();
    }
    if rejection.find::<MethodNotAllowed>().is_some() {
        return HtmlError::MethodNotAllowed.default();
    }

    log::error!("Unhandled rejection: {rejection:?}");
    HtmlError::InternalServerError.default()
}

/// Renders every rejection as a JSON error body with its status code.
pub async fn handle_rejection(rejection: Rejection) -> Result<Response, Infallible> {
    let error = classify(&rejection);
    let status =
        StatusCode::from_u16(error.code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    if status.is_server_error() {
        log::error!("Request failed: {error}");
    }

    Ok(reply::with_status(reply::json(&error.body()), status).into_response())
}
