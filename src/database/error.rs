use std::fmt::{self, Display};

use serde_json::{json, Map, Value};
use thiserror::Error as ThisError;
use warp::reject;

/// Error kinds understood by the HTTP boundary. Each maps to one status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HtmlError {
    InvalidRequest,
    Conflict,
    NotFound,
    Forbidden,
    InvalidSession,
    MethodNotAllowed,
    PayloadTooLarge,
    InternalServerError,
}

impl HtmlError {
    pub fn code(&self) -> u16 {
        match self {
            HtmlError::InvalidRequest => 400,
            HtmlError::Conflict => 400,
            HtmlError::NotFound => 404,
            HtmlError::Forbidden => 403,
            HtmlError::InvalidSession => 401,
            HtmlError::MethodNotAllowed => 405,
            HtmlError::PayloadTooLarge => 413,
            HtmlError::InternalServerError => 500,
        }
    }

    pub fn new(self, info: &str) -> Error {
        Error {
            kind: self,
            field: None,
            info: info.to_string(),
        }
    }

    /// Same as [`HtmlError::new`], attributing the message to a payload field.
    pub fn field(self, field: &str, info: &str) -> Error {
        Error {
            kind: self,
            field: Some(field.to_string()),
            info: info.to_string(),
        }
    }

    pub fn default(self) -> Error {
        let info = match self {
            HtmlError::InvalidRequest => "Invalid request",
            HtmlError::Conflict => "Already exists",
            HtmlError::NotFound => "Not found",
            HtmlError::Forbidden => "You don't have permission to perform this action",
            HtmlError::InvalidSession => "Invalid session",
            HtmlError::MethodNotAllowed => "Method not allowed",
            HtmlError::PayloadTooLarge => "Request body is too large",
            HtmlError::InternalServerError => "Internal server error",
        };
        self.new(info)
    }
}

#[derive(Debug, Clone, ThisError)]
#[error("{info}")]
pub struct Error {
    pub kind: HtmlError,
    pub field: Option<String>,
    pub info: String,
}

impl Error {
    pub fn code(&self) -> u16 {
        self.kind.code()
    }

    /// JSON body rendered for the client: `{"<field>": [info]}` or `{"detail": info}`.
    pub fn body(&self) -> Value {
        match &self.field {
            Some(field) => {
                let mut map = Map::new();
                map.insert(field.to_owned(), json!([self.info]));
                Value::Object(map)
            }
            None => json!({ "detail": self.info }),
        }
    }
}

impl reject::Reject for Error {}

#[derive(Debug)]
pub struct QueryError {
    info: String,
}

impl QueryError {
    pub fn new(info: String) -> Self {
        Self { info }
    }
}

impl From<sqlx::Error> for QueryError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::RowNotFound => Self::new(String::from("Row not found")),
            sqlx::Error::PoolTimedOut => Self::new(String::from("Pool timed out")),
            sqlx::Error::PoolClosed => Self::new(String::from("Pool closed")),
            sqlx::Error::TypeNotFound { type_name } => {
                Self::new(format!("Type not found: {type_name}"))
            }
            sqlx::Error::ColumnDecode { index, source } => {
                Self::new(format!("Column decode {index} ({source})"))
            }
            e => Self::new(format!("{e}")),
        }
    }
}

impl From<QueryError> for Error {
    fn from(value: QueryError) -> Self {
        log::error!("Query failed: {}", value.info);
        HtmlError::InternalServerError.new(&value.info)
    }
}

#[derive(Debug)]
pub struct TypeError {
    info: String,
}

impl TypeError {
    pub fn new(info: &str) -> Self {
        Self {
            info: info.to_string(),
        }
    }
}

impl From<TypeError> for Error {
    fn from(value: TypeError) -> Self {
        HtmlError::InvalidRequest.new(&value.info)
    }
}

impl Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.info)
    }
}

impl std::error::Error for TypeError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_errors_render_as_field_lists() {
        let error = HtmlError::InvalidRequest.field("ingredients", "Specify ingredients");
        assert_eq!(error.code(), 400);
        assert_eq!(error.body(), json!({ "ingredients": ["Specify ingredients"] }));
    }

    #[test]
    fn plain_errors_render_as_detail() {
        let error = HtmlError::NotFound.new("No recipe exists with specified id");
        assert_eq!(error.code(), 404);
        assert_eq!(
            error.body(),
            json!({ "detail": "No recipe exists with specified id" })
        );
    }

    #[test]
    fn type_errors_are_bad_requests() {
        let error: Error = TypeError::new("Invalid variant").into();
        assert_eq!(error.kind, HtmlError::InvalidRequest);
    }

    #[test]
    fn errors_travel_as_rejections() {
        let rejection: warp::Rejection = HtmlError::Forbidden.default().into();
        assert_eq!(rejection.find::<Error>().map(Error::code), Some(403));
    }
}
