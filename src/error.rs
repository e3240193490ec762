//! Error handler for accountservices.

use axum::extract::rejection::JsonRejection;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::Error as SQLxError;
use thiserror::Error;
use validator::ValidationErrors;

pub type Result<T> = std::result::Result<T, ServerError>;

/// Enum representing server-side errors.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("validation error occurred")]
    Validation(#[from] ValidationErrors),

    #[error(transparent)]
    Json(#[from] JsonRejection),

    #[error("account id must be a valid UUID")]
    InvalidId,

    #[error("initial deposit must be greater than zero, got {0}")]
    InvalidDeposit(Decimal),

    #[error("account type must not be blank")]
    InvalidAccountType,

    #[error("Account not found")]
    AccountNotFound,

    #[error("customer already holds an account")]
    CustomerAlreadyHasAccount,

    #[error("account number already taken")]
    AccountNumberTaken,

    #[error("no unused account number found after {attempts} attempts")]
    AccountNumberExhausted { attempts: u32 },

    #[error("SQL request failed: {0}")]
    Sql(#[from] SQLxError),

    #[error("No API key found in request headers")]
    MissingApiKey,

    #[error("Invalid API key")]
    InvalidApiKey,
}

/// Structure for detailed error responses.
#[derive(Debug, Serialize)]
pub struct ResponseError {
    r#type: Option<String>,
    title: String,
    status: u16,
    detail: String,
    instance: Option<String>,
    errors: Option<Vec<FieldError>>,
}

impl ResponseError {
    /// Update error status code.
    pub fn status(mut self, code: StatusCode) -> Self {
        self.status = code.as_u16();
        self
    }

    /// Update `title` field.
    pub fn title(mut self, title: &str) -> Self {
        self.title = title.into();
        self
    }

    /// Add detailed error.
    pub fn details(mut self, description: &str) -> Self {
        self.detail = description.into();
        self
    }

    /// Automatically add errors field.
    pub fn errors(mut self, errors: &ValidationErrors) -> Self {
        self.errors = Some(parse_validation_errors(errors));
        self
    }

    /// Transform [`ResponseError`] into axum [`Response`].
    pub fn into_response(
        self,
    ) -> std::result::Result<Response, axum::http::Error> {
        if let Ok(body) = serde_json::to_string(&self) {
            Response::builder()
                .status(self.status)
                .header(header::CONTENT_TYPE, "application/json")
                .body(body.into())
        } else {
            Ok(internal_server_error())
        }
    }
}

impl Default for ResponseError {
    fn default() -> Self {
        Self {
            r#type: None,
            title: "Internal server error.".to_owned(),
            status: StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
            detail: String::default(),
            instance: None,
            errors: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct FieldError {
    field: String,
    message: String,
}

fn parse_validation_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    errors
        .field_errors()
        .iter()
        .flat_map(|(field, issues)| {
            issues.iter().map(move |issue| FieldError {
                field: field.to_string(),
                message: issue
                    .message
                    .as_ref()
                    .map(|message| message.to_string())
                    .unwrap_or_else(|| issue.code.to_string()),
            })
        })
        .collect()
}

impl ServerError {
    /// HTTP status code the error is rendered with.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::Validation(_)
            | ServerError::Json(_)
            | ServerError::InvalidId
            | ServerError::InvalidDeposit(_)
            | ServerError::InvalidAccountType => StatusCode::BAD_REQUEST,
            ServerError::AccountNotFound => StatusCode::NOT_FOUND,
            ServerError::CustomerAlreadyHasAccount => StatusCode::CONFLICT,
            ServerError::MissingApiKey | ServerError::InvalidApiKey => {
                StatusCode::UNAUTHORIZED
            },
            ServerError::AccountNumberTaken
            | ServerError::AccountNumberExhausted { .. }
            | ServerError::Sql(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let response = ResponseError::default()
            .title("There were validation errors with your request.")
            .details(&self.to_string())
            .status(status);

        let response = match &self {
            ServerError::Validation(validation_errors) => {
                response.errors(validation_errors)
            },

            ServerError::Json(err) => response
                .title("Request body could not be read.")
                .details(&json_rejection_detail(err)),

            ServerError::AccountNotFound => {
                response.title("Resource not found.")
            },

            ServerError::CustomerAlreadyHasAccount => {
                response.title("Account could not be created.")
            },

            ServerError::MissingApiKey | ServerError::InvalidApiKey => response
                .title("Unauthorized.")
                .details(&format!("Unauthorized: {self}")),

            ServerError::Sql(err) => {
                tracing::error!(error = %err, "storage request failed");

                ResponseError::default()
            },

            ServerError::AccountNumberTaken
            | ServerError::AccountNumberExhausted { .. } => {
                tracing::error!(error = %self, "account was not created");

                ResponseError::default()
                    .details("Account could not be created, retry later.")
            },

            _ => response,
        };

        response
            .into_response()
            .unwrap_or_else(|_| internal_server_error())
    }
}

/// Path segment serde_json uses for exact numbers.
const EXACT_NUMBER_SEGMENT: &str = ".$serde_json::private::Number";

/// Client-facing detail of a body rejection, without serde internals.
fn json_rejection_detail(rejection: &JsonRejection) -> String {
    match rejection {
        JsonRejection::JsonDataError(_) => {
            let text = rejection.body_text();
            let text = text
                .split_once("target type: ")
                .map_or(text.as_str(), |(_, detail)| detail);

            match text.split_once(EXACT_NUMBER_SEGMENT) {
                Some((field, _)) => format!("{field} is not a valid decimal"),
                None => text.to_owned(),
            }
        },
        JsonRejection::JsonSyntaxError(_) => {
            "Request body is not valid JSON".to_owned()
        },
        _ => rejection.body_text(),
    }
}

fn internal_server_error() -> Response {
    Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .header(header::CONTENT_TYPE, "application/json")
        .body(
            serde_json::json!({
                "type": null,
                "title": "Internal server error.",
                "status": StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
                "detail": null,
                "instance": null,
                "errors": null,
            })
            .to_string()
            .into(),
        )
        .unwrap_or_else(|_| Response::new("Internal server error".into()))
}
