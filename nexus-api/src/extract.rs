//! Request extractors that reject with the API error envelope
//!
//! - [`ValidJson`]: JSON body, then `validator` rules
//! - [`Pagination`]: `page`, `size`, `sort_by`, `sort_order` query parameters
//! - [`TokenParam`]: the required `token` query parameter

use async_trait::async_trait;
use axum::{
    extract::{rejection::JsonRejection, FromRequest, FromRequestParts, Query, Request},
    http::request::Parts,
    Json,
};
use nexus_shared::models::{PageRequest, SortField, SortOrder};
use serde::{de::DeserializeOwned, Deserialize};
use validator::Validate;

use crate::error::ApiError;

/// A JSON body that passed validation
///
/// Unreadable JSON rejects with 422, failed rules with 400.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection: JsonRejection| {
                tracing::debug!(error = %rejection.body_text(), "unreadable request body");
                ApiError::UnprocessableEntity("failed to read request body".to_string())
            })?;

        value.validate()?;

        Ok(ValidJson(value))
    }
}

#[derive(Debug, Default, Deserialize)]
struct PaginationQuery {
    page: Option<i64>,
    size: Option<i64>,
    sort_by: Option<SortField>,
    sort_order: Option<SortOrder>,
}

/// Page and ordering for list endpoints
///
/// Missing values fall back to page 1, size 10, `created_at` descending.
/// The size is clamped to `1..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination(pub PageRequest);

#[async_trait]
impl<S> FromRequestParts<S> for Pagination
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(query) = Query::<PaginationQuery>::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::BadRequest("invalid pagination parameters".to_string()))?;

        Ok(Pagination(PageRequest::new(
            query.page,
            query.size,
            query.sort_by,
            query.sort_order,
        )))
    }
}

#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// The `?token=` query parameter; missing or blank rejects with 400
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenParam(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for TokenParam
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(query) = Query::<TokenQuery>::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::BadRequest("token is required".to_string()))?;

        query
            .token
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .map(TokenParam)
            .ok_or_else(|| ApiError::BadRequest("token is required".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode};

    #[derive(Debug, Deserialize, Validate)]
    struct Payload {
        #[validate(length(min = 3))]
        name: String,
    }

    fn json_request(body: &str) -> Request {
        Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn parts(uri: &str) -> Parts {
        let (parts, _) = Request::builder()
            .uri(uri)
            .body(Body::empty())
            .unwrap()
            .into_parts();
        parts
    }

    #[tokio::test]
    async fn test_valid_json_statuses() {
        let ok = ValidJson::<Payload>::from_request(json_request(r#"{"name":"abc"}"#), &()).await;
        assert_eq!(ok.unwrap().0.name, "abc");

        let err = ValidJson::<Payload>::from_request(json_request("{not json"), &())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

        let err = ValidJson::<Payload>::from_request(json_request(r#"{"name":"a"}"#), &())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_pagination_defaults_and_clamp() {
        let Pagination(page) = Pagination::from_request_parts(&mut parts("/list"), &())
            .await
            .unwrap();
        assert_eq!(page, PageRequest::default());

        let Pagination(page) = Pagination::from_request_parts(
            &mut parts("/list?page=3&size=500&sort_by=name&sort_order=asc"),
            &(),
        )
        .await
        .unwrap();
        assert_eq!(page.page, 3);
        assert_eq!(page.size, 100);
        assert_eq!(page.sort_by, SortField::Name);
        assert_eq!(page.sort_order, SortOrder::Asc);

        let Pagination(page) = Pagination::from_request_parts(
            &mut parts("/list?page=9223372036854775807&size=100"),
            &(),
        )
        .await
        .unwrap();
        assert_eq!(page.page, nexus_shared::models::MAX_PAGE);
        assert!(page.offset() > 0);

        let err = Pagination::from_request_parts(&mut parts("/list?sort_by=password"), &())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_token_param_required() {
        let TokenParam(token) = TokenParam::from_request_parts(&mut parts("/x?token=abc"), &())
            .await
            .unwrap();
        assert_eq!(token, "abc");

        assert!(TokenParam::from_request_parts(&mut parts("/x"), &())
            .await
            .is_err());
        assert!(TokenParam::from_request_parts(&mut parts("/x?token="), &())
            .await
            .is_err());
    }
}
