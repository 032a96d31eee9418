use axum::{
    extract::{FromRequestParts, Path, Query, State},
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::{result::Result as StdResult, sync::Arc};
use tokio::net::TcpListener;

use crate::{
    core::{
        model::{self as domain, CommandReceipt},
        Application,
    },
    error::Result,
};

pub mod model;

const API_RESOURCE_PREFIX: &str = "/api";

type ApiResult<A> = StdResult<A, ApiError>;

type ApplicationInner = Arc<Application>;
pub struct Api(ApplicationInner);

impl Api {
    pub fn new(application: Application) -> Self {
        Self(Arc::new(application))
    }

    pub fn router(self) -> Router {
        let Self(application) = self;
        routing_configuration().with_state(application)
    }

    pub async fn start(self, listener: TcpListener) -> Result<()> {
        Ok(axum::serve(listener, self.router()).await?)
    }
}

fn routing_configuration() -> Router<ApplicationInner> {
    let books = Router::new()
        .route("/", get(books::list).post(books::create))
        .route(
            "/:id",
            get(books::get).patch(books::update).delete(books::delete),
        );

    let api = Router::new().nest("/books", books);

    Router::new()
        .route("/", get(system_root))
        .nest(API_RESOURCE_PREFIX, api)
}

#[derive(Debug)]
pub enum ApiError {
    Unauthorized,
    NotFound,
    Rejected(Vec<String>),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                model::Message::Text("Unauthorized".to_owned()),
            ),
            ApiError::NotFound => (
                StatusCode::NOT_FOUND,
                model::Message::Text("Book not found".to_owned()),
            ),
            ApiError::Rejected(violations) => {
                (StatusCode::BAD_REQUEST, model::Message::Violations(violations))
            }
        };

        let body = model::ErrorBody {
            status_code: status.as_u16(),
            message,
        };
        (status, Json(body)).into_response()
    }
}

pub struct Caller(pub String);

#[axum::async_trait]
impl FromRequestParts<ApplicationInner> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        application: &ApplicationInner,
    ) -> ApiResult<Self> {
        let owner = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .and_then(|token| application.owner_of(token.trim()));

        if let Some(owner) = owner {
            Ok(Caller(owner.to_owned()))
        } else {
            tracing::debug!(path = %parts.uri.path(), "rejected unauthenticated request");
            Err(ApiError::Unauthorized)
        }
    }
}

impl From<CommandReceipt> for ApiResult<Response> {
    fn from(value: CommandReceipt) -> Self {
        match value {
            CommandReceipt::Created(book) => {
                Ok((StatusCode::CREATED, Json(model::Book::from(book))).into_response())
            }
            CommandReceipt::Revised(book) => Ok(Json(model::Book::from(book)).into_response()),
            CommandReceipt::Removed => Ok(StatusCode::NO_CONTENT.into_response()),
            CommandReceipt::NotFound => Err(ApiError::NotFound),
            CommandReceipt::Rejected(violations) => Err(ApiError::Rejected(violations)),
        }
    }
}

mod books {
    use super::*;

    use domain::{query, Command};

    pub async fn list(
        State(application): State<ApplicationInner>,
        _caller: Caller,
        Query(params): Query<model::ListParams>,
    ) -> ApiResult<Json<model::Envelope>> {
        let listing = query::BookListing::from(params);
        tracing::debug!(?listing, "listing books");
        Ok(Json(application.issue_query(listing).await.into()))
    }

    pub async fn get(
        State(application): State<ApplicationInner>,
        _caller: Caller,
        Path(book_id): Path<String>,
    ) -> ApiResult<Json<model::Book>> {
        let book_id = model::book_id(&book_id).ok_or(ApiError::NotFound)?;
        if let Some(book) = application.issue_query(query::BookById(book_id)).await {
            Ok(Json(book.into()))
        } else {
            Err(ApiError::NotFound)
        }
    }

    pub async fn create(
        State(application): State<ApplicationInner>,
        Caller(created_by): Caller,
        Json(model::NewBook(info)): Json<model::NewBook>,
    ) -> ApiResult<Response> {
        application
            .submit_command(Command::AddBook { info, created_by })
            .await
            .into()
    }

    pub async fn update(
        State(application): State<ApplicationInner>,
        _caller: Caller,
        Path(book_id): Path<String>,
        Json(patch): Json<model::BookPatch>,
    ) -> ApiResult<Response> {
        let book_id = model::book_id(&book_id).ok_or(ApiError::NotFound)?;
        application
            .submit_command(Command::ReviseBook(book_id, patch.into()))
            .await
            .into()
    }

    pub async fn delete(
        State(application): State<ApplicationInner>,
        _caller: Caller,
        Path(book_id): Path<String>,
    ) -> ApiResult<Response> {
        let book_id = model::book_id(&book_id).ok_or(ApiError::NotFound)?;
        application
            .submit_command(Command::RemoveBook(book_id))
            .await
            .into()
    }
}

async fn system_root() -> &'static str {
    "Bookdesk 0.1 running."
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Grant;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const TOKEN: &str = "shelf-key";

    fn router() -> Router {
        Api::new(Application::new([Grant::new("librarian", TOKEN)])).router()
    }

    fn request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(AUTHORIZATION, format!("Bearer {TOKEN}"));

        match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn json_of(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn book(title: &str) -> Value {
        json!({
            "title": title,
            "author": "Leila S. Chudori",
            "published_year": 2017,
            "stock": 4,
        })
    }

    #[tokio::test]
    async fn requests_without_a_token_are_unauthorized() {
        let response = router()
            .oneshot(
                Request::builder()
                    .uri("/api/books")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_of(response).await["statusCode"], 401);
    }

    #[tokio::test]
    async fn created_books_are_listed_in_an_envelope() {
        let router = router();

        let response = router
            .clone()
            .oneshot(request("POST", "/api/books", Some(book("Laut Bercerita"))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = json_of(response).await;
        assert_eq!(created["created_by"], "librarian");
        assert!(created["created_at"].is_string());

        let response = router
            .oneshot(request("GET", "/api/books?page=1&limit=8&search=laut", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let listing = json_of(response).await;
        assert_eq!(listing["meta"], json!({"total": 1, "page": 1, "last_page": 1}));
        assert_eq!(listing["data"][0]["title"], "Laut Bercerita");
    }

    #[tokio::test]
    async fn invalid_books_are_rejected_with_every_message() {
        let mut invalid = book("");
        invalid["stock"] = json!(-1);

        let response = router()
            .oneshot(request("POST", "/api/books", Some(invalid)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_of(response).await;
        assert_eq!(body["message"].as_array().map(Vec::len), Some(2));
    }

    #[tokio::test]
    async fn missing_books_are_not_found() {
        let uri = "/api/books/5f0c7b56-3f0e-4c43-9d0b-3c3b1f1c2a11";
        let router = router();

        let response = router.clone().oneshot(request("GET", uri, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = router
            .clone()
            .oneshot(request("GET", "/api/books/not-an-id", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = router.oneshot(request("DELETE", uri, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn patch_applies_present_fields() {
        let router = router();
        let created = json_of(
            router
                .clone()
                .oneshot(request("POST", "/api/books", Some(book("Pulang"))))
                .await
                .unwrap(),
        )
        .await;
        let uri = format!("/api/books/{}", created["id"].as_str().unwrap());

        let response = router
            .clone()
            .oneshot(request("PATCH", &uri, Some(json!({"stock": 0}))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let revised = json_of(response).await;
        assert_eq!(revised["stock"], 0);
        assert_eq!(revised["title"], "Pulang");

        let response = router
            .oneshot(request("DELETE", &uri, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }
}
