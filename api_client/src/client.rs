use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::{Arc, PoisonError, RwLock};

use crate::{
    error::{self, Error},
    model::{Book, BookId, BookPatch, BooksEnvelope, ListQuery, NewBook, PagedResult},
};

pub trait BookApi {
    async fn list(&self, query: &ListQuery) -> error::Result<PagedResult<Book>>;

    async fn get(&self, id: &BookId) -> error::Result<Book>;

    async fn create(&self, fields: &NewBook) -> error::Result<Book>;

    async fn update(&self, id: &BookId, fields: &BookPatch) -> error::Result<Book>;

    async fn delete(&self, id: &BookId) -> error::Result<()>;
}

#[derive(Clone, Debug, Default)]
pub struct Session(Arc<RwLock<Option<String>>>);

impl Session {
    pub fn signed_in(token: impl Into<String>) -> Self {
        let session = Self::default();
        session.sign_in(token);
        session
    }

    pub fn sign_in(&self, token: impl Into<String>) {
        let Self(slot) = self;
        *slot.write().unwrap_or_else(PoisonError::into_inner) = Some(token.into());
    }

    pub fn sign_out(&self) {
        let Self(slot) = self;
        *slot.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn bearer(&self) -> Option<String> {
        let Self(slot) = self;
        slot.read().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[derive(Clone)]
pub struct ApiClient {
    http_client: Client,
    base_url: String,
    session: Session,
}

impl ApiClient {
    const API_RESOURCE_PREFIX: &str = "/api";

    pub fn new(base_url: &str, session: Session) -> Self {
        let http_client = Client::new();
        Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            session,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub async fn list(&self, query: &ListQuery) -> error::Result<PagedResult<Book>> {
        let request = self
            .http_client
            .get(self.resolve_resource_uri("/books"))
            .query(&query.request_params());

        let response = self.send(request, None, false).await?;
        let envelope: BooksEnvelope = response.json().await?;
        Ok(envelope.into_paged(query.limit))
    }

    pub async fn get(&self, id: &BookId) -> error::Result<Book> {
        let request = self
            .http_client
            .get(self.resolve_resource_uri(&format!("/books/{id}")));
        self.receive(self.send(request, Some(id), false).await?)
            .await
    }

    pub async fn create(&self, fields: &NewBook) -> error::Result<Book> {
        let request = self
            .http_client
            .post(self.resolve_resource_uri("/books"))
            .json(fields);
        self.receive(self.send(request, None, true).await?).await
    }

    pub async fn update(&self, id: &BookId, fields: &BookPatch) -> error::Result<Book> {
        let request = self
            .http_client
            .patch(self.resolve_resource_uri(&format!("/books/{id}")))
            .json(fields);
        self.receive(self.send(request, Some(id), true).await?)
            .await
    }

    // Surfaces whatever the server says, including `NotFound` for a book
    // that is already gone.
    pub async fn delete(&self, id: &BookId) -> error::Result<()> {
        let request = self
            .http_client
            .delete(self.resolve_resource_uri(&format!("/books/{id}")));
        self.send(request, Some(id), false).await?;
        Ok(())
    }

    async fn receive<R>(&self, response: Response) -> error::Result<R>
    where
        R: DeserializeOwned,
    {
        Ok(response.json().await?)
    }

    // `resource` names the book a 404 refers to; `submits` marks requests
    // whose 400/422 is a validation verdict.
    async fn send(
        &self,
        request: RequestBuilder,
        resource: Option<&BookId>,
        submits: bool,
    ) -> error::Result<Response> {
        let request = match self.session.bearer() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
        .build()?;

        tracing::debug!(method = %request.method(), uri = %request.url(), "sending request");
        let response = self.http_client.execute(request).await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let error = match (status, resource) {
            (StatusCode::UNAUTHORIZED, _) => Error::Auth,
            (StatusCode::NOT_FOUND, Some(id)) => Error::NotFound(id.clone()),
            (StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY, _) if submits => {
                Error::Validation(failure_reason(status, &body))
            }
            _ => Error::Server {
                status,
                reason: failure_reason(status, &body),
            },
        };

        tracing::warn!(%status, kind = %error.kind(), "request rejected");
        Err(error)
    }

    fn resolve_resource_uri(&self, resource_uri: &str) -> String {
        format!(
            "{}{}{resource_uri}",
            self.base_url,
            Self::API_RESOURCE_PREFIX
        )
    }
}

impl BookApi for ApiClient {
    async fn list(&self, query: &ListQuery) -> error::Result<PagedResult<Book>> {
        ApiClient::list(self, query).await
    }

    async fn get(&self, id: &BookId) -> error::Result<Book> {
        ApiClient::get(self, id).await
    }

    async fn create(&self, fields: &NewBook) -> error::Result<Book> {
        ApiClient::create(self, fields).await
    }

    async fn update(&self, id: &BookId, fields: &BookPatch) -> error::Result<Book> {
        ApiClient::update(self, id, fields).await
    }

    async fn delete(&self, id: &BookId) -> error::Result<()> {
        ApiClient::delete(self, id).await
    }
}

// Server-described reason: `message` of a JSON body (a string or a list of
// strings), else the raw body, else the status' canonical reason.
fn failure_reason(status: StatusCode, body: &str) -> String {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| match value.get("message")? {
            serde_json::Value::String(text) => Some(text.clone()),
            serde_json::Value::Array(items) => Some(
                items
                    .iter()
                    .filter_map(|item| item.as_str())
                    .collect::<Vec<_>>()
                    .join("; "),
            ),
            _ => None,
        });

    match message {
        Some(message) if !message.is_empty() => message,
        _ if !body.trim().is_empty() => body.trim().to_owned(),
        _ => status.canonical_reason().unwrap_or("unknown").to_owned(),
    }
}
