//! HTTP implementation of the wire seams against a Supabase-style service

use std::time::Duration;

use chrono::{TimeZone, Utc};
use common_types::{AuthUser, Session};
use reqwest::{header, Client, Response};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware, RequestBuilder};
use reqwest_tracing::TracingMiddleware;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;
use url::Url;

use super::{
    AuthApi, BackendError, BackendResult, Filter, ObjectStorageApi, Query, TableApi,
};
use crate::config::BaasConfig;

/// Default request timeout in seconds
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
/// Maximum number of idle connections to maintain per host
const MAX_IDLE_CONNECTIONS_PER_HOST: usize = 10;

/// Token grant returned by the auth endpoints
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: AuthUser,
}

impl From<TokenResponse> for Session {
    fn from(token: TokenResponse) -> Self {
        let expires_at = token
            .expires_at
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
            .unwrap_or_else(|| {
                Utc::now() + chrono::Duration::seconds(token.expires_in.unwrap_or(3600))
            });

        Self {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at,
            user: token.user,
        }
    }
}

/// HTTP client for the hosted backend's REST, storage and auth endpoints
pub struct HttpBackend {
    base_url: Url,
    anon_key: String,
    http_client: ClientWithMiddleware,
}

impl HttpBackend {
    /// Creates a new client for the configured service
    ///
    /// # Panics
    ///
    /// If the HTTP client fails to be created
    #[must_use]
    pub fn new(config: &BaasConfig) -> Self {
        let reqwest_client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS))
            .pool_max_idle_per_host(MAX_IDLE_CONNECTIONS_PER_HOST)
            .user_agent(format!("studio/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("Failed to create HTTP client");

        let http_client = ClientBuilder::new(reqwest_client)
            .with(TracingMiddleware::default())
            .build();

        Self {
            base_url: config.url.clone(),
            anon_key: config.anon_key.clone(),
            http_client,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url.as_str().trim_end_matches('/'))
    }

    /// Attaches the API key and the caller's bearer token (the anon key when signed out)
    fn authorized(&self, request: RequestBuilder, bearer: Option<&str>) -> RequestBuilder {
        request
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer.unwrap_or(&self.anon_key))
    }

    async fn token_grant(&self, grant_type: &str, body: Value) -> BackendResult<Session> {
        let request = self
            .http_client
            .post(self.endpoint("auth/v1/token"))
            .query(&[("grant_type", grant_type)])
            .json(&body);

        let response = check(self.authorized(request, None).send().await?).await?;
        let token = response.json::<TokenResponse>().await?;
        Ok(token.into())
    }
}

/// Renders a structured query as PostgREST query parameters
fn query_params(query: &Query) -> Vec<(String, String)> {
    let mut params = vec![("select".to_string(), "*".to_string())];
    params.extend(filter_params(&query.filters));
    if let Some(order) = &query.order {
        let direction = if order.descending { "desc" } else { "asc" };
        params.push(("order".to_string(), format!("{}.{direction}", order.column)));
    }
    if let Some(limit) = query.limit {
        params.push(("limit".to_string(), limit.to_string()));
    }
    params
}

fn filter_params(filters: &[Filter]) -> Vec<(String, String)> {
    filters
        .iter()
        .map(|filter| match filter {
            Filter::Eq(column, value) => (column.clone(), format!("eq.{value}")),
        })
        .collect()
}

/// Pulls the human-readable message out of an error body
fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["message", "msg", "error_description", "error"]
        .iter()
        .find_map(|key| value.get(key).and_then(Value::as_str))
        .map(ToString::to_string)
}

/// Turns a non-success response into [`BackendError::Http`]
async fn check(response: Response) -> BackendResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = error_message(&body).unwrap_or_else(|| {
        if body.is_empty() {
            status.canonical_reason().unwrap_or("Unknown error").to_string()
        } else {
            body
        }
    });

    Err(BackendError::Http {
        status: status.as_u16(),
        message,
    })
}

#[async_trait::async_trait]
impl TableApi for HttpBackend {
    async fn select(
        &self,
        table: &str,
        query: &Query,
        bearer: Option<&str>,
    ) -> BackendResult<Vec<Value>> {
        let params = query_params(query);
        debug!("select from {table} with {params:?}");

        let request = self
            .http_client
            .get(self.endpoint(&format!("rest/v1/{table}")))
            .query(&params);

        let response = check(self.authorized(request, bearer).send().await?).await?;
        Ok(response.json::<Vec<Value>>().await?)
    }

    async fn insert(&self, table: &str, row: Value, bearer: Option<&str>) -> BackendResult<Value> {
        let request = self
            .http_client
            .post(self.endpoint(&format!("rest/v1/{table}")))
            .header("Prefer", "return=representation")
            .json(&row);

        let response = check(self.authorized(request, bearer).send().await?).await?;
        response
            .json::<Vec<Value>>()
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::Decode(format!("insert into {table} returned no row")))
    }

    async fn update(
        &self,
        table: &str,
        filters: &[Filter],
        patch: Value,
        bearer: Option<&str>,
    ) -> BackendResult<Vec<Value>> {
        let request = self
            .http_client
            .patch(self.endpoint(&format!("rest/v1/{table}")))
            .query(&filter_params(filters))
            .header("Prefer", "return=representation")
            .json(&patch);

        let response = check(self.authorized(request, bearer).send().await?).await?;
        Ok(response.json::<Vec<Value>>().await?)
    }

    async fn delete(
        &self,
        table: &str,
        filters: &[Filter],
        bearer: Option<&str>,
    ) -> BackendResult<()> {
        let request = self
            .http_client
            .delete(self.endpoint(&format!("rest/v1/{table}")))
            .query(&filter_params(filters))
            .header("Prefer", "return=minimal");

        check(self.authorized(request, bearer).send().await?).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl ObjectStorageApi for HttpBackend {
    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        bytes: Vec<u8>,
        bearer: Option<&str>,
    ) -> BackendResult<()> {
        debug!("uploading {} bytes to {bucket}/{key}", bytes.len());

        let request = self
            .http_client
            .post(self.endpoint(&format!("storage/v1/object/{bucket}/{key}")))
            .header(header::CONTENT_TYPE, content_type)
            .header("x-upsert", "false")
            .body(bytes);

        check(self.authorized(request, bearer).send().await?).await?;
        Ok(())
    }

    fn public_url(&self, bucket: &str, key: &str) -> String {
        self.endpoint(&format!("storage/v1/object/public/{bucket}/{key}"))
    }
}

#[async_trait::async_trait]
impl AuthApi for HttpBackend {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> BackendResult<Session> {
        self.token_grant("password", json!({ "email": email, "password": password }))
            .await
    }

    async fn sign_up(&self, email: &str, password: &str) -> BackendResult<AuthUser> {
        let request = self
            .http_client
            .post(self.endpoint("auth/v1/signup"))
            .json(&json!({ "email": email, "password": password }));

        let response = check(self.authorized(request, None).send().await?).await?;
        let mut body = response.json::<Value>().await?;

        // With auto-confirm on, the service answers with a full session; the user sits inside it.
        let user = if body.get("user").is_some() {
            body["user"].take()
        } else {
            body
        };
        Ok(serde_json::from_value(user)?)
    }

    async fn sign_out(&self, access_token: &str) -> BackendResult<()> {
        let request = self.http_client.post(self.endpoint("auth/v1/logout"));
        check(self.authorized(request, Some(access_token)).send().await?).await?;
        Ok(())
    }

    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: Option<&str>,
    ) -> BackendResult<Session> {
        self.token_grant(
            "pkce",
            json!({ "auth_code": code, "code_verifier": code_verifier }),
        )
        .await
    }

    async fn refresh(&self, refresh_token: &str) -> BackendResult<Session> {
        self.token_grant("refresh_token", json!({ "refresh_token": refresh_token }))
            .await
    }

    async fn user(&self, access_token: &str) -> BackendResult<AuthUser> {
        let request = self.http_client.get(self.endpoint("auth/v1/user"));
        let response = check(self.authorized(request, Some(access_token)).send().await?).await?;
        Ok(response.json::<AuthUser>().await?)
    }

    fn authorize_url(&self, provider: &str, redirect_to: &str, code_challenge: &str) -> String {
        let mut url = self.base_url.clone();
        let path = format!("{}/auth/v1/authorize", url.path().trim_end_matches('/'));
        url.set_path(&path);
        url.query_pairs_mut()
            .append_pair("provider", provider)
            .append_pair("redirect_to", redirect_to)
            .append_pair("code_challenge", code_challenge)
            .append_pair("code_challenge_method", "s256");
        url.to_string()
    }
}
