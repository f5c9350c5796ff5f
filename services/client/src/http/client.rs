//! services/client/src/http/client.rs
//!
//! The authenticated API client. Every request carries the bearer token of the
//! chosen identity class when one is valid; a 401/403 answer clears that token
//! and sends the user to the login surface before the error reaches the caller.

use godam_core::{IdentityClass, TokenManager};
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::Form;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::error::{ClientError, ClientResult};
use crate::http::envelope::{error_message, ApiEnvelope};

//=========================================================================================
// The Main Client Struct
//=========================================================================================

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    tokens: TokenManager,
}

impl ApiClient {
    /// Creates a client for the API rooted at `base_url` (e.g. `http://host/api`).
    pub fn new(base_url: impl Into<String>, tokens: TokenManager) -> ClientResult<Self> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tokens,
        })
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    //-------------------------------------------------------------------------------------
    // Verbs
    //-------------------------------------------------------------------------------------

    pub async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        class: IdentityClass,
    ) -> ClientResult<T> {
        self.send_json(Method::GET, endpoint, None::<&()>, class).await
    }

    /// GET and unwrap the `{ data }` envelope.
    pub async fn get_data<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        class: IdentityClass,
    ) -> ClientResult<T> {
        let envelope: ApiEnvelope<T> = self.get(endpoint, class).await?;
        Ok(envelope.data)
    }

    pub async fn post<B, T>(&self, endpoint: &str, data: &B, class: IdentityClass) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(Method::POST, endpoint, Some(data), class).await
    }

    pub async fn put<B, T>(&self, endpoint: &str, data: &B, class: IdentityClass) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(Method::PUT, endpoint, Some(data), class).await
    }

    pub async fn patch<B, T>(&self, endpoint: &str, data: &B, class: IdentityClass) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(Method::PATCH, endpoint, Some(data), class).await
    }

    pub async fn delete<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        class: IdentityClass,
    ) -> ClientResult<T> {
        self.send_json(Method::DELETE, endpoint, None::<&()>, class).await
    }

    /// POSTs a multipart form. The content type (with its boundary) is left to
    /// the form encoder.
    pub async fn upload<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        form: Form,
        class: IdentityClass,
    ) -> ClientResult<T> {
        let builder = self.request(Method::POST, endpoint, class)?.multipart(form);
        self.execute(builder, endpoint, class).await
    }

    //-------------------------------------------------------------------------------------
    // Plumbing
    //-------------------------------------------------------------------------------------

    fn url(&self, endpoint: &str) -> ClientResult<String> {
        if !endpoint.starts_with('/') {
            return Err(ClientError::InvalidEndpoint(format!(
                "'{}' must start with '/'",
                endpoint
            )));
        }
        Ok(format!("{}{}", self.base_url, endpoint))
    }

    fn request(
        &self,
        method: Method,
        endpoint: &str,
        class: IdentityClass,
    ) -> ClientResult<RequestBuilder> {
        let builder = self.http.request(method, self.url(endpoint)?);
        // The token is captured now; a request in flight when it lapses still uses it.
        Ok(match self.tokens.get_token(class) {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        })
    }

    async fn send_json<B, T>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&B>,
        class: IdentityClass,
    ) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut builder = self
            .request(method, endpoint, class)?
            .header(CONTENT_TYPE, "application/json");
        if let Some(body) = body {
            builder = builder.json(body);
        }
        self.execute(builder, endpoint, class).await
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        endpoint: &str,
        class: IdentityClass,
    ) -> ClientResult<T> {
        let response = builder.send().await.map_err(|e| {
            error!(endpoint, error = %e, "API request failed");
            ClientError::Http(e)
        })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            warn!(endpoint, %status, %class, "Session rejected by the API");
            self.tokens.clear_token(class);
            self.tokens.redirect_to_login();
            return Err(ClientError::Unauthorized);
        }

        if !status.is_success() {
            let body = response.bytes().await.unwrap_or_default();
            let message = error_message(&body)
                .unwrap_or_else(|| format!("HTTP error! status: {}", status.as_u16()));
            debug!(endpoint, %status, %message, "API returned an error");
            return Err(ClientError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.bytes().await?;
        if body.is_empty() {
            return Ok(serde_json::from_value(Value::Null)?);
        }
        Ok(serde_json::from_slice(&body)?)
    }
}
