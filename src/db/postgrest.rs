// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! PostgREST client for the Supabase tables.
//!
//! Requests are authorized with the signed-in user's access token so that
//! row-level security applies; without a session the anon key is used.

use crate::db::{Filter, TableGateway};
use crate::error::AppError;
use crate::services::auth::AuthGateway;
use async_trait::async_trait;
use std::sync::Arc;

/// PostgREST table client.
#[derive(Clone)]
pub struct PostgrestDb {
    http: reqwest::Client,
    rest_url: String,
    api_key: String,
    auth: Arc<dyn AuthGateway>,
}

impl PostgrestDb {
    /// Create a client for `{base_url}/rest/v1`.
    pub fn new(
        http: reqwest::Client,
        base_url: &str,
        api_key: &str,
        auth: Arc<dyn AuthGateway>,
    ) -> Self {
        Self {
            http,
            rest_url: format!("{}/rest/v1", base_url.trim_end_matches('/')),
            api_key: api_key.to_string(),
            auth,
        }
    }

    /// Start a request with the API key and the best available bearer token.
    /// The session is refreshed first when its token is about to expire.
    async fn request(&self, method: reqwest::Method, table: &str) -> reqwest::RequestBuilder {
        let bearer = self
            .auth
            .access_token()
            .await
            .unwrap_or_else(|| self.api_key.clone());

        self.http
            .request(method, format!("{}/{}", self.rest_url, table))
            .header("apikey", &self.api_key)
            .bearer_auth(bearer)
    }
}

#[async_trait]
impl TableGateway for PostgrestDb {
    async fn select(
        &self,
        table: &str,
        filters: &[Filter],
    ) -> Result<Vec<serde_json::Value>, AppError> {
        let mut query = vec![("select".to_string(), "*".to_string())];
        query.extend(filters.iter().map(Filter::to_query_pair));

        let response = self
            .request(reqwest::Method::GET, table)
            .await
            .query(&query)
            .send()
            .await
            .map_err(AppError::transport)?;

        let response = check_response(response).await?;
        response
            .json()
            .await
            .map_err(|e| AppError::Backend(format!("JSON parse error: {}", e)))
    }

    async fn insert(&self, table: &str, row: serde_json::Value) -> Result<(), AppError> {
        let response = self
            .request(reqwest::Method::POST, table)
            .await
            .header("Prefer", "return=minimal")
            .json(&row)
            .send()
            .await
            .map_err(AppError::transport)?;

        check_response(response).await?;
        Ok(())
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<(), AppError> {
        // PostgREST refuses unfiltered deletes; never send one.
        if filters.is_empty() {
            return Err(AppError::BadRequest(format!(
                "Refusing to delete every row of {}",
                table
            )));
        }

        let query: Vec<(String, String)> = filters.iter().map(Filter::to_query_pair).collect();

        let response = self
            .request(reqwest::Method::DELETE, table)
            .await
            .query(&query)
            .send()
            .await
            .map_err(AppError::transport)?;

        check_response(response).await?;
        Ok(())
    }
}

/// Check response status and turn PostgREST error bodies into `AppError`.
async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, AppError> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    // PostgREST errors look like {"code", "message", "details", "hint"}.
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| {
            let message = v.get("message")?.as_str()?.to_string();
            Some(match v.get("details").and_then(|d| d.as_str()) {
                Some(details) => format!("{} ({})", message, details),
                None => message,
            })
        })
        .unwrap_or(body);

    if status.as_u16() == 401 {
        return Err(AppError::Unauthorized);
    }

    Err(AppError::Backend(format!("HTTP {}: {}", status, message)))
}
