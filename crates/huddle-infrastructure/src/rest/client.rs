//! Minimal PostgREST client for the hosted relational store.
//!
//! Tables are addressed as `{url}/rest/v1/{table}`; filters, ordering and
//! embedded selects are passed as query parameters.

use huddle_core::config::BackendSettings;
use huddle_core::error::{HuddleError, Result};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// A row query against one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    table: String,
    select: String,
    filters: Vec<(String, String)>,
    order: Vec<String>,
    limit: Option<usize>,
}

impl Query {
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            select: "*".to_string(),
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
        }
    }

    /// Columns (and embedded relations) to return.
    pub fn select(mut self, columns: impl Into<String>) -> Self {
        self.select = columns.into();
        self
    }

    pub fn eq(mut self, column: &str, value: impl AsRef<str>) -> Self {
        self.filters
            .push((column.to_string(), format!("eq.{}", value.as_ref())));
        self
    }

    /// `column IN (values)`. Values are quoted so commas cannot split them.
    pub fn in_list(mut self, column: &str, values: &[String]) -> Self {
        let quoted: Vec<String> = values
            .iter()
            .map(|v| format!("\"{}\"", v.replace('"', "\\\"")))
            .collect();
        self.filters
            .push((column.to_string(), format!("in.({})", quoted.join(","))));
        self
    }

    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        let direction = if ascending { "asc" } else { "desc" };
        self.order.push(format!("{}.{}", column, direction));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    fn filter_params(&self) -> Vec<(String, String)> {
        self.filters.clone()
    }

    /// Filters plus the columns of the returned representation.
    fn write_params(&self) -> Vec<(String, String)> {
        let mut params = vec![("select".to_string(), self.select.clone())];
        params.extend(self.filter_params());
        params
    }

    fn read_params(&self) -> Vec<(String, String)> {
        let mut params = vec![("select".to_string(), self.select.clone())];
        params.extend(self.filter_params());
        if !self.order.is_empty() {
            params.push(("order".to_string(), self.order.join(",")));
        }
        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        params
    }
}

/// HTTP client bound to one backend project.
#[derive(Debug, Clone)]
pub struct RestClient {
    http: Client,
    base_url: String,
    anon_key: String,
    access_token: Option<String>,
    schema: String,
}

impl RestClient {
    /// Creates a client from backend settings.
    ///
    /// # Errors
    ///
    /// Returns a config error when the URL or key is missing.
    pub fn new(settings: &BackendSettings) -> Result<Self> {
        if !settings.is_configured() {
            return Err(HuddleError::config(
                "backend.url and backend.anon_key must be set",
            ));
        }

        let http = Client::builder()
            .timeout(settings.request_timeout())
            .build()
            .map_err(|e| HuddleError::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: settings.url.trim_end_matches('/').to_string(),
            anon_key: settings.anon_key.clone(),
            access_token: settings.access_token.clone(),
            schema: settings.schema.clone(),
        })
    }

    pub fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    /// Selects rows.
    pub async fn select<T: DeserializeOwned>(&self, query: &Query) -> Result<Vec<T>> {
        let builder = self
            .request(Method::GET, query.table_name())
            .query(&query.read_params());
        let response = self.send(builder, query.table_name()).await?;
        decode(response, query.table_name()).await
    }

    /// Selects at most one row.
    pub async fn select_one<T: DeserializeOwned>(&self, query: &Query) -> Result<Option<T>> {
        let rows = self.select(&query.clone().limit(1)).await?;
        Ok(rows.into_iter().next())
    }

    /// Inserts one row or an array of rows and returns the stored rows.
    pub async fn insert<B, T>(&self, table: &str, body: &B) -> Result<Vec<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let builder = self
            .request(Method::POST, table)
            .header("Prefer", "return=representation")
            .json(body);
        let response = self.send(builder, table).await?;
        decode(response, table).await
    }

    /// Patches every row matched by the query filters and returns them,
    /// shaped by the query's select.
    pub async fn update<B, T>(&self, query: &Query, body: &B) -> Result<Vec<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let builder = self
            .request(Method::PATCH, query.table_name())
            .header("Prefer", "return=representation")
            .query(&query.write_params())
            .json(body);
        let response = self.send(builder, query.table_name()).await?;
        decode(response, query.table_name()).await
    }

    /// Deletes every row matched by the query filters.
    pub async fn delete(&self, query: &Query) -> Result<()> {
        let builder = self
            .request(Method::DELETE, query.table_name())
            .query(&query.filter_params());
        self.send(builder, query.table_name()).await?;
        Ok(())
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        let bearer = self.access_token.as_deref().unwrap_or(&self.anon_key);
        let profile_header = if method == Method::GET {
            "Accept-Profile"
        } else {
            "Content-Profile"
        };
        self.http
            .request(method, self.table_url(table))
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", bearer))
            .header(profile_header, &self.schema)
    }

    async fn send(&self, builder: RequestBuilder, table: &str) -> Result<Response> {
        let response = builder.send().await.map_err(|err| {
            tracing::warn!("[RestClient] Request to '{}' failed: {}", table, err);
            HuddleError::data_access(format!("Request to '{}' failed: {}", table, err))
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            tracing::warn!("[RestClient] '{}' returned {}: {}", table, status, body);
            return Err(HuddleError::Http {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(response)
    }
}

async fn decode<T: DeserializeOwned>(response: Response, table: &str) -> Result<Vec<T>> {
    let bytes = response
        .bytes()
        .await
        .map_err(|e| HuddleError::data_access(format!("Failed to read '{}' rows: {}", table, e)))?;
    if bytes.is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_slice(&bytes)?)
}
