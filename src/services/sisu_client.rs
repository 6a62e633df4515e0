//! Sisu REST API client
//!
//! One method per endpoint the action touches. The trait is the seam the
//! orchestrator is written against so tests can drive the chain without a
//! live server; `SisuClient` is the reqwest-backed implementation with the
//! per-invocation bearer token.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

use crate::models::{
    AnalysisCreated, CustomQuery, DefaultDimensionIds, MetricCreated, NewAnalysis, NewCustomQuery,
    NewMetric, QueryDimension, SisuConnection, TableList,
};
use crate::utils::{ApiError, ApiResult};

/// Unified interface over the Sisu REST endpoints used by the action.
#[async_trait]
pub trait SisuApi: Send + Sync {
    /// List data connections visible to the token
    async fn list_connections(&self) -> ApiResult<Vec<SisuConnection>>;

    /// List catalog rows (database, schema, table) of a connection
    async fn list_tables(&self, connection_id: &str) -> ApiResult<TableList>;

    /// List custom queries registered on a data source
    async fn list_custom_queries(&self, connection_id: &str) -> ApiResult<Vec<CustomQuery>>;

    /// Register a custom query on a data source
    async fn create_custom_query(
        &self,
        connection_id: &str,
        query: &NewCustomQuery,
    ) -> ApiResult<CustomQuery>;

    /// List the dimensions of a base query's result shape
    async fn list_query_dimensions(&self, base_query_id: i64) -> ApiResult<Vec<QueryDimension>>;

    /// Create a metric
    async fn create_metric(&self, metric: &NewMetric) -> ApiResult<MetricCreated>;

    /// Set the default dimension ids of a metric
    async fn set_default_dimensions(
        &self,
        metric_id: i64,
        ids: &DefaultDimensionIds,
    ) -> ApiResult<()>;

    /// Create a key-driver analysis referencing a metric
    async fn create_analysis(
        &self,
        project_id: i64,
        metric_id: i64,
        analysis: &NewAnalysis,
    ) -> ApiResult<AnalysisCreated>;

    /// Trigger computation of an analysis
    async fn run_analysis(&self, analysis_id: i64) -> ApiResult<()>;
}

pub struct SisuClient {
    http_client: Client,
    base_url: String,
    api_token: String,
}

impl SisuClient {
    pub fn new(base_url: impl Into<String>, api_token: impl Into<String>, timeout: Duration) -> Self {
        let http_client = Client::builder().timeout(timeout).build().unwrap_or_else(|e| {
            // Client build failure is rare and usually indicates system resource issues
            tracing::error!("Failed to build HTTP client: {}. Falling back to defaults.", e);
            Client::default()
        });

        Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_token: api_token.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, step: &'static str, path: &str) -> ApiResult<T> {
        let url = self.url(path);
        tracing::debug!("GET {}", url);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.api_token)
            .send()
            .await?;
        Self::decode(step, response).await
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        step: &'static str,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        let url = self.url(path);
        tracing::debug!("POST {}", url);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_token)
            .json(body)
            .send()
            .await?;
        Self::decode(step, response).await
    }

    /// POST where only the status matters; the response body is discarded.
    async fn post_unit<B: Serialize>(
        &self,
        step: &'static str,
        path: &str,
        body: &B,
    ) -> ApiResult<()> {
        let url = self.url(path);
        tracing::debug!("POST {}", url);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_token)
            .json(body)
            .send()
            .await?;
        Self::check_status(step, response).await?;
        Ok(())
    }

    async fn decode<T: DeserializeOwned>(
        step: &'static str,
        response: reqwest::Response,
    ) -> ApiResult<T> {
        let response = Self::check_status(step, response).await?;
        response
            .json()
            .await
            .map_err(|e| ApiError::remote(step, format!("failed to parse response: {}", e)))
    }

    async fn check_status(
        step: &'static str,
        response: reqwest::Response,
    ) -> ApiResult<reqwest::Response> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Sisu API {} failed with status {}: {}", step, status, body);
            return Err(ApiError::remote(step, format!("{}: {}", status, body)));
        }
        Ok(response)
    }
}

#[async_trait]
impl SisuApi for SisuClient {
    async fn list_connections(&self) -> ApiResult<Vec<SisuConnection>> {
        self.get_json("list connections", "/rest/connections").await
    }

    async fn list_tables(&self, connection_id: &str) -> ApiResult<TableList> {
        self.get_json("list tables", &format!("/rest/connections/{}/tables", connection_id))
            .await
    }

    async fn list_custom_queries(&self, connection_id: &str) -> ApiResult<Vec<CustomQuery>> {
        self.get_json(
            "list custom queries",
            &format!("/rest/data_sources/{}/custom_queries", connection_id),
        )
        .await
    }

    async fn create_custom_query(
        &self,
        connection_id: &str,
        query: &NewCustomQuery,
    ) -> ApiResult<CustomQuery> {
        self.post_json(
            "create custom query",
            &format!("/rest/data_sources/{}/custom_queries", connection_id),
            query,
        )
        .await
    }

    async fn list_query_dimensions(&self, base_query_id: i64) -> ApiResult<Vec<QueryDimension>> {
        self.get_json(
            "list query dimensions",
            &format!("/rest/base_queries/{}/dimensions", base_query_id),
        )
        .await
    }

    async fn create_metric(&self, metric: &NewMetric) -> ApiResult<MetricCreated> {
        self.post_json("create metric", "/rest/metrics", metric).await
    }

    async fn set_default_dimensions(
        &self,
        metric_id: i64,
        ids: &DefaultDimensionIds,
    ) -> ApiResult<()> {
        self.post_unit(
            "set default dimensions",
            &format!("/rest/metrics/{}/default_dimensions", metric_id),
            ids,
        )
        .await
    }

    async fn create_analysis(
        &self,
        project_id: i64,
        metric_id: i64,
        analysis: &NewAnalysis,
    ) -> ApiResult<AnalysisCreated> {
        self.post_json(
            "create analysis",
            &format!("/rest/projects/{}/metrics/{}/analyses", project_id, metric_id),
            analysis,
        )
        .await
    }

    async fn run_analysis(&self, analysis_id: i64) -> ApiResult<()> {
        self.post_unit(
            "run analysis",
            &format!("/rest/analyses/{}/results", analysis_id),
            &serde_json::json!({}),
        )
        .await
    }
}
