//! KDA orchestration
//!
//! Runs the strictly linear chain of Sisu calls that turns one scheduled
//! report into a key-driver analysis:
//!
//! resolve table -> resolve-or-create "all dimensions" helper query ->
//! fetch dimension catalog -> rewrite query -> create base query ->
//! create metric -> set default dimensions -> create analysis -> run analysis
//!
//! Each step consumes the identifier produced by the previous one; a failure
//! at any step aborts the remainder. There is no rollback: remote objects
//! already created by earlier steps (base query, metric, analysis) stay in
//! Sisu when a later step fails, and a retried invocation creates a fresh
//! set under new timestamped names. The only object reused across
//! invocations is the per-table helper query, matched by its well-known
//! name; concurrent invocations for the same table may race to create
//! duplicates of it, which Sisu tolerates.

use chrono::{SecondsFormat, Utc};
use std::collections::HashSet;

use crate::config::ActionConfig;
use crate::models::{
    ActionRequest, DefaultDimensionIds, DesiredDirection, KdaChain, MetricCreated, NewAnalysis,
    NewCustomQuery, NewMetric, QueryPayload, TableInfo,
};
use crate::services::query_rewriter;
use crate::services::sisu_client::SisuApi;
use crate::utils::{ApiError, ApiResult};

pub struct KdaService<A: SisuApi> {
    api: A,
    config: ActionConfig,
}

impl<A: SisuApi> KdaService<A> {
    pub fn new(api: A, config: ActionConfig) -> Self {
        Self { api, config }
    }

    /// Execute the full chain for one report. Returns the identifiers of the
    /// created remote objects for logging.
    pub async fn run(&self, request: &ActionRequest) -> ApiResult<KdaChain> {
        let connection_id = request.connection_id()?.to_string();
        let table_name = request.table_name()?;
        let payload = request.payload()?;

        // One timestamp per invocation; all created objects share it
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let title = request.report_title();

        let table = self.resolve_table(&connection_id, table_name).await?;
        tracing::info!("Resolved table {} for report '{}'", table.fully_qualified_name(), title);

        let catalog = self.dimension_catalog(&connection_id, table_name, &table).await?;
        tracing::debug!("Table {} has {} dimensions", table.name, catalog.len());

        let query_string = query_rewriter::rewrite(payload.sql()?, &table, &catalog)?;
        let base_query = self
            .api
            .create_custom_query(
                &connection_id,
                &NewCustomQuery {
                    name: format!("{}_{}_query", timestamp, title),
                    query_string,
                },
            )
            .await?;
        tracing::info!("Created base query {}", base_query.base_query_id);

        let metric = self
            .create_metric(payload, &connection_id, base_query.base_query_id, &timestamp, title)
            .await?;
        tracing::info!("Created metric {}", metric.metric_id);

        self.update_default_dimensions(payload, base_query.base_query_id, metric.metric_id)
            .await?;

        let analysis = self
            .api
            .create_analysis(
                self.config.project_id,
                metric.metric_id,
                &NewAnalysis { name: format!("{}_{}_kda", timestamp, title) },
            )
            .await?;
        tracing::info!("Created analysis {}", analysis.analysis_id);

        self.api.run_analysis(analysis.analysis_id).await?;

        Ok(KdaChain {
            connection_id,
            base_query_id: base_query.base_query_id,
            metric_id: metric.metric_id,
            analysis_id: analysis.analysis_id,
        })
    }

    /// Resolve the report's table against the connection's catalog. The
    /// lookup key matches any column of a catalog row, case-insensitively.
    async fn resolve_table(&self, connection_id: &str, table_name: &str) -> ApiResult<TableInfo> {
        let table_list = self.api.list_tables(connection_id).await?;
        table_list
            .tables
            .iter()
            .find(|row| row.iter().any(|cell| cell.eq_ignore_ascii_case(table_name)))
            .and_then(|row| TableInfo::from_catalog_row(row))
            .ok_or_else(|| {
                ApiError::not_found(format!("Wasn't able to find table '{}' in Sisu", table_name))
            })
    }

    /// Well-known name of the helper query that memoizes a table's dimension
    /// catalog in Sisu.
    fn helper_query_name(table_name: &str) -> String {
        format!("Looker {} all dimensions", table_name)
    }

    /// Fetch the full dimension catalog of the target table, qualified as
    /// `table."column"`. Sisu has no describe-table endpoint, so the catalog
    /// is discovered through a one-row helper query that is created on first
    /// use and found by name afterwards.
    async fn dimension_catalog(
        &self,
        connection_id: &str,
        table_name: &str,
        table: &TableInfo,
    ) -> ApiResult<Vec<String>> {
        let helper_name = Self::helper_query_name(table_name);
        let queries = self.api.list_custom_queries(connection_id).await?;

        let helper_id = match queries.iter().find(|query| query.name == helper_name) {
            Some(existing) => existing.base_query_id,
            None => {
                let created = self
                    .api
                    .create_custom_query(
                        connection_id,
                        &NewCustomQuery {
                            name: helper_name,
                            query_string: format!(
                                "SELECT * FROM {} LIMIT 1",
                                table.fully_qualified_name()
                            ),
                        },
                    )
                    .await?;
                tracing::info!(
                    "Created all-dimensions helper query {} for table {}",
                    created.base_query_id,
                    table.name
                );
                created.base_query_id
            },
        };

        let dimensions = self.api.list_query_dimensions(helper_id).await?;
        Ok(dimensions
            .into_iter()
            .map(|dimension| format!("{}.\"{}\"", table.sql_qualifier(), dimension.column_name))
            .collect())
    }

    /// Derive the metric from the report's first measure.
    async fn create_metric(
        &self,
        payload: &QueryPayload,
        connection_id: &str,
        base_query_id: i64,
        timestamp: &str,
        title: &str,
    ) -> ApiResult<MetricCreated> {
        let measure = payload.first_measure()?;

        let desired_direction = if measure.sort_descending() {
            DesiredDirection::Increase
        } else {
            DesiredDirection::Decrease
        };

        let metric = NewMetric {
            created_at: timestamp.to_string(),
            data_source_id: connection_id.to_string(),
            default_calculation: measure.aggregation.clone(),
            desired_direction,
            kpi_column_name: measure.kpi_column_name(),
            name: format!("{}_{}_metric", timestamp, title),
            static_base_query_id: base_query_id,
            metric_type: "scalar".to_string(),
        };

        self.api.create_metric(&metric).await
    }

    /// Intersect the report's dimensions against the base query's registered
    /// dimensions and submit the matching ids as the metric's defaults.
    async fn update_default_dimensions(
        &self,
        payload: &QueryPayload,
        base_query_id: i64,
        metric_id: i64,
    ) -> ApiResult<()> {
        let report_dimensions: HashSet<&str> = payload
            .dimensions()?
            .iter()
            .map(|dimension| dimension.name.as_str())
            .collect();

        let registered = self.api.list_query_dimensions(base_query_id).await?;
        let ids: Vec<i64> = registered
            .iter()
            .filter(|dimension| report_dimensions.contains(dimension.column_name.as_str()))
            .map(|dimension| dimension.id)
            .collect();

        tracing::debug!("Default dimension ids for metric {}: {:?}", metric_id, ids);
        self.api
            .set_default_dimensions(metric_id, &DefaultDimensionIds { ids })
            .await
    }
}
