//! Orchestration chain tests against a recording mock of the Sisu API

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crate::config::ActionConfig;
use crate::models::{
    AnalysisCreated, CustomQuery, DefaultDimensionIds, DesiredDirection, MetricCreated,
    NewAnalysis, NewCustomQuery, NewMetric, QueryDimension, SisuConnection, TableList,
};
use crate::services::{KdaService, SisuApi};
use crate::tests::common;
use crate::utils::{ApiError, ApiResult};

const HELPER_QUERY_ID: i64 = 11;
const BASE_QUERY_ID: i64 = 42;
const METRIC_ID: i64 = 7;
const ANALYSIS_ID: i64 = 99;

/// In-memory Sisu that records every call in order.
#[derive(Default)]
struct MockSisu {
    tables: Vec<Vec<String>>,
    existing_queries: Vec<CustomQuery>,
    dimensions: Vec<QueryDimension>,
    fail_run_analysis: bool,

    calls: Mutex<Vec<String>>,
    created_queries: Mutex<Vec<NewCustomQuery>>,
    metric_bodies: Mutex<Vec<NewMetric>>,
    default_ids: Mutex<Vec<DefaultDimensionIds>>,
    analyses: Mutex<Vec<(i64, i64, String)>>,
}

impl MockSisu {
    fn with_orders_table() -> Self {
        Self {
            tables: vec![
                vec!["DB".to_string(), "PUBLIC".to_string(), "ORDERS".to_string()],
                vec!["DB".to_string(), "PUBLIC".to_string(), "USERS".to_string()],
            ],
            dimensions: vec![
                QueryDimension { id: 1, column_name: "id".to_string() },
                QueryDimension { id: 2, column_name: "total".to_string() },
                QueryDimension { id: 3, column_name: "state".to_string() },
            ],
            ..Default::default()
        }
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SisuApi for Arc<MockSisu> {
    async fn list_connections(&self) -> ApiResult<Vec<SisuConnection>> {
        self.record("list_connections");
        Ok(vec![])
    }

    async fn list_tables(&self, connection_id: &str) -> ApiResult<TableList> {
        self.record(format!("list_tables:{}", connection_id));
        Ok(TableList { tables: self.tables.clone() })
    }

    async fn list_custom_queries(&self, _connection_id: &str) -> ApiResult<Vec<CustomQuery>> {
        self.record("list_custom_queries");
        Ok(self.existing_queries.clone())
    }

    async fn create_custom_query(
        &self,
        _connection_id: &str,
        query: &NewCustomQuery,
    ) -> ApiResult<CustomQuery> {
        self.record(format!("create_custom_query:{}", query.name));
        self.created_queries.lock().unwrap().push(query.clone());
        let base_query_id = if query.name.ends_with("all dimensions") {
            HELPER_QUERY_ID
        } else {
            BASE_QUERY_ID
        };
        Ok(CustomQuery { name: query.name.clone(), base_query_id })
    }

    async fn list_query_dimensions(&self, base_query_id: i64) -> ApiResult<Vec<QueryDimension>> {
        self.record(format!("list_query_dimensions:{}", base_query_id));
        Ok(self.dimensions.clone())
    }

    async fn create_metric(&self, metric: &NewMetric) -> ApiResult<MetricCreated> {
        self.record("create_metric");
        self.metric_bodies.lock().unwrap().push(metric.clone());
        Ok(MetricCreated { metric_id: METRIC_ID })
    }

    async fn set_default_dimensions(
        &self,
        _metric_id: i64,
        ids: &DefaultDimensionIds,
    ) -> ApiResult<()> {
        self.record("set_default_dimensions");
        self.default_ids.lock().unwrap().push(ids.clone());
        Ok(())
    }

    async fn create_analysis(
        &self,
        project_id: i64,
        metric_id: i64,
        analysis: &NewAnalysis,
    ) -> ApiResult<AnalysisCreated> {
        self.record("create_analysis");
        self.analyses
            .lock()
            .unwrap()
            .push((project_id, metric_id, analysis.name.clone()));
        Ok(AnalysisCreated { analysis_id: ANALYSIS_ID })
    }

    async fn run_analysis(&self, analysis_id: i64) -> ApiResult<()> {
        self.record(format!("run_analysis:{}", analysis_id));
        if self.fail_run_analysis {
            return Err(ApiError::remote("run analysis", "500: boom"));
        }
        Ok(())
    }
}

fn service(mock: &Arc<MockSisu>) -> KdaService<Arc<MockSisu>> {
    KdaService::new(Arc::clone(mock), ActionConfig::default())
}

#[tokio::test]
async fn full_chain_threads_identifiers_in_order() {
    let mock = Arc::new(MockSisu::with_orders_table());
    let chain = service(&mock).run(&common::orders_request()).await.unwrap();

    assert_eq!(chain.connection_id, "5");
    assert_eq!(chain.base_query_id, BASE_QUERY_ID);
    assert_eq!(chain.metric_id, METRIC_ID);
    assert_eq!(chain.analysis_id, ANALYSIS_ID);

    let base_query_name = mock.created_queries.lock().unwrap()[1].name.clone();
    assert_eq!(
        mock.calls(),
        vec![
            "list_tables:5".to_string(),
            "list_custom_queries".to_string(),
            "create_custom_query:Looker orders all dimensions".to_string(),
            format!("list_query_dimensions:{}", HELPER_QUERY_ID),
            format!("create_custom_query:{}", base_query_name),
            "create_metric".to_string(),
            format!("list_query_dimensions:{}", BASE_QUERY_ID),
            "set_default_dimensions".to_string(),
            "create_analysis".to_string(),
            format!("run_analysis:{}", ANALYSIS_ID),
        ]
    );
}

#[tokio::test]
async fn helper_query_is_created_then_base_query_rewritten() {
    let mock = Arc::new(MockSisu::with_orders_table());
    service(&mock).run(&common::orders_request()).await.unwrap();

    let created = mock.created_queries.lock().unwrap();
    assert_eq!(created.len(), 2);

    assert_eq!(created[0].name, "Looker orders all dimensions");
    assert_eq!(created[0].query_string, "SELECT * FROM DB.PUBLIC.ORDERS LIMIT 1");

    assert!(created[1].name.ends_with("_Orders report_query"));
    assert_eq!(
        created[1].query_string,
        "SELECT orders.\"state\",orders.\"id\" AS id,orders.\"total\" AS total FROM DB.PUBLIC.ORDERS WHERE orders.\"id\" > 0"
    );
}

#[tokio::test]
async fn helper_query_is_reused_when_already_registered() {
    let mut mock = MockSisu::with_orders_table();
    mock.existing_queries = vec![CustomQuery {
        name: "Looker orders all dimensions".to_string(),
        base_query_id: HELPER_QUERY_ID,
    }];
    let mock = Arc::new(mock);
    service(&mock).run(&common::orders_request()).await.unwrap();

    // Only the base query is created; the helper is found by name
    let created = mock.created_queries.lock().unwrap();
    assert_eq!(created.len(), 1);
    assert!(created[0].name.ends_with("_Orders report_query"));
}

#[tokio::test]
async fn metric_is_derived_from_first_measure() {
    let mock = Arc::new(MockSisu::with_orders_table());
    service(&mock).run(&common::orders_request()).await.unwrap();

    let metrics = mock.metric_bodies.lock().unwrap();
    assert_eq!(metrics.len(), 1);
    let metric = &metrics[0];

    assert_eq!(metric.data_source_id, "5");
    assert_eq!(metric.default_calculation, "average");
    assert_eq!(metric.desired_direction, DesiredDirection::Increase);
    // Dotted measure names pass through untouched
    assert_eq!(metric.kpi_column_name, "orders.total");
    assert_eq!(metric.static_base_query_id, BASE_QUERY_ID);
    assert_eq!(metric.metric_type, "scalar");
    assert!(metric.name.ends_with("_Orders report_metric"));
}

#[tokio::test]
async fn ascending_sort_and_bare_measure_name() {
    let mut request = common::orders_request();
    let payload = request
        .attachment
        .as_mut()
        .unwrap()
        .data_json
        .as_mut()
        .unwrap();
    payload.fields.measures[0].name = "total".to_string();
    payload.fields.measures[0].sorted.desc = false;

    let mock = Arc::new(MockSisu::with_orders_table());
    service(&mock).run(&request).await.unwrap();

    let metrics = mock.metric_bodies.lock().unwrap();
    assert_eq!(metrics[0].desired_direction, DesiredDirection::Decrease);
    assert_eq!(metrics[0].kpi_column_name, "TOTAL");
}

#[tokio::test]
async fn default_dimensions_are_intersected_by_column_name() {
    let mock = Arc::new(MockSisu::with_orders_table());
    service(&mock).run(&common::orders_request()).await.unwrap();

    // Report selected only "id"; "total" and "state" are not defaults
    let ids = mock.default_ids.lock().unwrap();
    assert_eq!(ids.len(), 1);
    assert_eq!(ids[0].ids, vec![1]);
}

#[tokio::test]
async fn analysis_is_scoped_to_configured_project() {
    let mock = Arc::new(MockSisu::with_orders_table());
    let service = KdaService::new(
        Arc::clone(&mock),
        ActionConfig::default().with_project_id(123),
    );
    service.run(&common::orders_request()).await.unwrap();

    let analyses = mock.analyses.lock().unwrap();
    assert_eq!(analyses.len(), 1);
    let (project_id, metric_id, name) = &analyses[0];
    assert_eq!(*project_id, 123);
    assert_eq!(*metric_id, METRIC_ID);
    assert!(name.ends_with("_Orders report_kda"));
}

#[tokio::test]
async fn missing_measure_aborts_before_metric_and_analysis() {
    let mut request = common::orders_request();
    request
        .attachment
        .as_mut()
        .unwrap()
        .data_json
        .as_mut()
        .unwrap()
        .fields
        .measures
        .clear();

    let mock = Arc::new(MockSisu::with_orders_table());
    let err = service(&mock).run(&request).await.unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));

    let calls = mock.calls();
    assert!(!calls.contains(&"create_metric".to_string()));
    assert!(!calls.contains(&"create_analysis".to_string()));
    assert!(!calls.iter().any(|call| call.starts_with("run_analysis")));
}

#[tokio::test]
async fn unknown_table_aborts_after_lookup() {
    let mut request = common::orders_request();
    request.scheduled_plan.as_mut().unwrap().query.as_mut().unwrap().model =
        Some("payments".to_string());

    let mock = Arc::new(MockSisu::with_orders_table());
    let err = service(&mock).run(&request).await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
    assert_eq!(mock.calls(), vec!["list_tables:5".to_string()]);
}

#[tokio::test]
async fn table_resolution_is_case_insensitive() {
    let mut request = common::orders_request();
    request.scheduled_plan.as_mut().unwrap().query.as_mut().unwrap().model =
        Some("OrDeRs".to_string());

    let mock = Arc::new(MockSisu::with_orders_table());
    let chain = service(&mock).run(&request).await.unwrap();
    assert_eq!(chain.base_query_id, BASE_QUERY_ID);
}

#[tokio::test]
async fn run_analysis_failure_fails_the_invocation() {
    let mut mock = MockSisu::with_orders_table();
    mock.fail_run_analysis = true;
    let mock = Arc::new(mock);

    let err = service(&mock).run(&common::orders_request()).await.unwrap_err();
    assert_eq!(err.step(), Some("run analysis"));
    assert!(mock.calls().contains(&"create_analysis".to_string()));
}
