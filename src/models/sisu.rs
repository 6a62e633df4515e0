//! Sisu REST API wire types
//!
//! Request/response bodies for the endpoints the action touches, plus the
//! resolved table identity threaded through the orchestration.

use serde::{Deserialize, Serialize};

/// A data connection registered in Sisu.
#[derive(Debug, Clone, Deserialize)]
pub struct SisuConnection {
    pub id: i64,
    pub name: String,
}

/// Response of `GET /rest/connections/{id}/tables`: each row is the
/// catalog triple (database, schema, table name).
#[derive(Debug, Clone, Deserialize)]
pub struct TableList {
    pub tables: Vec<Vec<String>>,
}

/// Fully-qualified identity of the target table, uppercased the way the
/// warehouse catalog reports it. Resolved once per invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableInfo {
    pub database: String,
    pub schema: String,
    pub name: String,
}

impl TableInfo {
    /// Build from a catalog row; rows shorter than the triple are skipped.
    pub fn from_catalog_row(row: &[String]) -> Option<Self> {
        if row.len() < 3 {
            return None;
        }
        Some(Self {
            database: row[0].to_uppercase(),
            schema: row[1].to_uppercase(),
            name: row[2].to_uppercase(),
        })
    }

    pub fn fully_qualified_name(&self) -> String {
        format!("{}.{}.{}", self.database, self.schema, self.name)
    }

    /// Qualifier used for dimension references in SQL text
    pub fn sql_qualifier(&self) -> String {
        self.name.to_lowercase()
    }
}

/// A custom query (base query) registered against a data source.
#[derive(Debug, Clone, Deserialize)]
pub struct CustomQuery {
    pub name: String,
    pub base_query_id: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewCustomQuery {
    pub name: String,
    pub query_string: String,
}

/// A dimension registered on a base query.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryDimension {
    pub id: i64,
    #[serde(rename = "columnName")]
    pub column_name: String,
}

/// Direction in which the metric is expected to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DesiredDirection {
    Increase,
    Decrease,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewMetric {
    pub created_at: String,
    pub data_source_id: String,
    pub default_calculation: String,
    pub desired_direction: DesiredDirection,
    pub kpi_column_name: String,
    pub name: String,
    pub static_base_query_id: i64,
    pub metric_type: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricCreated {
    pub metric_id: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DefaultDimensionIds {
    pub ids: Vec<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewAnalysis {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisCreated {
    pub analysis_id: i64,
}

/// Identifiers created along one successful invocation, in creation order.
#[derive(Debug, Clone)]
pub struct KdaChain {
    pub connection_id: String,
    pub base_query_id: i64,
    pub metric_id: i64,
    pub analysis_id: i64,
}
