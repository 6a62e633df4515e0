//! Host-runtime request and response types
//!
//! Typed view of the action-hub request JSON. The attachment payload used to
//! be consumed duck-typed; here every field the action reads is an explicit
//! struct so malformed payloads fail at ingestion with a descriptive error
//! instead of deep inside the SQL rewriting.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::utils::{ApiError, ApiResult};

/// Inbound action request as delivered by the host runtime.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ActionRequest {
    /// Credential parameters configured on the action (API token lives here)
    pub params: HashMap<String, String>,
    /// User-supplied form values collected before execution
    #[serde(rename = "formParams")]
    pub form_params: HashMap<String, String>,
    #[serde(rename = "scheduledPlan")]
    pub scheduled_plan: Option<ScheduledPlan>,
    pub attachment: Option<Attachment>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ScheduledPlan {
    pub title: Option<String>,
    pub query: Option<ReportQuery>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReportQuery {
    pub model: Option<String>,
    pub view: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Attachment {
    #[serde(rename = "dataJSON")]
    pub data_json: Option<QueryPayload>,
}

/// JSON description of the executed report query.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct QueryPayload {
    pub sql: Option<String>,
    pub fields: QueryFields,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct QueryFields {
    pub measures: Vec<MeasureDescriptor>,
    pub dimensions: Vec<DimensionDescriptor>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MeasureDescriptor {
    pub name: String,
    /// Aggregation kind as reported by the host ("count", "average", ...)
    #[serde(rename = "type")]
    pub aggregation: String,
    #[serde(default)]
    pub sorted: SortState,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SortState {
    pub desc: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DimensionDescriptor {
    pub name: String,
}

impl MeasureDescriptor {
    pub fn sort_descending(&self) -> bool {
        self.sorted.desc
    }

    /// KPI column name for the metric: dotted names pass through, bare names
    /// are uppercased to match the warehouse casing.
    pub fn kpi_column_name(&self) -> String {
        if self.name.contains('.') {
            self.name.clone()
        } else {
            self.name.to_uppercase()
        }
    }
}

impl ActionRequest {
    pub fn api_token(&self, token_param: &str) -> ApiResult<&str> {
        self.params
            .get(token_param)
            .map(String::as_str)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::validation("Need an API token"))
    }

    pub fn connection_id(&self) -> ApiResult<&str> {
        self.form_params
            .get("connection")
            .map(String::as_str)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| ApiError::validation("User needs to select a Sisu connection"))
    }

    /// Table name derived from the report's model, falling back to the view.
    pub fn table_name(&self) -> ApiResult<&str> {
        self.scheduled_plan
            .as_ref()
            .and_then(|plan| plan.query.as_ref())
            .and_then(|query| query.model.as_deref().or(query.view.as_deref()))
            .filter(|name| !name.is_empty())
            .ok_or_else(|| ApiError::validation("There is no table name in the data"))
    }

    pub fn report_title(&self) -> &str {
        self.scheduled_plan
            .as_ref()
            .and_then(|plan| plan.title.as_deref())
            .unwrap_or("")
    }

    pub fn payload(&self) -> ApiResult<&QueryPayload> {
        self.attachment
            .as_ref()
            .and_then(|attachment| attachment.data_json.as_ref())
            .ok_or_else(|| ApiError::validation("Malformed payload: attachment has no dataJSON"))
    }
}

impl QueryPayload {
    pub fn sql(&self) -> ApiResult<&str> {
        self.sql
            .as_deref()
            .filter(|sql| !sql.is_empty())
            .ok_or_else(|| ApiError::validation("There is no sql query in the data"))
    }

    pub fn first_measure(&self) -> ApiResult<&MeasureDescriptor> {
        self.fields
            .measures
            .first()
            .ok_or_else(|| ApiError::validation("No measures in the data"))
    }

    pub fn dimensions(&self) -> ApiResult<&[DimensionDescriptor]> {
        if self.fields.dimensions.is_empty() {
            return Err(ApiError::validation("No dimensions in the data"));
        }
        Ok(&self.fields.dimensions)
    }
}

/// Outcome reported back to the host runtime. The contract is a single
/// success flag; `message` carries the failing step for the host's log.
#[derive(Debug, Clone, Serialize)]
pub struct ActionResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ActionResponse {
    pub fn success() -> Self {
        Self { success: true, message: None }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self { success: false, message: Some(message.into()) }
    }
}

/// Execution form presented to the user before the action runs.
#[derive(Debug, Clone, Serialize)]
pub struct ActionForm {
    pub fields: Vec<FormField>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FormField {
    pub name: String,
    pub label: String,
    pub description: String,
    pub required: bool,
    #[serde(rename = "type")]
    pub field_type: String,
    pub options: Vec<FormSelectOption>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FormSelectOption {
    /// Option value submitted back as the form parameter
    pub name: String,
    pub label: String,
}
