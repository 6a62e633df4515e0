//! Action entry points
//!
//! Outer boundary towards the host runtime: `execute` runs the KDA chain and
//! collapses every failure into the single success flag the host expects,
//! `form` renders the connection selector shown before execution. The failing
//! step is logged and carried on the response message so operators are not
//! left with a bare `false`.

use crate::config::ActionConfig;
use crate::models::{ActionForm, ActionRequest, ActionResponse, FormField, FormSelectOption, KdaChain};
use crate::services::{KdaService, SisuApi, SisuClient};
use crate::utils::ApiResult;

pub struct SisuKdaAction {
    config: ActionConfig,
}

impl Default for SisuKdaAction {
    fn default() -> Self {
        Self::new(ActionConfig::default())
    }
}

impl SisuKdaAction {
    pub fn new(config: ActionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ActionConfig {
        &self.config
    }

    /// Execute the action for one scheduled report.
    pub async fn execute(&self, request: &ActionRequest) -> ActionResponse {
        match self.run(request).await {
            Ok(chain) => {
                tracing::info!(
                    "KDA created: base query {}, metric {}, analysis {}",
                    chain.base_query_id,
                    chain.metric_id,
                    chain.analysis_id
                );
                ActionResponse::success()
            },
            Err(e) => {
                match e.step() {
                    Some(step) => tracing::error!("KDA action failed during {}: {}", step, e),
                    None => tracing::error!("KDA action failed: {}", e),
                }
                ActionResponse::failure(e.to_string())
            },
        }
    }

    async fn run(&self, request: &ActionRequest) -> ApiResult<KdaChain> {
        let token = request.api_token(self.config.token_param)?;
        let client = SisuClient::new(&self.config.api_base, token, self.config.request_timeout);
        KdaService::new(client, self.config.clone()).run(request).await
    }

    /// Build the execution form: one required select listing the Sisu
    /// connections visible to the token.
    pub async fn form(&self, request: &ActionRequest) -> ApiResult<ActionForm> {
        let token = request.api_token(self.config.token_param)?;
        let client = SisuClient::new(&self.config.api_base, token, self.config.request_timeout);

        let connections = client.list_connections().await?;
        let options = connections
            .into_iter()
            .map(|connection| FormSelectOption {
                name: connection.id.to_string(),
                label: connection.name,
            })
            .collect();

        Ok(ActionForm {
            fields: vec![FormField {
                name: "connection".to_string(),
                label: "Sisu's connections".to_string(),
                description: "Select the Sisu connection where this data is.".to_string(),
                required: true,
                field_type: "select".to_string(),
                options,
            }],
        })
    }
}
