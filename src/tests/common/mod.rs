//! Shared test fixtures

use crate::models::ActionRequest;

/// A realistic scheduled-report request: one already-selected dimension, one
/// aggregated measure, a filter and a GROUP BY.
pub fn orders_request() -> ActionRequest {
    request_from_json(serde_json::json!({
        "params": { "sisu_api_token": "token-123" },
        "formParams": { "connection": "5" },
        "scheduledPlan": {
            "title": "Orders report",
            "query": { "model": "orders" }
        },
        "attachment": {
            "dataJSON": {
                "sql": "SELECT orders.\"id\" AS id,COUNT(orders.\"total\") AS total FROM orders WHERE orders.\"id\" > 0 GROUP BY 1",
                "fields": {
                    "measures": [
                        { "name": "orders.total", "type": "average", "sorted": { "desc": true } }
                    ],
                    "dimensions": [
                        { "name": "id" }
                    ]
                }
            }
        }
    }))
}

pub fn request_from_json(value: serde_json::Value) -> ActionRequest {
    serde_json::from_value(value).expect("test request must deserialize")
}
