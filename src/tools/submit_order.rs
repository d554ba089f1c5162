// src/tools/submit_order.rs

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::info;

use super::ToolHandler;
use crate::error::ToolError;

pub const SUBMIT_ORDER: &str = "submit_order";

/// Wire names of the order fields, all required
pub const ORDER_FIELDS: [&str; 9] = [
    "menu", "type", "quantity", "meat", "nickname", "phone", "location", "date", "time",
];

/// Order fields the assistant collects. The handler relays the arguments
/// verbatim; this type documents the shape and builds test payloads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderRequest {
    pub menu: String,
    #[serde(rename = "type")]
    pub order_type: String,
    pub quantity: u32,
    pub meat: String,
    pub nickname: String,
    pub phone: String,
    pub location: String,
    pub date: String,
    pub time: String,
}

impl OrderRequest {
    /// Sample order for manual webhook checks
    pub fn sample() -> Self {
        Self {
            menu: "ไม่เอาหนังหมู - เผ็ดปกติ".to_string(),
            order_type: "พร้อมทาน".to_string(),
            quantity: 2,
            meat: "หมู".to_string(),
            nickname: "เจน".to_string(),
            phone: "022222222".to_string(),
            location: "สันทราย".to_string(),
            date: "16-10-2023".to_string(),
            time: "16:00".to_string(),
        }
    }
}

/// Relays `submit_order` calls to the order webhook
pub struct SubmitOrder {
    client: Client,
    webhook_url: Url,
}

impl SubmitOrder {
    pub fn new(client: Client, webhook_url: Url) -> Self {
        Self {
            client,
            webhook_url,
        }
    }
}

#[async_trait]
impl ToolHandler for SubmitOrder {
    fn name(&self) -> &'static str {
        SUBMIT_ORDER
    }

    fn definition(&self) -> Value {
        let text = |description: &str| {
            json!({
                "type": "string",
                "description": description
            })
        };
        json!({
            "type": "function",
            "function": {
                "name": SUBMIT_ORDER,
                "description": "Submit a confirmed food order to the shop's order sheet.",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "menu": text("Dish and preparation notes"),
                        "type": text("Order type, e.g. ready-to-eat or frozen"),
                        "quantity": {
                            "type": "integer",
                            "minimum": 1,
                            "description": "Number of portions"
                        },
                        "meat": text("Meat choice"),
                        "nickname": text("Customer nickname"),
                        "phone": text("Customer phone number"),
                        "location": text("Pickup or delivery location"),
                        "date": text("Pickup date, DD-MM-YYYY"),
                        "time": text("Pickup time, HH:MM")
                    },
                    "required": ORDER_FIELDS
                }
            }
        })
    }

    async fn call(&self, arguments: Value) -> Result<Value, ToolError> {
        info!("Calling order webhook for {} with arguments: {}", SUBMIT_ORDER, arguments);

        let response = self
            .client
            .post(self.webhook_url.clone())
            .json(&arguments)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ToolError::Status { status, body });
        }

        let result: Value = response
            .json()
            .await
            .map_err(|e| ToolError::InvalidResponse(e.to_string()))?;
        info!("Order webhook response: {}", result);
        Ok(result)
    }
}
