// src/assistant/client.rs

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;

use super::AssistantApi;
use super::types::*;
use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result};

const USER_AGENT: &str = concat!("assistant-bridge/", env!("CARGO_PKG_VERSION"));

/// Number of messages fetched when looking for the latest reply
const MESSAGE_PAGE: &str = "20";

/// Shared HTTP client for the assistant API and the webhook
pub fn build_http_client(timeout: Duration) -> Result<Client> {
    Ok(Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()?)
}

/// OpenAI Assistants v2 client
#[derive(Clone)]
pub struct OpenAIClient {
    client: Client,
    api_key: String,
    api_base: Url,
}

impl OpenAIClient {
    pub fn new(client: Client, api_key: impl Into<String>, api_base: Url) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            api_base,
        }
    }

    pub fn from_config(client: Client, config: &BridgeConfig) -> Self {
        Self::new(client, config.openai_api_key.clone(), config.api_base.clone())
    }

    /// Request builder for all Assistants endpoints. Each segment is
    /// percent-encoded on its own so an id can never leave its path slot.
    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| {
                let reason = format!("api_base '{}' cannot hold a path", self.api_base);
                BridgeError::InvalidConfig(reason)
            })?
            .pop_if_empty()
            .extend(segments);

        Ok(self
            .client
            .request(method, url)
            .bearer_auth(&self.api_key)
            .header("OpenAI-Beta", "assistants=v2"))
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(BridgeError::Api { status, body });
        }
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl AssistantApi for OpenAIClient {
    async fn create_thread(&self) -> Result<Thread> {
        self.send(self.request(Method::POST, &["threads"])?.json(&json!({})))
            .await
    }

    async fn add_message(&self, thread_id: &str, content: &str) -> Result<()> {
        let thread_id = checked_id(thread_id)?;
        let req = CreateMessageRequest {
            role: MessageRole::User,
            content,
        };
        let _: Value = self
            .send(
                self.request(Method::POST, &["threads", thread_id, "messages"])?
                    .json(&req),
            )
            .await?;
        Ok(())
    }

    async fn create_run(&self, thread_id: &str, assistant_id: &str) -> Result<Run> {
        let thread_id = checked_id(thread_id)?;
        self.send(
            self.request(Method::POST, &["threads", thread_id, "runs"])?
                .json(&CreateRunRequest { assistant_id }),
        )
        .await
    }

    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run> {
        let (thread_id, run_id) = (checked_id(thread_id)?, checked_id(run_id)?);
        let run: Run = self
            .send(self.request(Method::GET, &["threads", thread_id, "runs", run_id])?)
            .await?;
        debug!(run_id, status = %run.status, "Retrieved run");
        Ok(run)
    }

    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: Vec<ToolOutput>,
    ) -> Result<Run> {
        let (thread_id, run_id) = (checked_id(thread_id)?, checked_id(run_id)?);
        self.send(
            self.request(
                Method::POST,
                &["threads", thread_id, "runs", run_id, "submit_tool_outputs"],
            )?
            .json(&SubmitToolOutputsRequest {
                tool_outputs: outputs,
            }),
        )
        .await
    }

    async fn cancel_run(&self, thread_id: &str, run_id: &str) -> Result<Run> {
        let (thread_id, run_id) = (checked_id(thread_id)?, checked_id(run_id)?);
        self.send(self.request(
            Method::POST,
            &["threads", thread_id, "runs", run_id, "cancel"],
        )?)
        .await
    }

    async fn list_messages(&self, thread_id: &str) -> Result<Vec<ThreadMessage>> {
        let thread_id = checked_id(thread_id)?;
        let list: ListMessagesResponse = self
            .send(
                self.request(Method::GET, &["threads", thread_id, "messages"])?
                    .query(&[("order", "desc"), ("limit", MESSAGE_PAGE)]),
            )
            .await?;
        Ok(list.data)
    }
}

fn checked_id(id: &str) -> Result<&str> {
    if is_valid_id(id) {
        Ok(id)
    } else {
        Err(BridgeError::InvalidId(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::spawn_server;
    use axum::{
        Json, Router,
        extract::{Path, Query},
        http::{HeaderMap, StatusCode, Uri},
        routing::{get, post},
    };
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    fn client_for(base: &str) -> OpenAIClient {
        OpenAIClient::new(
            build_http_client(Duration::from_secs(5)).unwrap(),
            "sk-test",
            Url::parse(&format!("{base}/v1")).unwrap(),
        )
    }

    #[tokio::test]
    async fn sends_auth_and_beta_headers() {
        let app = Router::new().route(
            "/v1/threads",
            post(|headers: HeaderMap| async move {
                assert_eq!(headers["authorization"], "Bearer sk-test");
                assert_eq!(headers["openai-beta"], "assistants=v2");
                Json(json!({ "id": "thread_abc", "object": "thread" }))
            }),
        );
        let base = spawn_server(app).await;

        let thread = client_for(&base).create_thread().await.unwrap();
        assert_eq!(thread.id, "thread_abc");
    }

    #[tokio::test]
    async fn submits_outputs_to_run_path() {
        let app = Router::new().route(
            "/v1/threads/{thread_id}/runs/{run_id}/submit_tool_outputs",
            post(
                |Path((thread_id, run_id)): Path<(String, String)>,
                 Json(body): Json<Value>| async move {
                    assert_eq!(body["tool_outputs"][0]["tool_call_id"], "call_1");
                    assert_eq!(body["tool_outputs"][0]["output"], "{\"success\":true}");
                    Json(json!({ "id": run_id, "thread_id": thread_id, "status": "queued" }))
                },
            ),
        );
        let base = spawn_server(app).await;

        let run = client_for(&base)
            .submit_tool_outputs(
                "thread_1",
                "run_1",
                vec![ToolOutput {
                    tool_call_id: "call_1".into(),
                    output: "{\"success\":true}".into(),
                }],
            )
            .await
            .unwrap();
        assert_eq!(run.id, "run_1");
        assert_eq!(run.status, RunStatus::Queued);
    }

    #[tokio::test]
    async fn lists_messages_newest_first() {
        let app = Router::new().route(
            "/v1/threads/{thread_id}/messages",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                assert_eq!(params.get("order").map(String::as_str), Some("desc"));
                Json(json!({
                    "object": "list",
                    "data": [
                        { "id": "msg_2", "role": "assistant", "content": [] },
                        { "id": "msg_1", "role": "user", "content": [] }
                    ],
                    "has_more": false
                }))
            }),
        );
        let base = spawn_server(app).await;

        let messages = client_for(&base).list_messages("thread_1").await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].id, "msg_2");
    }

    #[tokio::test]
    async fn non_success_status_becomes_api_error() {
        let app = Router::new().route(
            "/v1/threads/{thread_id}/runs",
            post(|| async { (StatusCode::UNAUTHORIZED, "bad key") }),
        );
        let base = spawn_server(app).await;

        let err = client_for(&base)
            .create_run("thread_1", "asst_1")
            .await
            .unwrap_err();
        match err {
            BridgeError::Api { status, body } => {
                assert_eq!(status, reqwest::StatusCode::UNAUTHORIZED);
                assert_eq!(body, "bad key");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn unreachable_service_is_http_error() {
        let client = client_for("http://127.0.0.1:9");
        let err = client.create_thread().await.unwrap_err();
        assert!(matches!(err, BridgeError::Http(_)));
    }

    #[tokio::test]
    async fn ids_cannot_escape_their_path_segment() {
        let hits = Arc::new(Mutex::new(Vec::<String>::new()));
        let seen = hits.clone();
        let app = Router::new().fallback(move |uri: Uri| {
            let seen = seen.clone();
            async move {
                seen.lock().unwrap().push(uri.to_string());
                Json(json!({ "id": "msg_1" }))
            }
        });
        let base = spawn_server(app).await;
        let client = client_for(&base);

        for thread_id in ["../../v1/assistants/asst_x", "t?evil=1#", "a/b", "..", ""] {
            let err = client.add_message(thread_id, "hi").await.unwrap_err();
            assert!(matches!(err, BridgeError::InvalidId(_)), "{thread_id}: {err}");
        }
        assert!(hits.lock().unwrap().is_empty());

        client.add_message("thread_abc-1", "hi").await.unwrap();
        assert_eq!(
            hits.lock().unwrap().as_slice(),
            &["/v1/threads/thread_abc-1/messages".to_string()]
        );
    }

    #[tokio::test]
    async fn trailing_slash_in_base_is_ignored() {
        let app = Router::new().route(
            "/v1/threads",
            post(|| async { Json(json!({ "id": "thread_abc" })) }),
        );
        let base = spawn_server(app).await;
        let client = OpenAIClient::new(
            build_http_client(Duration::from_secs(5)).unwrap(),
            "sk-test",
            Url::parse(&format!("{base}/v1/")).unwrap(),
        );

        assert_eq!(client.create_thread().await.unwrap().id, "thread_abc");
    }
}
