//! 人工审批 HTTP 桥
//!
//! 审批邮件中的链接落到这里：
//! - GET  /approve/:session_id?toolUseId=..
//! - GET  /deny/:session_id?toolUseId=..
//! - POST /decision  `{session_id, tool_use_id, decision}`
//!
//! 每个请求都转成一条 Existing 任务投递到 agent 收件箱。

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::delegation::Outbox;
use crate::integrations::decision::{decision_task, Decision};

pub const NOTIFIED: &str = "Successfully notified agent";

pub struct ApprovalBridgeState {
    pub outbox: Arc<dyn Outbox>,
    /// 决定投递到的 agent 收件地址
    pub agent_inbox: String,
}

#[derive(Debug, Deserialize)]
pub struct DecisionQuery {
    #[serde(rename = "toolUseId")]
    pub tool_use_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    pub session_id: String,
    pub tool_use_id: String,
    pub decision: String,
}

pub fn create_router(state: Arc<ApprovalBridgeState>) -> Router {
    Router::new()
        .route("/approve/:session_id", get(approve_handler))
        .route("/deny/:session_id", get(deny_handler))
        .route("/decision", post(decision_handler))
        .route("/health", get(|| async { "OK" }))
        .with_state(state)
}

async fn approve_handler(
    State(state): State<Arc<ApprovalBridgeState>>,
    Path(session_id): Path<String>,
    Query(q): Query<DecisionQuery>,
) -> (StatusCode, String) {
    link_decision(&state, &session_id, q, Decision::Approved).await
}

async fn deny_handler(
    State(state): State<Arc<ApprovalBridgeState>>,
    Path(session_id): Path<String>,
    Query(q): Query<DecisionQuery>,
) -> (StatusCode, String) {
    link_decision(&state, &session_id, q, Decision::Denied).await
}

async fn link_decision(
    state: &ApprovalBridgeState,
    session_id: &str,
    q: DecisionQuery,
    decision: Decision,
) -> (StatusCode, String) {
    match q.tool_use_id.filter(|id| !id.is_empty()) {
        Some(tool_use_id) => notify(state, session_id, &tool_use_id, decision.as_str()).await,
        None => (StatusCode::BAD_REQUEST, "toolUseId is required".to_string()),
    }
}

/// POST /decision - 任意文本决定
async fn decision_handler(
    State(state): State<Arc<ApprovalBridgeState>>,
    Json(req): Json<DecisionRequest>,
) -> (StatusCode, String) {
    if req.session_id.is_empty() || req.tool_use_id.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            "session_id and tool_use_id are required".to_string(),
        );
    }
    notify(&state, &req.session_id, &req.tool_use_id, &req.decision).await
}

async fn notify(
    state: &ApprovalBridgeState,
    session_id: &str,
    tool_use_id: &str,
    decision: &str,
) -> (StatusCode, String) {
    tracing::info!(
        "Human decision for session {} / {}: {}",
        session_id,
        tool_use_id,
        decision
    );
    let task = decision_task(session_id, tool_use_id, decision);
    match state.outbox.send(&state.agent_inbox, &task).await {
        Ok(()) => (StatusCode::OK, NOTIFIED.to_string()),
        Err(e) => {
            tracing::error!("Failed to notify agent: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delegation::InMemoryTaskQueue;
    use crate::task::{TaskEnvelope, TaskMessage};
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    async fn body_text(resp: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn setup(inbox: &str) -> (Router, Arc<InMemoryTaskQueue>) {
        let queue = Arc::new(InMemoryTaskQueue::new());
        let state = Arc::new(ApprovalBridgeState {
            outbox: queue.clone(),
            agent_inbox: inbox.to_string(),
        });
        (create_router(state), queue)
    }

    #[tokio::test]
    async fn test_approve_link_enqueues_existing_task() {
        let (app, queue) = setup("mem://post-generator").await;
        let mut rx = queue.register("mem://post-generator").await;
        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/approve/S?toolUseId=T")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_text(resp).await, NOTIFIED);

        let msg: TaskMessage = rx.recv().await.unwrap();
        match TaskEnvelope::existing_from_message(msg).unwrap() {
            TaskEnvelope::Existing {
                session_id,
                tool_results,
                tool_name,
                ..
            } => {
                assert_eq!(session_id.as_str(), "S");
                assert_eq!(tool_results[0].tool_use_id, "T");
                assert_eq!(tool_results[0].text(), "approved");
                assert_eq!(tool_name.as_deref(), Some("human_approval"));
            }
            _ => panic!("expected existing"),
        }
    }

    #[tokio::test]
    async fn test_deny_without_tool_use_id_is_bad_request() {
        let (app, _queue) = setup("mem://post-generator").await;
        let resp = app
            .oneshot(Request::builder().uri("/deny/S").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_delivery_failure_is_500() {
        // 收件箱未注册
        let (app, _queue) = setup("mem://nowhere").await;
        let resp = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/decision")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        r#"{"session_id":"S","tool_use_id":"T","decision":"approved with edits"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_text(resp).await.contains("mem://nowhere"));
    }
}
