pub mod chat;
pub mod health;
pub mod knowledge;

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Chat API
        .route("/api/v1/chat", post(chat::handle_chat))
        .route("/api/v1/chat/classify", post(chat::handle_classify))
        .route(
            "/api/v1/chat/:session_id/history",
            get(chat::handle_get_history),
        )
        .route(
            "/api/v1/chat/:session_id",
            delete(chat::handle_delete_session),
        )
        // Knowledge API
        .route("/api/v1/knowledge/status", get(knowledge::handle_status))
        .route("/api/v1/knowledge/reindex", post(knowledge::handle_reindex))
        .route("/api/v1/knowledge/search", get(knowledge::handle_search))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{test_state, FakeHr, FakeLlm, MemorySource};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let resp = app.oneshot(request).await.unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
        let value = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, value)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn documents() -> MemorySource {
        MemorySource::default()
            .with("holiday.md", "Holiday policy: every employee gets 22 days of leave.")
            .with("payroll.md", "Payroll is paid on the last business day.")
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = build_router(test_state(FakeLlm::failing(), FakeHr::failing(), documents()));
        let (status, body) = send(app, Request::get("/health").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["knowledge_loaded"], false);
    }

    #[tokio::test]
    async fn test_chat_salary_turn_and_history() {
        let state = test_state(
            FakeLlm::classifying(json!({"request_type": "salary_request", "employee_code": "abc123"})),
            FakeHr::returning(17, 100.0, None),
            documents(),
        );
        let app = build_router(state);

        let (status, body) = send(
            app.clone(),
            post_json(
                "/api/v1/chat",
                json!({"message": "my code is abc123, what's my YTD payroll?"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["is_error"], false);
        assert_eq!(body["answer"], "Your YTD payroll is 100.00.");
        assert_eq!(body["history"]["turns"].as_array().unwrap().len(), 2);

        let session_id = body["session_id"].as_str().unwrap().to_string();
        let (status, body) = send(
            app,
            Request::get(format!("/api/v1/chat/{session_id}/history"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["history"]["turns"][0]["role"], "user");
    }

    #[tokio::test]
    async fn test_chat_failure_is_marked_reply() {
        let app = build_router(test_state(FakeLlm::failing(), FakeHr::failing(), documents()));
        let (status, body) = send(app, post_json("/api/v1/chat", json!({"message": "hello"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["is_error"], true);
        assert!(body["answer"]
            .as_str()
            .unwrap()
            .starts_with("Sorry, something went wrong: "));
    }

    #[tokio::test]
    async fn test_chat_rejects_empty_message() {
        let app = build_router(test_state(FakeLlm::failing(), FakeHr::failing(), documents()));
        let (status, body) = send(app, post_json("/api/v1/chat", json!({"message": "  "}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_classify_echo() {
        let app = build_router(test_state(
            FakeLlm::classifying(json!({"request_type": "vacancy_request", "employee_code": "E-42"})),
            FakeHr::failing(),
            documents(),
        ));
        let (status, body) = send(
            app,
            post_json("/api/v1/chat/classify", json!({"message": "leave days for E-42"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["request_type"], "vacancy");
        assert_eq!(body["answer"], "VACANCY (E-42)");
    }

    #[tokio::test]
    async fn test_unknown_session_is_404() {
        let app = build_router(test_state(FakeLlm::failing(), FakeHr::failing(), documents()));
        let uri = format!("/api/v1/chat/{}/history", uuid::Uuid::new_v4());
        let (status, _) = send(app, Request::get(uri).body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_session() {
        let state = test_state(FakeLlm::failing(), FakeHr::failing(), documents());
        let (id, _) = state.sessions.open(None).await;
        let app = build_router(state);

        let uri = format!("/api/v1/chat/{id}");
        let (status, _) = send(app.clone(), Request::delete(&uri).body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(app, Request::delete(&uri).body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_search_before_index_is_503() {
        let app = build_router(test_state(FakeLlm::failing(), FakeHr::failing(), documents()));
        let (status, body) = send(
            app,
            Request::get("/api/v1/knowledge/search?q=holiday")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"]["code"], "KNOWLEDGE_UNAVAILABLE");
    }

    #[tokio::test]
    async fn test_reindex_then_search_and_status() {
        let app = build_router(test_state(FakeLlm::failing(), FakeHr::failing(), documents()));

        let (status, body) = send(
            app.clone(),
            Request::post("/api/v1/knowledge/reindex")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["loaded"], true);
        assert_eq!(body["chunk_count"], 2);
        assert_eq!(body["source"], "memory");

        let (status, body) = send(
            app.clone(),
            Request::get("/api/v1/knowledge/search?q=holiday%20policy&k=1")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let results = body["results"].as_array().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["source"], "holiday.md");

        let (status, body) = send(
            app,
            Request::get("/api/v1/knowledge/status")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sources"]["payroll.md"], 1);
    }

    #[tokio::test]
    async fn test_search_rejects_empty_q() {
        let app = build_router(test_state(FakeLlm::failing(), FakeHr::failing(), documents()));
        let (status, _) = send(
            app,
            Request::get("/api/v1/knowledge/search?q=%20")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
