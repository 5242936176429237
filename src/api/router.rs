//! API router.
//!
//! Returns a composable `Router` that can be mounted on any axum server.
//! Routes are nested under `/api/`.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;

use crate::api::endpoints;
use crate::api::types::ApiContext;
use crate::pipeline::MAX_UPLOAD_BYTES;

/// Multipart framing overhead allowed on top of the file size cap. The
/// precise file limit is enforced after the field is read.
const BODY_LIMIT_SLACK: usize = 1024 * 1024;

/// Build the service router. All endpoints live under `/api/`.
///
/// NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
pub fn build_router(ctx: ApiContext) -> Router {
    let api = Router::new()
        .route("/analyze", post(endpoints::analyze::analyze))
        .route(
            "/reports",
            post(endpoints::reports::save).get(endpoints::reports::list),
        )
        .route("/reports/:id", get(endpoints::reports::detail))
        .route("/status", get(endpoints::status::status))
        .route("/upload", post(endpoints::upload::upload))
        .with_state(ctx);

    Router::new()
        .nest("/api", api)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES as usize + BODY_LIMIT_SLACK))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::db::ReportStore;
    use crate::pipeline::MockLlmClient;

    const VALID_INSIGHTS: &str = r#"{"summary":"Revenue grew through the quarter.","trends":"Steady upward trend in monthly revenue.","outliers":"March shows an isolated spike.","recommendations":"Review the March campaign spend."}"#;

    fn test_app(llm: MockLlmClient) -> Router {
        let store = ReportStore::open_in_memory().unwrap();
        build_router(ApiContext::new(store, Arc::new(llm)))
    }

    fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn response_json(response: axum::http::Response<Body>) -> serde_json::Value {
        let body = http_body_util::BodyExt::collect(response.into_body())
            .await
            .unwrap()
            .to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    fn analyze_body() -> serde_json::Value {
        serde_json::json!({
            "headers": ["month", "revenue"],
            "rows": [
                {"month": "Jan", "revenue": "100"},
                {"month": "Feb", "revenue": "120"},
                {"month": "Mar", "revenue": "400"}
            ]
        })
    }

    #[tokio::test]
    async fn analyze_returns_validated_insights() {
        let app = test_app(MockLlmClient::new(VALID_INSIGHTS));

        let response = app
            .oneshot(json_request("POST", "/api/analyze", analyze_body()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = response_json(response).await;
        assert_eq!(json["fallback"], false);
        for field in ["summary", "trends", "outliers", "recommendations"] {
            let text = json["insights"][field].as_str().unwrap();
            assert!(!text.is_empty(), "{field} should be populated");
            assert!(!text.contains('<'), "{field} should be HTML-free");
        }
    }

    #[tokio::test]
    async fn analyze_strips_markup_from_model_output() {
        let tainted = r#"{"summary":"<script>alert(1)</script>Revenue grew.","trends":"ok trend","outliers":"ok outlier","recommendations":"ok rec"}"#;
        let app = test_app(MockLlmClient::new(tainted));

        let response = app
            .oneshot(json_request("POST", "/api/analyze", analyze_body()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = response_json(response).await;
        let summary = json["insights"]["summary"].as_str().unwrap();
        assert!(!summary.contains("script"));
        assert!(summary.contains("Revenue grew."));
    }

    #[tokio::test]
    async fn analyze_missing_headers_returns_400() {
        let app = test_app(MockLlmClient::new(VALID_INSIGHTS));

        let body = serde_json::json!({ "rows": [] });
        let response = app
            .oneshot(json_request("POST", "/api/analyze", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = response_json(response).await;
        assert!(json["error"].is_string());
    }

    #[tokio::test(start_paused = true)]
    async fn analyze_unreachable_model_returns_502() {
        let app = test_app(MockLlmClient::failing("connection refused"));

        let response = app
            .oneshot(json_request("POST", "/api/analyze", analyze_body()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let json = response_json(response).await;
        let message = json["error"].as_str().unwrap();
        assert!(!message.contains("connection refused"));
    }

    #[tokio::test]
    async fn analyze_non_json_model_output_falls_back() {
        let app = test_app(MockLlmClient::new("I cannot produce JSON today."));

        let response = app
            .oneshot(json_request("POST", "/api/analyze", analyze_body()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = response_json(response).await;
        assert_eq!(json["fallback"], true);
        assert_eq!(
            json["insights"]["summary"].as_str().unwrap(),
            "I cannot produce JSON today."
        );
        assert_eq!(
            json["insights"]["trends"].as_str().unwrap(),
            "Could not parse structured trends."
        );
    }

    #[tokio::test]
    async fn follow_up_returns_answer() {
        let app = test_app(MockLlmClient::new("March revenue tripled over February."));

        let body = serde_json::json!({
            "action": "followup",
            "question": "Why did March spike?",
            "headers": ["month", "revenue"],
            "rows": [{"month": "Mar", "revenue": "400"}],
            "previousInsights": serde_json::from_str::<serde_json::Value>(VALID_INSIGHTS).unwrap()
        });

        let response = app
            .oneshot(json_request("POST", "/api/analyze", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = response_json(response).await;
        assert_eq!(json["answer"], "March revenue tripled over February.");
    }

    #[tokio::test]
    async fn follow_up_without_question_returns_400() {
        let app = test_app(MockLlmClient::new("unused"));

        let body = serde_json::json!({
            "action": "followup",
            "question": "",
            "headers": ["month"],
            "rows": [],
            "previousInsights": serde_json::from_str::<serde_json::Value>(VALID_INSIGHTS).unwrap()
        });

        let response = app
            .oneshot(json_request("POST", "/api/analyze", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    fn save_report_body(filename: &str) -> serde_json::Value {
        serde_json::json!({
            "filename": filename,
            "rowCount": 3,
            "columnCount": 2,
            "columnsAnalyzed": ["month", "revenue"],
            "insightsSummary": "Revenue grew through the quarter.",
            "trends": "Steady upward trend.",
            "outliers": "March spike.",
            "recommendations": "Review March.",
            "csvPreviewJson": [{"month": "Jan", "revenue": "100"}]
        })
    }

    #[tokio::test]
    async fn reports_round_trip() {
        let store = ReportStore::open_in_memory().unwrap();
        let ctx = ApiContext::new(store, Arc::new(MockLlmClient::new("OK")));

        // Create
        let response = build_router(ctx.clone())
            .oneshot(json_request("POST", "/api/reports", save_report_body("sales.csv")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = response_json(response).await;
        let id = created["report"]["id"].as_i64().unwrap();
        assert_eq!(created["report"]["filename"], "sales.csv");

        // List
        let response = build_router(ctx.clone())
            .oneshot(
                Request::builder()
                    .uri("/api/reports")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let listed = response_json(response).await;
        assert_eq!(listed["reports"].as_array().unwrap().len(), 1);

        // Fetch by id
        let response = build_router(ctx)
            .oneshot(
                Request::builder()
                    .uri(format!("/api/reports/{id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let fetched = response_json(response).await;
        assert_eq!(fetched["report"]["insightsSummary"], "Revenue grew through the quarter.");
        assert_eq!(fetched["report"]["columnsAnalyzed"][1], "revenue");
    }

    #[tokio::test]
    async fn report_save_rejects_non_csv_filename() {
        let app = test_app(MockLlmClient::new("OK"));

        let response = app
            .oneshot(json_request(
                "POST",
                "/api/reports",
                save_report_body("evil.exe"),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn report_id_injection_returns_400() {
        let app = test_app(MockLlmClient::new("OK"));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/reports/1;%20DROP%20TABLE%20reports")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = response_json(response).await;
        assert_eq!(json["error"], "id: report ID must be a number");
    }

    #[tokio::test]
    async fn missing_report_returns_404() {
        let app = test_app(MockLlmClient::new("OK"));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/reports/424242")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn status_healthy_when_both_components_up() {
        let app = test_app(MockLlmClient::new("OK"));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/status")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = response_json(response).await;
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["database"]["connected"], true);
        assert_eq!(json["llm"]["connected"], true);
        assert_eq!(json["llm"]["message"], "Gemini API responding");
        assert!(json["timestamp"].is_string());
    }

    #[tokio::test]
    async fn status_degraded_when_model_down() {
        let app = test_app(MockLlmClient::failing("down"));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/status")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        // Degradation is reported in-body, never as an error status.
        assert_eq!(response.status(), StatusCode::OK);

        let json = response_json(response).await;
        assert_eq!(json["status"], "unhealthy");
        assert_eq!(json["database"]["connected"], true);
        assert_eq!(json["llm"]["connected"], false);
    }

    fn multipart_request(filename: &str, content: &str) -> Request<Body> {
        let boundary = "csvsight-test-boundary";
        let body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: text/csv\r\n\r\n{content}\r\n--{boundary}--\r\n"
        );
        Request::builder()
            .method("POST")
            .uri("/api/upload")
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn upload_parses_and_profiles_csv() {
        let app = test_app(MockLlmClient::new("OK"));

        let csv = "month,revenue\nJan,100\nFeb,120\nMar,400\n";
        let response = app
            .oneshot(multipart_request("sales.csv", csv))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = response_json(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["filename"], "sales.csv");
        assert_eq!(json["rowCount"], 3);
        assert_eq!(json["headers"][0], "month");
        assert_eq!(json["preview"].as_array().unwrap().len(), 3);
        assert_eq!(json["numericColumns"][0], "revenue");
        assert_eq!(json["columnStats"]["revenue"]["min"], 100.0);
        assert_eq!(json["columnStats"]["revenue"]["max"], 400.0);
    }

    #[tokio::test]
    async fn upload_rejects_non_csv_extension() {
        let app = test_app(MockLlmClient::new("OK"));

        let response = app
            .oneshot(multipart_request("notes.txt", "a,b\n1,2\n"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn upload_without_file_field_returns_400() {
        let app = test_app(MockLlmClient::new("OK"));

        let boundary = "csvsight-test-boundary";
        let body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"other\"\r\n\r\nvalue\r\n--{boundary}--\r\n"
        );
        let req = Request::builder()
            .method("POST")
            .uri("/api/upload")
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_route_returns_404() {
        let app = test_app(MockLlmClient::new("OK"));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/nonexistent")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
