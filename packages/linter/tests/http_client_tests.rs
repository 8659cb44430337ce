//! HTTP lint client against a local axum server

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use folio_linter::{
    HttpLintClient, LintError, LintRequest, LintResponse, LintService, QualityConfig,
    QualityOrchestrator, RemoteIssue, RemoteStatus, RuleRegistry, Severity,
};

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/api/lint", addr)
}

async fn flag_todos(Json(request): Json<LintRequest>) -> Json<LintResponse> {
    let errors = request
        .text
        .lines()
        .enumerate()
        .filter(|(_, line)| line.contains("TODO"))
        .map(|(i, _)| RemoteIssue {
            rule_id: "no-todo".to_string(),
            message: "Unresolved TODO".to_string(),
            line: i + 1,
            column: 1,
            severity: Severity::Warning,
            fix: None,
        })
        .collect();

    Json(LintResponse {
        errors,
        processing_time: 1,
    })
}

#[tokio::test]
async fn test_lint_round_trip() {
    let url = serve(Router::new().route("/api/lint", post(flag_todos))).await;
    let client = HttpLintClient::new(url, Duration::from_secs(5)).unwrap();

    let response = client.lint("fine\nTODO: fix\nfine").await.unwrap();

    assert_eq!(response.errors.len(), 1);
    assert_eq!(response.errors[0].line, 2);
    assert_eq!(response.errors[0].rule_id, "no-todo");
}

#[tokio::test]
async fn test_non_success_status_is_an_error() {
    let app = Router::new().route(
        "/api/lint",
        post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "overloaded") }),
    );
    let url = serve(app).await;
    let client = HttpLintClient::new(url, Duration::from_secs(5)).unwrap();

    match client.lint("text").await {
        Err(LintError::Api { status, body }) => {
            assert_eq!(status, 503);
            assert_eq!(body, "overloaded");
        }
        other => panic!("expected api error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_slow_service_times_out() {
    let app = Router::new().route(
        "/api/lint",
        post(|| async {
            tokio::time::sleep(Duration::from_millis(500)).await;
            "late"
        }),
    );
    let url = serve(app).await;
    let client = HttpLintClient::new(url, Duration::from_millis(50)).unwrap();

    match client.lint("text").await {
        Err(LintError::Request(e)) => assert!(e.is_timeout()),
        other => panic!("expected timeout, got {:?}", other),
    }
}

#[tokio::test]
async fn test_refused_connection_yields_local_issues_only() {
    // Grab a free port, then close it
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = HttpLintClient::new(
        format!("http://{}/api/lint", addr),
        Duration::from_secs(1),
    )
    .unwrap();
    let mut quality =
        QualityOrchestrator::new(QualityConfig::default(), Arc::new(client), RuleRegistry::new());

    let report = quality.check_now("---\ntitle: ok\n---\nTODO").await;

    assert!(matches!(report.remote, RemoteStatus::Failed(_)));
    let rules: Vec<&str> = report.issues.iter().map(|i| i.rule_id.as_str()).collect();
    assert_eq!(rules, vec!["required-field", "required-field"]);
}
