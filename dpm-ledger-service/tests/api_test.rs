//! HTTP surface: auth, role checks, responses and the audit trail.

mod common;

use common::{token, TestApp};
use reqwest::StatusCode;
use serde_json::Value;

#[tokio::test]
async fn health_and_metrics_are_public() {
    let app = TestApp::spawn().await;

    let health = app
        .client
        .get(format!("{}/health", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(health.status(), StatusCode::OK);
    let body: Value = health.json().await.unwrap();
    assert_eq!(body["status"], "ok");

    let metrics = app
        .client
        .get(format!("{}/metrics", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(metrics.status(), StatusCode::OK);
    assert!(metrics.text().await.unwrap().contains("dpm_ledger_"));
}

#[tokio::test]
async fn missing_or_bad_token_is_unauthorized() {
    let app = TestApp::spawn().await;

    let response = app.get_api("/pharmacies/1001/summary", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .get_api("/pharmacies/1001/summary", Some("not-a-jwt"))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn other_roles_are_forbidden() {
    let app = TestApp::spawn().await;

    let rep = token("9", Some("salesman"));
    let response = app.get_api("/pharmacies/1001/statement", Some(&rep)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let no_role = token("9", None);
    let response = app.get_api("/areas/N1/summary", Some(&no_role)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn fallback_auth_header_is_accepted() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .get(format!(
            "{}/api/admin/dpm-ledger/pharmacies/1001/summary",
            app.address
        ))
        .header("X-Auth-Token", token("1", Some("admin")))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn statement_returns_events_and_string_money() {
    let app = TestApp::spawn().await;
    let manager = token("12", Some("sales-marketing-manager"));

    let response = app
        .get_api("/pharmacies/1001/statement", Some(&manager))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["pharmacy_legacy_id"], "1001");
    assert_eq!(body["year"], "2024");
    assert_eq!(body["events"].as_array().unwrap().len(), 4);
    assert_eq!(body["events"][0]["event_type"], "cash_receipt");
    assert_eq!(body["events"][0]["date"], "2024-01-10");
    assert_eq!(body["events"][0]["meta"]["db_kind"], "other");
    assert!(body["summary"]["balance"].is_string());
    assert_eq!(body["warnings"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn date_filters_and_year_are_applied() {
    let app = TestApp::spawn().await;
    let admin = token("1", Some("admin"));

    let response = app
        .get_api(
            "/pharmacies/1001/statement?date_from=2024-01-15&date_to=2024-12-31",
            Some(&admin),
        )
        .await;
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["events"].as_array().unwrap().len(), 2);

    let response = app
        .get_api("/pharmacies/1001/summary?year=2023", Some(&admin))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["year"], "2023");
    assert_eq!(body["warnings"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn invalid_year_or_date_is_bad_request() {
    let app = TestApp::spawn().await;
    let admin = token("1", Some("admin"));

    let response = app
        .get_api("/pharmacies/1001/summary?year=20x4", Some(&admin))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Invalid ledger year.");

    let response = app
        .get_api("/pharmacies/1001/summary?date_from=yesterday", Some(&admin))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn area_summary_lists_member_pharmacies() {
    let app = TestApp::spawn().await;
    let admin = token("1", Some("admin"));

    let response = app.get_api("/areas/N1/summary", Some(&admin)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["area_id"], "N1");
    let ids: Vec<&str> = body["pharmacies"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["pharmacy_legacy_id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["1001", "1002"]);
}

#[tokio::test]
async fn every_read_is_audited() {
    let app = TestApp::spawn().await;
    let admin = token("42", Some("admin"));

    app.get_api("/pharmacies/1001/summary", Some(&admin)).await;
    app.get_api("/pharmacies/1001/statement", Some(&admin)).await;
    app.get_api("/areas/N1/summary", Some(&admin)).await;
    // Rejected requests leave no trace.
    app.get_api("/pharmacies/1001/summary?year=bad", Some(&admin))
        .await;

    let response = app.get_api("/audit", Some(&admin)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["total"], 3);

    let items = body["items"].as_array().unwrap();
    let modes: Vec<&str> = items
        .iter()
        .map(|i| i["meta"]["mode"].as_str().unwrap())
        .collect();
    assert_eq!(modes, vec!["area_summary", "statement", "summary"]);
    assert!(items.iter().all(|i| i["user_id"] == 42));
    assert!(items.iter().all(|i| i["action"] == "view_statement"));

    let response = app
        .get_api("/audit?target_type=area&limit=10", Some(&admin))
        .await;
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["total"], 1);
    assert_eq!(body["items"][0]["target_id"], "N1");
}

#[tokio::test]
async fn audit_and_schema_are_admin_only() {
    let app = TestApp::spawn().await;
    let manager = token("5", Some("sales_manager"));

    assert_eq!(
        app.get_api("/audit", Some(&manager)).await.status(),
        StatusCode::FORBIDDEN
    );
    assert_eq!(
        app.get_api("/schema", Some(&manager)).await.status(),
        StatusCode::FORBIDDEN
    );
}

#[tokio::test]
async fn audit_rejects_out_of_range_paging() {
    let app = TestApp::spawn().await;
    let admin = token("1", Some("admin"));

    let response = app.get_api("/audit?limit=0", Some(&admin)).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = app.get_api("/audit?target_type=region", Some(&admin)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn schema_describes_partitions_and_roles() {
    let app = TestApp::spawn().await;
    let admin = token("1", Some("admin"));

    let response = app.get_api("/schema", Some(&admin)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["year"], "2024");
    let partitions = body["partitions"].as_array().unwrap();
    assert_eq!(partitions.len(), 2);
    assert_eq!(partitions[0]["kind"], "acc");
    assert_eq!(partitions[0]["roles"]["pharmacies"], "Customers");
    assert_eq!(partitions[1]["roles"]["receipts_cash"], "cash_receipts");

    let customers = partitions[0]["tables"]
        .as_array()
        .unwrap()
        .iter()
        .find(|t| t["name"] == "Customers")
        .unwrap();
    assert_eq!(customers["row_count"], 4);
}

#[tokio::test]
async fn responses_carry_request_id_and_security_headers() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .get(format!("{}/health", app.address))
        .header("x-request-id", "req-123")
        .send()
        .await
        .unwrap();

    assert_eq!(response.headers()["x-request-id"], "req-123");
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    assert_eq!(response.headers()["cache-control"], "no-store");
}
