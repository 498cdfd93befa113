//! HTTP surface tests: generation endpoint, summary aggregation, and the
//! approve/pay lifecycle.

use axum::http::StatusCode;
use std::sync::Arc;
use tempfile::TempDir;
use tierline::api;
use tierline::db::init_db;
use tierline::domain::{
    CommissionKind, CommissionLevel, CommissionRule, CustomerType, Decimal, Product, ProductId,
    TemplateStatus, User, UserId,
};
use tierline::engine::DEFAULT_MAX_UPLINE_DEPTH;
use tierline::orchestration::CommissionGenerator;
use tierline::Repository;
use tower::util::ServiceExt;

struct TestApp {
    app: axum::Router,
    repo: Arc<Repository>,
    _temp: TempDir,
}

async fn setup_test_app() -> TestApp {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir
        .path()
        .join("test.db")
        .to_string_lossy()
        .to_string();
    let pool = init_db(&db_path).await.expect("init_db failed");
    let repo = Arc::new(Repository::new(pool));
    let generator = Arc::new(CommissionGenerator::new(
        repo.clone(),
        DEFAULT_MAX_UPLINE_DEPTH,
    ));
    let app = api::create_router(api::AppState::new(repo.clone(), generator));

    TestApp {
        app,
        repo,
        _temp: temp_dir,
    }
}

async fn seed_standard(repo: &Repository) {
    repo.upsert_user(&User {
        id: UserId::new("B"),
        customer_type: CustomerType::Regular,
        upline_id: Some(UserId::new("U1")),
    })
    .await
    .unwrap();
    repo.upsert_user(&User {
        id: UserId::new("U1"),
        customer_type: CustomerType::Regular,
        upline_id: None,
    })
    .await
    .unwrap();

    let template_id = repo
        .insert_template(
            "STANDARD",
            "Standard",
            TemplateStatus::Active,
            &[
                CommissionRule {
                    level: CommissionLevel::Direct,
                    customer_type: CustomerType::All,
                    kind: CommissionKind::Percentage,
                    value: Decimal::from_str_canonical("30").unwrap(),
                },
                CommissionRule {
                    level: CommissionLevel::Upline(1),
                    customer_type: CustomerType::All,
                    kind: CommissionKind::Percentage,
                    value: Decimal::from_str_canonical("10").unwrap(),
                },
            ],
        )
        .await
        .unwrap();
    repo.upsert_product(&Product {
        id: ProductId::new("p-1"),
        default_template_id: Some(template_id),
        partner_company_id: None,
    })
    .await
    .unwrap();
}

async fn get(app: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let req = axum::http::Request::builder()
        .method("GET")
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();

    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

async fn post(
    app: axum::Router,
    uri: &str,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let req = axum::http::Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(axum::body::Body::from(body.to_string()))
        .unwrap();

    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

fn order_body(id: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "buyerId": "B",
        "placedMs": 5000,
        "lineItems": [
            { "productId": "p-1", "unitPrice": 100.0, "quantity": 2 }
        ]
    })
}

#[tokio::test]
async fn test_generate_returns_records_with_string_amounts() {
    let t = setup_test_app().await;
    seed_standard(&t.repo).await;

    let (status, body) = post(t.app, "/v1/orders/commissions", order_body("ord-1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["generated"], true);
    assert_eq!(body["recordCount"], 2);
    assert_eq!(body["records"][0]["beneficiaryId"], "B");
    assert_eq!(body["records"][0]["amount"], "60");
    assert_eq!(body["records"][0]["status"], "pending");
    assert_eq!(body["records"][1]["beneficiaryId"], "U1");
    assert_eq!(body["records"][1]["amount"], "20");
}

#[tokio::test]
async fn test_generate_redelivery_flagged() {
    let t = setup_test_app().await;
    seed_standard(&t.repo).await;

    let (_s, first) = post(t.app.clone(), "/v1/orders/commissions", order_body("ord-1")).await;
    let (_s, second) = post(t.app, "/v1/orders/commissions", order_body("ord-1")).await;

    assert_eq!(first["generated"], true);
    assert_eq!(second["generated"], false);
    assert_eq!(first["records"], second["records"]);
}

#[tokio::test]
async fn test_generate_rejects_unknown_buyer() {
    let t = setup_test_app().await;
    seed_standard(&t.repo).await;

    let mut body = order_body("ord-1");
    body["buyerId"] = serde_json::json!("ghost");
    let (status, _body) = post(t.app, "/v1/orders/commissions", body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_generate_rejects_zero_quantity() {
    let t = setup_test_app().await;
    seed_standard(&t.repo).await;

    let mut body = order_body("ord-1");
    body["lineItems"][0]["quantity"] = serde_json::json!(0);
    let (status, _body) = post(t.app, "/v1/orders/commissions", body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_summary_groups_totals_by_status() {
    let t = setup_test_app().await;
    seed_standard(&t.repo).await;

    post(t.app.clone(), "/v1/orders/commissions", order_body("ord-1")).await;
    post(t.app.clone(), "/v1/orders/commissions", order_body("ord-2")).await;

    let (status, body) = get(t.app, "/v1/commissions/summary?user=B").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"], "B");
    assert_eq!(body["totalPending"], "120");
    assert_eq!(body["totalApproved"], "0");
    assert_eq!(body["totalPaid"], "0");
    assert_eq!(body["commissionCount"], 2);
}

#[tokio::test]
async fn test_summary_requires_user() {
    let t = setup_test_app().await;
    let (status, _body) = get(t.app, "/v1/commissions/summary").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_summary_rejects_invalid_status_filter() {
    let t = setup_test_app().await;
    let (status, _body) = get(t.app, "/v1/commissions/summary?user=B&status=refunded").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_summary_rejects_inverted_time_window() {
    let t = setup_test_app().await;
    let (status, _body) =
        get(t.app, "/v1/commissions/summary?user=B&fromMs=2000&toMs=1000").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_approve_then_pay_lifecycle() {
    let t = setup_test_app().await;
    seed_standard(&t.repo).await;

    let (_s, generated) = post(t.app.clone(), "/v1/orders/commissions", order_body("ord-1")).await;
    let ids: Vec<i64> = generated["records"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_i64().unwrap())
        .collect();

    let (status, approved) = post(
        t.app.clone(),
        "/v1/commissions/approve",
        serde_json::json!({ "ids": ids }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(approved["updated"], 2);
    assert!(approved["records"]
        .as_array()
        .unwrap()
        .iter()
        .all(|r| r["status"] == "approved"));

    let (status, paid) = post(
        t.app.clone(),
        "/v1/commissions/pay",
        serde_json::json!({ "ids": ids }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(paid["updated"], 2);
    for record in paid["records"].as_array().unwrap() {
        assert_eq!(record["status"], "paid");
        assert!(record["paidMs"].is_i64());
    }

    // Re-approving paid rows is a no-op, not an error.
    let (status, reapproved) = post(
        t.app,
        "/v1/commissions/approve",
        serde_json::json!({ "ids": ids }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reapproved["updated"], 0);
}

#[tokio::test]
async fn test_pay_skips_pending_rows() {
    let t = setup_test_app().await;
    seed_standard(&t.repo).await;

    let (_s, generated) = post(t.app.clone(), "/v1/orders/commissions", order_body("ord-1")).await;
    let ids: Vec<i64> = generated["records"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_i64().unwrap())
        .collect();

    let (status, paid) = post(
        t.app,
        "/v1/commissions/pay",
        serde_json::json!({ "ids": ids }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(paid["updated"], 0);
    assert!(paid["records"]
        .as_array()
        .unwrap()
        .iter()
        .all(|r| r["status"] == "pending"));
}

#[tokio::test]
async fn test_transition_rejects_empty_ids() {
    let t = setup_test_app().await;
    let (status, _body) = post(
        t.app,
        "/v1/commissions/approve",
        serde_json::json!({ "ids": [] }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health_endpoints() {
    let t = setup_test_app().await;
    let (status, body) = get(t.app.clone(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = get(t.app, "/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}
