mod common;

use anyhow::Result;
use axum::http::{Method, StatusCode};
use serde_json::json;
use uuid::Uuid;

use common::{age_detail, field_names, sub_service_body, TestApp, INTERNAL};

#[tokio::test]
async fn internal_create_skips_ownership() -> Result<()> {
    let app = TestApp::new();
    let service_id = app.ctx.add_service(Uuid::new_v4()).await;

    let (status, created) = app
        .request(
            Method::POST,
            &format!("{}/sub-service", INTERNAL),
            None,
            Some(sub_service_body("A", service_id, age_detail())),
        )
        .await?;
    assert_eq!(status, StatusCode::OK, "{}", created);
    assert_eq!(created["auth_scope_id"], created["id"]);
    Ok(())
}

#[tokio::test]
async fn internal_create_checks_parent() -> Result<()> {
    let app = TestApp::new();
    let (status, body) = app
        .request(
            Method::POST,
            &format!("{}/sub-service", INTERNAL),
            None,
            Some(sub_service_body("A", Uuid::new_v4(), age_detail())),
        )
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "DataApplicationService.NotFound");
    Ok(())
}

#[tokio::test]
async fn lists_ids_by_parent_and_in_batch() -> Result<()> {
    let app = TestApp::new();
    let first = app.ctx.add_service(Uuid::new_v4()).await;
    let second = app.ctx.add_service(Uuid::new_v4()).await;
    let empty = Uuid::new_v4();

    let mut first_ids = Vec::new();
    for name in ["a", "b"] {
        let (_, created) = app
            .request(
                Method::POST,
                &format!("{}/sub-service", INTERNAL),
                None,
                Some(sub_service_body(name, first, age_detail())),
            )
            .await?;
        first_ids.push(created["id"].clone());
    }
    app.request(
        Method::POST,
        &format!("{}/sub-service", INTERNAL),
        None,
        Some(sub_service_body("c", second, age_detail())),
    )
    .await?;

    let (status, body) = app
        .request(Method::GET, &format!("{}/services/{}/sub-service", INTERNAL, first), None, None)
        .await?;
    assert_eq!(status, StatusCode::OK);
    // newest first
    assert_eq!(body["entries"], json!([first_ids[1], first_ids[0]]));

    let uri = format!("{}/services/sub-service/batch?service_id={},{},{}", INTERNAL, first, second, empty);
    let (status, body) = app.request(Method::GET, &uri, None, None).await?;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body[first.to_string()].as_array().map(Vec::len), Some(2));
    assert_eq!(body[second.to_string()].as_array().map(Vec::len), Some(1));
    assert_eq!(body[empty.to_string()], json!([]));
    Ok(())
}

#[tokio::test]
async fn batch_rejects_bad_ids() -> Result<()> {
    let app = TestApp::new();
    let uri = format!("{}/services/sub-service/batch?service_id={},nope", INTERNAL, Uuid::new_v4());
    let (status, body) = app.request(Method::GET, &uri, None, None).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(field_names(&body), vec!["service_id[1]"]);
    Ok(())
}
