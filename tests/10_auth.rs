mod common;

use anyhow::Result;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};

use common::{age_detail, sub_service_body, user, TestApp, V1};

#[tokio::test]
async fn invalid_bearer_token_is_rejected() -> Result<()> {
    let app = TestApp::new();

    let request = Request::builder()
        .uri(format!("{}/sub-service", V1))
        .header("authorization", "Bearer not-a-jwt")
        .body(Body::empty())?;
    let (status, body) = app.send(request).await?;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "DataApplicationService.Unauthorized");
    Ok(())
}

#[tokio::test]
async fn anonymous_reads_are_allowed() -> Result<()> {
    let app = TestApp::new();
    let (status, body) = app.request(Method::GET, &format!("{}/sub-service", V1), None, None).await?;

    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["total_count"], 0);
    Ok(())
}

#[tokio::test]
async fn anonymous_create_is_not_authorized() -> Result<()> {
    let app = TestApp::new();
    let owner = user("owner");
    let service_id = app.ctx.add_service(owner.id).await;

    let (status, body) = app
        .request(Method::POST, &format!("{}/sub-service", V1), None, Some(sub_service_body("A", service_id, age_detail())))
        .await?;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "DataApplicationService.PermissionNotAuthorized");
    Ok(())
}

#[tokio::test]
async fn non_owner_create_is_not_service_owner() -> Result<()> {
    let app = TestApp::new();
    let owner = user("owner");
    let stranger = user("stranger");
    let service_id = app.ctx.add_service(owner.id).await;
    let token = app.token(&stranger);

    let (status, body) = app
        .request(
            Method::POST,
            &format!("{}/sub-service", V1),
            Some(&token),
            Some(sub_service_body("A", service_id, age_detail())),
        )
        .await?;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "DataApplicationService.NotServiceOwner");
    Ok(())
}
