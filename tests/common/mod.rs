#![allow(dead_code)]

use anyhow::{Context, Result};
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use data_application_service::app::{app, AppState};
use data_application_service::auth::{generate_jwt, Claims};
use data_application_service::config::SubServiceSettings;
use data_application_service::policy::Subject;
use data_application_service::testing::TestContext;

pub const V1: &str = "/api/data-application-service/v1";
pub const INTERNAL: &str = "/api/data-application-service/internal/v1";

const SECRET: &str = "integration-secret";

/// Router wired to in-memory collaborators, driven in-process.
pub struct TestApp {
    pub ctx: TestContext,
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_settings(SubServiceSettings::default())
    }

    pub fn with_settings(settings: SubServiceSettings) -> Self {
        let ctx = TestContext::with_settings(settings);
        let router = app(AppState::new(ctx.service.clone(), SECRET));
        Self { ctx, router }
    }

    pub fn token(&self, subject: &Subject) -> String {
        generate_jwt(&Claims::new(subject.id, subject.name.clone(), 1), SECRET).expect("token")
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))?,
            None => builder.body(Body::empty())?,
        };
        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> Result<(StatusCode, Value)> {
        let response = self.router.clone().oneshot(request).await.context("router call")?;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).with_context(|| format!("non-JSON body: {:?}", bytes))?
        };
        Ok((status, value))
    }
}

pub fn user(name: &str) -> Subject {
    Subject::user(Uuid::new_v4(), name)
}

pub fn age_detail() -> Value {
    json!({
        "row_filters": {
            "where": [{
                "relation": "AND",
                "member": [{"name_en": "age", "data_type": "int", "operator": ">=", "value": "18"}]
            }]
        }
    })
}

pub fn sub_service_body(name: &str, service_id: Uuid, detail: Value) -> Value {
    json!({ "name": name, "service_id": service_id, "detail": detail })
}

pub fn field_names(body: &Value) -> Vec<String> {
    body["detail"]
        .as_array()
        .map(|errs| errs.iter().filter_map(|e| e["field"].as_str().map(str::to_string)).collect())
        .unwrap_or_default()
}
