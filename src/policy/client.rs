use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::config::PolicyConfig;
use super::error::PolicyError;
use super::types::{Effect, EnforceRequest, ListPoliciesRequest, Policy};

/// Decision service answering "may this subject do this to that object".
///
/// Callers deciding over many objects must use `enforce` with the whole batch.
#[async_trait]
pub trait PolicyGate: Send + Sync {
    async fn list_policies(&self, request: &ListPoliciesRequest) -> Result<Vec<Policy>, PolicyError>;

    /// One decision per request, aligned by index.
    async fn enforce(&self, requests: &[EnforceRequest]) -> Result<Vec<bool>, PolicyError>;

    async fn rule_enforce(&self, request: &EnforceRequest) -> Result<Effect, PolicyError>;
}

#[derive(Debug, Deserialize)]
struct PolicyList {
    #[serde(default)]
    entries: Vec<Policy>,
}

#[derive(Debug, Deserialize)]
struct Decision {
    effect: Effect,
}

/// `PolicyGate` backed by the auth service's HTTP API.
pub struct HttpPolicyGate {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpPolicyGate {
    const LIST_POLICIES_PATH: &'static str = "api/auth-service/v1/policies/query";
    const ENFORCE_PATH: &'static str = "api/auth-service/v1/enforce";
    const RULE_ENFORCE_PATH: &'static str = "api/auth-service/v1/rule/enforce";

    pub fn new(config: &PolicyConfig) -> Result<Self, PolicyError> {
        let mut base_url = Url::parse(&config.base_url).map_err(|e| PolicyError::InvalidUrl(e.to_string()))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;
        Ok(Self { client, base_url })
    }

    fn endpoint(&self, path: &str) -> Result<Url, PolicyError> {
        self.base_url.join(path).map_err(|e| PolicyError::InvalidUrl(e.to_string()))
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, PolicyError>
    where
        B: Serialize + ?Sized + Sync,
        R: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        let response = self.client.post(url).json(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), path, "Policy engine call failed");
            return Err(PolicyError::Status { status: status.as_u16(), body });
        }
        Ok(response.json::<R>().await?)
    }
}

#[async_trait]
impl PolicyGate for HttpPolicyGate {
    async fn list_policies(&self, request: &ListPoliciesRequest) -> Result<Vec<Policy>, PolicyError> {
        let list: PolicyList = self.post(Self::LIST_POLICIES_PATH, request).await?;
        Ok(list.entries)
    }

    async fn enforce(&self, requests: &[EnforceRequest]) -> Result<Vec<bool>, PolicyError> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }
        let decisions: Vec<Decision> = self.post(Self::ENFORCE_PATH, requests).await?;
        if decisions.len() != requests.len() {
            return Err(PolicyError::Misaligned { expected: requests.len(), got: decisions.len() });
        }
        Ok(decisions.into_iter().map(|d| d.effect == Effect::Allow).collect())
    }

    async fn rule_enforce(&self, request: &EnforceRequest) -> Result<Effect, PolicyError> {
        let decision: Decision = self.post(Self::RULE_ENFORCE_PATH, request).await?;
        Ok(decision.effect)
    }
}
