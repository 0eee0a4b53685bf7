//! In-memory doubles for the store, catalog, policy gate and event publisher,
//! shared by unit tests and the `tests/` integration suite.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::config::SubServiceSettings;
use crate::database::{DatabaseError, ListOptions, ServiceCatalog, SubService, SubServiceStore};
use crate::policy::{Action, Effect, EnforceRequest, ListPoliciesRequest, ObjectType, Policy, PolicyError, PolicyGate};
use crate::services::{EventError, SubServiceEvent, SubServiceEventPublisher, SubServiceService};

/// Parent APIs and their owners.
#[derive(Default)]
pub struct MemoryServiceCatalog {
    owners: RwLock<HashMap<Uuid, Uuid>>,
}

impl MemoryServiceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_service(&self, service_id: Uuid, owner_id: Uuid) {
        self.owners.write().await.insert(service_id, owner_id);
    }

    pub async fn remove_service(&self, service_id: Uuid) {
        self.owners.write().await.remove(&service_id);
    }
}

#[async_trait]
impl ServiceCatalog for MemoryServiceCatalog {
    async fn exists(&self, service_id: Uuid) -> Result<bool, DatabaseError> {
        Ok(self.owners.read().await.contains_key(&service_id))
    }

    async fn owner_id(&self, service_id: Uuid) -> Result<Option<Uuid>, DatabaseError> {
        Ok(self.owners.read().await.get(&service_id).copied())
    }
}

/// Store with the same uniqueness, parent and ordering rules as the
/// PostgreSQL table. Timestamps advance one millisecond per write so list
/// order is deterministic.
pub struct MemorySubServiceStore {
    rows: RwLock<Vec<SubService>>,
    catalog: Arc<MemoryServiceCatalog>,
    epoch: DateTime<Utc>,
    clock: AtomicI64,
    unavailable: AtomicBool,
    skip_repeat_check: AtomicBool,
}

impl MemorySubServiceStore {
    pub fn new(catalog: Arc<MemoryServiceCatalog>) -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
            catalog,
            epoch: Utc::now(),
            clock: AtomicI64::new(0),
            unavailable: AtomicBool::new(false),
            skip_repeat_check: AtomicBool::new(false),
        }
    }

    /// Makes every call fail as if the database were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Lets `is_repeat` pass unconditionally, as when a concurrent writer
    /// inserts between the pre-check and the write.
    pub fn simulate_repeat_race(&self, enabled: bool) {
        self.skip_repeat_check.store(enabled, Ordering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    fn check_available(&self) -> Result<(), DatabaseError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DatabaseError::QueryError("connection refused".to_string()));
        }
        Ok(())
    }

    fn tick(&self) -> DateTime<Utc> {
        let n = self.clock.fetch_add(1, Ordering::SeqCst) + 1;
        self.epoch + Duration::milliseconds(n)
    }

    fn sorted(mut rows: Vec<SubService>) -> Vec<SubService> {
        rows.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(a.id.cmp(&b.id)));
        rows
    }

    fn conflicts(rows: &[SubService], candidate: &SubService) -> bool {
        rows.iter()
            .any(|r| r.service_id == candidate.service_id && r.name == candidate.name && r.id != candidate.id)
    }

    fn not_found(id: Uuid) -> DatabaseError {
        DatabaseError::NotFound(format!("sub-service {}", id))
    }
}

#[async_trait]
impl SubServiceStore for MemorySubServiceStore {
    async fn is_repeat(&self, candidate: &SubService) -> Result<(), DatabaseError> {
        self.check_available()?;
        if self.skip_repeat_check.load(Ordering::SeqCst) {
            return Ok(());
        }
        if Self::conflicts(&self.rows.read().await, candidate) {
            return Err(DatabaseError::AlreadyExists(candidate.name.clone()));
        }
        Ok(())
    }

    async fn create(&self, model: &SubService) -> Result<SubService, DatabaseError> {
        self.check_available()?;
        if !self.catalog.exists(model.service_id).await? {
            return Err(DatabaseError::ParentNotFound(model.name.clone()));
        }

        let mut rows = self.rows.write().await;
        if Self::conflicts(&rows, model) {
            return Err(DatabaseError::AlreadyExists(model.name.clone()));
        }

        let now = self.tick();
        let mut row = model.clone();
        row.created_at = now;
        row.updated_at = now;
        row.can_auth = None;
        rows.push(row.clone());
        Ok(row)
    }

    async fn get(&self, id: Uuid) -> Result<SubService, DatabaseError> {
        self.check_available()?;
        self.rows
            .read()
            .await
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| Self::not_found(id))
    }

    async fn get_service_id(&self, id: Uuid) -> Result<Uuid, DatabaseError> {
        self.get(id).await.map(|r| r.service_id)
    }

    async fn update(&self, model: &SubService) -> Result<SubService, DatabaseError> {
        self.check_available()?;
        let mut rows = self.rows.write().await;
        if Self::conflicts(&rows, model) {
            return Err(DatabaseError::AlreadyExists(model.name.clone()));
        }

        let now = self.tick();
        let row = rows.iter_mut().find(|r| r.id == model.id).ok_or_else(|| Self::not_found(model.id))?;
        row.name = model.name.clone();
        row.detail = model.detail.clone();
        row.row_filter_clause = model.row_filter_clause.clone();
        row.auth_scope_id = model.auth_scope_id;
        row.updated_at = now;
        Ok(row.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<(), DatabaseError> {
        self.check_available()?;
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|r| r.id != id);
        if rows.len() == before {
            return Err(Self::not_found(id));
        }
        Ok(())
    }

    async fn list(&self, opts: &ListOptions) -> Result<(Vec<SubService>, i64), DatabaseError> {
        self.check_available()?;
        let matching: Vec<SubService> = self
            .rows
            .read()
            .await
            .iter()
            .filter(|r| opts.service_id.map_or(true, |id| r.service_id == id))
            .cloned()
            .collect();
        let total = matching.len();
        let (start, end) = opts.window(total);
        let page = Self::sorted(matching).drain(start..end).collect();
        Ok((page, total as i64))
    }

    async fn list_all(&self, service_id: Uuid) -> Result<Vec<SubService>, DatabaseError> {
        self.check_available()?;
        let rows = self.rows.read().await.iter().filter(|r| r.service_id == service_id).cloned().collect();
        Ok(Self::sorted(rows))
    }

    async fn list_id(&self, service_id: Option<Uuid>) -> Result<Vec<Uuid>, DatabaseError> {
        self.check_available()?;
        let rows = self
            .rows
            .read()
            .await
            .iter()
            .filter(|r| service_id.map_or(true, |id| r.service_id == id))
            .cloned()
            .collect();
        Ok(Self::sorted(rows).into_iter().map(|r| r.id).collect())
    }

    async fn list_sub_services(&self, service_ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<Uuid>>, DatabaseError> {
        self.check_available()?;
        let mut out: HashMap<Uuid, Vec<Uuid>> = service_ids.iter().map(|id| (*id, Vec::new())).collect();
        let rows = Self::sorted(self.rows.read().await.clone());
        for row in rows {
            if let Some(ids) = out.get_mut(&row.service_id) {
                ids.push(row.id);
            }
        }
        Ok(out)
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        self.check_available()
    }
}

type Grant = (Uuid, ObjectType, Uuid, Action);

/// Policy gate answering from a fixed set of allow grants.
#[derive(Default)]
pub struct StaticPolicyGate {
    grants: RwLock<HashSet<Grant>>,
    enforce_calls: AtomicUsize,
    rule_enforce_calls: AtomicUsize,
    unavailable: AtomicBool,
}

impl StaticPolicyGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn grant(&self, subject_id: Uuid, object_type: ObjectType, object_id: Uuid, action: Action) {
        self.grants.write().await.insert((subject_id, object_type, object_id, action));
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of batched `enforce` round-trips served so far.
    pub fn enforce_calls(&self) -> usize {
        self.enforce_calls.load(Ordering::SeqCst)
    }

    pub fn rule_enforce_calls(&self) -> usize {
        self.rule_enforce_calls.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<(), PolicyError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(PolicyError::Status { status: 503, body: "policy engine unavailable".to_string() });
        }
        Ok(())
    }

    fn key(request: &EnforceRequest) -> Grant {
        (request.subject_id, request.object_type, request.object_id, request.action)
    }
}

#[async_trait]
impl PolicyGate for StaticPolicyGate {
    async fn list_policies(&self, request: &ListPoliciesRequest) -> Result<Vec<Policy>, PolicyError> {
        self.check_available()?;
        let grants = self.grants.read().await;
        Ok(grants
            .iter()
            .filter(|(subject_id, object_type, object_id, _)| {
                request.subjects.iter().any(|s| s.subject_id == *subject_id)
                    && request.objects.iter().any(|o| o.object_type == *object_type && o.object_id == *object_id)
            })
            .filter_map(|(subject_id, object_type, object_id, action)| {
                let subject = request.subjects.iter().find(|s| s.subject_id == *subject_id)?;
                Some(Policy {
                    subject_type: subject.subject_type,
                    subject_id: *subject_id,
                    object_type: *object_type,
                    object_id: *object_id,
                    action: *action,
                    effect: Effect::Allow,
                })
            })
            .collect())
    }

    async fn enforce(&self, requests: &[EnforceRequest]) -> Result<Vec<bool>, PolicyError> {
        self.check_available()?;
        self.enforce_calls.fetch_add(1, Ordering::SeqCst);
        let grants = self.grants.read().await;
        Ok(requests.iter().map(|r| grants.contains(&Self::key(r))).collect())
    }

    async fn rule_enforce(&self, request: &EnforceRequest) -> Result<Effect, PolicyError> {
        self.check_available()?;
        self.rule_enforce_calls.fetch_add(1, Ordering::SeqCst);
        if self.grants.read().await.contains(&Self::key(request)) {
            Ok(Effect::Allow)
        } else {
            Ok(Effect::Deny)
        }
    }
}

/// Publisher keeping every event it receives.
#[derive(Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<SubServiceEvent>>,
    failing: AtomicBool,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn events(&self) -> Vec<SubServiceEvent> {
        self.events.lock().await.clone()
    }
}

#[async_trait]
impl SubServiceEventPublisher for RecordingPublisher {
    async fn publish(&self, event: &SubServiceEvent) -> Result<(), EventError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(EventError("bus unavailable".to_string()));
        }
        self.events.lock().await.push(event.clone());
        Ok(())
    }
}

/// A use case wired to fresh in-memory collaborators.
pub struct TestContext {
    pub catalog: Arc<MemoryServiceCatalog>,
    pub store: Arc<MemorySubServiceStore>,
    pub policy: Arc<StaticPolicyGate>,
    pub events: Arc<RecordingPublisher>,
    pub service: Arc<SubServiceService>,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_settings(SubServiceSettings::default())
    }

    pub fn with_settings(settings: SubServiceSettings) -> Self {
        let catalog = Arc::new(MemoryServiceCatalog::new());
        let store = Arc::new(MemorySubServiceStore::new(catalog.clone()));
        let policy = Arc::new(StaticPolicyGate::new());
        let events = Arc::new(RecordingPublisher::new());
        let service = Arc::new(SubServiceService::new(
            store.clone(),
            catalog.clone(),
            policy.clone(),
            events.clone(),
            settings,
        ));
        Self { catalog, store, policy, events, service }
    }

    /// Registers a parent API owned by `owner_id` and returns its id.
    pub async fn add_service(&self, owner_id: Uuid) -> Uuid {
        let service_id = Uuid::new_v4();
        self.catalog.add_service(service_id, owner_id).await;
        service_id
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(service_id: Uuid, name: &str) -> SubService {
        let now = Utc::now();
        SubService {
            id: Uuid::new_v4(),
            name: name.to_string(),
            service_id,
            auth_scope_id: Uuid::nil(),
            detail: "{}".to_string(),
            row_filter_clause: String::new(),
            created_at: now,
            updated_at: now,
            can_auth: None,
        }
    }

    #[tokio::test]
    async fn store_enforces_uniqueness_even_when_precheck_is_skipped() {
        let ctx = TestContext::new();
        let service_id = ctx.add_service(Uuid::new_v4()).await;
        ctx.store.create(&row(service_id, "a")).await.unwrap();

        ctx.store.simulate_repeat_race(true);
        let dup = row(service_id, "a");
        assert!(ctx.store.is_repeat(&dup).await.is_ok());
        assert!(matches!(ctx.store.create(&dup).await, Err(DatabaseError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn store_rejects_unknown_parent() {
        let ctx = TestContext::new();
        let err = ctx.store.create(&row(Uuid::new_v4(), "a")).await.unwrap_err();
        assert!(matches!(err, DatabaseError::ParentNotFound(_)));
    }

    #[tokio::test]
    async fn newest_write_lists_first() {
        let ctx = TestContext::new();
        let service_id = ctx.add_service(Uuid::new_v4()).await;
        let first = ctx.store.create(&row(service_id, "first")).await.unwrap();
        let second = ctx.store.create(&row(service_id, "second")).await.unwrap();

        assert_eq!(ctx.store.list_id(Some(service_id)).await.unwrap(), vec![second.id, first.id]);
    }

    #[tokio::test]
    async fn batch_listing_has_entry_per_parent() {
        let ctx = TestContext::new();
        let with_child = ctx.add_service(Uuid::new_v4()).await;
        let empty = Uuid::new_v4();
        let child = ctx.store.create(&row(with_child, "a")).await.unwrap();

        let map = ctx.store.list_sub_services(&[with_child, empty]).await.unwrap();
        assert_eq!(map[&with_child], vec![child.id]);
        assert!(map[&empty].is_empty());
    }
}
