use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use crate::config::SubServiceSettings;
use crate::database::{DatabaseError, ListOptions, ListResult, ServiceCatalog, SubService, SubServiceInput, SubServiceStore};
use crate::filter::Filter;
use crate::policy::{
    Action, Effect, EnforceRequest, ListPoliciesRequest, ObjectRef, ObjectType, PolicyError, PolicyGate, Subject,
};

use super::events::{ChangeKind, SubServiceEvent, SubServiceEventPublisher};
use super::validation::{
    validate_list_options, validate_sub_service, validate_sub_service_update, FieldErrors, SORT_IS_AUTHORIZED,
};

#[derive(Debug, Error)]
pub enum SubServiceError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(FieldErrors),

    #[error("Sub-service already exists: {0}")]
    AlreadyExists(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Caller does not own service {0}")]
    NotServiceOwner(Uuid),

    #[error("Permission not authorized: {0}")]
    PermissionNotAuthorized(String),

    #[error(transparent)]
    Database(DatabaseError),

    #[error(transparent)]
    Policy(#[from] PolicyError),
}

impl From<FieldErrors> for SubServiceError {
    fn from(errs: FieldErrors) -> Self {
        SubServiceError::InvalidParameter(errs)
    }
}

impl From<DatabaseError> for SubServiceError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(what) => SubServiceError::NotFound(what),
            DatabaseError::AlreadyExists(name) => SubServiceError::AlreadyExists(name),
            DatabaseError::ParentNotFound(what) => SubServiceError::NotFound(format!("service for {}", what)),
            other => SubServiceError::Database(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, SubServiceError>;

/// Sub-service use case: validation, predicate compilation, persistence and
/// authorization-sorted listing.
pub struct SubServiceService {
    store: Arc<dyn SubServiceStore>,
    catalog: Arc<dyn ServiceCatalog>,
    policy: Arc<dyn PolicyGate>,
    events: Arc<dyn SubServiceEventPublisher>,
    settings: SubServiceSettings,
}

impl SubServiceService {
    pub fn new(
        store: Arc<dyn SubServiceStore>,
        catalog: Arc<dyn ServiceCatalog>,
        policy: Arc<dyn PolicyGate>,
        events: Arc<dyn SubServiceEventPublisher>,
        settings: SubServiceSettings,
    ) -> Self {
        Self { store, catalog, policy, events, settings }
    }

    /// Creates a sub-service. `internal` skips the ownership check.
    pub async fn create(&self, subject: Option<&Subject>, input: SubServiceInput, internal: bool) -> Result<SubService> {
        let mut model = Self::model_from_input(input, Uuid::new_v4());

        self.store.is_repeat(&model).await?;

        let mut errs = validate_sub_service(&model);
        Self::compile_into(&mut model, &mut errs);
        errs.into_result()?;

        if !self.catalog.exists(model.service_id).await? {
            return Err(SubServiceError::NotFound(format!("service {}", model.service_id)));
        }
        if !internal {
            self.ensure_can_manage(subject, model.service_id).await?;
        }

        if model.auth_scope_id.is_nil() {
            model.auth_scope_id = model.id;
        }

        let created = self.store.create(&model).await?;
        self.publish(ChangeKind::Created, &created).await;
        Ok(created)
    }

    pub async fn update(&self, subject: Option<&Subject>, id: Uuid, input: SubServiceInput) -> Result<SubService> {
        if let Some(body_id) = input.id {
            if body_id != id {
                let mut errs = FieldErrors::new();
                errs.invalid("id", body_id, "must match the id in the path");
                return Err(errs.into());
            }
        }
        let mut model = Self::model_from_input(input, id);

        self.store.is_repeat(&model).await?;
        let previous = self.store.get(id).await?;

        let mut errs = validate_sub_service_update(&model, &previous);
        Self::compile_into(&mut model, &mut errs);
        errs.into_result()?;

        self.ensure_can_manage(subject, previous.service_id).await?;

        if model.auth_scope_id.is_nil() {
            model.auth_scope_id = previous.auth_scope_id;
        }

        let updated = self.store.update(&model).await?;
        self.publish(ChangeKind::Updated, &updated).await;
        Ok(updated)
    }

    pub async fn delete(&self, subject: Option<&Subject>, id: Uuid) -> Result<()> {
        let previous = self.store.get(id).await?;
        self.ensure_can_manage(subject, previous.service_id).await?;
        self.store.delete(id).await?;
        self.publish(ChangeKind::Deleted, &previous).await;
        Ok(())
    }

    pub async fn get(&self, id: Uuid) -> Result<SubService> {
        Ok(self.store.get(id).await?)
    }

    pub async fn get_service_id(&self, id: Uuid) -> Result<Uuid> {
        Ok(self.store.get_service_id(id).await?)
    }

    pub async fn list_id(&self, service_id: Option<Uuid>) -> Result<Vec<Uuid>> {
        Ok(self.store.list_id(service_id).await?)
    }

    pub async fn list_sub_services(&self, service_ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<Uuid>>> {
        Ok(self.store.list_sub_services(service_ids).await?)
    }

    pub async fn ping(&self) -> Result<()> {
        Ok(self.store.ping().await?)
    }

    pub async fn list(&self, subject: Option<&Subject>, opts: &ListOptions) -> Result<ListResult> {
        validate_list_options(opts, self.settings.max_page_size).into_result()?;

        if opts.sort == SORT_IS_AUTHORIZED {
            return self.list_sorted_by_authorization(subject, opts).await;
        }

        let (mut entries, total_count) = self.store.list(opts).await?;
        self.stamp_can_auth(subject, &mut entries).await?;
        Ok(ListResult { entries, total_count })
    }

    /// Pages the parent's sub-services ordered by whether the subject may use
    /// each one. The whole set is loaded and sorted in memory.
    async fn list_sorted_by_authorization(&self, subject: Option<&Subject>, opts: &ListOptions) -> Result<ListResult> {
        let service_id = opts.service_id.unwrap_or_default();
        let mut candidates = self.store.list_all(service_id).await?;

        if candidates.len() > self.settings.max_sort_candidates {
            return Err(FieldErrors::single(
                "service_id",
                format!(
                    "has {} sub-services, more than the {} that can be sorted by authorization",
                    candidates.len(),
                    self.settings.max_sort_candidates
                ),
            )
            .into());
        }

        let authorized = match subject {
            Some(subject) => self.authorized_map(subject, &candidates).await?,
            None => {
                tracing::debug!(%service_id, "anonymous authorization sort, treating all entries as unauthorized");
                HashMap::new()
            }
        };
        let is_authorized = |s: &SubService| authorized.get(&s.id).copied().unwrap_or(false);

        // sort_by_key is stable, so ties keep the store order.
        if opts.direction == "asc" {
            candidates.sort_by_key(|s| is_authorized(s));
        } else {
            candidates.sort_by_key(|s| Reverse(is_authorized(s)));
        }

        let total = candidates.len();
        let (start, end) = opts.window(total);
        let mut entries: Vec<SubService> = candidates.drain(start..end).collect();
        self.stamp_can_auth(subject, &mut entries).await?;

        Ok(ListResult { entries, total_count: total as i64 })
    }

    /// One batched Enforce round-trip; a candidate is authorized when any
    /// probed action is allowed.
    async fn authorized_map(&self, subject: &Subject, candidates: &[SubService]) -> Result<HashMap<Uuid, bool>> {
        if candidates.is_empty() {
            return Ok(HashMap::new());
        }

        let requests: Vec<EnforceRequest> = candidates
            .iter()
            .flat_map(|c| {
                let (object_type, object_id) = c.auth_object();
                Action::USE
                    .into_iter()
                    .map(move |action| EnforceRequest::new(subject, object_type, object_id, action))
            })
            .collect();

        let decisions = self.policy.enforce(&requests).await?;
        if decisions.len() != requests.len() {
            return Err(PolicyError::Misaligned { expected: requests.len(), got: decisions.len() }.into());
        }

        Ok(candidates
            .iter()
            .zip(decisions.chunks(Action::USE.len()))
            .map(|(c, allowed)| (c.id, allowed.iter().any(|a| *a)))
            .collect())
    }

    async fn stamp_can_auth(&self, subject: Option<&Subject>, entries: &mut [SubService]) -> Result<()> {
        if !self.settings.fine_grained_can_auth {
            for entry in entries.iter_mut() {
                entry.can_auth = Some(true);
            }
            return Ok(());
        }

        let Some(subject) = subject else {
            for entry in entries.iter_mut() {
                entry.can_auth = Some(false);
            }
            return Ok(());
        };
        if entries.is_empty() {
            return Ok(());
        }

        let mut owners: HashMap<Uuid, Option<Uuid>> = HashMap::new();
        for entry in entries.iter() {
            if !owners.contains_key(&entry.service_id) {
                owners.insert(entry.service_id, self.catalog.owner_id(entry.service_id).await?);
            }
        }

        let objects: HashSet<ObjectRef> = entries
            .iter()
            .map(|e| {
                let (object_type, object_id) = e.auth_object();
                ObjectRef { object_type, object_id }
            })
            .collect();
        let request = ListPoliciesRequest {
            subjects: vec![subject.subject_ref()],
            objects: objects.into_iter().collect(),
        };
        let delegated: HashSet<(ObjectType, Uuid)> = self
            .policy
            .list_policies(&request)
            .await?
            .into_iter()
            .filter(|p| p.subject_id == subject.id && p.effect == Effect::Allow && Action::DELEGATE.contains(&p.action))
            .map(|p| (p.object_type, p.object_id))
            .collect();

        for entry in entries.iter_mut() {
            let owns_parent = owners.get(&entry.service_id).copied().flatten() == Some(subject.id);
            entry.can_auth = Some(owns_parent || delegated.contains(&entry.auth_object()));
        }
        Ok(())
    }

    /// Mutations on a parent's sub-services need parent ownership or an
    /// Allocate/Auth grant on the parent API.
    async fn ensure_can_manage(&self, subject: Option<&Subject>, service_id: Uuid) -> Result<()> {
        if !self.settings.enforce_ownership {
            return Ok(());
        }
        let subject = subject
            .ok_or_else(|| SubServiceError::PermissionNotAuthorized("an authenticated subject is required".to_string()))?;

        match self.catalog.owner_id(service_id).await? {
            None => return Err(SubServiceError::NotFound(format!("service {}", service_id))),
            Some(owner) if owner == subject.id => return Ok(()),
            Some(_) => {}
        }

        for action in Action::DELEGATE {
            let request = EnforceRequest::new(subject, ObjectType::Api, service_id, action);
            if self.policy.rule_enforce(&request).await? == Effect::Allow {
                return Ok(());
            }
        }

        tracing::warn!(subject = %subject.id, %service_id, "sub-service mutation rejected: caller neither owns nor holds a grant on the service");
        Err(SubServiceError::NotServiceOwner(service_id))
    }

    fn model_from_input(input: SubServiceInput, id: Uuid) -> SubService {
        let now = Utc::now();
        SubService {
            id,
            name: input.name,
            service_id: input.service_id.unwrap_or_default(),
            auth_scope_id: input.auth_scope_id.unwrap_or_default(),
            detail: input.detail,
            row_filter_clause: String::new(),
            created_at: now,
            updated_at: now,
            can_auth: None,
        }
    }

    /// Compiles `detail` into the model's clause, recording failures on `errs`.
    fn compile_into(model: &mut SubService, errs: &mut FieldErrors) {
        if model.detail.trim().is_empty() {
            return;
        }
        match Filter::compile_str(&model.detail) {
            Ok(clause) => model.row_filter_clause = clause,
            Err(e) => {
                tracing::warn!(sub_service = %model.id, error = %e, "rejecting sub-service detail");
                errs.extend(e.into());
            }
        }
    }

    async fn publish(&self, kind: ChangeKind, model: &SubService) {
        let event = SubServiceEvent { kind, id: model.id, service_id: model.service_id };
        if let Err(e) = self.events.publish(&event).await {
            tracing::warn!(error = %e, id = %model.id, "sub-service event not published");
        }
    }
}
