use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectType {
    User,
    App,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectType {
    Api,
    SubService,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Read,
    Download,
    Auth,
    Allocate,
}

impl Action {
    /// Actions probed when deciding whether a subject may use a sub-service.
    pub const USE: [Action; 2] = [Action::Read, Action::Download];
    /// Actions granting delegation rights over an object.
    pub const DELEGATE: [Action; 2] = [Action::Allocate, Action::Auth];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    Allow,
    Deny,
}

/// Authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub subject_type: SubjectType,
    #[serde(default)]
    pub name: String,
}

impl Subject {
    pub fn user(id: Uuid, name: impl Into<String>) -> Self {
        Self { id, subject_type: SubjectType::User, name: name.into() }
    }

    pub fn subject_ref(&self) -> SubjectRef {
        SubjectRef { subject_type: self.subject_type, subject_id: self.id }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubjectRef {
    pub subject_type: SubjectType,
    pub subject_id: Uuid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    pub object_type: ObjectType,
    pub object_id: Uuid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnforceRequest {
    pub subject_type: SubjectType,
    pub subject_id: Uuid,
    pub object_type: ObjectType,
    pub object_id: Uuid,
    pub action: Action,
}

impl EnforceRequest {
    pub fn new(subject: &Subject, object_type: ObjectType, object_id: Uuid, action: Action) -> Self {
        Self {
            subject_type: subject.subject_type,
            subject_id: subject.id,
            object_type,
            object_id,
            action,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListPoliciesRequest {
    pub subjects: Vec<SubjectRef>,
    pub objects: Vec<ObjectRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    pub subject_type: SubjectType,
    pub subject_id: Uuid,
    pub object_type: ObjectType,
    pub object_id: Uuid,
    pub action: Action,
    pub effect: Effect,
}
