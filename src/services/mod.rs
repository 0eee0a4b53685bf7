pub mod events;
pub mod sub_service;
pub mod validation;

pub use events::{ChangeKind, EventError, LogEventPublisher, SubServiceEvent, SubServiceEventPublisher};
pub use sub_service::{SubServiceError, SubServiceService};
pub use validation::{FieldError, FieldErrors};
