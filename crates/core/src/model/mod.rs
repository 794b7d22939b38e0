pub mod content;
mod ids;
mod pathway;
mod progress;
mod query;
mod resource;
mod user;

pub use content::{Blog, BlogDraft, BlogFields, ContentError, Event, EventDraft, EventFields};
pub use ids::{BlogId, EventId, ParseIdError, PathwayId, ProgressId, QueryId, ResourceId, UserId};

pub use pathway::{Category, Pathway, PathwayDetail, PathwayDraft, PathwayError, PathwayFields};
pub use progress::{ProgressEntry, ProgressMark, ProgressStatus};
pub use query::{PageRequest, QueryDraft, QueryError, QueryPage, QueryStatus, UserQuery};
pub use resource::{Resource, ResourceDraft, ResourceError, ResourceFields, ResourceKind};
pub use user::{Email, Registration, User, UserError};
