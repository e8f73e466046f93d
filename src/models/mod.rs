pub mod event;
pub mod location;
pub mod notification;
pub mod skill;
pub mod volunteer;

pub use event::{Event, EventPayload};
pub use location::Location;
pub use notification::Notification;
pub use skill::Skill;
pub use volunteer::{HistoryEntry, MatchRecord, Volunteer};
