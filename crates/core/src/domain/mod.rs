// Domain Layer - Pure scheduling entities and interval logic

pub mod conflict;
pub mod error;
pub mod event;
pub mod hold;
pub mod subscriber;
pub mod venue;
pub mod window;

// Re-exports
pub use conflict::{Conflict, ConflictReport, ConflictType, Occupant, Suggestions};
pub use error::DomainError;
pub use event::{Coordinates, EventId, EventProposal, EventRecord, EventStatus, Location};
pub use hold::{HoldId, PencilHold, SlotDescriptor, SlotKey};
pub use subscriber::{Channel, DigestSubscriber, Recipient, SubscriberSet, User};
pub use venue::{Venue, VenueDirectory};
pub use window::{DateRange, TimeWindow};
