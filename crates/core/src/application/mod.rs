// Application Layer - Use Cases and Business Logic

pub mod bounded;
pub mod conflict;
pub mod hold;
pub mod jobs;

// Re-exports
pub use conflict::{ConflictConfig, ConflictDetectionEngine};
pub use hold::{HoldConfig, PromotionDetails, ReservationHoldManager};
pub use jobs::{
    shutdown_channel, standard_jobs, JobDependencies, JobDescriptor, JobOutcome, JobReport,
    JobRunner, JobsConfig, Schedule, ScheduledJob, ShutdownSender, ShutdownToken, TriggerOutcome,
};
