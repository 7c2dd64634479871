//! Jobs - the runner built from the standard job table

use gather_core::application::{standard_jobs, JobDependencies, JobRunner};
use gather_core::error::Result;

use crate::settings::Settings;

/// Single place where the daemon's job descriptors are assembled
pub fn build_runner(settings: &Settings, deps: &JobDependencies) -> Result<JobRunner> {
    let descriptors = standard_jobs(&settings.jobs, &settings.retention, deps)?;
    JobRunner::with_jobs(deps.time_provider.clone(), &settings.jobs, descriptors)
}
