use super::job::{JobConfig, JobOptions};
use super::models::{Settings, StoreBackend};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Job name is required")]
    MissingJobName,

    #[error("Concurrency must be at least 1")]
    InvalidConcurrency,

    #[error("log_step must be at least 1")]
    InvalidLogStep,

    #[error("Store key prefix must not be empty")]
    EmptyKeyPrefix,

    #[error("Store path must not be empty for the fjall backend")]
    EmptyStorePath,
}

/// Validate process settings
pub fn validate(settings: &Settings) -> Result<(), ValidationError> {
    if settings.store.key_prefix.is_empty() {
        return Err(ValidationError::EmptyKeyPrefix);
    }
    if settings.store.backend == StoreBackend::Fjall && settings.store.path.as_os_str().is_empty()
    {
        return Err(ValidationError::EmptyStorePath);
    }
    validate_options(&settings.job)
}

/// Validate a job before it may touch the store
pub fn validate_job(job: &JobConfig) -> Result<(), ValidationError> {
    if job.name.trim().is_empty() {
        return Err(ValidationError::MissingJobName);
    }
    validate_options(&job.options)
}

fn validate_options(options: &JobOptions) -> Result<(), ValidationError> {
    if options.concurrency == 0 {
        return Err(ValidationError::InvalidConcurrency);
    }
    if options.log_step == 0 {
        return Err(ValidationError::InvalidLogStep);
    }
    Ok(())
}
