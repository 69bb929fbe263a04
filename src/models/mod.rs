pub mod errors;
pub mod job;

pub use errors::{ValidationErrors, Violation, ViolationKind};
pub use job::{Capability, Job, JobArguments, JobResult, JobType, WorkerCapabilities};
