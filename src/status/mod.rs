//! Status vocabulary mapping between GitLab CI and GitHub commit statuses.

pub mod mapper;

pub use mapper::{
    CommitState, CommitStatusUpdate, STATUS_CONTEXT_PREFIX, default_description, describe_job,
    map_ci_status,
};
