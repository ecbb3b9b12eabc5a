//! GitLab REST v4 access: the commit status, pipeline trigger and trigger
//! pipeline endpoints this service calls.

pub mod client;
pub mod types;

pub use client::GitLabClient;
pub use types::{BuildStatus, TriggerCredential, TriggerOwner};
