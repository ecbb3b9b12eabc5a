//! Duplicate-build guard: refuse to trigger when the commit already has a
//! build in any state other than `skipped`.

use secrecy::SecretString;
use tracing::info;

use crate::error::Result;
use crate::gitlab::{BuildStatus, GitLabClient};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Proceed,
    Veto { build_id: u64, status: String },
}

/// Veto on the first non-skipped status; an empty or all-skipped list proceeds.
pub fn evaluate(statuses: &[BuildStatus]) -> GuardDecision {
    match statuses.iter().find(|s| !s.is_skipped()) {
        Some(build) => GuardDecision::Veto {
            build_id: build.id,
            status: build.status.clone(),
        },
        None => GuardDecision::Proceed,
    }
}

pub async fn check_existing_builds(
    client: &GitLabClient,
    private_token: &SecretString,
    project_id: u64,
    sha: &str,
) -> Result<GuardDecision> {
    let statuses = client.commit_statuses(private_token, project_id, sha).await?;
    let decision = evaluate(&statuses);
    if let GuardDecision::Veto { build_id, status } = &decision {
        info!(
            "{} build skipped (reason: build {} is in \"{}\" status)",
            sha, build_id, status
        );
    }
    Ok(decision)
}
