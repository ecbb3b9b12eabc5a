//! Turns one merge request event into zero or one pipeline trigger.

use secrecy::SecretString;
use tracing::info;

use crate::claims::SharedClaims;
use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result};
use crate::gitlab::GitLabClient;
use crate::guard::{GuardDecision, check_existing_builds};
use crate::pipeline::start_pipeline;
use crate::trigger::{TriggerSelection, resolve_trigger};
use crate::webhook::{Eligibility, MergeRequestEvent};

/// How processing of one event ended. None of these are errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Ineligible(Eligibility),
    Vetoed { build_id: u64, status: String },
    /// Another delivery for the same commit is being or was just handled here.
    AlreadyClaimed,
    Triggered { project: String, branch: String },
}

pub struct TriggerEngine {
    client: GitLabClient,
    selection: TriggerSelection,
    claims: SharedClaims,
}

impl TriggerEngine {
    pub fn new(config: &BridgeConfig) -> Result<Self> {
        let client = GitLabClient::new(config.base_url.clone(), config.request_timeout)?;
        Ok(Self {
            client,
            selection: config.trigger_selection,
            claims: SharedClaims::new(config.dedup_window),
        })
    }

    pub fn selection(&self) -> TriggerSelection {
        self.selection
    }

    /// Filter, guard, resolve the trigger and start the pipeline, stopping at
    /// the first negative outcome or error. `private_token` is only required
    /// once the event is found eligible.
    pub async fn process(
        &self,
        event: &MergeRequestEvent,
        private_token: Option<&SecretString>,
    ) -> Result<Outcome> {
        let eligibility = event.eligibility();
        if eligibility != Eligibility::Eligible {
            info!(
                "Ignoring event for {}#{}: {}",
                event.project_name(),
                event.source_branch(),
                eligibility
            );
            return Ok(Outcome::Ineligible(eligibility));
        }

        let private_token = private_token.ok_or(BridgeError::MissingToken)?;
        let project_id = event.source_project_id();
        let sha = event.commit_sha();

        if let GuardDecision::Veto { build_id, status } =
            check_existing_builds(&self.client, private_token, project_id, sha).await?
        {
            return Ok(Outcome::Vetoed { build_id, status });
        }

        let Some(claim) = self.claims.claim(project_id, sha) else {
            info!(
                "{} build skipped (reason: already being triggered by another delivery)",
                sha
            );
            return Ok(Outcome::AlreadyClaimed);
        };

        // `claim` is released on drop unless committed: on error or when the request is cancelled.
        self.trigger(event, private_token).await?;
        claim.commit();

        Ok(Outcome::Triggered {
            project: event.project_name().to_string(),
            branch: event.source_branch().to_string(),
        })
    }

    async fn trigger(&self, event: &MergeRequestEvent, private_token: &SecretString) -> Result<()> {
        let project_id = event.source_project_id();
        let trigger =
            resolve_trigger(&self.client, private_token, project_id, self.selection).await?;
        start_pipeline(
            &self.client,
            project_id,
            event.project_name(),
            event.source_branch(),
            &trigger.token,
        )
        .await
    }
}
