//! Trigger resolution: find or create the project's pipeline trigger and make
//! sure it has an owner.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::info;

use crate::error::Result;
use crate::gitlab::{GitLabClient, TriggerCredential};

/// Description given to triggers this service creates.
pub const TRIGGER_DESCRIPTION: &str = "triggered by gitlab_mr_build_trigger";

/// Which trigger to use when a project has several.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerSelection {
    /// Whatever the API lists first.
    #[default]
    First,
    /// Lowest id.
    Oldest,
    /// Highest id.
    Newest,
}

impl TriggerSelection {
    pub fn select(self, triggers: Vec<TriggerCredential>) -> Option<TriggerCredential> {
        match self {
            TriggerSelection::First => triggers.into_iter().next(),
            TriggerSelection::Oldest => triggers.into_iter().min_by_key(|t| t.id),
            TriggerSelection::Newest => triggers.into_iter().max_by_key(|t| t.id),
        }
    }
}

impl fmt::Display for TriggerSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TriggerSelection::First => "first",
            TriggerSelection::Oldest => "oldest",
            TriggerSelection::Newest => "newest",
        };
        f.write_str(s)
    }
}

impl FromStr for TriggerSelection {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "first" => Ok(TriggerSelection::First),
            "oldest" => Ok(TriggerSelection::Oldest),
            "newest" => Ok(TriggerSelection::Newest),
            other => Err(format!(
                "unknown trigger selection {:?} (expected first, oldest or newest)",
                other
            )),
        }
    }
}

/// Return a usable trigger for `project_id`.
///
/// 1. List the project's triggers.
/// 2. If there are none, create one and use it.
/// 3. Otherwise pick one with `selection`.
/// 4. If the chosen trigger has no owner, take ownership and use the
///    returned record instead.
pub async fn resolve_trigger(
    client: &GitLabClient,
    private_token: &SecretString,
    project_id: u64,
    selection: TriggerSelection,
) -> Result<TriggerCredential> {
    let triggers = client.list_triggers(private_token, project_id).await?;
    let count = triggers.len();

    let trigger = match selection.select(triggers) {
        Some(trigger) => trigger,
        None => {
            info!("No trigger for project {}, creating one", project_id);
            client
                .create_trigger(private_token, project_id, TRIGGER_DESCRIPTION)
                .await?
        }
    };

    if count > 1 {
        info!(
            "Project {} has {} triggers, using {} ({} policy)",
            project_id, count, trigger.id, selection
        );
    }

    if trigger.is_legacy() {
        info!(
            "Trigger {} of project {} has no owner, taking ownership",
            trigger.id, project_id
        );
        let owned = client
            .take_ownership(private_token, project_id, trigger.id)
            .await?;
        info!(
            "Trigger {} of project {} is now owned by {}",
            owned.id,
            project_id,
            owned.owner_name()
        );
        return Ok(owned);
    }

    Ok(trigger)
}
