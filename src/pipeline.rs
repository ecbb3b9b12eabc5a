use secrecy::SecretString;
use tracing::info;

use crate::error::Result;
use crate::gitlab::GitLabClient;

/// Start a pipeline for `branch`. Only `201 Created` counts as success.
pub async fn start_pipeline(
    client: &GitLabClient,
    project_id: u64,
    project_name: &str,
    branch: &str,
    trigger_token: &SecretString,
) -> Result<()> {
    client
        .trigger_pipeline(trigger_token, project_id, branch)
        .await?;
    info!("Triggered build of {}#{}", project_name, branch);
    Ok(())
}
