//! Merge request webhook payload and the eligibility filter.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const MERGE_REQUEST_KIND: &str = "merge_request";

/// Decoded merge request hook body.
///
/// Every field defaults so that any JSON object decodes; payloads of other
/// event kinds come out with zero values and are filtered out as ineligible.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct MergeRequestEvent {
    pub object_kind: String,
    pub project: ProjectInfo,
    pub object_attributes: MergeRequestAttributes,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ProjectInfo {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct MergeRequestAttributes {
    pub source_branch: String,
    pub source_project_id: u64,
    pub state: MergeRequestState,
    pub last_commit: LastCommit,
    pub work_in_progress: bool,
    /// Newer GitLab versions send `draft` alongside or instead of `work_in_progress`.
    pub draft: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LastCommit {
    pub id: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeRequestState {
    Opened,
    Merged,
    Closed,
    Locked,
    #[default]
    #[serde(other)]
    Unknown,
}

impl fmt::Display for MergeRequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MergeRequestState::Opened => "opened",
            MergeRequestState::Merged => "merged",
            MergeRequestState::Closed => "closed",
            MergeRequestState::Locked => "locked",
            MergeRequestState::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Result of the eligibility filter. Anything but `Eligible` is a silent no-op.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Eligibility {
    Eligible,
    WrongKind(String),
    NotOpen(MergeRequestState),
    WorkInProgress,
}

impl fmt::Display for Eligibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Eligibility::Eligible => f.write_str("eligible"),
            Eligibility::WrongKind(kind) => write!(f, "event kind is {:?}", kind),
            Eligibility::NotOpen(state) => write!(f, "merge request is {}", state),
            Eligibility::WorkInProgress => f.write_str("merge request is a draft"),
        }
    }
}

impl MergeRequestEvent {
    pub fn project_name(&self) -> &str {
        &self.project.name
    }

    pub fn source_branch(&self) -> &str {
        &self.object_attributes.source_branch
    }

    pub fn source_project_id(&self) -> u64 {
        self.object_attributes.source_project_id
    }

    pub fn commit_sha(&self) -> &str {
        &self.object_attributes.last_commit.id
    }

    pub fn is_work_in_progress(&self) -> bool {
        self.object_attributes.work_in_progress || self.object_attributes.draft
    }

    /// Only opened, non-draft merge request events may trigger a build.
    pub fn eligibility(&self) -> Eligibility {
        if self.object_kind != MERGE_REQUEST_KIND {
            return Eligibility::WrongKind(self.object_kind.clone());
        }
        if self.object_attributes.state != MergeRequestState::Opened {
            return Eligibility::NotOpen(self.object_attributes.state);
        }
        if self.is_work_in_progress() {
            return Eligibility::WorkInProgress;
        }
        Eligibility::Eligible
    }

    pub fn is_eligible(&self) -> bool {
        self.eligibility() == Eligibility::Eligible
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(kind: &str, state: &str, wip: bool) -> MergeRequestEvent {
        serde_json::from_value(json!({
            "object_kind": kind,
            "project": { "name": "widgets" },
            "object_attributes": {
                "source_branch": "feature/login",
                "source_project_id": 42,
                "state": state,
                "work_in_progress": wip,
                "last_commit": { "id": "abc123" }
            }
        }))
        .unwrap()
    }

    #[test]
    fn decodes_gitlab_payload() {
        let ev = event("merge_request", "opened", false);
        assert_eq!(ev.project_name(), "widgets");
        assert_eq!(ev.source_branch(), "feature/login");
        assert_eq!(ev.source_project_id(), 42);
        assert_eq!(ev.commit_sha(), "abc123");
        assert_eq!(ev.object_attributes.state, MergeRequestState::Opened);
    }

    #[test]
    fn opened_non_draft_merge_request_is_eligible() {
        assert_eq!(
            event("merge_request", "opened", false).eligibility(),
            Eligibility::Eligible
        );
    }

    #[test]
    fn merged_closed_and_locked_are_not_eligible() {
        for state in ["merged", "closed", "locked", "reopened"] {
            let ev = event("merge_request", state, false);
            assert!(
                matches!(ev.eligibility(), Eligibility::NotOpen(_)),
                "state {state} should be ineligible"
            );
        }
    }

    #[test]
    fn work_in_progress_is_not_eligible() {
        assert_eq!(
            event("merge_request", "opened", true).eligibility(),
            Eligibility::WorkInProgress
        );
    }

    #[test]
    fn draft_flag_counts_as_work_in_progress() {
        let mut ev = event("merge_request", "opened", false);
        ev.object_attributes.draft = true;
        assert!(!ev.is_eligible());
    }

    #[test]
    fn other_event_kinds_are_not_eligible() {
        let ev = event("push", "opened", false);
        assert_eq!(ev.eligibility(), Eligibility::WrongKind("push".to_string()));
    }

    #[test]
    fn unrelated_payload_decodes_with_defaults() {
        let ev: MergeRequestEvent =
            serde_json::from_str(r#"{"object_kind":"push","ref":"refs/heads/main"}"#).unwrap();
        assert_eq!(ev.source_project_id(), 0);
        assert_eq!(ev.object_attributes.state, MergeRequestState::Unknown);
        assert!(!ev.is_eligible());
    }

    #[test]
    fn non_json_body_fails_to_decode() {
        assert!(serde_json::from_str::<MergeRequestEvent>("not json").is_err());
    }
}
