use secrecy::SecretString;
use serde::{Deserialize, Deserializer};

/// One entry of `GET /projects/:id/repository/commits/:sha/statuses`.
#[derive(Debug, Clone, Deserialize)]
pub struct BuildStatus {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub status: String,
}

impl BuildStatus {
    pub fn is_skipped(&self) -> bool {
        self.status == "skipped"
    }
}

/// A pipeline trigger token as returned by the triggers API.
#[derive(Debug, Deserialize)]
pub struct TriggerCredential {
    /// Zero when the API omits it.
    #[serde(default)]
    pub id: u64,
    #[serde(deserialize_with = "secret")]
    pub token: SecretString,
    /// Absent on legacy triggers created before per-user ownership.
    #[serde(default)]
    pub owner: Option<TriggerOwner>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TriggerOwner {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub username: String,
}

impl TriggerCredential {
    pub fn owner_id(&self) -> u64 {
        self.owner.as_ref().map_or(0, |o| o.id)
    }

    pub fn is_legacy(&self) -> bool {
        self.owner_id() == 0
    }

    pub fn owner_name(&self) -> &str {
        self.owner.as_ref().map_or("", |o| o.username.as_str())
    }
}

fn secret<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn owned_trigger_is_not_legacy() {
        let trigger: TriggerCredential = serde_json::from_str(
            r#"{"id":10,"token":"6d056f63e50fe6f8c5f8f4aa10edb7","description":"ci","owner":{"id":3,"username":"root"}}"#,
        )
        .unwrap();
        assert_eq!(trigger.owner_id(), 3);
        assert_eq!(trigger.owner_name(), "root");
        assert!(!trigger.is_legacy());
        assert_eq!(trigger.token.expose_secret(), "6d056f63e50fe6f8c5f8f4aa10edb7");
    }

    #[test]
    fn missing_or_null_owner_is_legacy() {
        let no_owner: TriggerCredential =
            serde_json::from_str(r#"{"id":1,"token":"t"}"#).unwrap();
        assert!(no_owner.is_legacy());

        let null_owner: TriggerCredential =
            serde_json::from_str(r#"{"id":1,"token":"t","owner":null}"#).unwrap();
        assert!(null_owner.is_legacy());
    }

    #[test]
    fn debug_does_not_print_token() {
        let trigger: TriggerCredential =
            serde_json::from_str(r#"{"id":1,"token":"very-secret-token"}"#).unwrap();
        assert!(!format!("{:?}", trigger).contains("very-secret-token"));
    }

    #[test]
    fn skipped_status_is_recognised() {
        let statuses: Vec<BuildStatus> =
            serde_json::from_str(r#"[{"id":1,"status":"skipped"},{"id":2,"status":"running"}]"#)
                .unwrap();
        assert!(statuses[0].is_skipped());
        assert!(!statuses[1].is_skipped());
    }
}
