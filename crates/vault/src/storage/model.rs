//! Stored entities and their conversion to API responses.

use chrono::{DateTime, Utc};
use common::protocol::{DecryptedSecretResponse, ProjectResponse, SecretResponse};
use uuid::Uuid;

use crate::crypto::FieldValues;

/// A named group of secrets owned by one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: String,
    /// Platforms of the project's secrets, appended as new ones appear.
    pub platforms: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Field changes applied to a stored project.
///
/// `None` leaves a field unchanged. `description: Some(None)` clears it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectEdit {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub updated_at: DateTime<Utc>,
}

/// A credential entry as persisted.
///
/// `encrypted_values` maps field names to tokens; plaintext never lands here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretRecord {
    pub id: Uuid,
    pub name: String,
    pub kind: String,
    pub platform: String,
    pub encrypted_values: FieldValues,
    pub project_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A secret with its values decrypted for the owner.
#[derive(Debug, Clone)]
pub struct DecryptedSecret {
    pub record: SecretRecord,
    pub values: FieldValues,
}

/// A project together with its secrets.
#[derive(Debug, Clone)]
pub struct ProjectWithSecrets {
    pub project: Project,
    pub secrets: Vec<SecretRecord>,
}

impl Project {
    /// Record `platform` if the project has not seen it yet. Returns `true` if added.
    pub fn add_platform(&mut self, platform: &str) -> bool {
        if self.platforms.iter().any(|p| p == platform) {
            return false;
        }
        self.platforms.push(platform.to_owned());
        true
    }
}

impl SecretRecord {
    pub fn to_response(&self) -> SecretResponse {
        SecretResponse {
            id: self.id,
            name: self.name.clone(),
            kind: self.kind.clone(),
            platform: self.platform.clone(),
            project_id: self.project_id,
            fields: self.encrypted_values.keys().cloned().collect(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl DecryptedSecret {
    pub fn into_response(self) -> DecryptedSecretResponse {
        DecryptedSecretResponse {
            secret: self.record.to_response(),
            decrypted_values: self.values,
        }
    }
}

impl ProjectWithSecrets {
    pub fn into_response(self) -> ProjectResponse {
        let Self { project, secrets } = self;
        ProjectResponse {
            id: project.id,
            name: project.name,
            description: project.description,
            platforms: project.platforms,
            secret_count: secrets.len(),
            secrets: secrets.iter().map(SecretRecord::to_response).collect(),
            created_at: project.created_at,
            updated_at: project.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project() -> Project {
        let now = Utc::now();
        Project {
            id: Uuid::new_v4(),
            name: "Payments".into(),
            description: None,
            owner_id: "user-1".into(),
            platforms: vec![],
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn add_platform_deduplicates() {
        let mut p = project();
        assert!(p.add_platform("Stripe"));
        assert!(p.add_platform("AWS"));
        assert!(!p.add_platform("Stripe"));
        assert_eq!(p.platforms, vec!["Stripe", "AWS"]);
    }

    #[test]
    fn secret_response_lists_field_names_only() {
        let now = Utc::now();
        let record = SecretRecord {
            id: Uuid::new_v4(),
            name: "AWS prod".into(),
            kind: "API Key".into(),
            platform: "AWS".into(),
            encrypted_values: FieldValues::from([
                ("secret_access_key".to_owned(), "aa:bb:cc".to_owned()),
                ("access_key_id".to_owned(), "dd:ee:ff".to_owned()),
            ]),
            project_id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
        };
        let resp = record.to_response();
        assert_eq!(resp.fields, vec!["access_key_id", "secret_access_key"]);
        let json = serde_json::to_string(&resp).unwrap();
        assert!(!json.contains("aa:bb:cc"));
    }

    #[test]
    fn project_response_counts_secrets() {
        let view = ProjectWithSecrets {
            project: project(),
            secrets: vec![],
        };
        let resp = view.into_response();
        assert_eq!(resp.secret_count, 0);
        assert!(resp.secrets.is_empty());
    }
}
