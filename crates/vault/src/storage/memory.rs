//! Persistence seam for projects and secrets, plus the in-memory backend.

use std::{
    collections::HashMap,
    sync::{PoisonError, RwLock},
};

use uuid::Uuid;

use chrono::{DateTime, Utc};

use super::model::{Project, ProjectEdit, SecretRecord};

/// Storage operations the [`SecretStore`](super::SecretStore) builds on.
///
/// Backends see only encrypted records and do no ownership checks of their own.
/// Every method is atomic: a write that touches both a secret and its project
/// happens under one lock, so concurrent edits are never overwritten by a
/// stale copy.
#[cfg_attr(test, mockall::automock)]
pub trait SecretBackend: Send + Sync {
    fn insert_project(&self, project: Project);
    fn project(&self, id: Uuid) -> Option<Project>;
    fn projects_for_owner(&self, owner_id: &str) -> Vec<Project>;
    /// Apply `edit` to a stored project. Returns the result, or `None` if absent.
    fn edit_project(&self, id: Uuid, edit: ProjectEdit) -> Option<Project>;
    /// Remove a project and every secret in it. Returns `false` if absent.
    fn remove_project(&self, id: Uuid) -> bool;

    /// Insert a secret and record its platform on the owning project.
    /// Returns `false`, storing nothing, if the project does not exist.
    fn insert_secret(&self, secret: SecretRecord) -> bool;
    fn secret(&self, id: Uuid) -> Option<SecretRecord>;
    fn secrets_in_project(&self, project_id: Uuid) -> Vec<SecretRecord>;
    /// Replace an existing secret and record its platform on the owning
    /// project. Returns `false` if the secret does not exist.
    fn replace_secret(&self, secret: SecretRecord) -> bool;
    fn remove_secret(&self, id: Uuid) -> bool;
}

#[derive(Debug, Default)]
struct Tables {
    projects: HashMap<Uuid, Project>,
    secrets: HashMap<Uuid, SecretRecord>,
}

/// Process-local backend. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    tables: RwLock<Tables>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn read<T>(&self, f: impl FnOnce(&Tables) -> T) -> T {
        f(&self.tables.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn write<T>(&self, f: impl FnOnce(&mut Tables) -> T) -> T {
        f(&mut self.tables.write().unwrap_or_else(PoisonError::into_inner))
    }
}

impl SecretBackend for InMemoryBackend {
    fn insert_project(&self, project: Project) {
        self.write(|t| t.projects.insert(project.id, project));
    }

    fn project(&self, id: Uuid) -> Option<Project> {
        self.read(|t| t.projects.get(&id).cloned())
    }

    fn projects_for_owner(&self, owner_id: &str) -> Vec<Project> {
        self.read(|t| {
            t.projects
                .values()
                .filter(|p| p.owner_id == owner_id)
                .cloned()
                .collect()
        })
    }

    fn edit_project(&self, id: Uuid, edit: ProjectEdit) -> Option<Project> {
        self.write(|t| {
            let project = t.projects.get_mut(&id)?;
            if let Some(name) = edit.name {
                project.name = name;
            }
            if let Some(description) = edit.description {
                project.description = description;
            }
            project.updated_at = edit.updated_at;
            Some(project.clone())
        })
    }

    fn remove_project(&self, id: Uuid) -> bool {
        self.write(|t| {
            let removed = t.projects.remove(&id).is_some();
            if removed {
                t.secrets.retain(|_, s| s.project_id != id);
            }
            removed
        })
    }

    fn insert_secret(&self, secret: SecretRecord) -> bool {
        self.write(|t| {
            let Some(project) = t.projects.get_mut(&secret.project_id) else {
                return false;
            };
            record_platform(project, &secret.platform, secret.updated_at);
            t.secrets.insert(secret.id, secret);
            true
        })
    }

    fn secret(&self, id: Uuid) -> Option<SecretRecord> {
        self.read(|t| t.secrets.get(&id).cloned())
    }

    fn secrets_in_project(&self, project_id: Uuid) -> Vec<SecretRecord> {
        self.read(|t| {
            let mut secrets: Vec<SecretRecord> = t
                .secrets
                .values()
                .filter(|s| s.project_id == project_id)
                .cloned()
                .collect();
            secrets.sort_by_key(|s| s.created_at);
            secrets
        })
    }

    fn replace_secret(&self, secret: SecretRecord) -> bool {
        self.write(|t| {
            let Some(slot) = t.secrets.get_mut(&secret.id) else {
                return false;
            };
            if let Some(project) = t.projects.get_mut(&secret.project_id) {
                record_platform(project, &secret.platform, secret.updated_at);
            }
            *slot = secret;
            true
        })
    }

    fn remove_secret(&self, id: Uuid) -> bool {
        self.write(|t| t.secrets.remove(&id).is_some())
    }
}

fn record_platform(project: &mut Project, platform: &str, at: DateTime<Utc>) {
    if project.add_platform(platform) {
        project.updated_at = at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(owner: &str) -> Project {
        let now = Utc::now();
        Project {
            id: Uuid::new_v4(),
            name: "p".into(),
            description: None,
            owner_id: owner.into(),
            platforms: vec![],
            created_at: now,
            updated_at: now,
        }
    }

    fn secret(project_id: Uuid) -> SecretRecord {
        let now = Utc::now();
        SecretRecord {
            id: Uuid::new_v4(),
            name: "s".into(),
            kind: "API Key".into(),
            platform: "AWS".into(),
            encrypted_values: Default::default(),
            project_id,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn projects_are_filtered_by_owner() {
        let backend = InMemoryBackend::new();
        backend.insert_project(project("alice"));
        backend.insert_project(project("alice"));
        backend.insert_project(project("bob"));
        assert_eq!(backend.projects_for_owner("alice").len(), 2);
        assert_eq!(backend.projects_for_owner("bob").len(), 1);
        assert!(backend.projects_for_owner("carol").is_empty());
    }

    #[test]
    fn removing_project_cascades_to_secrets() {
        let backend = InMemoryBackend::new();
        let keep = project("alice");
        let gone = project("alice");
        let kept_secret = secret(keep.id);
        let dropped_secret = secret(gone.id);
        backend.insert_project(keep.clone());
        backend.insert_project(gone.clone());
        backend.insert_secret(kept_secret.clone());
        backend.insert_secret(dropped_secret.clone());

        assert!(backend.remove_project(gone.id));
        assert!(backend.secret(dropped_secret.id).is_none());
        assert!(backend.secret(kept_secret.id).is_some());
        assert!(!backend.remove_project(gone.id));
    }

    #[test]
    fn edit_touches_only_given_fields() {
        let backend = InMemoryBackend::new();
        let mut p = project("alice");
        p.description = Some("keep me".into());
        let edit = ProjectEdit {
            name: Some("renamed".into()),
            description: None,
            updated_at: Utc::now(),
        };
        assert!(backend.edit_project(p.id, edit.clone()).is_none());

        backend.insert_project(p.clone());
        let edited = backend.edit_project(p.id, edit).unwrap();
        assert_eq!(edited.name, "renamed");
        assert_eq!(edited.description.as_deref(), Some("keep me"));
        assert_eq!(backend.project(p.id).unwrap(), edited);
    }

    #[test]
    fn secret_writes_need_a_live_project() {
        let backend = InMemoryBackend::new();
        let p = project("alice");
        let s = secret(p.id);
        assert!(!backend.insert_secret(s.clone()));
        assert!(backend.secret(s.id).is_none());
        assert!(!backend.replace_secret(s.clone()));

        backend.insert_project(p.clone());
        assert!(backend.insert_secret(s.clone()));
        assert!(backend.replace_secret(s));
    }

    #[test]
    fn secret_writes_record_platform_in_place() {
        let backend = InMemoryBackend::new();
        let p = project("alice");
        backend.insert_project(p.clone());

        let mut s = secret(p.id);
        backend.insert_secret(s.clone());
        s.platform = "GitHub".into();
        backend.replace_secret(s.clone());
        backend.replace_secret(s);

        let stored = backend.project(p.id).unwrap();
        assert_eq!(stored.platforms, vec!["AWS", "GitHub"]);
        assert_eq!(stored.name, "p");
    }
}
