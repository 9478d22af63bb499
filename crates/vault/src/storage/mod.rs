//! Project and secret storage with encryption at rest.
//!
//! [`SecretStore`] is the only caller of the field codec. Every write of
//! secret values goes through [`FieldCodec::encrypt_fields`] before the
//! backend sees it, and every read goes through
//! [`FieldCodec::decrypt_fields`] before the caller sees it.
//!
//! # Invariants
//!
//! - The backend never receives plaintext values.
//! - Encryption failure leaves the backend untouched: nothing is written for
//!   a secret whose values did not all encrypt.
//! - A secret with one undecryptable field is unreadable as a whole.
//! - Records owned by someone else are reported as not found.

pub mod memory;
pub mod model;

pub use memory::{InMemoryBackend, SecretBackend};
pub use model::{DecryptedSecret, Project, ProjectEdit, ProjectWithSecrets, SecretRecord};

use std::{cmp::Reverse, sync::Arc};

use chrono::Utc;
use common::protocol::{
    CreateProjectRequest, CreateSecretRequest, UpdateProjectRequest, UpdateSecretRequest,
};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::crypto::{CodecError, FieldCodec, FieldValues};

/// Errors produced by the storage layer.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The project does not exist or belongs to another owner.
    #[error("project not found")]
    ProjectNotFound,

    /// The secret does not exist or belongs to another owner.
    #[error("secret not found")]
    SecretNotFound,

    /// The input failed validation.
    #[error("{0}")]
    Validation(String),

    /// The field codec failed.
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Owner-scoped project and secret operations.
#[derive(Clone)]
pub struct SecretStore {
    backend: Arc<dyn SecretBackend>,
    codec: FieldCodec,
}

impl SecretStore {
    pub fn new(backend: Arc<dyn SecretBackend>, codec: FieldCodec) -> Self {
        Self { backend, codec }
    }

    /// Store backed by a fresh [`InMemoryBackend`].
    pub fn in_memory(codec: FieldCodec) -> Self {
        Self::new(Arc::new(InMemoryBackend::new()), codec)
    }

    /// The codec this store encrypts with.
    pub fn codec(&self) -> &FieldCodec {
        &self.codec
    }

    // -----------------------------------------------------------------------
    // Projects
    // -----------------------------------------------------------------------

    pub fn create_project(
        &self,
        req: CreateProjectRequest,
        owner_id: &str,
    ) -> Result<Project, StorageError> {
        let name = required(&req.name, "project name")?;
        let now = Utc::now();
        let project = Project {
            id: Uuid::new_v4(),
            name,
            description: normalise_description(req.description),
            owner_id: owner_id.to_owned(),
            platforms: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        self.backend.insert_project(project.clone());
        info!(project_id = %project.id, "project created");
        Ok(project)
    }

    /// All projects of `owner_id` with their secrets, most recently updated first.
    pub fn list_projects(&self, owner_id: &str) -> Vec<ProjectWithSecrets> {
        let mut projects = self.backend.projects_for_owner(owner_id);
        projects.sort_by_key(|p| Reverse(p.updated_at));
        projects
            .into_iter()
            .map(|project| ProjectWithSecrets {
                secrets: self.backend.secrets_in_project(project.id),
                project,
            })
            .collect()
    }

    pub fn get_project(
        &self,
        id: Uuid,
        owner_id: &str,
    ) -> Result<ProjectWithSecrets, StorageError> {
        let project = self.owned_project(id, owner_id)?;
        Ok(ProjectWithSecrets {
            secrets: self.backend.secrets_in_project(project.id),
            project,
        })
    }

    pub fn update_project(
        &self,
        id: Uuid,
        req: UpdateProjectRequest,
        owner_id: &str,
    ) -> Result<ProjectWithSecrets, StorageError> {
        self.owned_project(id, owner_id)?;
        let edit = ProjectEdit {
            name: req
                .name
                .map(|name| required(&name, "project name"))
                .transpose()?,
            description: req.description.map(|d| normalise_description(Some(d))),
            updated_at: Utc::now(),
        };
        let project = self
            .backend
            .edit_project(id, edit)
            .ok_or(StorageError::ProjectNotFound)?;
        Ok(ProjectWithSecrets {
            secrets: self.backend.secrets_in_project(project.id),
            project,
        })
    }

    /// Delete a project and all of its secrets.
    pub fn delete_project(&self, id: Uuid, owner_id: &str) -> Result<(), StorageError> {
        self.owned_project(id, owner_id)?;
        if !self.backend.remove_project(id) {
            return Err(StorageError::ProjectNotFound);
        }
        info!(project_id = %id, "project deleted");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Secrets
    // -----------------------------------------------------------------------

    /// Encrypt and store a new secret in one of the owner's projects.
    ///
    /// # Errors
    ///
    /// [`StorageError::Validation`] for empty names or values,
    /// [`StorageError::ProjectNotFound`] if the project is not the owner's,
    /// [`StorageError::Codec`] if the values cannot be encrypted. On any
    /// error nothing is stored.
    pub fn create_secret(
        &self,
        req: CreateSecretRequest,
        owner_id: &str,
    ) -> Result<SecretRecord, StorageError> {
        let name = required(&req.name, "secret name")?;
        let kind = required(&req.kind, "secret type")?;
        let platform = required(&req.platform, "platform")?;
        validate_values(&req.values)?;

        let project = self.owned_project(req.project_id, owner_id)?;
        let encrypted_values = self.codec.encrypt_fields(&req.values)?;

        let now = Utc::now();
        let secret = SecretRecord {
            id: Uuid::new_v4(),
            name,
            kind,
            platform,
            encrypted_values,
            project_id: project.id,
            created_at: now,
            updated_at: now,
        };
        if !self.backend.insert_secret(secret.clone()) {
            return Err(StorageError::ProjectNotFound);
        }

        info!(
            secret_id = %secret.id,
            project_id = %secret.project_id,
            fields = secret.encrypted_values.len(),
            "secret created"
        );
        Ok(secret)
    }

    /// Fetch a secret with all of its values decrypted.
    ///
    /// # Errors
    ///
    /// [`StorageError::SecretNotFound`] if absent or not the owner's;
    /// [`StorageError::Codec`] if any stored value cannot be decrypted.
    pub fn get_secret(&self, id: Uuid, owner_id: &str) -> Result<DecryptedSecret, StorageError> {
        let record = self.owned_secret(id, owner_id)?;
        let values = self
            .codec
            .decrypt_fields(&record.encrypted_values)
            .inspect_err(|e| warn!(secret_id = %id, error = %e, "failed to decrypt secret"))?;
        Ok(DecryptedSecret { record, values })
    }

    /// Apply a partial update. A new `values` mapping replaces the stored one
    /// entirely and is encrypted before anything is written.
    pub fn update_secret(
        &self,
        id: Uuid,
        req: UpdateSecretRequest,
        owner_id: &str,
    ) -> Result<SecretRecord, StorageError> {
        let mut record = self.owned_secret(id, owner_id)?;

        if let Some(name) = req.name {
            record.name = required(&name, "secret name")?;
        }
        if let Some(kind) = req.kind {
            record.kind = required(&kind, "secret type")?;
        }
        if let Some(platform) = req.platform {
            record.platform = required(&platform, "platform")?;
        }
        if let Some(values) = req.values {
            validate_values(&values)?;
            record.encrypted_values = self.codec.encrypt_fields(&values)?;
        }
        record.updated_at = Utc::now();

        if !self.backend.replace_secret(record.clone()) {
            return Err(StorageError::SecretNotFound);
        }

        info!(secret_id = %id, "secret updated");
        Ok(record)
    }

    pub fn delete_secret(&self, id: Uuid, owner_id: &str) -> Result<(), StorageError> {
        self.owned_secret(id, owner_id)?;
        if !self.backend.remove_secret(id) {
            return Err(StorageError::SecretNotFound);
        }
        info!(secret_id = %id, "secret deleted");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Ownership
    // -----------------------------------------------------------------------

    fn owned_project(&self, id: Uuid, owner_id: &str) -> Result<Project, StorageError> {
        self.backend
            .project(id)
            .filter(|p| p.owner_id == owner_id)
            .ok_or(StorageError::ProjectNotFound)
    }

    fn owned_secret(&self, id: Uuid, owner_id: &str) -> Result<SecretRecord, StorageError> {
        let secret = self.backend.secret(id).ok_or(StorageError::SecretNotFound)?;
        self.owned_project(secret.project_id, owner_id)
            .map_err(|_| StorageError::SecretNotFound)?;
        Ok(secret)
    }
}

fn required(value: &str, what: &str) -> Result<String, StorageError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(StorageError::Validation(format!("{what} is required")));
    }
    Ok(trimmed.to_owned())
}

fn normalise_description(description: Option<String>) -> Option<String> {
    description
        .map(|d| d.trim().to_owned())
        .filter(|d| !d.is_empty())
}

fn validate_values(values: &FieldValues) -> Result<(), StorageError> {
    if values.is_empty() {
        return Err(StorageError::Validation(
            "at least one key-value pair is required".into(),
        ));
    }
    if values.keys().any(|k| k.trim().is_empty()) {
        return Err(StorageError::Validation("field names must not be empty".into()));
    }
    if values.values().any(String::is_empty) {
        return Err(StorageError::Validation("secret value is required".into()));
    }
    Ok(())
}
