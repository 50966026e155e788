//! Reconciliation of identity-provider lifecycle events into the local store.
//!
//! The delivery channel guarantees at-least-once delivery with no ordering
//! across events for the same entity, so every handler is an idempotent
//! single-statement upsert or delete-if-exists. The engine never reads then
//! writes for the same key, takes no locks, and performs no retries of its
//! own; a failed store write surfaces as a retryable error and the channel
//! redelivers the whole event.

use thiserror::Error;
use tracing::warn;

use crate::{
    db::Database,
    event::{self, Decoded, DecodeError, EventEnvelope, ProviderEvent},
    membership::{MemberRole, MembershipStore},
    user::{UserStore, synthetic_email},
    workspace::{DEFAULT_WORKSPACE_NAME, WorkspaceStore},
};

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Malformed(#[from] DecodeError),
    #[error("invalid member role `{role}`")]
    InvalidRole { role: String },
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl ReconcileError {
    /// Store failures are transient and safe to redeliver; malformed
    /// payloads and invalid roles will never become valid and must be
    /// discarded by the channel instead.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Processed,
    /// Unrecognized kind, acknowledged without any store mutation.
    Ignored,
}

#[derive(Clone)]
pub struct ReconcileEngine {
    users: UserStore,
    workspaces: WorkspaceStore,
    members: MembershipStore,
}

impl ReconcileEngine {
    pub fn new(database: &Database) -> Self {
        Self {
            users: UserStore::new(database),
            workspaces: WorkspaceStore::new(database),
            members: MembershipStore::new(database),
        }
    }

    /// Decode and apply one raw envelope. Unknown kinds are logged and
    /// acknowledged so the channel never gets stuck on a provider addition.
    pub async fn apply_envelope(&self, envelope: &EventEnvelope) -> Result<Applied, ReconcileError> {
        match event::decode(envelope)? {
            Decoded::Unknown => {
                warn!(kind = %envelope.kind, "ignoring unrecognized event kind");
                Ok(Applied::Ignored)
            }
            Decoded::Event(provider_event) => {
                self.apply(provider_event).await?;
                Ok(Applied::Processed)
            }
        }
    }

    /// Exhaustive dispatch over the closed event set.
    pub async fn apply(&self, provider_event: ProviderEvent) -> Result<(), ReconcileError> {
        match provider_event {
            ProviderEvent::UserCreated(payload) => {
                let email = payload
                    .email
                    .unwrap_or_else(|| synthetic_email(&payload.id));
                // First-writer-wins: a duplicate create delivered after a
                // newer update must not clobber refreshed fields.
                self.users
                    .insert_if_absent(
                        &payload.id,
                        &email,
                        payload.name.as_deref(),
                        payload.image_url.as_deref(),
                    )
                    .await?;
            }
            ProviderEvent::UserUpdated(payload) => {
                let email = payload
                    .email
                    .unwrap_or_else(|| synthetic_email(&payload.id));
                // Heal-on-update: creates the user when the create event has
                // not arrived yet.
                self.users
                    .upsert_refresh(
                        &payload.id,
                        &email,
                        payload.name.as_deref(),
                        payload.image_url.as_deref(),
                    )
                    .await?;
            }
            ProviderEvent::UserDeleted { id } => {
                self.users.delete_if_exists(&id).await?;
            }
            ProviderEvent::OrganizationCreated(payload) => {
                self.workspaces
                    .insert_if_absent(
                        &payload.id,
                        payload.name.as_deref().unwrap_or(DEFAULT_WORKSPACE_NAME),
                        payload.slug.as_deref(),
                        payload.created_by.as_deref(),
                        payload.image_url.as_deref(),
                    )
                    .await?;

                // The decoder guarantees created_by for organization.created.
                if let Some(owner_id) = payload.created_by.as_deref() {
                    self.users.ensure_placeholder(owner_id).await?;
                    self.members
                        .upsert(&payload.id, owner_id, MemberRole::Admin, None)
                        .await?;
                }
            }
            ProviderEvent::OrganizationUpdated(payload) => {
                self.workspaces
                    .upsert_refresh(
                        &payload.id,
                        payload.name.as_deref(),
                        payload.slug.as_deref(),
                        payload.created_by.as_deref(),
                        payload.image_url.as_deref(),
                    )
                    .await?;
            }
            ProviderEvent::OrganizationDeleted { id } => {
                self.workspaces.delete_if_exists(&id).await?;
            }
            ProviderEvent::MembershipAccepted(payload) => {
                let role = MemberRole::parse(&payload.role_name).ok_or_else(|| {
                    ReconcileError::InvalidRole {
                        role: payload.role_name.clone(),
                    }
                })?;

                // Placeholder rows keep the membership's foreign keys valid
                // when the invitation outruns the user or organization event.
                self.users.ensure_placeholder(&payload.user_id).await?;
                self.workspaces
                    .ensure_placeholder(&payload.organization_id)
                    .await?;
                self.members
                    .upsert(
                        &payload.organization_id,
                        &payload.user_id,
                        role,
                        payload.message.as_deref(),
                    )
                    .await?;
            }
        }

        Ok(())
    }
}
