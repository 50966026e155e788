//! Envelope decoding for identity-provider lifecycle events.
//!
//! The delivery channel pushes raw `{ kind, data }` envelopes with
//! at-least-once, possibly out-of-order semantics. Decoding is pure: it
//! either produces one of the closed [`ProviderEvent`] variants, reports the
//! kind as unrecognized, or fails on a payload that is missing a required
//! field and can never become valid.

use serde::Deserialize;
use serde_json::Value as JsonValue;
use thiserror::Error;

#[derive(Debug, Clone, Deserialize)]
pub struct EventEnvelope {
    pub kind: String,
    #[serde(default)]
    pub data: JsonValue,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("malformed {kind} event: missing required field `{field}`")]
    MissingField { kind: String, field: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserPayload {
    pub id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganizationPayload {
    pub id: String,
    pub name: Option<String>,
    pub slug: Option<String>,
    pub created_by: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipPayload {
    pub user_id: String,
    pub organization_id: String,
    pub role_name: String,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    UserCreated(UserPayload),
    UserUpdated(UserPayload),
    UserDeleted { id: String },
    OrganizationCreated(OrganizationPayload),
    OrganizationUpdated(OrganizationPayload),
    OrganizationDeleted { id: String },
    MembershipAccepted(MembershipPayload),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    Event(ProviderEvent),
    /// Well-formed envelope with a kind this engine does not handle.
    /// Acknowledged upstream as a no-op, never an error.
    Unknown,
}

pub fn decode(envelope: &EventEnvelope) -> Result<Decoded, DecodeError> {
    let kind = envelope.kind.as_str();
    let data = &envelope.data;

    let event = match kind {
        "clerk/user.created" => ProviderEvent::UserCreated(user_payload(kind, data)?),
        "clerk/user.updated" => ProviderEvent::UserUpdated(user_payload(kind, data)?),
        "clerk/user.deleted" => ProviderEvent::UserDeleted {
            id: required_str(kind, data, "id")?,
        },
        "clerk/organization.created" => {
            let payload = organization_payload(kind, data)?;
            if payload.created_by.is_none() {
                // Without the creator there is nobody to seed as ADMIN.
                return Err(DecodeError::MissingField {
                    kind: kind.to_owned(),
                    field: "created_by",
                });
            }
            ProviderEvent::OrganizationCreated(payload)
        }
        "clerk/organization.updated" => {
            ProviderEvent::OrganizationUpdated(organization_payload(kind, data)?)
        }
        "clerk/organization.deleted" => ProviderEvent::OrganizationDeleted {
            id: required_str(kind, data, "id")?,
        },
        "clerk/organizationInvitation.accepted" => {
            ProviderEvent::MembershipAccepted(MembershipPayload {
                user_id: required_str(kind, data, "user_id")?,
                organization_id: required_str(kind, data, "organization_id")?,
                role_name: required_str(kind, data, "role_name")?,
                message: optional_str(data, "message"),
            })
        }
        _ => return Ok(Decoded::Unknown),
    };

    Ok(Decoded::Event(event))
}

fn user_payload(kind: &str, data: &JsonValue) -> Result<UserPayload, DecodeError> {
    Ok(UserPayload {
        id: required_str(kind, data, "id")?,
        email: primary_email(data),
        name: display_name(data),
        image_url: optional_str(data, "image_url"),
    })
}

fn organization_payload(kind: &str, data: &JsonValue) -> Result<OrganizationPayload, DecodeError> {
    Ok(OrganizationPayload {
        id: required_str(kind, data, "id")?,
        name: optional_str(data, "name"),
        slug: optional_str(data, "slug"),
        created_by: optional_str(data, "created_by"),
        image_url: optional_str(data, "image_url"),
    })
}

fn required_str(kind: &str, data: &JsonValue, field: &'static str) -> Result<String, DecodeError> {
    optional_str(data, field).ok_or_else(|| DecodeError::MissingField {
        kind: kind.to_owned(),
        field,
    })
}

fn optional_str(data: &JsonValue, field: &str) -> Option<String> {
    data.get(field)
        .and_then(JsonValue::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
}

/// First entry of the provider's `email_addresses` list, when present.
fn primary_email(data: &JsonValue) -> Option<String> {
    data.get("email_addresses")
        .and_then(JsonValue::as_array)
        .and_then(|addresses| addresses.first())
        .and_then(|entry| entry.get("email_address"))
        .and_then(JsonValue::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
}

/// Join `first_name` and `last_name` into a display name; empty when the
/// provider supplied neither.
fn display_name(data: &JsonValue) -> Option<String> {
    let first = optional_str(data, "first_name");
    let last = optional_str(data, "last_name");

    match (first, last) {
        (Some(first), Some(last)) => Some(format!("{first} {last}")),
        (Some(single), None) | (None, Some(single)) => Some(single),
        (None, None) => None,
    }
}
