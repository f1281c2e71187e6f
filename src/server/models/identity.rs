use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "identity_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum IdentityKind {
    Guest,
    User,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "identity_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Member,
    Owner,
    Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Identity {
    pub id: Uuid,
    pub kind: IdentityKind,
    pub role: Role,
    pub display_name: String,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Identity {
    /// Staff read the shared support inbox; everyone else reads their own.
    pub fn is_staff(&self) -> bool {
        matches!(self.role, Role::Owner | Role::Admin)
    }
}

/// Parameters for inserting an identity. `id` is normally generated; fixed
/// ids exist for the configured owner and the legacy support alias.
#[derive(Debug, Clone)]
pub struct NewIdentity {
    pub id: Option<Uuid>,
    pub kind: IdentityKind,
    pub role: Role,
    pub display_name: String,
    pub email: Option<String>,
}

impl NewIdentity {
    pub fn guest(display_name: &str) -> Self {
        Self {
            id: None,
            kind: IdentityKind::Guest,
            role: Role::Member,
            display_name: display_name.to_string(),
            email: None,
        }
    }

    pub fn user(display_name: &str, email: Option<&str>) -> Self {
        Self {
            id: None,
            kind: IdentityKind::User,
            role: Role::Member,
            display_name: display_name.to_string(),
            email: email.map(str::to_string),
        }
    }
}

/// The pseudo-user record behind a guest bearer token. Once `merged_into`
/// is set the row is a tombstone: the token no longer resolves.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct GuestIdentity {
    pub identity_id: Uuid,
    pub token: String,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
    pub merged_into: Option<Uuid>,
}
