//! Administrator bootstrap.
//!
//! Ensures one administrator profile exists so a fresh deployment can be managed
//! from the dashboard. Credentials belong to the managed identity provider; this only
//! makes sure the profile row with the admin role is there. Running it repeatedly is
//! harmless.
//!
//! Reads `BOOTSTRAP_ADMIN_EMAIL`, `BOOTSTRAP_ADMIN_NAME` and optionally
//! `BOOTSTRAP_ADMIN_ID` (the identity provider's id for that account).

use crate::{
    entities::{Profile, Role, profile},
    errors::{Error, Result},
};
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};
use tracing::{info, instrument};
use uuid::Uuid;

/// Administrator identity to ensure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapAdmin {
    /// Identity-provider id; derived from the email when not configured
    pub id: Uuid,
    /// Login email
    pub email: String,
    /// Display name for the profile
    pub display_name: String,
}

impl BootstrapAdmin {
    /// Builds the identity, deriving a stable id from the email if none is given.
    ///
    /// # Errors
    /// Returns [`Error::Config`] if the email is empty or has no `@`.
    pub fn new(id: Option<Uuid>, email: &str, display_name: &str) -> Result<Self> {
        let email = email.trim().to_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(Error::Config {
                message: format!("Invalid bootstrap admin email: '{email}'"),
            });
        }
        let display_name = match display_name.trim() {
            "" => "Administrator".to_string(),
            name => name.to_string(),
        };
        let id = id.unwrap_or_else(|| derive_id(&email));
        Ok(Self {
            id,
            email,
            display_name,
        })
    }

    /// Reads the bootstrap identity from the environment.
    ///
    /// Returns `Ok(None)` when `BOOTSTRAP_ADMIN_EMAIL` is not set.
    ///
    /// # Errors
    /// Returns [`Error::Config`] if `BOOTSTRAP_ADMIN_ID` is not a UUID or the email is invalid.
    pub fn from_env() -> Result<Option<Self>> {
        let Ok(email) = std::env::var("BOOTSTRAP_ADMIN_EMAIL") else {
            return Ok(None);
        };
        let display_name = std::env::var("BOOTSTRAP_ADMIN_NAME").unwrap_or_default();
        let id = match std::env::var("BOOTSTRAP_ADMIN_ID") {
            Ok(raw) => Some(Uuid::parse_str(raw.trim()).map_err(|e| Error::Config {
                message: format!("BOOTSTRAP_ADMIN_ID is not a UUID: {e}"),
            })?),
            Err(_) => None,
        };
        Self::new(id, &email, &display_name).map(Some)
    }
}

/// Stable id for an email address.
#[must_use]
pub fn derive_id(email: &str) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_URL, format!("mailto:{email}").as_bytes())
}

/// Creates the administrator profile, or promotes the existing one.
///
/// Trusted system path, not subject to the profile rule. Apart from an existing
/// admin this is the only writer that may set the admin role.
///
/// # Errors
/// Returns an error if the lookup or the write fails.
#[instrument(skip(db), fields(email = %admin.email))]
pub async fn ensure_admin<C: ConnectionTrait>(
    db: &C,
    admin: &BootstrapAdmin,
) -> Result<profile::Model> {
    let existing = match Profile::find_by_id(admin.id).one(db).await? {
        Some(found) => Some(found),
        None => {
            Profile::find()
                .filter(profile::Column::Email.eq(admin.email.as_str()))
                .one(db)
                .await?
        }
    };

    if let Some(found) = existing {
        if found.role == Role::Admin {
            info!("Administrator profile already present.");
            return Ok(found);
        }
        info!("Promoting existing profile {} to admin.", found.id);
        let mut active: profile::ActiveModel = found.into();
        active.role = Set(Role::Admin);
        return active.update(db).await.map_err(Into::into);
    }

    info!("Creating administrator profile {}.", admin.id);
    profile::ActiveModel {
        id: Set(admin.id),
        display_name: Set(admin.display_name.clone()),
        email: Set(Some(admin.email.clone())),
        role: Set(Role::Admin),
        created_at: Set(chrono::Utc::now()),
    }
    .insert(db)
    .await
    .map_err(Into::into)
}
