//! Profile business logic - Principal records and their roles.
//!
//! Customers can see and edit only their own profile and can never grant
//! themselves the admin role. Admins can do anything, including deleting a
//! principal; deletion keeps that principal's orders and analytics events and only
//! clears their owner reference.

use crate::{
    core::access::{Operation, ProfileRule, Requester, RowRule, Subject, visible},
    entities::{AnalyticsEvent, Order, Profile, Role, analytics_event, order, profile},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use serde::Deserialize;
use tracing::{debug, info, instrument};

/// Fields for a new profile.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProfile {
    /// Principal id issued by the identity provider
    pub id: Uuid,
    /// Display name
    pub display_name: String,
    /// Optional contact email
    #[serde(default)]
    pub email: Option<String>,
    /// Requested role; defaults to customer
    #[serde(default)]
    pub role: Role,
}

/// Partial update of a profile. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileChanges {
    /// New display name
    pub display_name: Option<String>,
    /// New role
    pub role: Option<Role>,
}

fn validate_display_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::validation("Display name cannot be empty"));
    }
    Ok(())
}

/// Fetches one profile if the requester may see it.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn get_profile(
    db: &DatabaseConnection,
    requester: &Requester,
    id: Uuid,
) -> Result<Option<profile::Model>> {
    let subject = Subject::resolve(db, requester).await?;
    let found = Profile::find_by_id(id).one(db).await?;
    Ok(found.filter(|row| ProfileRule::check(&subject, Operation::Select, row).is_allowed()))
}

/// Lists every profile the requester may see, ordered by display name.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn list_profiles(
    db: &DatabaseConnection,
    requester: &Requester,
) -> Result<Vec<profile::Model>> {
    let subject = Subject::resolve(db, requester).await?;
    let rows = Profile::find()
        .order_by_asc(profile::Column::DisplayName)
        .all(db)
        .await?;
    Ok(visible::<ProfileRule>(&subject, rows))
}

/// Creates a profile.
///
/// Customers may only create their own row and only with the customer role.
///
/// # Errors
/// Returns an error if the display name is empty or the insert fails.
#[instrument(skip(db, new), fields(id = %new.id))]
pub async fn create_profile(
    db: &DatabaseConnection,
    requester: &Requester,
    new: NewProfile,
) -> Result<Option<profile::Model>> {
    validate_display_name(&new.display_name)?;

    let subject = Subject::resolve(db, requester).await?;
    let candidate = profile::Model {
        id: new.id,
        display_name: new.display_name.trim().to_string(),
        email: new.email.map(|e| e.trim().to_lowercase()),
        role: new.role,
        created_at: chrono::Utc::now(),
    };
    if !ProfileRule::check(&subject, Operation::Insert, &candidate).is_allowed()
        || !ProfileRule::check_proposed(&subject, Operation::Insert, &candidate).is_allowed()
    {
        debug!("Profile insert denied");
        return Ok(None);
    }

    let active: profile::ActiveModel = candidate.into();
    Ok(Some(active.insert(db).await?))
}

/// Applies `changes` to a profile.
///
/// The stored row must be updatable by the requester and the resulting row must
/// pass the rule as well, which is what stops a customer from promoting themself.
///
/// # Errors
/// Returns an error if the new display name is empty or the update fails.
#[instrument(skip(db, changes))]
pub async fn update_profile(
    db: &DatabaseConnection,
    requester: &Requester,
    id: Uuid,
    changes: ProfileChanges,
) -> Result<Option<profile::Model>> {
    if let Some(name) = &changes.display_name {
        validate_display_name(name)?;
    }

    let subject = Subject::resolve(db, requester).await?;
    let Some(current) = Profile::find_by_id(id).one(db).await? else {
        return Ok(None);
    };
    if !ProfileRule::check(&subject, Operation::Update, &current).is_allowed() {
        debug!("Profile update denied");
        return Ok(None);
    }

    let mut proposed = current.clone();
    if let Some(name) = changes.display_name {
        proposed.display_name = name.trim().to_string();
    }
    if let Some(role) = changes.role {
        proposed.role = role;
    }
    if !ProfileRule::check_proposed(&subject, Operation::Update, &proposed).is_allowed() {
        debug!("Profile update rejected for resulting row");
        return Ok(None);
    }

    let mut active: profile::ActiveModel = current.into();
    active.display_name = Set(proposed.display_name);
    active.role = Set(proposed.role);
    Ok(Some(active.update(db).await?))
}

/// Deletes a principal's profile, keeping their orders and events.
///
/// Orders and analytics events that referenced the principal have their owner set
/// to `NULL` in the same transaction.
///
/// # Errors
/// Returns an error if any statement of the transaction fails.
#[instrument(skip(db))]
pub async fn delete_principal(
    db: &DatabaseConnection,
    requester: &Requester,
    id: Uuid,
) -> Result<Option<profile::Model>> {
    let subject = Subject::resolve(db, requester).await?;
    let Some(current) = Profile::find_by_id(id).one(db).await? else {
        return Ok(None);
    };
    if !ProfileRule::check(&subject, Operation::Delete, &current).is_allowed() {
        debug!("Profile delete denied");
        return Ok(None);
    }

    let txn = db.begin().await?;
    let orphaned_orders = Order::update_many()
        .col_expr(order::Column::UserId, Expr::value(Option::<Uuid>::None))
        .filter(order::Column::UserId.eq(id))
        .exec(&txn)
        .await?;
    let orphaned_events = AnalyticsEvent::update_many()
        .col_expr(analytics_event::Column::UserId, Expr::value(Option::<Uuid>::None))
        .filter(analytics_event::Column::UserId.eq(id))
        .exec(&txn)
        .await?;
    Profile::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;

    info!(
        "Deleted profile {}; kept {} orders and {} events",
        id, orphaned_orders.rows_affected, orphaned_events.rows_affected
    );
    Ok(Some(current))
}
