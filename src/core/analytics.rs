//! Analytics business logic - Admin-only event log.

use crate::{
    core::access::{AnalyticsRule, Operation, Requester, RowRule, Subject, visible},
    entities::{AnalyticsEvent, analytics_event},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, QuerySelect, Set, prelude::*};
use tracing::{debug, instrument};

/// Default page size for [`list_events`].
pub const DEFAULT_EVENT_LIMIT: u64 = 100;

/// Records an analytics event.
///
/// Returns `Ok(None)` unless the requester is an admin.
///
/// # Errors
/// Returns an error if the event type is empty or the insert fails.
#[instrument(skip(db, payload))]
pub async fn record_event(
    db: &DatabaseConnection,
    requester: &Requester,
    user_id: Option<Uuid>,
    event_type: &str,
    payload: Json,
) -> Result<Option<analytics_event::Model>> {
    let event_type = event_type.trim();
    if event_type.is_empty() {
        return Err(Error::validation("Event type cannot be empty"));
    }

    let subject = Subject::resolve(db, requester).await?;
    let candidate = analytics_event::Model {
        id: 0,
        user_id,
        event_type: event_type.to_string(),
        payload,
        created_at: chrono::Utc::now(),
    };
    if !AnalyticsRule::check(&subject, Operation::Insert, &candidate).is_allowed() {
        debug!("Analytics insert denied");
        return Ok(None);
    }

    let event = analytics_event::ActiveModel {
        user_id: Set(candidate.user_id),
        event_type: Set(candidate.event_type),
        payload: Set(candidate.payload),
        created_at: Set(candidate.created_at),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(Some(event))
}

/// Lists recent events, newest first, optionally narrowed to one event type.
///
/// Non-admins get an empty list.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn list_events(
    db: &DatabaseConnection,
    requester: &Requester,
    event_type: Option<&str>,
    limit: u64,
) -> Result<Vec<analytics_event::Model>> {
    let subject = Subject::resolve(db, requester).await?;
    if !subject.is_admin() {
        return Ok(Vec::new());
    }

    let mut query = AnalyticsEvent::find();
    if let Some(kind) = event_type {
        query = query.filter(analytics_event::Column::EventType.eq(kind));
    }
    let rows = query
        .order_by_desc(analytics_event::Column::CreatedAt)
        .order_by_desc(analytics_event::Column::Id)
        .limit(limit)
        .all(db)
        .await?;
    Ok(visible::<AnalyticsRule>(&subject, rows))
}
