//! Analytics event entity - Admin-only append log of arbitrary payloads.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Analytics event database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "analytics_events")]
pub struct Model {
    /// Unique identifier for the event
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Principal the event is about, None once the profile has been deleted
    pub user_id: Option<Uuid>,
    /// Event name (e.g., `"page_view"`, `"quiz_generated"`)
    pub event_type: String,
    /// Arbitrary JSON payload
    #[sea_orm(column_type = "Json")]
    pub payload: Json,
    /// When the event was recorded
    pub created_at: DateTimeUtc,
}

/// Defines relationships between `AnalyticsEvent` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each event references at most one profile
    #[sea_orm(
        belongs_to = "super::profile::Entity",
        from = "Column::UserId",
        to = "super::profile::Column::Id",
        on_delete = "SetNull"
    )]
    Profile,
}

impl Related<super::profile::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Profile.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
