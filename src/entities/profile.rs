//! Profile entity - One row per authenticated principal.
//!
//! The id is the identity issued by the managed identity provider; this table only
//! carries the display data and the role flag every access rule depends on.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Role flag stored on a profile.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full access to every table
    #[sea_orm(string_value = "admin")]
    Admin,
    /// Regular shop and curriculum user
    #[default]
    #[sea_orm(string_value = "customer")]
    Customer,
}

/// Profile database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "profiles")]
pub struct Model {
    /// Principal id issued by the identity provider
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Name shown in the dashboard and on orders
    pub display_name: String,
    /// Contact email, used by the admin bootstrap to find an existing row
    #[sea_orm(unique)]
    pub email: Option<String>,
    /// Access role; defaults to customer
    pub role: Role,
    /// When the profile was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Profile and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One profile owns many orders
    #[sea_orm(has_many = "super::order::Entity")]
    Orders,
    /// One profile is the subject of many analytics events
    #[sea_orm(has_many = "super::analytics_event::Entity")]
    AnalyticsEvents,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orders.def()
    }
}

impl Related<super::analytics_event::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AnalyticsEvents.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
