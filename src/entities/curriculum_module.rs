//! Curriculum module entity - A grade/subject/module scoped learning unit.
//!
//! Modules carry an ordered list of asset references (videos, code snippets and
//! documents) stored as a JSON column. Only published modules are visible to
//! non-admin readers.

use sea_orm::FromJsonQueryResult;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Kind of learning asset attached to a module.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    /// Hosted or embedded video
    Video,
    /// Code snippet, literal or inline-encoded
    Code,
    /// Document in object storage
    Doc,
}

/// A single asset reference.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRef {
    /// What the location points at
    pub kind: AssetKind,
    /// URL, storage path or (for code) the snippet itself
    pub location: String,
    /// Caption shown next to the asset
    pub label: String,
}

impl AssetRef {
    /// Readable text of a code asset.
    ///
    /// Inline-encoded snippets are decoded; anything unreadable comes back as an
    /// empty string. Non-code assets return `None`.
    #[must_use]
    pub fn code_text(&self) -> Option<String> {
        (self.kind == AssetKind::Code).then(|| crate::core::snippet::decode(Some(&self.location)))
    }
}

/// Ordered asset list stored as JSON.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct AssetList(pub Vec<AssetRef>);

/// Curriculum module database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "curriculum_modules")]
pub struct Model {
    /// Unique identifier for the module
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Module title
    pub title: String,
    /// School grade the module targets
    pub grade: i32,
    /// Subject (e.g., "Aerodynamics", "Programming")
    pub subject: String,
    /// Module label within the subject (e.g., "Module 2")
    pub module: String,
    /// Long-form description
    pub description: String,
    /// Ordered asset references
    #[sea_orm(column_type = "Json")]
    pub assets: AssetList,
    /// Optional yearly subscription price in dollars
    pub yearly_price: Option<f64>,
    /// Visible to non-admin readers when true
    pub published: bool,
    /// When the module was created
    pub created_at: DateTimeUtc,
    /// When the module was last modified
    pub updated_at: DateTimeUtc,
}

/// `CurriculumModule` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
