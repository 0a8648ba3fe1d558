//! Product entity - Items sold in the shop.
//!
//! Products are readable by anyone and mutable only by admins. Besides the primary
//! image each product carries up to three additional image URLs.

use sea_orm::FromJsonQueryResult;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Maximum number of additional images per product.
pub const MAX_EXTRA_IMAGES: usize = 3;

/// Additional image URLs stored as JSON.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct ImageList(pub Vec<String>);

/// Product database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    /// Unique identifier for the product
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Name of the product (e.g., "Starter Quadcopter Kit")
    pub name: String,
    /// Shop description
    pub description: String,
    /// Public URL of the primary image
    pub image_url: Option<String>,
    /// Public URLs of additional images, at most [`MAX_EXTRA_IMAGES`]
    #[sea_orm(column_type = "Json")]
    pub extra_images: ImageList,
    /// Unit price in dollars
    pub price: f64,
    /// Units in stock
    pub stock: i32,
    /// Free-form delivery estimate (e.g., "3-5 business days")
    pub delivery_estimate: Option<String>,
    /// Shown on the landing page when true
    pub featured: bool,
    /// When the product was created
    pub created_at: DateTimeUtc,
    /// When the product was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Product and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One product appears on many order lines
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItems,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
