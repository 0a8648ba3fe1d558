//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod analytics_event;
pub mod curriculum_module;
pub mod order;
pub mod order_item;
pub mod product;
pub mod profile;

// Re-export specific types to avoid conflicts
pub use analytics_event::{
    Column as AnalyticsEventColumn, Entity as AnalyticsEvent, Model as AnalyticsEventModel,
};
pub use curriculum_module::{
    AssetKind, AssetList, AssetRef, Column as CurriculumModuleColumn,
    Entity as CurriculumModule, Model as CurriculumModuleModel,
};
pub use order::{Column as OrderColumn, Entity as Order, Model as OrderModel, OrderStatus};
pub use order_item::{Column as OrderItemColumn, Entity as OrderItem, Model as OrderItemModel};
pub use product::{Column as ProductColumn, Entity as Product, ImageList, Model as ProductModel};
pub use profile::{Column as ProfileColumn, Entity as Profile, Model as ProfileModel, Role};
