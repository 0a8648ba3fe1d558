//! Shared test utilities for the drone academy backend.
//!
//! This module provides helpers for setting up in-memory databases, seeding
//! principals with a given role and creating catalog rows with sensible defaults.

use crate::{
    core::{
        Requester,
        curriculum::{self, ModuleInput},
        order::{self, OrderLine, OrderWithItems},
        product::{self, ProductInput},
    },
    entities::{Role, curriculum_module, product as product_entity, profile},
    errors::{Error, Result},
};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use uuid::Uuid;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Inserts a profile directly, bypassing the row rules.
async fn insert_profile(
    db: &DatabaseConnection,
    display_name: &str,
    role: Role,
) -> Result<profile::Model> {
    profile::ActiveModel {
        id: Set(Uuid::new_v4()),
        display_name: Set(display_name.to_string()),
        email: Set(None),
        role: Set(role),
        created_at: Set(chrono::Utc::now()),
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Seeds an administrator profile.
pub async fn create_admin(db: &DatabaseConnection, display_name: &str) -> Result<profile::Model> {
    insert_profile(db, display_name, Role::Admin).await
}

/// Seeds a customer profile.
pub async fn create_customer(
    db: &DatabaseConnection,
    display_name: &str,
) -> Result<profile::Model> {
    insert_profile(db, display_name, Role::Customer).await
}

/// A database seeded with one admin and two unrelated customers.
pub struct TestWorld {
    /// Connection to the in-memory database
    pub db: DatabaseConnection,
    /// Administrator profile
    pub admin: profile::Model,
    /// Customer used as the "owner" in most tests
    pub customer: profile::Model,
    /// Customer that owns nothing
    pub other: profile::Model,
}

impl TestWorld {
    /// Requester for the admin.
    pub const fn admin_requester(&self) -> Requester {
        Requester::Principal(self.admin.id)
    }

    /// Requester for the owning customer.
    pub const fn customer_requester(&self) -> Requester {
        Requester::Principal(self.customer.id)
    }

    /// Requester for the unrelated customer.
    pub const fn other_requester(&self) -> Requester {
        Requester::Principal(self.other.id)
    }
}

/// Builds a [`TestWorld`].
pub async fn setup_world() -> Result<TestWorld> {
    let db = setup_test_db().await?;
    let admin = create_admin(&db, "Root").await?;
    let customer = create_customer(&db, "Maya").await?;
    let other = create_customer(&db, "Theo").await?;
    Ok(TestWorld {
        db,
        admin,
        customer,
        other,
    })
}

/// Product input with sensible defaults.
///
/// # Defaults
/// * stock: 5
/// * no images, not featured
pub fn sample_product_input(name: &str, price: f64) -> ProductInput {
    ProductInput {
        name: name.to_string(),
        description: format!("{name} for the classroom"),
        image_url: None,
        extra_images: Vec::new(),
        price,
        stock: 5,
        delivery_estimate: Some("3-5 days".to_string()),
        featured: false,
    }
}

/// Creates a product as `requester`, failing if the write was denied.
pub async fn create_test_product(
    db: &DatabaseConnection,
    requester: &Requester,
    name: &str,
    price: f64,
) -> Result<product_entity::Model> {
    product::create_product(db, requester, sample_product_input(name, price))
        .await?
        .ok_or_else(|| Error::validation("product insert denied"))
}

/// Places a one-line order for `world.customer`.
///
/// # Defaults
/// * product: "Trainer Quad" at 120.0, created by the admin
/// * quantity: 1
pub async fn place_test_order(world: &TestWorld) -> Result<OrderWithItems> {
    let product =
        create_test_product(&world.db, &world.admin_requester(), "Trainer Quad", 120.0).await?;
    order::place_order(
        &world.db,
        &world.customer_requester(),
        &[OrderLine {
            product_id: product.id,
            quantity: 1,
        }],
    )
    .await?
    .ok_or_else(|| Error::validation("order insert denied"))
}

/// Module input with sensible defaults.
///
/// # Defaults
/// * grade: 7
/// * subject: "Aerodynamics"
/// * module: "Module 1"
/// * no assets, no price
pub fn sample_module_input(title: &str, published: bool) -> ModuleInput {
    ModuleInput {
        title: title.to_string(),
        grade: 7,
        subject: "Aerodynamics".to_string(),
        module: "Module 1".to_string(),
        description: String::new(),
        assets: Vec::new(),
        yearly_price: None,
        published,
    }
}

/// Creates a curriculum module as `requester`, failing if the write was denied.
pub async fn create_test_module(
    db: &DatabaseConnection,
    requester: &Requester,
    title: &str,
    published: bool,
) -> Result<curriculum_module::Model> {
    curriculum::create_module(db, requester, sample_module_input(title, published))
        .await?
        .ok_or_else(|| Error::validation("module insert denied"))
}
