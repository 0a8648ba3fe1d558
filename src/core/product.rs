//! Product business logic - Handles all shop product operations.
//!
//! Products are readable by every caller, signed in or not. Creating, editing and
//! deleting them is reserved for admins. All functions are async and return Result
//! types; a denied write comes back as `Ok(None)`.

use crate::{
    core::access::{Operation, ProductRule, Requester, RowRule, Subject, visible},
    entities::{ImageList, Product, product, product::MAX_EXTRA_IMAGES},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};
use serde::Deserialize;
use tracing::{debug, instrument};

/// Editable fields of a product.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductInput {
    /// Product name
    pub name: String,
    /// Shop description
    #[serde(default)]
    pub description: String,
    /// Public URL of the primary image
    #[serde(default)]
    pub image_url: Option<String>,
    /// Public URLs of additional images
    #[serde(default)]
    pub extra_images: Vec<String>,
    /// Unit price in dollars
    pub price: f64,
    /// Units in stock
    #[serde(default)]
    pub stock: i32,
    /// Free-form delivery estimate
    #[serde(default)]
    pub delivery_estimate: Option<String>,
    /// Shown on the landing page when true
    #[serde(default)]
    pub featured: bool,
}

/// Validates product input.
///
/// # Errors
/// Returns an error if:
/// - The product name is empty or whitespace-only
/// - The price is negative or not finite (NaN, infinity)
/// - The stock count is negative
/// - More than three additional images are given
fn validate(input: &ProductInput) -> Result<()> {
    if input.name.trim().is_empty() {
        return Err(Error::validation("Product name cannot be empty"));
    }

    if input.price < 0.0 || !input.price.is_finite() {
        return Err(Error::InvalidAmount {
            amount: input.price,
        });
    }

    if input.stock < 0 {
        return Err(Error::validation(format!(
            "Stock cannot be negative: {}",
            input.stock
        )));
    }

    if input.extra_images.len() > MAX_EXTRA_IMAGES {
        return Err(Error::validation(format!(
            "At most {MAX_EXTRA_IMAGES} additional images are allowed, got {}",
            input.extra_images.len()
        )));
    }
    Ok(())
}

fn clean_url(url: Option<String>) -> Option<String> {
    url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty())
}

/// Retrieves every product, featured ones first, then alphabetically by name.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn list_products(
    db: &DatabaseConnection,
    requester: &Requester,
) -> Result<Vec<product::Model>> {
    let subject = Subject::resolve(db, requester).await?;
    let rows = Product::find()
        .order_by_desc(product::Column::Featured)
        .order_by_asc(product::Column::Name)
        .all(db)
        .await?;
    Ok(visible::<ProductRule>(&subject, rows))
}

/// Retrieves featured products, alphabetically by name.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn list_featured_products(
    db: &DatabaseConnection,
    requester: &Requester,
) -> Result<Vec<product::Model>> {
    let subject = Subject::resolve(db, requester).await?;
    let rows = Product::find()
        .filter(product::Column::Featured.eq(true))
        .order_by_asc(product::Column::Name)
        .all(db)
        .await?;
    Ok(visible::<ProductRule>(&subject, rows))
}

/// Retrieves a specific product by its unique ID.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn get_product(
    db: &DatabaseConnection,
    requester: &Requester,
    product_id: i64,
) -> Result<Option<product::Model>> {
    let subject = Subject::resolve(db, requester).await?;
    let found = Product::find_by_id(product_id).one(db).await?;
    Ok(found.filter(|row| ProductRule::check(&subject, Operation::Select, row).is_allowed()))
}

/// Creates a new product (admin only).
///
/// # Errors
/// Returns an error if the input is invalid or the insert fails.
#[instrument(skip(db, input), fields(name = %input.name))]
pub async fn create_product(
    db: &DatabaseConnection,
    requester: &Requester,
    input: ProductInput,
) -> Result<Option<product::Model>> {
    validate(&input)?;

    let subject = Subject::resolve(db, requester).await?;
    let now = chrono::Utc::now();
    let candidate = product::Model {
        id: 0,
        name: input.name.trim().to_string(),
        description: input.description,
        image_url: clean_url(input.image_url),
        extra_images: ImageList(input.extra_images),
        price: input.price,
        stock: input.stock,
        delivery_estimate: input.delivery_estimate,
        featured: input.featured,
        created_at: now,
        updated_at: now,
    };
    if !ProductRule::check(&subject, Operation::Insert, &candidate).is_allowed() {
        debug!("Product insert denied");
        return Ok(None);
    }

    let product = product::ActiveModel {
        name: Set(candidate.name),
        description: Set(candidate.description),
        image_url: Set(candidate.image_url),
        extra_images: Set(candidate.extra_images),
        price: Set(candidate.price),
        stock: Set(candidate.stock),
        delivery_estimate: Set(candidate.delivery_estimate),
        featured: Set(candidate.featured),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    Ok(Some(product.insert(db).await?))
}

/// Replaces every editable field of a product (admin only).
///
/// Concurrent edits are not detected; the last write wins.
///
/// # Errors
/// Returns an error if:
/// - The name is empty or whitespace-only
/// - The price is negative or not finite
/// - The update fails
#[instrument(skip(db, input))]
pub async fn update_product(
    db: &DatabaseConnection,
    requester: &Requester,
    product_id: i64,
    input: ProductInput,
) -> Result<Option<product::Model>> {
    validate(&input)?;

    let subject = Subject::resolve(db, requester).await?;
    let Some(current) = Product::find_by_id(product_id).one(db).await? else {
        return Ok(None);
    };
    if !ProductRule::check(&subject, Operation::Update, &current).is_allowed() {
        debug!("Product update denied");
        return Ok(None);
    }

    let mut product: product::ActiveModel = current.into();
    product.name = Set(input.name.trim().to_string());
    product.description = Set(input.description);
    product.image_url = Set(clean_url(input.image_url));
    product.extra_images = Set(ImageList(input.extra_images));
    product.price = Set(input.price);
    product.stock = Set(input.stock);
    product.delivery_estimate = Set(input.delivery_estimate);
    product.featured = Set(input.featured);
    product.updated_at = Set(chrono::Utc::now());

    Ok(Some(product.update(db).await?))
}

/// Deletes a product (admin only).
///
/// Order lines that referenced it keep their quantity and unit price; their product
/// reference becomes `NULL`.
///
/// # Errors
/// Returns an error if the delete fails.
#[instrument(skip(db))]
pub async fn delete_product(
    db: &DatabaseConnection,
    requester: &Requester,
    product_id: i64,
) -> Result<Option<product::Model>> {
    let subject = Subject::resolve(db, requester).await?;
    let Some(current) = Product::find_by_id(product_id).one(db).await? else {
        return Ok(None);
    };
    if !ProductRule::check(&subject, Operation::Delete, &current).is_allowed() {
        debug!("Product delete denied");
        return Ok(None);
    }

    Product::delete_by_id(product_id).exec(db).await?;
    Ok(Some(current))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_create_product_validation() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let admin = Requester::Principal(Uuid::new_v4());

        // Test empty name validation
        let result = create_product(&db, &admin, sample_product_input("", 10.0)).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { message: _ }));

        // Test whitespace-only name validation
        let result = create_product(&db, &admin, sample_product_input("   ", 10.0)).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { message: _ }));

        // Test negative price validation
        let result = create_product(&db, &admin, sample_product_input("Quad", -10.0)).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::InvalidAmount { amount: -10.0 }
        ));

        // Test NaN and infinity price validation
        let result = create_product(&db, &admin, sample_product_input("Quad", f64::NAN)).await;
        assert!(matches!(result.unwrap_err(), Error::InvalidAmount { amount: _ }));
        let result = create_product(&db, &admin, sample_product_input("Quad", f64::INFINITY)).await;
        assert!(matches!(result.unwrap_err(), Error::InvalidAmount { amount: _ }));

        // Test negative stock validation
        let mut input = sample_product_input("Quad", 10.0);
        input.stock = -1;
        let result = create_product(&db, &admin, input).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { message: _ }));

        // Test image limit
        let mut input = sample_product_input("Quad", 10.0);
        input.extra_images = (0..4).map(|i| format!("https://img.test/{i}.png")).collect();
        let result = create_product(&db, &admin, input).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { message: _ }));

        Ok(())
    }

    #[tokio::test]
    async fn test_create_product_integration() -> Result<()> {
        let world = setup_world().await?;

        let mut input = sample_product_input("Racing Frame", 59.5);
        input.extra_images = vec![
            "https://img.test/a.png".to_string(),
            "https://img.test/b.png".to_string(),
            "https://img.test/c.png".to_string(),
        ];
        input.image_url = Some("  ".to_string());
        let product = create_product(&world.db, &world.admin_requester(), input)
            .await?
            .unwrap();

        assert_eq!(product.name, "Racing Frame");
        assert_eq!(product.price, 59.5);
        assert_eq!(product.extra_images.0.len(), 3);
        assert_eq!(product.image_url, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_customer_cannot_write_products() -> Result<()> {
        let world = setup_world().await?;
        let customer = world.customer_requester();

        assert!(
            create_product(&world.db, &customer, sample_product_input("Quad", 10.0))
                .await?
                .is_none()
        );
        assert!(
            create_product(&world.db, &Requester::Anonymous, sample_product_input("Quad", 10.0))
                .await?
                .is_none()
        );

        let product = create_test_product(&world.db, &world.admin_requester(), "Quad", 10.0).await?;
        let cheaper = sample_product_input("Cheap Quad", 1.0);
        assert!(
            update_product(&world.db, &customer, product.id, cheaper)
                .await?
                .is_none()
        );
        assert!(delete_product(&world.db, &customer, product.id).await?.is_none());

        let stored = Product::find_by_id(product.id).one(&world.db).await?.unwrap();
        assert_eq!(stored, product);
        Ok(())
    }

    #[tokio::test]
    async fn test_anonymous_reads_products() -> Result<()> {
        let world = setup_world().await?;
        let product = create_test_product(&world.db, &world.admin_requester(), "Quad", 10.0).await?;

        let listed = list_products(&world.db, &Requester::Anonymous).await?;
        assert_eq!(listed, vec![product.clone()]);
        let found = get_product(&world.db, &Requester::Anonymous, product.id).await?;
        assert_eq!(found, Some(product));
        assert!(get_product(&world.db, &Requester::Anonymous, 999).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_featured_products_come_first() -> Result<()> {
        let world = setup_world().await?;
        let admin = world.admin_requester();
        create_test_product(&world.db, &admin, "Antenna", 5.0).await?;
        let mut input = sample_product_input("Zoom Camera", 120.0);
        input.featured = true;
        create_product(&world.db, &admin, input).await?.unwrap();
        create_test_product(&world.db, &admin, "Battery", 25.0).await?;

        let names: Vec<_> = list_products(&world.db, &Requester::Anonymous)
            .await?
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["Zoom Camera", "Antenna", "Battery"]);

        let featured = list_featured_products(&world.db, &Requester::Anonymous).await?;
        assert_eq!(featured.len(), 1);
        assert_eq!(featured[0].name, "Zoom Camera");
        Ok(())
    }

    #[tokio::test]
    async fn test_update_and_delete_product() -> Result<()> {
        let world = setup_world().await?;
        let admin = world.admin_requester();
        let product = create_test_product(&world.db, &admin, "Original Name", 10.0).await?;

        let input = sample_product_input("Updated Name", 15.0);
        let updated = update_product(&world.db, &admin, product.id, input)
            .await?
            .unwrap();
        assert_eq!(updated.name, "Updated Name");
        assert_eq!(updated.price, 15.0);
        assert_eq!(updated.id, product.id);

        let deleted = delete_product(&world.db, &admin, product.id).await?.unwrap();
        assert_eq!(deleted.id, product.id);
        assert!(list_products(&world.db, &admin).await?.is_empty());

        // Deleting again affects no rows
        assert!(delete_product(&world.db, &admin, product.id).await?.is_none());
        Ok(())
    }
}
