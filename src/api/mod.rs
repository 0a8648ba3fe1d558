//! HTTP surface.
//!
//! Thin axum handlers over `core`. Each handler extracts the [`Requester`] from the
//! gateway header and passes it explicitly to the core function it wraps; no handler
//! makes an access decision of its own except the admin-only upload endpoint, which
//! has no table behind it.
//!
//! [`Requester`]: crate::core::Requester

/// Dashboard endpoints
pub mod admin;
/// Assistant and quiz endpoints
pub mod assistant;
/// Product and curriculum endpoints
pub mod catalog;
/// Error to status mapping
pub mod error;
/// Order endpoints
pub mod orders;
/// Profile endpoints
pub mod profiles;
/// Principal header extraction
pub mod requester;

use crate::{
    cache::CatalogCache,
    errors::Result,
    services::{AssistantClient, StorageClient},
};
use axum::{
    Router,
    http::{HeaderName, Method, header::CONTENT_TYPE},
    routing::{get, post, put},
};
use sea_orm::DatabaseConnection;
use std::{sync::Arc, time::Duration};
use tokio::{net::TcpListener, signal};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info};

/// Shared state handed to every handler.
pub struct AppState {
    /// Database connection
    pub db: DatabaseConnection,
    /// Public catalog cache
    pub catalog: CatalogCache,
    /// AI-assist client
    pub assistant: AssistantClient,
    /// Object storage client
    pub storage: StorageClient,
}

async fn health() -> &'static str {
    "ok"
}

/// Builds the application router.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, HeaderName::from_static(requester::PRINCIPAL_HEADER)])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/health", get(health))
        .route("/catalog", get(catalog::catalog))
        .route(
            "/products",
            get(catalog::list_products).post(catalog::create_product),
        )
        .route("/products/featured", get(catalog::list_featured_products))
        .route(
            "/products/{id}",
            get(catalog::get_product)
                .put(catalog::update_product)
                .delete(catalog::delete_product),
        )
        .route(
            "/modules",
            get(catalog::list_modules).post(catalog::create_module),
        )
        .route(
            "/modules/{id}",
            get(catalog::get_module)
                .put(catalog::update_module)
                .delete(catalog::delete_module),
        )
        .route("/modules/{id}/publish", post(catalog::set_published))
        .route("/modules/{id}/code", post(catalog::append_code_asset))
        .route("/modules/{id}/snippets", get(catalog::module_snippets))
        .route("/orders", get(orders::list_orders).post(orders::place_order))
        .route(
            "/orders/{id}",
            get(orders::get_order).delete(orders::delete_order),
        )
        .route("/orders/{id}/status", put(orders::update_order_status))
        .route(
            "/profiles",
            get(profiles::list_profiles).post(profiles::create_profile),
        )
        .route("/profiles/me", get(profiles::my_profile))
        .route(
            "/profiles/{id}",
            get(profiles::get_profile)
                .patch(profiles::update_profile)
                .delete(profiles::delete_principal),
        )
        .route(
            "/analytics",
            get(admin::list_events).post(admin::record_event),
        )
        .route("/uploads/{kind}", post(admin::upload))
        .route("/assistant", post(assistant::assist))
        .route("/quiz", post(assistant::generate_quiz))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Serves the API on `bind_address` until Ctrl+C or SIGTERM.
pub async fn serve(state: Arc<AppState>, bind_address: &str) -> Result<()> {
    let listener = TcpListener::bind(bind_address).await?;
    info!("Server running on {bind_address}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::{
        config::settings::{AssistantConfig, StorageConfig},
        core::Requester,
        entities::ProductModel,
        services::ASSISTANT_UNAVAILABLE,
        test_utils::*,
    };
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode},
        response::Response,
    };
    use serde_json::{Value, json};
    use tower::ServiceExt;

    fn state(db: DatabaseConnection) -> Arc<AppState> {
        Arc::new(AppState {
            db,
            catalog: CatalogCache::new(Duration::from_secs(60)),
            assistant: AssistantClient::new(&AssistantConfig::default(), None),
            storage: StorageClient::new(&StorageConfig::default(), None),
        })
    }

    fn request(
        method: Method,
        uri: &str,
        requester: Requester,
        body: Option<Value>,
    ) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Requester::Principal(id) = requester {
            builder = builder.header(requester::PRINCIPAL_HEADER, id.to_string());
        }
        match body {
            Some(json) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let world = setup_world().await.unwrap();
        let response = router(state(world.db))
            .oneshot(request(Method::GET, "/health", Requester::Anonymous, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_product_writes_need_admin_and_refresh_catalog() {
        let world = setup_world().await.unwrap();
        let admin = world.admin_requester();
        let customer = world.customer_requester();
        let app = router(state(world.db));
        let body = json!({ "name": "Trainer Quad", "price": 129.0, "stock": 4 });

        // Prime the cache with the empty catalog
        let response = app
            .clone()
            .oneshot(request(Method::GET, "/products", Requester::Anonymous, None))
            .await
            .unwrap();
        assert_eq!(json_body(response).await, json!([]));

        let response = app
            .clone()
            .oneshot(request(Method::POST, "/products", customer, Some(body.clone())))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app
            .clone()
            .oneshot(request(Method::POST, "/products", admin, Some(body)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app
            .oneshot(request(Method::GET, "/products", Requester::Anonymous, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let products: Vec<ProductModel> =
            serde_json::from_value(json_body(response).await).unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].name, "Trainer Quad");
    }

    #[tokio::test]
    async fn test_invalid_product_is_bad_request() {
        let world = setup_world().await.unwrap();
        let admin = world.admin_requester();
        let response = router(state(world.db))
            .oneshot(request(
                Method::POST,
                "/products",
                admin,
                Some(json!({ "name": "Quad", "price": -1.0 })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_orders_hidden_from_other_customers() {
        let world = setup_world().await.unwrap();
        let quad = create_test_product(&world.db, &world.admin_requester(), "Quad", 50.0)
            .await
            .unwrap();
        let customer = world.customer_requester();
        let other = world.other_requester();
        let app = router(state(world.db));

        let response = app
            .clone()
            .oneshot(request(
                Method::POST,
                "/orders",
                customer,
                Some(json!({ "lines": [{ "product_id": quad.id, "quantity": 2 }] })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let placed = json_body(response).await;
        assert_eq!(placed["total"], json!(100.0));
        assert_eq!(placed["status"], json!("pending"));
        let uri = format!("/orders/{}", placed["id"]);

        let response = app
            .clone()
            .oneshot(request(Method::GET, &uri, other, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app
            .oneshot(request(Method::GET, &uri, customer, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["items"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_product_is_unprocessable() {
        let world = setup_world().await.unwrap();
        let customer = world.customer_requester();
        let response = router(state(world.db))
            .oneshot(request(
                Method::POST,
                "/orders",
                customer,
                Some(json!({ "lines": [{ "product_id": 999, "quantity": 1 }] })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_customer_cannot_promote_self() {
        let world = setup_world().await.unwrap();
        let customer = world.customer_requester();
        let uri = format!("/profiles/{}", world.customer.id);
        let app = router(state(world.db));

        let response = app
            .clone()
            .oneshot(request(Method::PATCH, &uri, customer, Some(json!({ "role": "admin" }))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app
            .oneshot(request(Method::GET, "/profiles/me", customer, None))
            .await
            .unwrap();
        assert_eq!(json_body(response).await["role"], json!("customer"));
    }

    #[tokio::test]
    async fn test_constraint_violations_are_client_errors() {
        let world = setup_world().await.unwrap();
        let customer = world.customer_requester();
        let admin = world.admin_requester();
        let own_id = world.customer.id;
        let app = router(state(world.db));

        // Profile for this principal already exists
        let response = app
            .clone()
            .oneshot(request(
                Method::POST,
                "/profiles",
                customer,
                Some(json!({ "id": own_id, "display_name": "Maya again" })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let first = json!({
            "id": uuid::Uuid::new_v4(),
            "display_name": "Ana",
            "email": "ana@school.test",
        });
        let second = json!({
            "id": uuid::Uuid::new_v4(),
            "display_name": "Ana B",
            "email": "ana@school.test",
        });
        let response = app
            .clone()
            .oneshot(request(Method::POST, "/profiles", admin, Some(first)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let response = app
            .clone()
            .oneshot(request(Method::POST, "/profiles", admin, Some(second)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        // Event about a principal that has no profile
        let response = app
            .oneshot(request(
                Method::POST,
                "/analytics",
                admin,
                Some(json!({ "user_id": uuid::Uuid::new_v4(), "event_type": "page_view" })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_malformed_principal_header() {
        let world = setup_world().await.unwrap();
        let response = router(state(world.db))
            .oneshot(
                Request::builder()
                    .uri("/orders")
                    .header(requester::PRINCIPAL_HEADER, "admin")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_upload_requires_admin() {
        let world = setup_world().await.unwrap();
        let customer = world.customer_requester();
        let response = router(state(world.db))
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/uploads/products?file_name=quad.png")
                    .header(requester::PRINCIPAL_HEADER, customer.id().unwrap().to_string())
                    .header(CONTENT_TYPE, "image/png")
                    .body(Body::from(vec![1_u8, 2, 3]))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_assistant_degrades_without_upstream() {
        let world = setup_world().await.unwrap();
        let app = router(state(world.db));

        let response = app
            .clone()
            .oneshot(request(
                Method::POST,
                "/assistant",
                Requester::Anonymous,
                Some(json!({ "prompt": "Why do drones need four rotors?" })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["reply"], json!(ASSISTANT_UNAVAILABLE));

        // A question that happens to start with "data:" is plain text
        let response = app
            .clone()
            .oneshot(request(
                Method::POST,
                "/assistant",
                Requester::Anonymous,
                Some(json!({ "prompt": "data: how is telemetry logged?" })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["reply"], json!(ASSISTANT_UNAVAILABLE));

        let response = app
            .oneshot(request(
                Method::POST,
                "/assistant",
                Requester::Anonymous,
                Some(json!({ "prompt": "   " })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unpublished_module_only_listed_for_admin() {
        let world = setup_world().await.unwrap();
        create_test_module(&world.db, &world.admin_requester(), "Draft", false)
            .await
            .unwrap();
        let admin = world.admin_requester();
        let customer = world.customer_requester();
        let app = router(state(world.db));

        for (requester, expected) in [(Requester::Anonymous, 0), (customer, 0), (admin, 1)] {
            let response = app
                .clone()
                .oneshot(request(Method::GET, "/modules", requester, None))
                .await
                .unwrap();
            assert_eq!(json_body(response).await.as_array().unwrap().len(), expected);
        }
    }
}
