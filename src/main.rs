//src/main.rs

use axum::{
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::{AppState, Config};
use crate::docs::ApiDoc;
use crate::middleware::auth::auth_guard;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn")),
        )
        .with_target(false)
        .compact()
        .init();

    // Sem configuração válida a aplicação não sobe.
    let config = Config::from_env()?;
    let app_state = AppState::new(config).await?;

    sqlx::migrate!().run(&app_state.db_pool).await?;
    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    // Rotas públicas
    let auth_routes = Router::new().route("/login", post(handlers::auth::login));

    let user_routes = Router::new()
        .route(
            "/",
            post(handlers::users::create_user).get(handlers::users::list_users),
        )
        .route("/me", get(handlers::auth::get_me))
        .route("/names", get(handlers::users::list_user_names))
        .route("/{id}", put(handlers::users::update_user))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let product_routes = Router::new()
        .route(
            "/",
            post(handlers::products::create_product).get(handlers::products::list_products),
        )
        .route("/{id}", get(handlers::products::get_product))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let schedule_routes = Router::new()
        .route(
            "/",
            post(handlers::schedules::create_schedule).get(handlers::schedules::list_schedules),
        )
        .route(
            "/{id}",
            get(handlers::schedules::get_schedule)
                .put(handlers::schedules::update_schedule)
                .delete(handlers::schedules::delete_schedule),
        )
        .route("/{id}/cancel", post(handlers::schedules::cancel_schedule))
        .route(
            "/{id}/activities/{index}",
            put(handlers::schedules::toggle_activity),
        )
        .route(
            "/{id}/progress",
            get(handlers::schedules::get_progress).put(handlers::schedules::save_progress),
        )
        .route("/{id}/counts", post(handlers::schedules::record_count))
        .route(
            "/{id}/counts/{product_id}/review",
            post(handlers::schedules::review_count),
        )
        .route("/{id}/report", get(handlers::schedules::get_report))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let movement_routes = Router::new()
        .route(
            "/",
            post(handlers::movements::create_movement).get(handlers::movements::list_movements),
        )
        .route(
            "/classification/preview",
            post(handlers::movements::preview_classification),
        )
        .route("/{id}", get(handlers::movements::get_movement))
        .route("/{id}/approve", post(handlers::movements::approve_movement))
        .route("/{id}/reject", post(handlers::movements::reject_movement))
        .route(
            "/{id}/transfer/dispatch",
            post(handlers::movements::dispatch_transfer),
        )
        .route(
            "/{id}/transfer/receive",
            post(handlers::movements::receive_transfer),
        )
        .route(
            "/{id}/transfer/reject",
            post(handlers::movements::reject_transfer),
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let addr = app_state.config.server_addr.clone();

    let app = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/auth", auth_routes)
        .nest("/api/users", user_routes)
        .nest("/api/products", product_routes)
        .nest("/api/schedules", schedule_routes)
        .nest("/api/movements", movement_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
