//src/main.rs

use axum::{
    middleware as axum_middleware,
    routing::{get, post, put},
    Json, Router,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

// Importações principais
use crate::config::{AppState, Config};
use crate::docs::ApiDoc;
use crate::middleware::{auth::auth_guard, rbac::admin_guard};

#[tokio::main]
async fn main() {
    // Inicializa o logger; o nível vem de RUST_LOG (padrão: info)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    // .expect() é bom aqui: se a configuração falhar, a aplicação não deve iniciar.
    let config = Config::from_env().expect("Falha ao carregar a configuração.");
    let bind_addr = config.bind_addr.clone();

    let app_state = AppState::new(config)
        .await
        .expect("Falha ao inicializar o estado da aplicação.");

    // Faz o app rodar as migrações do SQLx na inicialização
    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .expect("Falha ao rodar as migrações do banco de dados.");

    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    // Ordens de serviço (protegidas pelo middleware de autenticação)
    let order_routes = Router::new()
        .route("/"
               ,get(handlers::orders::list_orders)
               .post(handlers::orders::create_order)
        )
        .route("/{id}", get(handlers::orders::get_order))
        .route("/{id}/comandos", post(handlers::orders::apply_command))
        .route("/{id}/aprovar-orcamento", post(handlers::orders::approve_budget))
        .route("/{id}/confirmar-pagamento", post(handlers::orders::confirm_payment))
        .route("/{id}/certificado", post(handlers::orders::issue_certificate))
        .route("/{id}/certificado.html", get(handlers::documents::certificate_html))
        .route("/{id}/certificado.pdf", get(handlers::documents::certificate_pdf))
        .route("/{id}/avaliacao", put(handlers::orders::set_rating))
        .route("/{id}/fotos", post(handlers::orders::upload_photo))
        .route("/{id}/rota", get(handlers::orders::get_route))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    // Área administrativa: o último layer roda primeiro (auth antes do admin)
    let admin_routes = Router::new()
        .route("/me", get(handlers::admin::get_me))
        .layer(axum_middleware::from_fn_with_state(
            app_state.auth_service.clone(),
            admin_guard,
        ))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    // Combina tudo no router principal
    let app = Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .route("/api/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .nest("/api/ordens", order_routes)
        .nest("/api/admin", admin_routes)
        .with_state(app_state);

    // Inicia o servidor
    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("Falha ao iniciar o listener TCP");
    tracing::info!("🚀 Servidor escutando em {}", bind_addr);
    axum::serve(listener, app)
        .await
        .expect("Erro no servidor Axum");
}
