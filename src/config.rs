// src/config.rs

use std::{env, str::FromStr, sync::Arc, time::Duration};

use anyhow::Context;
use rust_decimal::Decimal;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    db::{OrderRepository, RbacRepository},
    services::{
        auth::AuthService,
        certificate::{CertificateRenderer, ProviderInfo},
        document_service::DocumentService,
        mailer::FunctionsMailer,
        order_service::OrderService,
        pricing::PriceTable,
        storage::SupabaseStorage,
        workflow::Workflow,
    },
};

/// Configuração lida do ambiente (e do `.env`, quando existir).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub supabase_url: String,
    pub supabase_service_key: String,
    pub jwt_secret: String,
    pub certificate_function: String,
    pub photo_bucket: String,
    pub admin_email: Option<String>,
    pub prices: PriceTable,
    pub provider: ProviderInfo,
    pub fonts_dir: String,
    pub bind_addr: String,
    pub dispatch_timeout: Duration,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = PriceTable::default();
        let prices = PriceTable {
            maintenance: decimal_or("PRECO_MANUTENCAO", defaults.maintenance)?,
            film: decimal_or("PRECO_PELICULA", defaults.film)?,
        };

        let dispatch_timeout = match optional("DISPATCH_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse::<u64>()
                .with_context(|| format!("DISPATCH_TIMEOUT_SECS inválido: {}", raw))?,
            None => 15,
        };

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            supabase_url: required("SUPABASE_URL")?,
            supabase_service_key: required("SUPABASE_SERVICE_KEY")?,
            jwt_secret: required("SUPABASE_JWT_SECRET")?,
            certificate_function: optional("CERTIFICATE_FUNCTION").unwrap_or_else(|| "enviar-certificado".into()),
            photo_bucket: optional("PHOTO_BUCKET").unwrap_or_else(|| "fotos-os".into()),
            admin_email: optional("ADMIN_EMAIL"),
            prices,
            provider: ProviderInfo {
                company_name: optional("PROVIDER_NAME").unwrap_or_default(),
                document: optional("PROVIDER_DOCUMENT"),
                phone: optional("PROVIDER_PHONE"),
            },
            fonts_dir: optional("FONTS_DIR").unwrap_or_else(|| "./fonts".into()),
            bind_addr: optional("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".into()),
            dispatch_timeout: Duration::from_secs(dispatch_timeout),
        })
    }
}

fn required(key: &str) -> anyhow::Result<String> {
    optional(key).with_context(|| format!("{} deve ser definida", key))
}

// Variável vazia conta como ausente.
fn optional(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn decimal_or(key: &str, default: Decimal) -> anyhow::Result<Decimal> {
    match optional(key) {
        Some(raw) => Decimal::from_str(&raw.replace(',', "."))
            .with_context(|| format!("{} inválido: {}", key, raw)),
        None => Ok(default),
    }
}

// O estado compartilhado que será acessível em toda a aplicação
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub auth_service: AuthService,
    pub order_service: OrderService,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        // Conecta ao banco de dados, usando '?' para propagar erros
        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        // --- Monta o gráfico de dependências ---
        let order_repo = Arc::new(OrderRepository::new(db_pool.clone()));
        let rbac_repo = Arc::new(RbacRepository::new(db_pool.clone()));

        let mailer = FunctionsMailer::new(
            &config.supabase_url,
            &config.supabase_service_key,
            &config.certificate_function,
            config.dispatch_timeout,
        )?;
        let storage = SupabaseStorage::new(
            &config.supabase_url,
            &config.supabase_service_key,
            reqwest::Client::new(),
        );

        let order_service = OrderService::new(
            order_repo,
            Workflow::new(config.prices),
            CertificateRenderer::new(config.provider.clone())?,
            DocumentService::new(config.fonts_dir.clone()),
            Arc::new(mailer),
            Arc::new(storage),
            config.photo_bucket.clone(),
            config.admin_email.clone(),
        );
        let auth_service = AuthService::new(rbac_repo, config.jwt_secret.clone());

        Ok(Self {
            db_pool,
            auth_service,
            order_service,
        })
    }
}
