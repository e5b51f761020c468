// src/db/order_repo.rs

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use sqlx::{types::Json, FromRow, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        command::FieldUpdate,
        order::{Client, OrderStatus, OrderSummary, PaymentMethod, Rating, ServiceOrder, ShowerBox},
    },
};

/// Fronteira de persistência do agregado `ServiceOrder`.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn insert(&self, order: &ServiceOrder) -> Result<(), AppError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ServiceOrder>, AppError>;

    async fn list(&self) -> Result<Vec<OrderSummary>, AppError>;

    /// Grava um único campo. Sem transação: a última escrita vence.
    async fn save_field(&self, id: Uuid, update: &FieldUpdate) -> Result<(), AppError>;

    /// Reserva o envio do certificado. `false` se já foi enviado ou se outra
    /// requisição está enviando.
    async fn claim_dispatch(&self, id: Uuid) -> Result<bool, AppError>;

    async fn release_dispatch(&self, id: Uuid) -> Result<(), AppError>;
}

// Reserva abandonada (processo caiu no meio do envio) expira após este prazo.
const DISPATCH_LEASE_SECS: f64 = 300.0;

// Linha crua da tabela `ordens_servico`.
#[derive(Debug, FromRow)]
struct OrderRow {
    id: Uuid,
    cliente_nome: String,
    cliente_telefone: Option<String>,
    cliente_email: Option<String>,
    cliente_cep: Option<String>,
    cliente_rua: Option<String>,
    cliente_numero: Option<String>,
    cliente_complemento: Option<String>,
    cliente_bairro: Option<String>,
    cliente_cidade: Option<String>,
    cliente_estado: Option<String>,
    boxes: Json<Vec<ShowerBox>>,
    data_solicitacao: DateTime<Utc>,
    data_agendada: Option<NaiveDate>,
    hora_agendada: Option<NaiveTime>,
    data_contato_prestador: Option<NaiveDate>,
    prestador_nome: Option<String>,
    prestador_telefone: Option<String>,
    status: OrderStatus,
    forma_pagamento: Option<PaymentMethod>,
    data_pagamento: Option<NaiveDate>,
    valor_total: Decimal,
    data_conclusao: Option<DateTime<Utc>>,
    avaliacao: Option<i16>,
    certificado_gerado: bool,
    certificado_enviado: bool,
    certificado_url: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<OrderRow> for ServiceOrder {
    fn from(row: OrderRow) -> Self {
        // Avaliação fora do intervalo (dado legado) é tratada como ausente.
        let rating = row
            .avaliacao
            .and_then(|v| Rating::try_from(i32::from(v)).ok());

        ServiceOrder {
            id: row.id,
            client: Client {
                name: row.cliente_nome,
                phone: row.cliente_telefone,
                email: row.cliente_email,
                postal_code: row.cliente_cep,
                street: row.cliente_rua,
                number: row.cliente_numero,
                complement: row.cliente_complemento,
                neighborhood: row.cliente_bairro,
                city: row.cliente_cidade,
                state: row.cliente_estado,
            },
            boxes: row.boxes.0,
            requested_at: row.data_solicitacao,
            scheduled_date: row.data_agendada,
            scheduled_time: row.hora_agendada,
            provider_contacted_at: row.data_contato_prestador,
            provider_name: row.prestador_nome,
            provider_phone: row.prestador_telefone,
            status: row.status,
            payment_method: row.forma_pagamento,
            payment_date: row.data_pagamento,
            total: row.valor_total,
            concluded_at: row.data_conclusao,
            rating,
            certificate_generated: row.certificado_gerado,
            certificate_sent: row.certificado_enviado,
            certificate_url: row.certificado_url,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

// O repositório de ordens, responsável por todas as interações com a tabela 'ordens_servico'
#[derive(Clone)]
pub struct OrderRepository {
    pool: PgPool,
}

impl OrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // Os nomes de coluna vêm de `FieldUpdate::column`, nunca do usuário.
    async fn set_column<T>(&self, id: Uuid, column: &str, value: T) -> Result<(), AppError>
    where
        T: for<'q> sqlx::Encode<'q, Postgres> + sqlx::Type<Postgres> + Send + 'static,
    {
        let sql = format!(
            "UPDATE ordens_servico SET {} = $1, updated_at = NOW() WHERE id = $2",
            column
        );

        let result = sqlx::query(&sql)
            .bind(value)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::OrderNotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl OrderStore for OrderRepository {
    async fn insert(&self, order: &ServiceOrder) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO ordens_servico (
                id, cliente_nome, cliente_telefone, cliente_email, cliente_cep, cliente_rua,
                cliente_numero, cliente_complemento, cliente_bairro, cliente_cidade, cliente_estado,
                boxes, data_solicitacao, status, valor_total, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            "#,
        )
        .bind(order.id)
        .bind(&order.client.name)
        .bind(&order.client.phone)
        .bind(&order.client.email)
        .bind(&order.client.postal_code)
        .bind(&order.client.street)
        .bind(&order.client.number)
        .bind(&order.client.complement)
        .bind(&order.client.neighborhood)
        .bind(&order.client.city)
        .bind(&order.client.state)
        .bind(Json(&order.boxes))
        .bind(order.requested_at)
        .bind(order.status)
        .bind(order.total)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ServiceOrder>, AppError> {
        let row = sqlx::query_as::<_, OrderRow>("SELECT * FROM ordens_servico WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let order = row.map(ServiceOrder::from);
        if let Some(order) = order.as_ref().filter(|o| !o.certificate_flags_consistent()) {
            tracing::warn!(
                "⚠️ Ordem {} com flags de certificado inconsistentes (gerado={}, enviado={})",
                order.id,
                order.certificate_generated,
                order.certificate_sent
            );
        }
        Ok(order)
    }

    async fn list(&self) -> Result<Vec<OrderSummary>, AppError> {
        let orders = sqlx::query_as::<_, OrderSummary>(
            r#"
            SELECT
                id,
                cliente_nome AS client_name,
                cliente_cidade AS city,
                status,
                valor_total AS total,
                data_agendada AS scheduled_date,
                certificado_enviado AS certificate_sent,
                created_at
            FROM ordens_servico
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }

    async fn save_field(&self, id: Uuid, update: &FieldUpdate) -> Result<(), AppError> {
        let column = update.column();
        match update {
            FieldUpdate::Client(_, value) => match value {
                Some(v) => self.set_column(id, column, v.clone()).await,
                // `cliente_nome` é NOT NULL; o workflow nunca o apaga.
                None => self.set_column(id, column, None::<String>).await,
            },
            FieldUpdate::Boxes(boxes) => self.set_column(id, column, Json(boxes.clone())).await,
            FieldUpdate::Total(total) => self.set_column(id, column, *total).await,
            FieldUpdate::ScheduledDate(date)
            | FieldUpdate::ProviderContactedAt(date)
            | FieldUpdate::PaymentDate(date) => self.set_column(id, column, *date).await,
            FieldUpdate::ScheduledTime(time) => self.set_column(id, column, *time).await,
            FieldUpdate::ProviderName(text)
            | FieldUpdate::ProviderPhone(text)
            | FieldUpdate::CertificateUrl(text) => self.set_column(id, column, text.clone()).await,
            FieldUpdate::Status(status) => self.set_column(id, column, *status).await,
            FieldUpdate::PaymentMethod(method) => self.set_column(id, column, *method).await,
            FieldUpdate::ConcludedAt(at) => self.set_column(id, column, *at).await,
            FieldUpdate::Rating(rating) => {
                self.set_column(id, column, rating.map(|r| i16::from(r.value()))).await
            }
            FieldUpdate::CertificateGenerated(flag) | FieldUpdate::CertificateSent(flag) => {
                self.set_column(id, column, *flag).await
            }
        }
    }

    async fn claim_dispatch(&self, id: Uuid) -> Result<bool, AppError> {
        // Um único UPDATE condicional: só uma requisição concorrente vence.
        let result = sqlx::query(
            r#"
            UPDATE ordens_servico
            SET certificado_despacho_em = NOW()
            WHERE id = $1
              AND NOT certificado_enviado
              AND (
                certificado_despacho_em IS NULL
                OR certificado_despacho_em < NOW() - ($2::float8 * INTERVAL '1 second')
              )
            "#,
        )
        .bind(id)
        .bind(DISPATCH_LEASE_SECS)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn release_dispatch(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query("UPDATE ordens_servico SET certificado_despacho_em = NULL WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
