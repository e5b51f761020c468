// src/models/order.rs

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use utoipa::ToSchema;
use validator::ValidateEmail;

use crate::{
    common::error::AppError,
    models::checklist::{Checklist, ServiceKind},
};

pub const MIN_BOXES: usize = 1;
pub const MAX_BOXES: usize = 10;

/// Placeholder de rota que cria uma ordem nova e redireciona para o seu ID.
pub const NEW_ORDER_PLACEHOLDER: &str = "nova";

// --- Enums ---

/// Etapas da ordem, em ordem estrita de avanço.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "order_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Draft,
    BudgetApproved,
    PaymentConfirmed,
    CertificateIssued,
}

impl OrderStatus {
    pub fn label(&self) -> &'static str {
        match self {
            OrderStatus::Draft => "rascunho",
            OrderStatus::BudgetApproved => "orçamento aprovado",
            OrderStatus::PaymentConfirmed => "pagamento confirmado",
            OrderStatus::CertificateIssued => "concluída",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "payment_method", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Pix,
    Cash,
    CreditCard,
    DebitCard,
    BankTransfer,
    Boleto,
}

/// Nota de 1 a 5 estrelas. Nunca zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "i32", into = "i32")]
#[schema(value_type = i32, example = 5)]
pub struct Rating(u8);

impl Rating {
    pub fn value(&self) -> u8 {
        self.0
    }
}

impl TryFrom<i32> for Rating {
    type Error = AppError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            1..=5 => Ok(Rating(value as u8)),
            _ => Err(AppError::InvalidRating(value)),
        }
    }
}

impl From<Rating> for i32 {
    fn from(rating: Rating) -> Self {
        rating.0 as i32
    }
}

// --- Cliente ---

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    #[schema(example = "Maria Silva")]
    pub name: String,
    #[schema(example = "(11) 98888-7777")]
    pub phone: Option<String>,
    #[schema(example = "maria@email.com")]
    pub email: Option<String>,
    #[schema(example = "01310-100")]
    pub postal_code: Option<String>,
    #[schema(example = "Av. Paulista")]
    pub street: Option<String>,
    #[schema(example = "1000")]
    pub number: Option<String>,
    pub complement: Option<String>,
    pub neighborhood: Option<String>,
    #[schema(example = "São Paulo")]
    pub city: Option<String>,
    #[schema(example = "SP")]
    pub state: Option<String>,
}

/// Campos editáveis do cliente, um por coluna.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum ClientField {
    Name,
    Phone,
    Email,
    PostalCode,
    Street,
    Number,
    Complement,
    Neighborhood,
    City,
    State,
}

impl ClientField {
    pub fn column(&self) -> &'static str {
        match self {
            ClientField::Name => "cliente_nome",
            ClientField::Phone => "cliente_telefone",
            ClientField::Email => "cliente_email",
            ClientField::PostalCode => "cliente_cep",
            ClientField::Street => "cliente_rua",
            ClientField::Number => "cliente_numero",
            ClientField::Complement => "cliente_complemento",
            ClientField::Neighborhood => "cliente_bairro",
            ClientField::City => "cliente_cidade",
            ClientField::State => "cliente_estado",
        }
    }
}

impl Client {
    pub fn get(&self, field: ClientField) -> Option<&str> {
        match field {
            ClientField::Name => Some(self.name.as_str()).filter(|n| !n.is_empty()),
            ClientField::Phone => self.phone.as_deref(),
            ClientField::Email => self.email.as_deref(),
            ClientField::PostalCode => self.postal_code.as_deref(),
            ClientField::Street => self.street.as_deref(),
            ClientField::Number => self.number.as_deref(),
            ClientField::Complement => self.complement.as_deref(),
            ClientField::Neighborhood => self.neighborhood.as_deref(),
            ClientField::City => self.city.as_deref(),
            ClientField::State => self.state.as_deref(),
        }
    }

    /// Atribui o campo já normalizado. O nome nunca fica vazio.
    pub fn set(&mut self, field: ClientField, value: Option<String>) -> Result<(), AppError> {
        let value = value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        let slot = match field {
            ClientField::Name => {
                self.name = value.ok_or(AppError::MissingClientName)?;
                return Ok(());
            }
            ClientField::State => {
                let state = value.map(|v| v.to_uppercase());
                if let Some(s) = &state {
                    if s.chars().count() != 2 || !s.chars().all(|c| c.is_ascii_alphabetic()) {
                        return Err(AppError::InvalidField("state".into()));
                    }
                }
                self.state = state;
                return Ok(());
            }
            ClientField::Email => {
                if let Some(email) = &value {
                    if !email.validate_email() {
                        return Err(AppError::InvalidEmail(email.clone()));
                    }
                }
                self.email = value;
                return Ok(());
            }
            ClientField::Phone => &mut self.phone,
            ClientField::PostalCode => &mut self.postal_code,
            ClientField::Street => &mut self.street,
            ClientField::Number => &mut self.number,
            ClientField::Complement => &mut self.complement,
            ClientField::Neighborhood => &mut self.neighborhood,
            ClientField::City => &mut self.city,
        };
        *slot = value;
        Ok(())
    }
}

// --- Box ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceLine {
    pub selected: bool,
    pub concluded: bool,
    pub checklist: Checklist,
}

impl ServiceLine {
    pub fn new(kind: ServiceKind) -> Self {
        Self {
            selected: false,
            concluded: false,
            checklist: Checklist::for_kind(kind),
        }
    }
}

/// Um box de vidro atendido dentro da ordem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShowerBox {
    #[schema(example = 1)]
    pub number: u8,
    #[schema(example = "Banheiro social")]
    pub environment: Option<String>,
    pub photo_url: Option<String>,
    pub maintenance: ServiceLine,
    pub film: ServiceLine,
}

impl ShowerBox {
    pub fn new(number: u8) -> Self {
        Self {
            number,
            environment: None,
            photo_url: None,
            maintenance: ServiceLine::new(ServiceKind::Maintenance),
            film: ServiceLine::new(ServiceKind::Film),
        }
    }

    pub fn service(&self, kind: ServiceKind) -> &ServiceLine {
        match kind {
            ServiceKind::Maintenance => &self.maintenance,
            ServiceKind::Film => &self.film,
        }
    }

    pub fn service_mut(&mut self, kind: ServiceKind) -> &mut ServiceLine {
        match kind {
            ServiceKind::Maintenance => &mut self.maintenance,
            ServiceKind::Film => &mut self.film,
        }
    }

    pub fn selected_services(&self) -> impl Iterator<Item = ServiceKind> + '_ {
        ServiceKind::ALL
            .into_iter()
            .filter(|kind| self.service(*kind).selected)
    }
}

// --- Ordem de serviço (raiz do agregado) ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceOrder {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: Uuid,
    pub client: Client,
    pub boxes: Vec<ShowerBox>,

    pub requested_at: DateTime<Utc>,
    pub scheduled_date: Option<NaiveDate>,
    #[schema(value_type = Option<String>, example = "14:30:00")]
    pub scheduled_time: Option<NaiveTime>,
    pub provider_contacted_at: Option<NaiveDate>,
    pub provider_name: Option<String>,
    pub provider_phone: Option<String>,

    pub status: OrderStatus,
    pub payment_method: Option<PaymentMethod>,
    pub payment_date: Option<NaiveDate>,
    #[schema(example = "250.00")]
    pub total: Decimal,

    pub concluded_at: Option<DateTime<Utc>>,
    pub rating: Option<Rating>,
    pub certificate_generated: bool,
    pub certificate_sent: bool,
    pub certificate_url: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ServiceOrder {
    /// Ordem vazia, em rascunho, com um box.
    pub fn new_draft(id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id,
            client: Client::default(),
            boxes: vec![ShowerBox::new(1)],
            requested_at: now,
            scheduled_date: None,
            scheduled_time: None,
            provider_contacted_at: None,
            provider_name: None,
            provider_phone: None,
            status: OrderStatus::Draft,
            payment_method: None,
            payment_date: None,
            total: Decimal::ZERO,
            concluded_at: None,
            rating: None,
            certificate_generated: false,
            certificate_sent: false,
            certificate_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Ajusta a quantidade de boxes (limitada a 1..=10), mexendo só no final da lista.
    pub fn resize_boxes(&mut self, count: usize) -> usize {
        let count = count.clamp(MIN_BOXES, MAX_BOXES);
        if count < self.boxes.len() {
            self.boxes.truncate(count);
        }
        while self.boxes.len() < count {
            let number = self.boxes.len() as u8 + 1;
            self.boxes.push(ShowerBox::new(number));
        }
        count
    }

    /// Box pelo número de sequência (começa em 1).
    pub fn box_mut(&mut self, number: u8) -> Result<&mut ShowerBox, AppError> {
        self.boxes
            .iter_mut()
            .find(|b| b.number == number)
            .ok_or(AppError::InvalidBoxIndex(number))
    }

    pub fn has_any_service(&self) -> bool {
        self.boxes.iter().any(|b| b.selected_services().next().is_some())
    }

    /// Serviços selecionados em pelo menos um box, na ordem canônica.
    pub fn selected_services(&self) -> Vec<ServiceKind> {
        ServiceKind::ALL
            .into_iter()
            .filter(|kind| self.boxes.iter().any(|b| b.service(*kind).selected))
            .collect()
    }

    /// `enviado => gerado => data de conclusão`.
    pub fn certificate_flags_consistent(&self) -> bool {
        (!self.certificate_sent || self.certificate_generated)
            && (!self.certificate_generated || self.concluded_at.is_some())
    }
}

/// Linha da listagem de ordens.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub id: Uuid,
    pub client_name: String,
    pub city: Option<String>,
    pub status: OrderStatus,
    pub total: Decimal,
    pub scheduled_date: Option<NaiveDate>,
    pub certificate_sent: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&ServiceOrder> for OrderSummary {
    fn from(order: &ServiceOrder) -> Self {
        Self {
            id: order.id,
            client_name: order.client.name.clone(),
            city: order.client.city.clone(),
            status: order.status,
            total: order.total,
            scheduled_date: order.scheduled_date,
            certificate_sent: order.certificate_sent,
            created_at: order.created_at,
        }
    }
}

/// Valida o formato do ID antes de consultar o banco.
pub fn parse_order_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim()).map_err(|_| AppError::InvalidOrderId(raw.to_string()))
}
