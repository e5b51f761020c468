// src/models/command.rs

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{
    checklist::{GlassFindings, ServiceKind},
    order::{ClientField, OrderStatus, PaymentMethod, Rating, ShowerBox},
};

// =============================================================================
//  COMANDOS DE EDIÇÃO
// =============================================================================

/// Edições discretas sobre uma ordem. Cada uma altera um único campo lógico.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum OrderCommand {
    #[serde(rename_all = "camelCase")]
    SetClientField {
        field: ClientField,
        value: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    SetBoxCount {
        #[schema(example = 2)]
        count: usize,
    },
    #[serde(rename_all = "camelCase")]
    SetBoxEnvironment {
        box_number: u8,
        environment: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    SetBoxPhoto {
        box_number: u8,
        photo_url: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    ToggleBoxService {
        box_number: u8,
        service: ServiceKind,
        selected: bool,
    },
    #[serde(rename_all = "camelCase")]
    CompleteChecklistStep {
        box_number: u8,
        service: ServiceKind,
        step: u8,
        completed: bool,
    },
    #[serde(rename_all = "camelCase")]
    SetStepPhoto {
        box_number: u8,
        service: ServiceKind,
        step: u8,
        photo_url: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    SetStepNote {
        box_number: u8,
        service: ServiceKind,
        step: u8,
        note: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    SetGlassFindings {
        box_number: u8,
        service: ServiceKind,
        findings: GlassFindings,
    },
    #[serde(rename_all = "camelCase")]
    ConcludeBoxService {
        box_number: u8,
        service: ServiceKind,
        concluded: bool,
    },
    #[serde(rename_all = "camelCase")]
    SetSchedule {
        date: Option<NaiveDate>,
        #[schema(value_type = Option<String>, example = "14:30:00")]
        time: Option<NaiveTime>,
    },
    #[serde(rename_all = "camelCase")]
    SetProviderContactedAt {
        date: Option<NaiveDate>,
    },
    #[serde(rename_all = "camelCase")]
    SetProvider {
        name: Option<String>,
        phone: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    SetPaymentMethod {
        method: Option<PaymentMethod>,
    },
    #[serde(rename_all = "camelCase")]
    SetPaymentDate {
        date: Option<NaiveDate>,
    },
    #[serde(rename_all = "camelCase")]
    SetRating {
        rating: Option<Rating>,
    },
}

// =============================================================================
//  ATUALIZAÇÕES DE CAMPO (PERSISTÊNCIA)
// =============================================================================

/// Um campo persistido da ordem. Cada variante corresponde a uma coluna de
/// `ordens_servico`, gravada isoladamente.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate {
    Client(ClientField, Option<String>),
    Boxes(Vec<ShowerBox>),
    Total(Decimal),
    ScheduledDate(Option<NaiveDate>),
    ScheduledTime(Option<NaiveTime>),
    ProviderContactedAt(Option<NaiveDate>),
    ProviderName(Option<String>),
    ProviderPhone(Option<String>),
    Status(OrderStatus),
    PaymentMethod(Option<PaymentMethod>),
    PaymentDate(Option<NaiveDate>),
    ConcludedAt(Option<DateTime<Utc>>),
    Rating(Option<Rating>),
    CertificateGenerated(bool),
    CertificateSent(bool),
    CertificateUrl(Option<String>),
}

impl FieldUpdate {
    pub fn column(&self) -> &'static str {
        match self {
            FieldUpdate::Client(field, _) => field.column(),
            FieldUpdate::Boxes(_) => "boxes",
            FieldUpdate::Total(_) => "valor_total",
            FieldUpdate::ScheduledDate(_) => "data_agendada",
            FieldUpdate::ScheduledTime(_) => "hora_agendada",
            FieldUpdate::ProviderContactedAt(_) => "data_contato_prestador",
            FieldUpdate::ProviderName(_) => "prestador_nome",
            FieldUpdate::ProviderPhone(_) => "prestador_telefone",
            FieldUpdate::Status(_) => "status",
            FieldUpdate::PaymentMethod(_) => "forma_pagamento",
            FieldUpdate::PaymentDate(_) => "data_pagamento",
            FieldUpdate::ConcludedAt(_) => "data_conclusao",
            FieldUpdate::Rating(_) => "avaliacao",
            FieldUpdate::CertificateGenerated(_) => "certificado_gerado",
            FieldUpdate::CertificateSent(_) => "certificado_enviado",
            FieldUpdate::CertificateUrl(_) => "certificado_url",
        }
    }
}
