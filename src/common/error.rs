// src/common/error.rs

use std::collections::HashMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::middleware::i18n::Locale;

// Nosso tipo de erro de domínio, com `thiserror` para melhor ergonomia.
#[derive(Debug, Error)]
pub enum AppError {
    // --- Validação (entrada do usuário) ---
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("ID de ordem inválido: {0}")]
    InvalidOrderId(String),

    #[error("Endereço incompleto para rota")]
    IncompleteAddress,

    #[error("Checklist incompleto, etapa {number} pendente: {title}")]
    IncompleteChecklist { number: u8, title: String },

    #[error("Serviço não selecionado neste box")]
    ServiceNotSelected,

    #[error("Orçamento vazio")]
    EmptyBudget,

    #[error("Forma e data de pagamento são obrigatórias")]
    MissingPaymentInfo,

    #[error("Nenhum serviço selecionado")]
    NoServiceSelected,

    #[error("Nome do cliente é obrigatório")]
    MissingClientName,

    #[error("E-mail do cliente é obrigatório")]
    MissingClientEmail,

    #[error("Transição inválida a partir de {0}")]
    InvalidTransition(String),

    #[error("Campo bloqueado na etapa atual")]
    FieldLocked,

    #[error("Avaliação fora do intervalo 1-5: {0}")]
    InvalidRating(i32),

    #[error("Box inexistente: {0}")]
    InvalidBoxIndex(u8),

    #[error("Etapa inexistente: {0}")]
    InvalidStep(u8),

    #[error("Campo inválido: {0}")]
    InvalidField(String),

    #[error("E-mail inválido: {0}")]
    InvalidEmail(String),

    #[error("Certificado ainda não emitido")]
    CertificateNotIssued,

    // --- Recursos ---
    #[error("Ordem de serviço não encontrada")]
    OrderNotFound,

    // --- Colaboradores externos ---
    #[error("Falha no envio do certificado: {0}")]
    DeliveryError(String),

    #[error("Falha no storage: {0}")]
    StorageError(String),

    #[error("Fonte não encontrada: {0}")]
    FontNotFound(String),

    // --- Template do certificado ---
    #[error("Template do certificado inválido: {0}")]
    TemplateSyntax(#[from] handlebars::TemplateError),

    #[error("Falha ao renderizar o certificado: {0}")]
    Template(#[from] handlebars::RenderError),

    // --- Autenticação ---
    #[error("Token inválido")]
    InvalidToken,

    #[error("Acesso negado")]
    Forbidden,

    // Variante para erros de banco de dados
    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),
}

/// Erro pronto para a resposta HTTP, já traduzido para o idioma do cliente.
#[derive(Debug, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    pub status: StatusCode,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_)
            | AppError::InvalidOrderId(_)
            | AppError::IncompleteAddress
            | AppError::InvalidRating(_)
            | AppError::InvalidBoxIndex(_)
            | AppError::InvalidStep(_)
            | AppError::InvalidField(_)
            | AppError::InvalidEmail(_)
            | AppError::MissingClientName
            | AppError::MissingClientEmail => StatusCode::BAD_REQUEST,

            AppError::IncompleteChecklist { .. }
            | AppError::ServiceNotSelected
            | AppError::EmptyBudget
            | AppError::MissingPaymentInfo
            | AppError::NoServiceSelected => StatusCode::UNPROCESSABLE_ENTITY,

            AppError::InvalidTransition(_)
            | AppError::FieldLocked
            | AppError::CertificateNotIssued => StatusCode::CONFLICT,

            AppError::OrderNotFound => StatusCode::NOT_FOUND,
            AppError::DeliveryError(_) => StatusCode::BAD_GATEWAY,
            AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,

            AppError::StorageError(_)
            | AppError::FontNotFound(_)
            | AppError::TemplateSyntax(_)
            | AppError::Template(_)
            | AppError::DatabaseError(_)
            | AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Mensagem amigável no idioma pedido. Erros internos nunca expõem detalhes.
    pub fn message(&self, locale: &Locale) -> String {
        let en = locale.is_english();
        match self {
            AppError::ValidationError(_) => pick(en, "Um ou mais campos são inválidos.", "One or more fields are invalid."),
            AppError::InvalidOrderId(id) => if en {
                format!("'{}' is not a valid order id.", id)
            } else {
                format!("'{}' não é um ID de ordem válido.", id)
            },
            AppError::IncompleteAddress => pick(en, "Endereço incompleto: rua, número e cidade são obrigatórios.", "Incomplete address: street, number and city are required."),
            AppError::IncompleteChecklist { number, title } => if en {
                format!("Checklist incomplete: step {} ({}) is not done.", number, title)
            } else {
                format!("Checklist incompleto: a etapa {} ({}) não foi concluída.", number, title)
            },
            AppError::ServiceNotSelected => pick(en, "Este serviço não foi selecionado para o box.", "This service is not selected for the box."),
            AppError::EmptyBudget => pick(en, "Selecione ao menos um serviço antes de aprovar o orçamento.", "Select at least one service before approving the budget."),
            AppError::MissingPaymentInfo => pick(en, "Informe a forma e a data de pagamento.", "Payment method and payment date are required."),
            AppError::NoServiceSelected => pick(en, "Nenhum serviço selecionado nos boxes.", "No service selected in any box."),
            AppError::MissingClientName => pick(en, "O nome do cliente é obrigatório.", "Client name is required."),
            AppError::MissingClientEmail => pick(en, "Informe o e-mail do cliente para enviar o certificado.", "Client e-mail is required to send the certificate."),
            AppError::InvalidTransition(state) => if en {
                format!("This action is not available while the order is {}.", state)
            } else {
                format!("Esta ação não está disponível com a ordem em {}.", state)
            },
            AppError::FieldLocked => pick(en, "Este campo não pode ser alterado na etapa atual.", "This field cannot be changed at the current stage."),
            AppError::InvalidRating(value) => if en {
                format!("Rating must be between 1 and 5 (got {}).", value)
            } else {
                format!("A avaliação deve ser de 1 a 5 (recebido {}).", value)
            },
            AppError::InvalidBoxIndex(n) => if en {
                format!("Box {} does not exist.", n)
            } else {
                format!("O box {} não existe.", n)
            },
            AppError::InvalidStep(n) => if en {
                format!("Checklist step {} does not exist.", n)
            } else {
                format!("A etapa {} não existe no checklist.", n)
            },
            AppError::InvalidField(field) => if en {
                format!("Invalid field: {}.", field)
            } else {
                format!("Campo inválido: {}.", field)
            },
            AppError::InvalidEmail(email) => if en {
                format!("'{}' is not a valid e-mail address.", email)
            } else {
                format!("'{}' não é um e-mail válido.", email)
            },
            AppError::CertificateNotIssued => pick(en, "O certificado ainda não foi emitido.", "The certificate has not been issued yet."),
            AppError::OrderNotFound => pick(en, "Ordem de serviço não encontrada.", "Service order not found."),
            AppError::DeliveryError(_) => pick(en, "Não foi possível enviar o certificado. Tente novamente.", "The certificate could not be sent. Please try again."),
            AppError::InvalidToken => pick(en, "Token de autenticação inválido ou ausente.", "Invalid or missing authentication token."),
            AppError::Forbidden => pick(en, "Acesso restrito a administradores.", "Access restricted to administrators."),
            _ => pick(en, "Ocorreu um erro inesperado.", "An unexpected error occurred."),
        }
    }

    pub fn to_api_error(&self, locale: &Locale) -> ApiError {
        let status = self.status();

        // O `tracing` loga a mensagem detalhada que `thiserror` nos deu.
        if status.is_server_error() {
            tracing::error!("Erro Interno do Servidor: {:?}", self);
        }

        let details = match self {
            AppError::ValidationError(errors) => {
                let mut details = HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| e.message.as_ref().map(|m| m.to_string()).unwrap_or_else(|| e.code.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                Some(json!(details))
            }
            AppError::IncompleteChecklist { number, .. } => Some(json!({ "step": number })),
            _ => None,
        };

        ApiError {
            status,
            error: self.message(locale),
            details,
        }
    }
}

// Ordem dos argumentos: português primeiro, inglês depois.
fn pick(en: bool, pt: &str, english: &str) -> String {
    if en { english.to_string() } else { pt.to_string() }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status;
        (status, Json(self)).into_response()
    }
}

// Quando não há `Locale` em mãos, respondemos no idioma padrão.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.to_api_error(&Locale::default()).into_response()
    }
}
