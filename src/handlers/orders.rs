// src/handlers/orders.rs

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::i18n::Locale,
    models::{
        checklist::ServiceKind,
        command::OrderCommand,
        order::{parse_order_id, ClientField, OrderSummary, PaymentMethod, Rating, ServiceOrder, NEW_ORDER_PLACEHOLDER},
    },
    services::{certificate::CertificateLanguage, order_service::TransitionReport, storage::PhotoTarget},
};

// =============================================================================
//  PAYLOADS
// =============================================================================

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderPayload {
    #[validate(length(min = 2, message = "O nome deve ter no mínimo 2 caracteres"))]
    #[schema(example = "Maria Silva")]
    pub client_name: Option<String>,

    #[validate(email(message = "O e-mail fornecido é inválido."))]
    #[schema(example = "maria@email.com")]
    pub client_email: Option<String>,

    #[schema(example = "(11) 98765-4321")]
    pub client_phone: Option<String>,
}

impl CreateOrderPayload {
    /// Comandos iniciais da nova ordem. Nome só com espaços é recusado aqui,
    /// antes de qualquer gravação.
    fn into_commands(self) -> Result<Vec<OrderCommand>, AppError> {
        if self.client_name.as_deref().is_some_and(|name| name.trim().is_empty()) {
            return Err(AppError::MissingClientName);
        }

        let commands = [
            (ClientField::Name, self.client_name),
            (ClientField::Email, self.client_email),
            (ClientField::Phone, self.client_phone),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_some())
        .map(|(field, value)| OrderCommand::SetClientField { field, value })
        .collect();
        Ok(commands)
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmPaymentPayload {
    pub method: Option<PaymentMethod>,
    #[schema(example = "2024-03-01")]
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RatingPayload {
    /// `null` remove a avaliação.
    pub rating: Option<Rating>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PhotoQuery {
    /// Box de destino (começa em 1).
    pub box_number: u8,
    /// Informe serviço e etapa para uma foto de checklist; omita ambos para a foto do box.
    pub service: Option<ServiceKind>,
    pub step: Option<u8>,
    /// Extensão do arquivo: jpg, jpeg, png, webp ou heic.
    pub ext: String,
}

impl PhotoQuery {
    fn target(&self) -> Result<PhotoTarget, AppError> {
        match (self.service, self.step) {
            (None, None) => Ok(PhotoTarget::Box { box_number: self.box_number }),
            (Some(service), Some(step)) => Ok(PhotoTarget::Step { box_number: self.box_number, service, step }),
            _ => Err(AppError::InvalidField("service/step".into())),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RouteResponse {
    #[schema(example = "https://www.google.com/maps/dir/?api=1&destination=Av.+Paulista%2C+1000%2C+S%C3%A3o+Paulo+-+SP%2C+Brasil")]
    pub url: String,
}

// =============================================================================
//  ORDENS
// =============================================================================

// GET /api/ordens
#[utoipa::path(
    get,
    path = "/api/ordens",
    tag = "Orders",
    responses(
        (status = 200, description = "Ordens, das mais recentes para as mais antigas", body = Vec<OrderSummary>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_orders(
    State(app_state): State<AppState>,
    locale: Locale,
) -> Result<impl IntoResponse, ApiError> {
    let orders = app_state
        .order_service
        .list_orders()
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok(Json(orders))
}

// POST /api/ordens
#[utoipa::path(
    post,
    path = "/api/ordens",
    tag = "Orders",
    request_body = CreateOrderPayload,
    responses(
        (status = 201, description = "Ordem criada em rascunho", body = ServiceOrder),
        (status = 400, description = "Dados inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_order(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<CreateOrderPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let initial = payload
        .into_commands()
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    let order = app_state
        .order_service
        .create_order(initial)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(order)))
}

// GET /api/ordens/{id}
#[utoipa::path(
    get,
    path = "/api/ordens/{id}",
    tag = "Orders",
    params(
        ("id" = String, Path, description = "UUID da ordem, ou `nova` para criar uma e redirecionar")
    ),
    responses(
        (status = 200, description = "Ordem completa", body = ServiceOrder),
        (status = 303, description = "Ordem criada; redireciona para o novo ID"),
        (status = 400, description = "ID inválido"),
        (status = 404, description = "Ordem não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_order(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(raw_id): Path<String>,
) -> Result<Response, ApiError> {
    if raw_id == NEW_ORDER_PLACEHOLDER {
        let order = app_state
            .order_service
            .create_order(Vec::new())
            .await
            .map_err(|app_err| app_err.to_api_error(&locale))?;
        return Ok(Redirect::to(&format!("/api/ordens/{}", order.id)).into_response());
    }

    let id = parse_order_id(&raw_id).map_err(|e| e.to_api_error(&locale))?;
    let order = app_state
        .order_service
        .get_order(id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok(Json(order).into_response())
}

// POST /api/ordens/{id}/comandos
#[utoipa::path(
    post,
    path = "/api/ordens/{id}/comandos",
    tag = "Orders",
    params(("id" = String, Path, description = "UUID da ordem")),
    request_body = OrderCommand,
    responses(
        (status = 200, description = "Comando aplicado", body = ServiceOrder),
        (status = 400, description = "Comando inválido"),
        (status = 409, description = "Campo bloqueado na etapa atual"),
        (status = 422, description = "Checklist incompleto"),
        (status = 404, description = "Ordem não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn apply_command(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(raw_id): Path<String>,
    Json(command): Json<OrderCommand>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_order_id(&raw_id).map_err(|e| e.to_api_error(&locale))?;

    let order = app_state
        .order_service
        .apply_command(id, command)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok(Json(order))
}

// PUT /api/ordens/{id}/avaliacao
#[utoipa::path(
    put,
    path = "/api/ordens/{id}/avaliacao",
    tag = "Orders",
    params(("id" = String, Path, description = "UUID da ordem")),
    request_body = RatingPayload,
    responses(
        (status = 200, description = "Avaliação gravada", body = ServiceOrder),
        (status = 400, description = "Avaliação fora de 1 a 5")
    ),
    security(("api_jwt" = []))
)]
pub async fn set_rating(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(raw_id): Path<String>,
    Json(payload): Json<RatingPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_order_id(&raw_id).map_err(|e| e.to_api_error(&locale))?;

    let order = app_state
        .order_service
        .set_rating(id, payload.rating)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok(Json(order))
}

// =============================================================================
//  TRANSIÇÕES
// =============================================================================

// POST /api/ordens/{id}/aprovar-orcamento
#[utoipa::path(
    post,
    path = "/api/ordens/{id}/aprovar-orcamento",
    tag = "Workflow",
    params(("id" = String, Path, description = "UUID da ordem")),
    responses(
        (status = 200, description = "Orçamento aprovado (ou já estava)", body = TransitionReport),
        (status = 422, description = "Orçamento vazio")
    ),
    security(("api_jwt" = []))
)]
pub async fn approve_budget(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(raw_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_order_id(&raw_id).map_err(|e| e.to_api_error(&locale))?;

    let report = app_state
        .order_service
        .approve_budget(id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok(Json(report))
}

// POST /api/ordens/{id}/confirmar-pagamento
#[utoipa::path(
    post,
    path = "/api/ordens/{id}/confirmar-pagamento",
    tag = "Workflow",
    params(("id" = String, Path, description = "UUID da ordem")),
    request_body = ConfirmPaymentPayload,
    responses(
        (status = 200, description = "Pagamento confirmado (ou já estava)", body = TransitionReport),
        (status = 409, description = "Orçamento ainda não aprovado"),
        (status = 422, description = "Forma ou data de pagamento ausente")
    ),
    security(("api_jwt" = []))
)]
pub async fn confirm_payment(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(raw_id): Path<String>,
    Json(payload): Json<ConfirmPaymentPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_order_id(&raw_id).map_err(|e| e.to_api_error(&locale))?;

    let report = app_state
        .order_service
        .confirm_payment(id, payload.method, payload.date)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok(Json(report))
}

// POST /api/ordens/{id}/certificado
#[utoipa::path(
    post,
    path = "/api/ordens/{id}/certificado",
    tag = "Workflow",
    params(
        ("id" = String, Path, description = "UUID da ordem"),
        ("accept-language" = Option<String>, Header, description = "Idioma do certificado (pt padrão, en)")
    ),
    responses(
        (status = 200, description = "Certificado emitido e enviado (ou já enviado)", body = TransitionReport),
        (status = 400, description = "E-mail ou nome do cliente ausente"),
        (status = 409, description = "Pagamento ainda não confirmado"),
        (status = 422, description = "Nenhum serviço selecionado"),
        (status = 502, description = "Falha no envio do e-mail; pode ser repetido")
    ),
    security(("api_jwt" = []))
)]
pub async fn issue_certificate(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(raw_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_order_id(&raw_id).map_err(|e| e.to_api_error(&locale))?;

    let report = app_state
        .order_service
        .issue_certificate(id, CertificateLanguage::from(&locale))
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok(Json(report))
}

// =============================================================================
//  FOTOS E ROTA
// =============================================================================

// POST /api/ordens/{id}/fotos
#[utoipa::path(
    post,
    path = "/api/ordens/{id}/fotos",
    tag = "Orders",
    params(("id" = String, Path, description = "UUID da ordem"), PhotoQuery),
    request_body(content = Vec<u8>, content_type = "application/octet-stream", description = "Bytes da imagem"),
    responses(
        (status = 200, description = "Foto enviada e registrada", body = ServiceOrder),
        (status = 400, description = "Destino ou extensão inválidos"),
        (status = 500, description = "Falha no storage")
    ),
    security(("api_jwt" = []))
)]
pub async fn upload_photo(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(raw_id): Path<String>,
    Query(query): Query<PhotoQuery>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_order_id(&raw_id).map_err(|e| e.to_api_error(&locale))?;
    let target = query.target().map_err(|e| e.to_api_error(&locale))?;

    if body.is_empty() {
        return Err(AppError::InvalidField("body".into()).to_api_error(&locale));
    }

    let order = app_state
        .order_service
        .upload_photo(id, target, &query.ext, body.to_vec())
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok(Json(order))
}

// GET /api/ordens/{id}/rota
#[utoipa::path(
    get,
    path = "/api/ordens/{id}/rota",
    tag = "Orders",
    params(("id" = String, Path, description = "UUID da ordem")),
    responses(
        (status = 200, description = "Link de rota até o cliente", body = RouteResponse),
        (status = 400, description = "Endereço incompleto")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_route(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(raw_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_order_id(&raw_id).map_err(|e| e.to_api_error(&locale))?;

    let url = app_state
        .order_service
        .route_url(id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok(Json(RouteResponse { url: url.to_string() }))
}
