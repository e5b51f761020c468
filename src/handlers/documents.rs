// src/handlers/documents.rs

use axum::{
    extract::{Path, State},
    http::header,
    response::{Html, IntoResponse, Response},
};

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::i18n::Locale,
    models::order::parse_order_id,
    services::certificate::CertificateLanguage,
};

// GET /api/ordens/{id}/certificado.html
#[utoipa::path(
    get,
    path = "/api/ordens/{id}/certificado.html",
    tag = "Certificates",
    params(
        ("id" = String, Path, description = "UUID da ordem"),
        ("accept-language" = Option<String>, Header, description = "Idioma do certificado (pt padrão, en)")
    ),
    responses(
        (status = 200, description = "Certificado em HTML", content_type = "text/html"),
        (status = 409, description = "Certificado ainda não emitido")
    ),
    security(("api_jwt" = []))
)]
pub async fn certificate_html(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(raw_id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_order_id(&raw_id).map_err(|e| e.to_api_error(&locale))?;

    let certificate = app_state
        .order_service
        .render_certificate(id, CertificateLanguage::from(&locale))
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok(Html(certificate.html).into_response())
}

// GET /api/ordens/{id}/certificado.pdf
#[utoipa::path(
    get,
    path = "/api/ordens/{id}/certificado.pdf",
    tag = "Certificates",
    params(
        ("id" = String, Path, description = "UUID da ordem"),
        ("accept-language" = Option<String>, Header, description = "Idioma do certificado (pt padrão, en)")
    ),
    responses(
        (status = 200, description = "Certificado em PDF", content_type = "application/pdf"),
        (status = 409, description = "Certificado ainda não emitido")
    ),
    security(("api_jwt" = []))
)]
pub async fn certificate_pdf(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(raw_id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_order_id(&raw_id).map_err(|e| e.to_api_error(&locale))?;

    let pdf_bytes = app_state
        .order_service
        .certificate_pdf(id, CertificateLanguage::from(&locale))
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    // Configura os Headers para o navegador mostrar o PDF
    let headers = [
        (header::CONTENT_TYPE, "application/pdf".to_string()),
        (header::CONTENT_DISPOSITION, format!("inline; filename=\"certificado_{}.pdf\"", id)),
    ];

    Ok((headers, pdf_bytes).into_response())
}
