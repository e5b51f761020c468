// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;
use crate::services;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Orders ---
        handlers::orders::list_orders,
        handlers::orders::create_order,
        handlers::orders::get_order,
        handlers::orders::apply_command,
        handlers::orders::set_rating,
        handlers::orders::upload_photo,
        handlers::orders::get_route,

        // --- Workflow ---
        handlers::orders::approve_budget,
        handlers::orders::confirm_payment,
        handlers::orders::issue_certificate,

        // --- Certificates ---
        handlers::documents::certificate_html,
        handlers::documents::certificate_pdf,

        // --- Admin ---
        handlers::admin::get_me,
    ),
    components(
        schemas(
            // --- Ordem ---
            models::order::OrderStatus,
            models::order::PaymentMethod,
            models::order::Rating,
            models::order::Client,
            models::order::ClientField,
            models::order::ServiceLine,
            models::order::ShowerBox,
            models::order::ServiceOrder,
            models::order::OrderSummary,

            // --- Checklist ---
            models::checklist::ServiceKind,
            models::checklist::GlassFindings,
            models::checklist::ChecklistStep,
            models::checklist::Checklist,

            // --- Comandos e transições ---
            models::command::OrderCommand,
            services::workflow::Transition,
            services::order_service::TransitionReport,

            // --- Payloads ---
            handlers::orders::CreateOrderPayload,
            handlers::orders::ConfirmPaymentPayload,
            handlers::orders::RatingPayload,
            handlers::orders::RouteResponse,

            // --- Auth ---
            models::auth::User,
        )
    ),
    tags(
        (name = "Orders", description = "Ordens de serviço, comandos de edição, fotos e rota"),
        (name = "Workflow", description = "Orçamento, pagamento e emissão do certificado"),
        (name = "Certificates", description = "Visualização do certificado (HTML e PDF)"),
        (name = "Admin", description = "Área administrativa")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}
