// src/handlers/admin.rs

use axum::Json;

use crate::{middleware::auth::AuthenticatedUser, models::auth::User};

// GET /api/admin/me
#[utoipa::path(
    get,
    path = "/api/admin/me",
    tag = "Admin",
    responses(
        (status = 200, description = "Administrador autenticado", body = User),
        (status = 401, description = "Token ausente ou inválido"),
        (status = 403, description = "Usuário sem papel de admin")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_me(AuthenticatedUser(user): AuthenticatedUser) -> Json<User> {
    Json(user)
}
