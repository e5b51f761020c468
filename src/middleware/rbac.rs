// src/middleware/rbac.rs

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};

use crate::{
    common::error::{ApiError, AppError},
    middleware::i18n::Locale,
    models::auth::User,
    services::auth::AuthService,
};

/// Deve rodar depois do `auth_guard`: exige o papel `admin` no banco.
pub async fn admin_guard(
    State(auth_service): State<AuthService>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let locale = Locale::from_headers(request.headers());

    // Copia só o ID: a requisição não pode ficar emprestada durante o await.
    let user_id = request
        .extensions()
        .get::<User>()
        .map(|user| user.id)
        .ok_or_else(|| AppError::InvalidToken.to_api_error(&locale))?;

    let is_admin = auth_service
        .is_admin(user_id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    if !is_admin {
        tracing::warn!("🚫 Usuário {} sem papel de admin", user_id);
        return Err(AppError::Forbidden.to_api_error(&locale));
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::{http::StatusCode, middleware, routing::get, Router};
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::db::{AppRole, RoleStore};

    struct FixedRoles {
        admins: Vec<Uuid>,
    }

    #[async_trait]
    impl RoleStore for FixedRoles {
        async fn has_role(&self, user_id: Uuid, role: AppRole) -> Result<bool, AppError> {
            Ok(role == AppRole::Admin && self.admins.contains(&user_id))
        }
    }

    fn app(admins: Vec<Uuid>) -> Router {
        let auth_service = AuthService::new(Arc::new(FixedRoles { admins }), "segredo".into());
        Router::new()
            .route("/me", get(|| async { "ok" }))
            .layer(middleware::from_fn_with_state(auth_service, admin_guard))
    }

    fn request_as(user: Option<Uuid>) -> Request<Body> {
        let mut request = Request::builder()
            .uri("/me")
            .header("accept-language", "en")
            .body(Body::empty())
            .unwrap();
        if let Some(id) = user {
            request.extensions_mut().insert(User { id, email: None });
        }
        request
    }

    #[tokio::test]
    async fn admin_passes_through() {
        let admin = Uuid::new_v4();
        let response = app(vec![admin]).oneshot(request_as(Some(admin))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn non_admin_is_forbidden() {
        let response = app(vec![Uuid::new_v4()])
            .oneshot(request_as(Some(Uuid::new_v4())))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn missing_user_is_unauthorized() {
        let response = app(vec![Uuid::new_v4()]).oneshot(request_as(None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
