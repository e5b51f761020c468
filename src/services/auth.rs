// src/services/auth.rs

use std::sync::Arc;

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{AppRole, RoleStore},
    models::auth::{Claims, User, AUTHENTICATED_AUDIENCE},
};

/// Valida os tokens emitidos pelo provedor de autenticação. Senhas e login
/// ficam todos do lado do provedor.
#[derive(Clone)]
pub struct AuthService {
    roles: Arc<dyn RoleStore>,
    jwt_secret: String,
}

impl AuthService {
    pub fn new(roles: Arc<dyn RoleStore>, jwt_secret: String) -> Self {
        Self { roles, jwt_secret }
    }

    pub fn validate_token(&self, token: &str) -> Result<User, AppError> {
        decode_user(token, &self.jwt_secret)
    }

    pub async fn is_admin(&self, user_id: Uuid) -> Result<bool, AppError> {
        self.roles.has_role(user_id, AppRole::Admin).await
    }
}

fn decode_user(token: &str, secret: &str) -> Result<User, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[AUTHENTICATED_AUDIENCE]);

    let token_data = decode::<Claims>(token, &DecodingKey::from_secret(secret.as_ref()), &validation)
        .map_err(|e| {
            tracing::debug!("Token rejeitado: {}", e);
            AppError::InvalidToken
        })?;

    Ok(User::from(token_data.claims))
}
