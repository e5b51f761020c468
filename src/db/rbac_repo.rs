// src/db/rbac_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::common::error::AppError;

/// Papéis de `user_roles` (enum `app_role` no banco) que a API consulta.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppRole {
    Admin,
}

impl AppRole {
    fn as_db(&self) -> &'static str {
        match self {
            AppRole::Admin => "admin",
        }
    }
}

/// Consulta de papéis por usuário.
#[async_trait]
pub trait RoleStore: Send + Sync {
    async fn has_role(&self, user_id: Uuid, role: AppRole) -> Result<bool, AppError>;
}

#[derive(Clone)]
pub struct RbacRepository {
    pool: PgPool,
}

impl RbacRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoleStore for RbacRepository {
    // Delega para a função `public.has_role`, a mesma usada pelas políticas do banco.
    async fn has_role(&self, user_id: Uuid, role: AppRole) -> Result<bool, AppError> {
        let has_role: Option<bool> = sqlx::query_scalar("SELECT public.has_role($1, $2::app_role)")
            .bind(user_id)
            .bind(role.as_db())
            .fetch_one(&self.pool)
            .await?;

        Ok(has_role.unwrap_or(false))
    }
}
