// src/services/storage.rs

use async_trait::async_trait;
use reqwest::Client;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{checklist::ServiceKind, command::OrderCommand},
};

const ALLOWED_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "webp", "heic"];

/// Onde a foto enviada será registrada na ordem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotoTarget {
    Box { box_number: u8 },
    Step { box_number: u8, service: ServiceKind, step: u8 },
}

impl PhotoTarget {
    /// Nome do campo usado no caminho do arquivo.
    pub fn field_name(&self) -> String {
        match self {
            PhotoTarget::Box { box_number } => format!("box{}_foto", box_number),
            PhotoTarget::Step { box_number, service, step } => {
                format!("box{}_{}_etapa{}", box_number, service.slug(), step)
            }
        }
    }

    /// Comando que grava a URL pública no campo correspondente.
    pub fn into_command(self, photo_url: String) -> OrderCommand {
        match self {
            PhotoTarget::Box { box_number } => OrderCommand::SetBoxPhoto {
                box_number,
                photo_url: Some(photo_url),
            },
            PhotoTarget::Step { box_number, service, step } => OrderCommand::SetStepPhoto {
                box_number,
                service,
                step,
                photo_url: Some(photo_url),
            },
        }
    }
}

/// `{orderId}/{fieldName}_{timestamp}.{ext}`
pub fn photo_path(order_id: Uuid, field_name: &str, timestamp_ms: i64, ext: &str) -> String {
    format!("{}/{}_{}.{}", order_id, field_name, timestamp_ms, ext)
}

pub fn normalize_extension(ext: &str) -> Result<String, AppError> {
    let ext = ext.trim().trim_start_matches('.').to_lowercase();
    if ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        Ok(ext)
    } else {
        Err(AppError::InvalidField(format!("extensão '{}'", ext)))
    }
}

pub fn content_type_for(ext: &str) -> &'static str {
    match ext {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "heic" => "image/heic",
        _ => "application/octet-stream",
    }
}

#[async_trait]
pub trait PhotoStorage: Send + Sync {
    /// Envia o arquivo e devolve a URL pública.
    async fn upload(&self, bucket: &str, path: &str, content_type: &str, bytes: Vec<u8>) -> Result<String, AppError>;
}

/// Cliente do storage de objetos (`/storage/v1`).
#[derive(Clone)]
pub struct SupabaseStorage {
    url: String,
    key: String,
    client: Client,
}

impl SupabaseStorage {
    pub fn new(url: &str, key: &str, client: Client) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
            key: key.to_string(),
            client,
        }
    }

    fn object_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/storage/v1/object/{}/{}", self.url, bucket, path)
    }

    pub fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/storage/v1/object/public/{}/{}", self.url, bucket, path)
    }
}

#[async_trait]
impl PhotoStorage for SupabaseStorage {
    async fn upload(&self, bucket: &str, path: &str, content_type: &str, bytes: Vec<u8>) -> Result<String, AppError> {
        let response = self
            .client
            .post(self.object_url(bucket, path))
            .header("apikey", &self.key)
            .bearer_auth(&self.key)
            .header("Content-Type", content_type)
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await
            .map_err(|e| AppError::StorageError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::StorageError(format!("status {}: {}", status.as_u16(), text)));
        }

        Ok(self.public_url(bucket, path))
    }
}
