// src/services/mailer.rs

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::error::AppError;

/// Mensagem entregue à função de e-mail.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateMessage {
    pub order_id: Uuid,
    pub client_email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_email: Option<String>,
    pub subject: String,
    pub html: String,
}

/// Resposta da função. A URL do documento é opcional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchReceipt {
    #[serde(default)]
    pub document_url: Option<String>,
}

#[async_trait]
pub trait CertificateMailer: Send + Sync {
    /// Uma única tentativa; qualquer falha vira `DeliveryError`.
    async fn send_certificate(&self, message: &CertificateMessage) -> Result<DispatchReceipt, AppError>;
}

/// Dispara o e-mail por meio de uma edge function (`/functions/v1/{nome}`).
#[derive(Clone)]
pub struct FunctionsMailer {
    url: String,
    key: String,
    function: String,
    client: Client,
}

impl FunctionsMailer {
    pub fn new(url: &str, key: &str, function: &str, timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::InternalServerError(e.into()))?;

        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            key: key.to_string(),
            function: function.to_string(),
            client,
        })
    }

    fn function_url(&self) -> String {
        format!("{}/functions/v1/{}", self.url, self.function)
    }
}

#[async_trait]
impl CertificateMailer for FunctionsMailer {
    async fn send_certificate(&self, message: &CertificateMessage) -> Result<DispatchReceipt, AppError> {
        let response = self
            .client
            .post(self.function_url())
            .header("apikey", &self.key)
            .bearer_auth(&self.key)
            .json(message)
            .send()
            .await
            .map_err(|e| AppError::DeliveryError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::DeliveryError(format!(
                "Função {} falhou com status {}: {}",
                self.function, status.as_u16(), text
            )));
        }

        // Corpo vazio ou fora do formato não invalida um envio bem-sucedido.
        let body = response
            .bytes()
            .await
            .map_err(|e| AppError::DeliveryError(e.to_string()))?;
        Ok(serde_json::from_slice(&body).unwrap_or_default())
    }
}
