// src/db/memory_repo.rs

use std::{
    collections::{HashMap, HashSet},
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::OrderStore,
    models::{
        command::FieldUpdate,
        order::{OrderSummary, ServiceOrder},
    },
};

#[derive(Default)]
struct Tables {
    orders: HashMap<Uuid, ServiceOrder>,
    // Ordens com envio de certificado em andamento.
    dispatching: HashSet<Uuid>,
}

/// Store em memória para os testes de serviço. Grava campo a campo, como o Postgres.
#[derive(Default)]
pub struct MemoryOrderStore {
    tables: Mutex<Tables>,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, AppError> {
        self.tables
            .lock()
            .map_err(|_| AppError::InternalServerError(anyhow::anyhow!("store envenenado")))
    }
}

/// Reaplica a atualização sobre a cópia guardada, coluna por coluna.
fn apply_update(order: &mut ServiceOrder, update: &FieldUpdate) {
    match update {
        FieldUpdate::Client(field, value) => {
            // O valor já foi validado pelo workflow.
            if order.client.set(*field, value.clone()).is_err() {
                tracing::warn!("Campo {:?} ignorado ao reaplicar atualização", field);
            }
        }
        FieldUpdate::Boxes(boxes) => order.boxes = boxes.clone(),
        FieldUpdate::Total(total) => order.total = *total,
        FieldUpdate::ScheduledDate(date) => order.scheduled_date = *date,
        FieldUpdate::ScheduledTime(time) => order.scheduled_time = *time,
        FieldUpdate::ProviderContactedAt(date) => order.provider_contacted_at = *date,
        FieldUpdate::ProviderName(name) => order.provider_name = name.clone(),
        FieldUpdate::ProviderPhone(phone) => order.provider_phone = phone.clone(),
        FieldUpdate::Status(status) => order.status = *status,
        FieldUpdate::PaymentMethod(method) => order.payment_method = *method,
        FieldUpdate::PaymentDate(date) => order.payment_date = *date,
        FieldUpdate::ConcludedAt(at) => order.concluded_at = *at,
        FieldUpdate::Rating(rating) => order.rating = *rating,
        FieldUpdate::CertificateGenerated(flag) => order.certificate_generated = *flag,
        FieldUpdate::CertificateSent(flag) => order.certificate_sent = *flag,
        FieldUpdate::CertificateUrl(url) => order.certificate_url = url.clone(),
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn insert(&self, order: &ServiceOrder) -> Result<(), AppError> {
        self.lock()?.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ServiceOrder>, AppError> {
        Ok(self.lock()?.orders.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<OrderSummary>, AppError> {
        let tables = self.lock()?;
        let mut summaries: Vec<OrderSummary> = tables.orders.values().map(OrderSummary::from).collect();
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(summaries)
    }

    async fn save_field(&self, id: Uuid, update: &FieldUpdate) -> Result<(), AppError> {
        let mut tables = self.lock()?;
        let order = tables.orders.get_mut(&id).ok_or(AppError::OrderNotFound)?;
        apply_update(order, update);
        order.updated_at = Utc::now();
        Ok(())
    }

    async fn claim_dispatch(&self, id: Uuid) -> Result<bool, AppError> {
        let mut tables = self.lock()?;
        let sent = tables
            .orders
            .get(&id)
            .map(|o| o.certificate_sent)
            .ok_or(AppError::OrderNotFound)?;
        Ok(!sent && tables.dispatching.insert(id))
    }

    async fn release_dispatch(&self, id: Uuid) -> Result<(), AppError> {
        self.lock()?.dispatching.remove(&id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::order::ClientField;
    use rust_decimal::Decimal;

    #[test]
    fn updates_replay_on_aggregate() {
        let mut order = ServiceOrder::new_draft(Uuid::new_v4(), Utc::now());
        apply_update(&mut order, &FieldUpdate::Client(ClientField::City, Some("Campinas".into())));
        apply_update(&mut order, &FieldUpdate::Total(Decimal::new(60000, 2)));

        assert_eq!(order.client.city.as_deref(), Some("Campinas"));
        assert_eq!(order.total, Decimal::new(60000, 2));
    }

    #[tokio::test]
    async fn dispatch_claim_is_exclusive_until_released() {
        let store = MemoryOrderStore::new();
        let order = ServiceOrder::new_draft(Uuid::new_v4(), Utc::now());
        store.insert(&order).await.unwrap();

        assert!(store.claim_dispatch(order.id).await.unwrap());
        assert!(!store.claim_dispatch(order.id).await.unwrap());

        store.release_dispatch(order.id).await.unwrap();
        assert!(store.claim_dispatch(order.id).await.unwrap());
    }

    #[tokio::test]
    async fn sent_certificate_cannot_be_claimed() {
        let store = MemoryOrderStore::new();
        let order = ServiceOrder::new_draft(Uuid::new_v4(), Utc::now());
        store.insert(&order).await.unwrap();
        store.save_field(order.id, &FieldUpdate::CertificateSent(true)).await.unwrap();

        assert!(!store.claim_dispatch(order.id).await.unwrap());
        assert!(matches!(
            store.claim_dispatch(Uuid::new_v4()).await,
            Err(AppError::OrderNotFound)
        ));
    }
}
