// src/services/order_service.rs

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use url::Url;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::OrderStore,
    models::{
        command::{FieldUpdate, OrderCommand},
        order::{OrderSummary, PaymentMethod, Rating, ServiceOrder},
    },
    services::{
        certificate::{Certificate, CertificateLanguage, CertificateRenderer},
        document_service::DocumentService,
        mailer::{CertificateMailer, CertificateMessage},
        route::build_route_url,
        storage::{content_type_for, normalize_extension, photo_path, PhotoStorage, PhotoTarget},
        workflow::{Transition, Workflow},
    },
};

/// Resposta das transições: a ordem atualizada e se algo mudou.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransitionReport {
    pub transition: Transition,
    pub order: ServiceOrder,
}

#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn OrderStore>,
    workflow: Workflow,
    renderer: CertificateRenderer,
    documents: DocumentService,
    mailer: Arc<dyn CertificateMailer>,
    storage: Arc<dyn PhotoStorage>,
    photo_bucket: String,
    admin_email: Option<String>,
}

impl OrderService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn OrderStore>,
        workflow: Workflow,
        renderer: CertificateRenderer,
        documents: DocumentService,
        mailer: Arc<dyn CertificateMailer>,
        storage: Arc<dyn PhotoStorage>,
        photo_bucket: String,
        admin_email: Option<String>,
    ) -> Self {
        Self {
            store,
            workflow,
            renderer,
            documents,
            mailer,
            storage,
            photo_bucket,
            admin_email,
        }
    }

    // Grava os campos um a um, na ordem em que o workflow os devolveu.
    async fn persist(&self, id: Uuid, updates: &[FieldUpdate]) -> Result<(), AppError> {
        for update in updates {
            self.store.save_field(id, update).await?;
        }
        Ok(())
    }

    // --- ORDENS ---

    /// Cria a ordem em rascunho já com os comandos iniciais aplicados. Se algum
    /// for recusado, nada é gravado.
    pub async fn create_order(&self, initial: Vec<OrderCommand>) -> Result<ServiceOrder, AppError> {
        let mut order = ServiceOrder::new_draft(Uuid::new_v4(), Utc::now());
        for command in initial {
            self.workflow.apply(&mut order, command)?;
        }
        self.store.insert(&order).await?;

        tracing::info!("📝 Ordem {} criada em rascunho", order.id);
        Ok(order)
    }

    pub async fn get_order(&self, id: Uuid) -> Result<ServiceOrder, AppError> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or(AppError::OrderNotFound)
    }

    pub async fn list_orders(&self) -> Result<Vec<OrderSummary>, AppError> {
        self.store.list().await
    }

    pub async fn apply_command(&self, id: Uuid, command: OrderCommand) -> Result<ServiceOrder, AppError> {
        let mut order = self.get_order(id).await?;
        let updates = self.workflow.apply(&mut order, command)?;
        self.persist(id, &updates).await?;
        Ok(order)
    }

    pub async fn set_rating(&self, id: Uuid, rating: Option<Rating>) -> Result<ServiceOrder, AppError> {
        self.apply_command(id, OrderCommand::SetRating { rating }).await
    }

    // --- TRANSIÇÕES ---

    pub async fn approve_budget(&self, id: Uuid) -> Result<TransitionReport, AppError> {
        let mut order = self.get_order(id).await?;
        let outcome = self.workflow.approve_budget(&mut order)?;
        self.persist(id, &outcome.updates).await?;

        if outcome.transition == Transition::Applied {
            tracing::info!("💰 Orçamento da ordem {} aprovado: R$ {}", id, order.total);
        }
        Ok(TransitionReport { transition: outcome.transition, order })
    }

    pub async fn confirm_payment(
        &self,
        id: Uuid,
        method: Option<PaymentMethod>,
        date: Option<NaiveDate>,
    ) -> Result<TransitionReport, AppError> {
        let mut order = self.get_order(id).await?;
        let outcome = self.workflow.confirm_payment(&mut order, method, date)?;
        self.persist(id, &outcome.updates).await?;

        if outcome.transition == Transition::Applied {
            tracing::info!("💳 Pagamento da ordem {} confirmado", id);
        }
        Ok(TransitionReport { transition: outcome.transition, order })
    }

    /// Emite o certificado e envia por e-mail. Se o envio falhar, a ordem fica
    /// emitida mas não enviada, e uma nova chamada reenvia o mesmo documento.
    /// Chamadas concorrentes disputam uma reserva; só a vencedora envia.
    pub async fn issue_certificate(
        &self,
        id: Uuid,
        language: CertificateLanguage,
    ) -> Result<TransitionReport, AppError> {
        let order = self.get_order(id).await?;

        if order.certificate_sent {
            return Ok(TransitionReport { transition: Transition::AlreadySatisfied, order });
        }

        let client_email = order
            .client
            .email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(str::to_string)
            .ok_or(AppError::MissingClientEmail)?;

        if !self.store.claim_dispatch(id).await? {
            tracing::info!("⏳ Certificado da ordem {} já enviado ou em envio", id);
            let order = self.get_order(id).await?;
            return Ok(TransitionReport { transition: Transition::AlreadySatisfied, order });
        }

        let result = self.issue_and_dispatch(order, language, client_email).await;

        if let Err(e) = self.store.release_dispatch(id).await {
            tracing::error!("🔥 Falha ao liberar a reserva de envio da ordem {}: {}", id, e);
        }
        result
    }

    // Roda com a reserva de envio em mãos.
    async fn issue_and_dispatch(
        &self,
        mut order: ServiceOrder,
        language: CertificateLanguage,
        client_email: String,
    ) -> Result<TransitionReport, AppError> {
        let id = order.id;
        let outcome = self.workflow.issue_certificate(&mut order, Utc::now())?;
        self.persist(id, &outcome.updates).await?;

        if outcome.transition == Transition::AlreadySatisfied {
            tracing::info!("🔁 Reenviando certificado da ordem {}", id);
        }

        let issued_at = order.concluded_at.unwrap_or_else(Utc::now);
        let certificate = self.renderer.render(&order, language, issued_at)?;

        let message = CertificateMessage {
            order_id: id,
            client_email,
            admin_email: self.admin_email.clone(),
            subject: certificate.subject,
            html: certificate.html,
        };

        let receipt = match self.mailer.send_certificate(&message).await {
            Ok(receipt) => receipt,
            Err(e) => {
                tracing::error!("🔥 Falha ao enviar certificado da ordem {}: {}", id, e);
                return Err(e);
            }
        };

        let updates = self.workflow.mark_certificate_sent(&mut order, receipt.document_url)?;
        self.persist(id, &updates).await?;

        tracing::info!("📨 Certificado da ordem {} enviado para {}", id, message.client_email);
        Ok(TransitionReport { transition: Transition::Applied, order })
    }

    // --- CERTIFICADO (VISUALIZAÇÃO) ---

    pub async fn render_certificate(
        &self,
        id: Uuid,
        language: CertificateLanguage,
    ) -> Result<Certificate, AppError> {
        let order = self.get_order(id).await?;
        let issued_at = match (order.certificate_generated, order.concluded_at) {
            (true, Some(at)) => at,
            _ => return Err(AppError::CertificateNotIssued),
        };
        self.renderer.render(&order, language, issued_at)
    }

    pub async fn certificate_pdf(&self, id: Uuid, language: CertificateLanguage) -> Result<Vec<u8>, AppError> {
        let certificate = self.render_certificate(id, language).await?;
        let documents = self.documents.clone();

        // genpdf é síncrono e pesado; roda fora do executor.
        tokio::task::spawn_blocking(move || documents.certificate_pdf(&certificate.content))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de geração do PDF: {}", e))?
    }

    // --- FOTOS ---

    /// Envia a foto e grava a URL pública no box ou etapa indicada.
    pub async fn upload_photo(
        &self,
        id: Uuid,
        target: PhotoTarget,
        ext: &str,
        bytes: Vec<u8>,
    ) -> Result<ServiceOrder, AppError> {
        let ext = normalize_extension(ext)?;
        let mut order = self.get_order(id).await?;

        // Valida box, etapa e bloqueio antes de subir o arquivo.
        self.workflow
            .apply(&mut order.clone(), target.into_command(String::new()))?;

        let path = photo_path(id, &target.field_name(), Utc::now().timestamp_millis(), &ext);
        let url = self
            .storage
            .upload(&self.photo_bucket, &path, content_type_for(&ext), bytes)
            .await?;

        tracing::info!("📷 Foto {} enviada para a ordem {}", path, id);

        let updates = self.workflow.apply(&mut order, target.into_command(url))?;
        self.persist(id, &updates).await?;
        Ok(order)
    }

    // --- ROTA ---

    pub async fn route_url(&self, id: Uuid) -> Result<Url, AppError> {
        let order = self.get_order(id).await?;
        build_route_url(&order.client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::MemoryOrderStore,
        models::{
            checklist::ServiceKind,
            order::{ClientField, OrderStatus},
        },
        services::{certificate::ProviderInfo, mailer::DispatchReceipt, pricing::PriceTable},
    };
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use std::{str::FromStr, sync::Mutex};

    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<CertificateMessage>>,
        failures_left: Mutex<u32>,
    }

    impl RecordingMailer {
        fn failing(times: u32) -> Self {
            Self { sent: Mutex::new(Vec::new()), failures_left: Mutex::new(times) }
        }

        fn sent(&self) -> Vec<CertificateMessage> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CertificateMailer for RecordingMailer {
        async fn send_certificate(&self, message: &CertificateMessage) -> Result<DispatchReceipt, AppError> {
            // Cede a vez ao executor, como faria a chamada HTTP real.
            tokio::task::yield_now().await;

            let mut failures = self.failures_left.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(AppError::DeliveryError("timeout".into()));
            }
            self.sent.lock().unwrap().push(message.clone());
            Ok(DispatchReceipt { document_url: Some("https://cdn.exemplo.com/cert.html".into()) })
        }
    }

    #[derive(Default)]
    struct FakeStorage {
        paths: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl PhotoStorage for FakeStorage {
        async fn upload(&self, bucket: &str, path: &str, _content_type: &str, _bytes: Vec<u8>) -> Result<String, AppError> {
            self.paths.lock().unwrap().push(path.to_string());
            Ok(format!("https://storage.exemplo.com/{}/{}", bucket, path))
        }
    }

    struct Harness {
        service: OrderService,
        mailer: Arc<RecordingMailer>,
        storage: Arc<FakeStorage>,
    }

    fn harness(mailer: RecordingMailer) -> Harness {
        let mailer = Arc::new(mailer);
        let storage = Arc::new(FakeStorage::default());
        let service = OrderService::new(
            Arc::new(MemoryOrderStore::new()),
            Workflow::new(PriceTable::default()),
            CertificateRenderer::new(ProviderInfo::default()).unwrap(),
            DocumentService::new("./fonts"),
            mailer.clone(),
            storage.clone(),
            "fotos-os".into(),
            Some("admin@boxservice.com.br".into()),
        );
        Harness { service, mailer, storage }
    }

    async fn set_client(service: &OrderService, id: Uuid, field: ClientField, value: &str) {
        service
            .apply_command(id, OrderCommand::SetClientField { field, value: Some(value.into()) })
            .await
            .unwrap();
    }

    // Maria Silva, um box, só manutenção, checklist completo e pagamento confirmado.
    async fn paid_maintenance_order(service: &OrderService) -> Uuid {
        let id = service.create_order(Vec::new()).await.unwrap().id;
        set_client(service, id, ClientField::Name, "Maria Silva").await;
        set_client(service, id, ClientField::Email, "maria@email.com").await;

        let box_number = 1;
        let kind = ServiceKind::Maintenance;
        service
            .apply_command(id, OrderCommand::ToggleBoxService { box_number, service: kind, selected: true })
            .await
            .unwrap();
        for step in 1..=6 {
            service
                .apply_command(id, OrderCommand::CompleteChecklistStep { box_number, service: kind, step, completed: true })
                .await
                .unwrap();
        }
        service
            .apply_command(id, OrderCommand::ConcludeBoxService { box_number, service: kind, concluded: true })
            .await
            .unwrap();

        service.approve_budget(id).await.unwrap();
        service
            .confirm_payment(id, Some(PaymentMethod::Pix), NaiveDate::from_ymd_opt(2024, 3, 1))
            .await
            .unwrap();
        id
    }

    #[tokio::test]
    async fn maintenance_order_goes_end_to_end() {
        let h = harness(RecordingMailer::default());
        let id = paid_maintenance_order(&h.service).await;

        let stored = h.service.get_order(id).await.unwrap();
        assert_eq!(stored.total, Decimal::from_str("250.00").unwrap());
        assert_eq!(stored.status, OrderStatus::PaymentConfirmed);

        let report = h.service.issue_certificate(id, CertificateLanguage::English).await.unwrap();
        assert_eq!(report.transition, Transition::Applied);

        let stored = h.service.get_order(id).await.unwrap();
        assert_eq!(stored.status, OrderStatus::CertificateIssued);
        assert!(stored.concluded_at.is_some());
        assert!(stored.certificate_generated && stored.certificate_sent);
        assert_eq!(stored.certificate_url.as_deref(), Some("https://cdn.exemplo.com/cert.html"));

        let sent = h.mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].client_email, "maria@email.com");
        assert_eq!(sent[0].admin_email.as_deref(), Some("admin@boxservice.com.br"));
        assert!(sent[0].html.contains("Annual Maintenance"));
        assert!(!sent[0].html.contains("Protective Film Installation"));
    }

    #[tokio::test]
    async fn failed_dispatch_can_be_retried_once() {
        let h = harness(RecordingMailer::failing(1));
        let id = paid_maintenance_order(&h.service).await;

        let err = h.service.issue_certificate(id, CertificateLanguage::Portuguese).await.unwrap_err();
        assert!(matches!(err, AppError::DeliveryError(_)));

        let after_failure = h.service.get_order(id).await.unwrap();
        assert!(after_failure.certificate_generated);
        assert!(!after_failure.certificate_sent);
        let concluded_at = after_failure.concluded_at;

        let retry = h.service.issue_certificate(id, CertificateLanguage::Portuguese).await.unwrap();
        assert_eq!(retry.transition, Transition::Applied);
        assert_eq!(retry.order.concluded_at, concluded_at);
        assert_eq!(h.mailer.sent().len(), 1);

        let again = h.service.issue_certificate(id, CertificateLanguage::Portuguese).await.unwrap();
        assert_eq!(again.transition, Transition::AlreadySatisfied);
        assert_eq!(h.mailer.sent().len(), 1);
    }

    #[tokio::test]
    async fn concurrent_issue_sends_a_single_email() {
        let h = harness(RecordingMailer::default());
        let id = paid_maintenance_order(&h.service).await;

        let (a, b) = tokio::join!(
            h.service.issue_certificate(id, CertificateLanguage::Portuguese),
            h.service.issue_certificate(id, CertificateLanguage::Portuguese),
        );
        let mut transitions = vec![a.unwrap().transition, b.unwrap().transition];
        transitions.sort_by_key(|t| *t == Transition::AlreadySatisfied);

        assert_eq!(transitions, vec![Transition::Applied, Transition::AlreadySatisfied]);
        assert_eq!(h.mailer.sent().len(), 1);
        assert!(h.service.get_order(id).await.unwrap().certificate_sent);
    }

    #[tokio::test]
    async fn create_with_blank_name_stores_nothing() {
        let h = harness(RecordingMailer::default());
        let initial = vec![OrderCommand::SetClientField { field: ClientField::Name, value: Some("   ".into()) }];

        let err = h.service.create_order(initial).await.unwrap_err();
        assert!(matches!(err, AppError::MissingClientName));
        assert!(h.service.list_orders().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_applies_initial_client_fields() {
        let h = harness(RecordingMailer::default());
        let initial = vec![
            OrderCommand::SetClientField { field: ClientField::Name, value: Some(" Maria Silva ".into()) },
            OrderCommand::SetClientField { field: ClientField::Email, value: Some("maria@email.com".into()) },
        ];

        let order = h.service.create_order(initial).await.unwrap();
        let stored = h.service.get_order(order.id).await.unwrap();
        assert_eq!(stored.client.name, "Maria Silva");
        assert_eq!(stored.client.email.as_deref(), Some("maria@email.com"));
    }

    #[tokio::test]
    async fn certificate_requires_client_email() {
        let h = harness(RecordingMailer::default());
        let id = paid_maintenance_order(&h.service).await;
        h.service
            .apply_command(id, OrderCommand::SetClientField { field: ClientField::Email, value: None })
            .await
            .unwrap();

        let err = h.service.issue_certificate(id, CertificateLanguage::Portuguese).await.unwrap_err();
        assert!(matches!(err, AppError::MissingClientEmail));

        let stored = h.service.get_order(id).await.unwrap();
        assert_eq!(stored.status, OrderStatus::PaymentConfirmed);
        assert!(h.mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn preview_needs_issued_certificate() {
        let h = harness(RecordingMailer::default());
        let id = paid_maintenance_order(&h.service).await;

        let err = h.service.render_certificate(id, CertificateLanguage::Portuguese).await.unwrap_err();
        assert!(matches!(err, AppError::CertificateNotIssued));

        h.service.issue_certificate(id, CertificateLanguage::Portuguese).await.unwrap();
        let certificate = h.service.render_certificate(id, CertificateLanguage::Portuguese).await.unwrap();
        assert!(certificate.html.contains("Manutenção Anual"));
        assert_eq!(certificate.subject, format!("{} - Maria Silva", certificate.content.title));
    }

    #[tokio::test]
    async fn unknown_order_is_not_found() {
        let h = harness(RecordingMailer::default());
        let err = h.service.get_order(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::OrderNotFound));

        let err = h.service.approve_budget(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::OrderNotFound));
    }

    #[tokio::test]
    async fn empty_budget_keeps_draft() {
        let h = harness(RecordingMailer::default());
        let id = h.service.create_order(Vec::new()).await.unwrap().id;

        let err = h.service.approve_budget(id).await.unwrap_err();
        assert!(matches!(err, AppError::EmptyBudget));
        assert_eq!(h.service.get_order(id).await.unwrap().status, OrderStatus::Draft);
    }

    #[tokio::test]
    async fn box_count_changes_are_persisted() {
        let h = harness(RecordingMailer::default());
        let id = h.service.create_order(Vec::new()).await.unwrap().id;

        h.service
            .apply_command(id, OrderCommand::ToggleBoxService { box_number: 1, service: ServiceKind::Film, selected: true })
            .await
            .unwrap();
        h.service.apply_command(id, OrderCommand::SetBoxCount { count: 3 }).await.unwrap();

        let stored = h.service.get_order(id).await.unwrap();
        assert_eq!(stored.boxes.iter().map(|b| b.number).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert!(stored.boxes[0].film.selected);
        assert_eq!(stored.total, Decimal::from_str("350.00").unwrap());

        h.service.apply_command(id, OrderCommand::SetBoxCount { count: 0 }).await.unwrap();
        assert_eq!(h.service.get_order(id).await.unwrap().boxes.len(), 1);
    }

    #[tokio::test]
    async fn rating_is_accepted_after_issue() {
        let h = harness(RecordingMailer::default());
        let id = paid_maintenance_order(&h.service).await;
        h.service.issue_certificate(id, CertificateLanguage::Portuguese).await.unwrap();

        let rating = Rating::try_from(5).unwrap();
        let order = h.service.set_rating(id, Some(rating)).await.unwrap();
        assert_eq!(order.rating, Some(rating));
        assert_eq!(h.service.get_order(id).await.unwrap().rating, Some(rating));
    }

    #[tokio::test]
    async fn step_photo_is_uploaded_and_recorded() {
        let h = harness(RecordingMailer::default());
        let id = h.service.create_order(Vec::new()).await.unwrap().id;
        let target = PhotoTarget::Step { box_number: 1, service: ServiceKind::Maintenance, step: 2 };

        let order = h.service.upload_photo(id, target, "JPG", vec![0xFF, 0xD8]).await.unwrap();

        let paths = h.storage.paths.lock().unwrap().clone();
        assert_eq!(paths.len(), 1);
        assert!(paths[0].starts_with(&format!("{}/box1_manutencao_etapa2_", id)));
        assert!(paths[0].ends_with(".jpg"));

        let step = order.boxes[0].maintenance.checklist.step(2).unwrap();
        assert_eq!(step.photo_url.as_deref(), Some(format!("https://storage.exemplo.com/fotos-os/{}", paths[0]).as_str()));
    }

    #[tokio::test]
    async fn photo_for_missing_box_is_not_uploaded() {
        let h = harness(RecordingMailer::default());
        let id = h.service.create_order(Vec::new()).await.unwrap().id;

        let err = h
            .service
            .upload_photo(id, PhotoTarget::Box { box_number: 4 }, "png", vec![1])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidBoxIndex(4)));
        assert!(h.storage.paths.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn route_needs_address() {
        let h = harness(RecordingMailer::default());
        let id = h.service.create_order(Vec::new()).await.unwrap().id;
        assert!(matches!(h.service.route_url(id).await, Err(AppError::IncompleteAddress)));

        set_client(&h.service, id, ClientField::Street, "Av. Paulista").await;
        set_client(&h.service, id, ClientField::Number, "1000").await;
        set_client(&h.service, id, ClientField::City, "São Paulo").await;
        let url = h.service.route_url(id).await.unwrap();
        assert!(url.as_str().starts_with("https://www.google.com/maps/dir/"));
    }
}
