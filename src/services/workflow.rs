// src/services/workflow.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    common::error::AppError,
    models::{
        checklist::GLASS_INSPECTION_STEP,
        command::{FieldUpdate, OrderCommand},
        order::{OrderStatus, PaymentMethod, ServiceOrder},
    },
    services::pricing::PriceTable,
};

/// Resultado de uma transição de etapa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Transition {
    Applied,
    /// A etapa já tinha sido alcançada; nada foi alterado.
    AlreadySatisfied,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub transition: Transition,
    pub updates: Vec<FieldUpdate>,
}

impl Outcome {
    fn applied(updates: Vec<FieldUpdate>) -> Self {
        Self { transition: Transition::Applied, updates }
    }

    fn already_satisfied() -> Self {
        Self { transition: Transition::AlreadySatisfied, updates: Vec::new() }
    }
}

// Grupos de campos e a etapa em que cada um pode ser editado.
#[derive(Debug, Clone, Copy)]
enum FieldGroup {
    // Seleção de serviços e quantidade de boxes: definem o orçamento.
    Budget,
    Payment,
    // Cliente, agenda, prestador e checklists.
    Details,
    Rating,
}

/// Máquina de estados da ordem: Rascunho -> Orçamento aprovado ->
/// Pagamento confirmado -> Certificado emitido. Só avança.
#[derive(Debug, Clone)]
pub struct Workflow {
    prices: PriceTable,
}

impl Workflow {
    pub fn new(prices: PriceTable) -> Self {
        Self { prices }
    }

    fn ensure_editable(order: &ServiceOrder, group: FieldGroup) -> Result<(), AppError> {
        let editable = match group {
            FieldGroup::Budget => order.status == OrderStatus::Draft,
            FieldGroup::Payment => order.status == OrderStatus::BudgetApproved,
            FieldGroup::Details => order.status < OrderStatus::CertificateIssued,
            FieldGroup::Rating => true,
        };

        if editable { Ok(()) } else { Err(AppError::FieldLocked) }
    }

    // =========================================================================
    //  COMANDOS
    // =========================================================================

    /// Valida e aplica um comando. Devolve os campos que precisam ser gravados.
    pub fn apply(&self, order: &mut ServiceOrder, command: OrderCommand) -> Result<Vec<FieldUpdate>, AppError> {
        match command {
            OrderCommand::SetClientField { field, value } => {
                Self::ensure_editable(order, FieldGroup::Details)?;
                order.client.set(field, value)?;
                let stored = order.client.get(field).map(str::to_string);
                Ok(vec![FieldUpdate::Client(field, stored)])
            }

            OrderCommand::SetBoxCount { count } => {
                Self::ensure_editable(order, FieldGroup::Budget)?;
                order.resize_boxes(count);
                Ok(self.boxes_and_total(order))
            }

            OrderCommand::SetBoxEnvironment { box_number, environment } => {
                Self::ensure_editable(order, FieldGroup::Details)?;
                order.box_mut(box_number)?.environment = normalize(environment);
                Ok(vec![FieldUpdate::Boxes(order.boxes.clone())])
            }

            OrderCommand::SetBoxPhoto { box_number, photo_url } => {
                Self::ensure_editable(order, FieldGroup::Details)?;
                order.box_mut(box_number)?.photo_url = normalize(photo_url);
                Ok(vec![FieldUpdate::Boxes(order.boxes.clone())])
            }

            OrderCommand::ToggleBoxService { box_number, service, selected } => {
                Self::ensure_editable(order, FieldGroup::Budget)?;
                let line = order.box_mut(box_number)?.service_mut(service);
                line.selected = selected;
                if !selected {
                    line.concluded = false;
                }
                Ok(self.boxes_and_total(order))
            }

            OrderCommand::CompleteChecklistStep { box_number, service, step, completed } => {
                Self::ensure_editable(order, FieldGroup::Details)?;
                let line = order.box_mut(box_number)?.service_mut(service);
                line.checklist.step_mut(step)?.set_completed(completed);
                // Serviço concluído exige checklist completo.
                if !completed {
                    line.concluded = false;
                }
                Ok(vec![FieldUpdate::Boxes(order.boxes.clone())])
            }

            OrderCommand::SetStepPhoto { box_number, service, step, photo_url } => {
                Self::ensure_editable(order, FieldGroup::Details)?;
                order
                    .box_mut(box_number)?
                    .service_mut(service)
                    .checklist
                    .step_mut(step)?
                    .set_photo(normalize(photo_url));
                Ok(vec![FieldUpdate::Boxes(order.boxes.clone())])
            }

            OrderCommand::SetStepNote { box_number, service, step, note } => {
                Self::ensure_editable(order, FieldGroup::Details)?;
                order
                    .box_mut(box_number)?
                    .service_mut(service)
                    .checklist
                    .step_mut(step)?
                    .set_note(note);
                Ok(vec![FieldUpdate::Boxes(order.boxes.clone())])
            }

            OrderCommand::SetGlassFindings { box_number, service, findings } => {
                Self::ensure_editable(order, FieldGroup::Details)?;
                order
                    .box_mut(box_number)?
                    .service_mut(service)
                    .checklist
                    .step_mut(GLASS_INSPECTION_STEP)?
                    .set_flags(findings)?;
                Ok(vec![FieldUpdate::Boxes(order.boxes.clone())])
            }

            OrderCommand::ConcludeBoxService { box_number, service, concluded } => {
                Self::ensure_editable(order, FieldGroup::Details)?;
                let line = order.box_mut(box_number)?.service_mut(service);
                if concluded {
                    if !line.selected {
                        return Err(AppError::ServiceNotSelected);
                    }
                    line.checklist.ensure_done()?;
                }
                line.concluded = concluded;
                Ok(vec![FieldUpdate::Boxes(order.boxes.clone())])
            }

            OrderCommand::SetSchedule { date, time } => {
                Self::ensure_editable(order, FieldGroup::Details)?;
                order.scheduled_date = date;
                order.scheduled_time = time;
                Ok(vec![FieldUpdate::ScheduledDate(date), FieldUpdate::ScheduledTime(time)])
            }

            OrderCommand::SetProviderContactedAt { date } => {
                Self::ensure_editable(order, FieldGroup::Details)?;
                order.provider_contacted_at = date;
                Ok(vec![FieldUpdate::ProviderContactedAt(date)])
            }

            OrderCommand::SetProvider { name, phone } => {
                Self::ensure_editable(order, FieldGroup::Details)?;
                order.provider_name = normalize(name);
                order.provider_phone = normalize(phone);
                Ok(vec![
                    FieldUpdate::ProviderName(order.provider_name.clone()),
                    FieldUpdate::ProviderPhone(order.provider_phone.clone()),
                ])
            }

            OrderCommand::SetPaymentMethod { method } => {
                Self::ensure_editable(order, FieldGroup::Payment)?;
                order.payment_method = method;
                Ok(vec![FieldUpdate::PaymentMethod(method)])
            }

            OrderCommand::SetPaymentDate { date } => {
                Self::ensure_editable(order, FieldGroup::Payment)?;
                order.payment_date = date;
                Ok(vec![FieldUpdate::PaymentDate(date)])
            }

            OrderCommand::SetRating { rating } => {
                Self::ensure_editable(order, FieldGroup::Rating)?;
                order.rating = rating;
                Ok(vec![FieldUpdate::Rating(rating)])
            }
        }
    }

    fn boxes_and_total(&self, order: &mut ServiceOrder) -> Vec<FieldUpdate> {
        order.total = self.prices.total(&order.boxes);
        vec![FieldUpdate::Boxes(order.boxes.clone()), FieldUpdate::Total(order.total)]
    }

    // =========================================================================
    //  TRANSIÇÕES
    // =========================================================================

    pub fn approve_budget(&self, order: &mut ServiceOrder) -> Result<Outcome, AppError> {
        if order.status >= OrderStatus::BudgetApproved {
            return Ok(Outcome::already_satisfied());
        }

        let total = self.prices.total(&order.boxes);
        if total.is_zero() {
            return Err(AppError::EmptyBudget);
        }

        order.total = total;
        order.status = OrderStatus::BudgetApproved;
        Ok(Outcome::applied(vec![
            FieldUpdate::Total(total),
            FieldUpdate::Status(order.status),
        ]))
    }

    /// Forma e data podem vir junto com a confirmação ou já estar gravadas.
    pub fn confirm_payment(
        &self,
        order: &mut ServiceOrder,
        method: Option<PaymentMethod>,
        date: Option<NaiveDate>,
    ) -> Result<Outcome, AppError> {
        if order.status >= OrderStatus::PaymentConfirmed {
            return Ok(Outcome::already_satisfied());
        }
        if order.status < OrderStatus::BudgetApproved {
            return Err(AppError::InvalidTransition(order.status.label().to_string()));
        }

        let (Some(method), Some(date)) = (method.or(order.payment_method), date.or(order.payment_date)) else {
            return Err(AppError::MissingPaymentInfo);
        };

        order.payment_method = Some(method);
        order.payment_date = Some(date);
        order.status = OrderStatus::PaymentConfirmed;
        Ok(Outcome::applied(vec![
            FieldUpdate::PaymentMethod(Some(method)),
            FieldUpdate::PaymentDate(Some(date)),
            FieldUpdate::Status(order.status),
        ]))
    }

    /// Marca o certificado como gerado. O envio é registrado à parte, em
    /// `mark_certificate_sent`, só depois que o e-mail sair.
    pub fn issue_certificate(&self, order: &mut ServiceOrder, now: DateTime<Utc>) -> Result<Outcome, AppError> {
        if order.status == OrderStatus::CertificateIssued {
            return Ok(Outcome::already_satisfied());
        }
        if !order.has_any_service() {
            return Err(AppError::NoServiceSelected);
        }
        if order.status < OrderStatus::PaymentConfirmed {
            return Err(AppError::InvalidTransition(order.status.label().to_string()));
        }
        if order.client.name.trim().is_empty() {
            return Err(AppError::MissingClientName);
        }

        order.concluded_at = Some(now);
        order.certificate_generated = true;
        order.status = OrderStatus::CertificateIssued;

        // A ordem importa: o banco exige data de conclusão antes do flag.
        Ok(Outcome::applied(vec![
            FieldUpdate::ConcludedAt(order.concluded_at),
            FieldUpdate::CertificateGenerated(true),
            FieldUpdate::Status(order.status),
        ]))
    }

    pub fn mark_certificate_sent(
        &self,
        order: &mut ServiceOrder,
        document_url: Option<String>,
    ) -> Result<Vec<FieldUpdate>, AppError> {
        if !order.certificate_generated {
            return Err(AppError::CertificateNotIssued);
        }

        order.certificate_sent = true;
        let mut updates = vec![FieldUpdate::CertificateSent(true)];
        if let Some(url) = normalize(document_url) {
            order.certificate_url = Some(url);
            updates.push(FieldUpdate::CertificateUrl(order.certificate_url.clone()));
        }
        Ok(updates)
    }
}

fn normalize(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
