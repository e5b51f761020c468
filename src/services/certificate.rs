// src/services/certificate.rs

use chrono::{DateTime, Months, Utc};
use handlebars::Handlebars;
use serde::Serialize;

use crate::{
    common::error::AppError,
    middleware::i18n::Locale,
    models::{
        checklist::ServiceKind,
        order::{Client, ServiceOrder},
    },
};

/// Dados fixos da empresa prestadora, vindos da configuração.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderInfo {
    pub company_name: String,
    pub document: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertificateLanguage {
    Portuguese,
    English,
}

impl From<&Locale> for CertificateLanguage {
    fn from(locale: &Locale) -> Self {
        if locale.is_english() {
            CertificateLanguage::English
        } else {
            CertificateLanguage::Portuguese
        }
    }
}

// --- Textos fixos ---

struct Labels {
    title: &'static str,
    client: &'static str,
    provider: &'static str,
    name: &'static str,
    phone: &'static str,
    email: &'static str,
    address: &'static str,
    document: &'static str,
    technician: &'static str,
    services: &'static str,
    boxes: &'static str,
    maintenance: &'static str,
    film: &'static str,
    maintenance_summary: [&'static str; 6],
    film_summary: [&'static str; 7],
    cracks_found: &'static str,
    cracks_replacement: &'static str,
    no_cracks: &'static str,
    warranty_heading: &'static str,
    warranty: &'static str,
    generated_at: &'static str,
    conjunction: &'static str,
}

static PT: Labels = Labels {
    title: "Certificado de Serviço",
    client: "Cliente",
    provider: "Prestador",
    name: "Nome",
    phone: "Telefone",
    email: "E-mail",
    address: "Endereço",
    document: "CNPJ/CPF",
    technician: "Técnico responsável",
    services: "Serviços realizados",
    boxes: "Boxes atendidos",
    maintenance: "Manutenção Anual",
    film: "Instalação de Película Protetora",
    maintenance_summary: [
        "Inspeção completa dos vidros",
        "Verificação e ajuste de roldanas e trilhos",
        "Reaperto de fixações e parafusos",
        "Revisão das vedações",
        "Limpeza e lubrificação das partes móveis",
        "Teste de funcionamento",
    ],
    film_summary: [
        "Inspeção dos vidros antes da aplicação",
        "Limpeza profunda da superfície",
        "Medição e corte sob medida",
        "Aplicação da película de segurança",
        "Remoção de bolhas",
        "Acabamento e selagem das bordas",
        "Inspeção final com o cliente",
    ],
    cracks_found: "Foram identificadas trincas nos vidros durante a inspeção.",
    cracks_replacement: "Foram identificadas trincas nos vidros; recomenda-se a substituição.",
    no_cracks: "Nenhuma trinca foi identificada nos vidros.",
    warranty_heading: "Garantia",
    warranty: "Os serviços descritos neste certificado possuem garantia de 1 (um) ano",
    generated_at: "Documento gerado em",
    conjunction: "e",
};

static EN: Labels = Labels {
    title: "Service Certificate",
    client: "Client",
    provider: "Provider",
    name: "Name",
    phone: "Phone",
    email: "E-mail",
    address: "Address",
    document: "Tax ID",
    technician: "Technician",
    services: "Services performed",
    boxes: "Serviced boxes",
    maintenance: "Annual Maintenance",
    film: "Protective Film Installation",
    maintenance_summary: [
        "Full glass inspection",
        "Roller and track check and adjustment",
        "Fixings and screws tightened",
        "Seal review",
        "Cleaning and lubrication of moving parts",
        "Operation test",
    ],
    film_summary: [
        "Glass inspection before application",
        "Deep surface cleaning",
        "Custom measuring and cutting",
        "Safety film application",
        "Bubble removal",
        "Edge finishing and sealing",
        "Final inspection with the client",
    ],
    cracks_found: "Cracks were found in the glass during inspection.",
    cracks_replacement: "Cracks were found in the glass; replacement is recommended.",
    no_cracks: "No cracks were found in the glass.",
    warranty_heading: "Warranty",
    warranty: "The services described in this certificate carry a 1 (one) year warranty",
    generated_at: "Document generated on",
    conjunction: "and",
};

impl CertificateLanguage {
    fn labels(&self) -> &'static Labels {
        match self {
            CertificateLanguage::Portuguese => &PT,
            CertificateLanguage::English => &EN,
        }
    }

    pub fn service_label(&self, kind: ServiceKind) -> &'static str {
        let labels = self.labels();
        match kind {
            ServiceKind::Maintenance => labels.maintenance,
            ServiceKind::Film => labels.film,
        }
    }
}

// --- Conteúdo do certificado ---

/// Uma linha "rótulo: valor" dos blocos de cliente e prestador.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InfoLine {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChecklistSection {
    pub heading: String,
    pub bullets: Vec<String>,
}

/// Conteúdo já resolvido, independente do formato (HTML ou PDF).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateContent {
    pub title: String,
    pub client_heading: String,
    pub client_lines: Vec<InfoLine>,
    pub provider_heading: String,
    pub provider_lines: Vec<InfoLine>,
    pub services_heading: String,
    pub services: Vec<ServiceKind>,
    pub services_line: String,
    pub boxes_line: String,
    pub sections: Vec<ChecklistSection>,
    pub glass_note: String,
    pub warranty_heading: String,
    pub warranty: String,
    pub footer: String,
    pub document_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Certificate {
    pub subject: String,
    pub html: String,
    pub content: CertificateContent,
}

const CERTIFICATE_TEMPLATE_NAME: &str = "certificado";

// `{{...}}` escapa HTML; nenhum campo usa a forma crua `{{{...}}}`.
const CERTIFICATE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{{title}}</title>
<style>
body { font-family: Arial, sans-serif; color: #222; max-width: 720px; margin: 0 auto; padding: 24px; }
h1 { text-align: center; color: #0b4f6c; }
h2 { border-bottom: 1px solid #ccc; padding-bottom: 4px; }
.warranty { background: #eef6f9; padding: 12px; border-radius: 6px; }
footer { margin-top: 32px; font-size: 12px; color: #777; text-align: center; }
</style>
</head>
<body>
<h1>{{title}}</h1>
<section class="client">
<h2>{{clientHeading}}</h2>
{{#each clientLines}}
<p><strong>{{label}}:</strong> {{value}}</p>
{{/each}}
</section>
<section class="provider">
<h2>{{providerHeading}}</h2>
{{#each providerLines}}
<p><strong>{{label}}:</strong> {{value}}</p>
{{/each}}
</section>
<section class="services">
<h2>{{servicesHeading}}</h2>
<p class="service-list">{{servicesLine}}</p>
<p>{{boxesLine}}</p>
{{#each sections}}
<h3>{{heading}}</h3>
<ul>{{#each bullets}}<li>{{this}}</li>{{/each}}</ul>
{{/each}}
<p class="glass">{{glassNote}}</p>
</section>
<section class="warranty">
<h2>{{warrantyHeading}}</h2>
<p>{{warranty}}</p>
</section>
<footer>{{footer}}</footer>
</body>
</html>
"#;

#[derive(Debug, Clone)]
pub struct CertificateRenderer {
    provider: ProviderInfo,
    handlebars: Handlebars<'static>,
}

impl CertificateRenderer {
    pub fn new(provider: ProviderInfo) -> Result<Self, AppError> {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(true);
        handlebars.register_template_string(CERTIFICATE_TEMPLATE_NAME, CERTIFICATE_TEMPLATE)?;
        Ok(Self { provider, handlebars })
    }

    /// Projeta a ordem no conteúdo do certificado. `issued_at` é a data de
    /// geração (e início da garantia).
    pub fn content(
        &self,
        order: &ServiceOrder,
        language: CertificateLanguage,
        issued_at: DateTime<Utc>,
    ) -> Result<CertificateContent, AppError> {
        let services = order.selected_services();
        if services.is_empty() {
            return Err(AppError::NoServiceSelected);
        }

        let l = language.labels();

        let services_line = join_human(
            &services.iter().map(|k| language.service_label(*k)).collect::<Vec<_>>(),
            l.conjunction,
        );

        let sections = services
            .iter()
            .map(|kind| ChecklistSection {
                heading: language.service_label(*kind).to_string(),
                bullets: match kind {
                    ServiceKind::Maintenance => l.maintenance_summary.iter().map(|s| s.to_string()).collect(),
                    ServiceKind::Film => l.film_summary.iter().map(|s| s.to_string()).collect(),
                },
            })
            .collect();

        let boxes_line = order
            .boxes
            .iter()
            .filter(|b| b.selected_services().next().is_some())
            .map(|b| match &b.environment {
                Some(env) => format!("Box {} ({})", b.number, env),
                None => format!("Box {}", b.number),
            })
            .collect::<Vec<_>>()
            .join(", ");

        // Único detalhe dinâmico do checklist: trincas nos vidros dos serviços selecionados.
        let findings = order
            .boxes
            .iter()
            .flat_map(|b| b.selected_services().map(move |k| b.service(k).checklist.glass_findings()))
            .fold((false, false), |(cracks, replace), f| (cracks || f.cracks, replace || f.needs_replacement));
        let glass_note = match findings {
            (_, true) => l.cracks_replacement,
            (true, false) => l.cracks_found,
            (false, false) => l.no_cracks,
        }
        .to_string();

        let issued_date = issued_at.date_naive();
        let expires = issued_date
            .checked_add_months(Months::new(12))
            .unwrap_or(issued_date);
        let warranty = match language {
            CertificateLanguage::Portuguese => format!(
                "{}, a partir de {}, válida até {}.",
                l.warranty,
                issued_date.format("%d/%m/%Y"),
                expires.format("%d/%m/%Y")
            ),
            CertificateLanguage::English => format!(
                "{}, starting {}, valid until {}.",
                l.warranty,
                issued_date.format("%d/%m/%Y"),
                expires.format("%d/%m/%Y")
            ),
        };

        let mut provider_lines = vec![InfoLine { label: l.name.to_string(), value: self.provider.company_name.clone() }];
        push_opt(&mut provider_lines, l.document, self.provider.document.as_deref());
        push_opt(&mut provider_lines, l.phone, self.provider.phone.as_deref());
        push_opt(&mut provider_lines, l.technician, order.provider_name.as_deref());
        push_opt(&mut provider_lines, l.phone, order.provider_phone.as_deref());

        Ok(CertificateContent {
            title: l.title.to_string(),
            client_heading: l.client.to_string(),
            client_lines: client_lines(&order.client, l),
            provider_heading: l.provider.to_string(),
            provider_lines,
            services_heading: l.services.to_string(),
            services,
            services_line,
            boxes_line: format!("{}: {}", l.boxes, boxes_line),
            sections,
            glass_note,
            warranty_heading: l.warranty_heading.to_string(),
            warranty,
            footer: format!("{} {}", l.generated_at, issued_at.format("%d/%m/%Y %H:%M UTC")),
            document_url: order.certificate_url.clone(),
        })
    }

    pub fn render(
        &self,
        order: &ServiceOrder,
        language: CertificateLanguage,
        issued_at: DateTime<Utc>,
    ) -> Result<Certificate, AppError> {
        let content = self.content(order, language, issued_at)?;
        let subject = format!("{} - {}", content.title, order.client.name);
        let html = self.handlebars.render(CERTIFICATE_TEMPLATE_NAME, &content)?;
        Ok(Certificate { subject, html, content })
    }
}

fn client_lines(client: &Client, l: &Labels) -> Vec<InfoLine> {
    let mut lines = vec![InfoLine { label: l.name.to_string(), value: client.name.clone() }];
    push_opt(&mut lines, l.phone, client.phone.as_deref());
    push_opt(&mut lines, l.email, client.email.as_deref());

    let street = [client.street.as_deref(), client.number.as_deref(), client.complement.as_deref()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(", ");
    let city = match (client.city.as_deref(), client.state.as_deref()) {
        (Some(city), Some(state)) => Some(format!("{}/{}", city, state)),
        (Some(city), None) => Some(city.to_string()),
        _ => None,
    };
    let address = [
        Some(street).filter(|s| !s.is_empty()),
        client.neighborhood.clone(),
        city,
        client.postal_code.clone(),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join(" - ");
    push_opt(&mut lines, l.address, Some(address.as_str()).filter(|a| !a.is_empty()));

    lines
}

fn push_opt(lines: &mut Vec<InfoLine>, label: &str, value: Option<&str>) {
    if let Some(v) = value.map(str::trim).filter(|v| !v.is_empty()) {
        lines.push(InfoLine { label: label.to_string(), value: v.to_string() });
    }
}

/// "A", "A e B", "A, B e C".
fn join_human(items: &[&str], conjunction: &str) -> String {
    match items {
        [] => String::new(),
        [one] => one.to_string(),
        [init @ .., last] => format!("{} {} {}", init.join(", "), conjunction, last),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    use crate::models::checklist::{GlassFindings, GLASS_INSPECTION_STEP};

    fn renderer() -> CertificateRenderer {
        CertificateRenderer::new(ProviderInfo {
            company_name: "Box Brilho Serviços".into(),
            document: Some("12.345.678/0001-99".into()),
            phone: None,
        })
        .unwrap()
    }

    fn order_with(maintenance: bool, film: bool) -> ServiceOrder {
        let mut order = ServiceOrder::new_draft(Uuid::new_v4(), Utc::now());
        order.client.name = "Maria Silva".into();
        order.client.street = Some("Rua das Flores".into());
        order.client.number = Some("12".into());
        order.client.city = Some("Campinas".into());
        order.client.state = Some("SP".into());
        order.boxes[0].maintenance.selected = maintenance;
        order.boxes[0].film.selected = film;
        order
    }

    fn issued() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 15, 30, 0).unwrap()
    }

    #[test]
    fn no_service_no_certificate() {
        let result = renderer().render(&order_with(false, false), CertificateLanguage::Portuguese, issued());
        assert!(matches!(result, Err(AppError::NoServiceSelected)));
    }

    #[test]
    fn lists_exactly_the_selected_services() {
        let cert = renderer()
            .render(&order_with(true, false), CertificateLanguage::English, issued())
            .unwrap();

        assert_eq!(cert.content.services, vec![ServiceKind::Maintenance]);
        assert!(cert.html.contains("Annual Maintenance"));
        assert!(!cert.html.contains("Protective Film Installation"));

        let both = renderer()
            .render(&order_with(true, true), CertificateLanguage::English, issued())
            .unwrap();
        assert_eq!(both.content.services_line, "Annual Maintenance and Protective Film Installation");
    }

    #[test]
    fn portuguese_is_default_language() {
        let cert = renderer()
            .render(&order_with(false, true), CertificateLanguage::from(&Locale::default()), issued())
            .unwrap();

        assert!(cert.html.contains("Instalação de Película Protetora"));
        assert!(!cert.html.contains("Manutenção Anual"));
        assert_eq!(cert.subject, "Certificado de Serviço - Maria Silva");
    }

    #[test]
    fn warranty_runs_for_one_year_from_generation() {
        let cert = renderer()
            .render(&order_with(true, false), CertificateLanguage::Portuguese, issued())
            .unwrap();

        assert!(cert.content.warranty.contains("01/03/2024"));
        assert!(cert.content.warranty.contains("01/03/2025"));
        assert_eq!(cert.content.footer, "Documento gerado em 01/03/2024 15:30 UTC");
    }

    #[test]
    fn glass_cracks_are_the_only_dynamic_detail() {
        let mut order = order_with(true, false);
        let clean = renderer().render(&order, CertificateLanguage::English, issued()).unwrap();
        assert_eq!(clean.content.glass_note, EN.no_cracks);

        order.boxes[0]
            .maintenance
            .checklist
            .step_mut(GLASS_INSPECTION_STEP)
            .unwrap()
            .set_flags(GlassFindings { cracks: true, needs_replacement: false })
            .unwrap();
        let cracked = renderer().render(&order, CertificateLanguage::English, issued()).unwrap();
        assert_eq!(cracked.content.glass_note, EN.cracks_found);

        // Etapas concluídas não mudam o texto fixo do checklist.
        order.boxes[0].maintenance.checklist.step_mut(2).unwrap().set_completed(true);
        let again = renderer().render(&order, CertificateLanguage::English, issued()).unwrap();
        assert_eq!(again.content.sections, cracked.content.sections);
    }

    #[test]
    fn user_text_is_escaped() {
        let mut order = order_with(true, false);
        order.client.name = "<script>alert('x')</script>".into();
        let cert = renderer().render(&order, CertificateLanguage::Portuguese, issued()).unwrap();

        assert!(!cert.html.contains("<script>"));
        assert!(cert.html.contains("&lt;script&gt;"));
    }

    #[test]
    fn provider_text_is_escaped_too() {
        let renderer = CertificateRenderer::new(ProviderInfo {
            company_name: "Vidros & Cia <b>".into(),
            document: None,
            phone: None,
        })
        .unwrap();
        let cert = renderer
            .render(&order_with(true, false), CertificateLanguage::Portuguese, issued())
            .unwrap();

        assert!(cert.html.contains("Vidros &amp; Cia &lt;b&gt;"));
        assert!(!cert.html.contains("<b>"));
    }

    #[test]
    fn template_renders_every_block() {
        let cert = renderer()
            .render(&order_with(true, true), CertificateLanguage::Portuguese, issued())
            .unwrap();

        assert!(cert.html.contains("<strong>Nome:</strong> Maria Silva"));
        assert!(cert.html.contains("<strong>CNPJ/CPF:</strong> 12.345.678/0001-99"));
        assert!(cert.html.contains("<li>Teste de funcionamento</li>"));
        assert!(cert.html.contains("<h3>Instalação de Película Protetora</h3>"));
        assert!(cert.html.contains("<footer>Documento gerado em 01/03/2024 15:30 UTC</footer>"));
    }

    #[test]
    fn rendering_is_deterministic() {
        let order = order_with(true, true);
        let a = renderer().render(&order, CertificateLanguage::Portuguese, issued()).unwrap();
        let b = renderer().render(&order, CertificateLanguage::Portuguese, issued()).unwrap();
        assert_eq!(a.html, b.html);
    }

    #[test]
    fn address_block_joins_present_parts() {
        let order = order_with(true, false);
        let content = renderer().content(&order, CertificateLanguage::Portuguese, issued()).unwrap();
        let address = content
            .client_lines
            .iter()
            .find(|line| line.label == "Endereço")
            .map(|line| line.value.as_str());
        assert_eq!(address, Some("Rua das Flores, 12 - Campinas/SP"));
    }

    #[test]
    fn join_human_handles_lists() {
        assert_eq!(join_human(&[], "e"), "");
        assert_eq!(join_human(&["A"], "e"), "A");
        assert_eq!(join_human(&["A", "B", "C"], "e"), "A, B e C");
    }
}
