// src/services/document_service.rs

use genpdf::{elements, style, Element};
use image::Luma;
use qrcode::QrCode;

use crate::{
    common::error::AppError,
    services::certificate::{CertificateContent, InfoLine},
};

/// Gera a versão em PDF do certificado, a partir do mesmo conteúdo do HTML.
#[derive(Debug, Clone)]
pub struct DocumentService {
    fonts_dir: String,
}

impl DocumentService {
    pub fn new(fonts_dir: impl Into<String>) -> Self {
        Self { fonts_dir: fonts_dir.into() }
    }

    pub fn certificate_pdf(&self, content: &CertificateContent) -> Result<Vec<u8>, AppError> {
        // Carrega a fonte da pasta configurada
        let font_family = genpdf::fonts::from_files(&self.fonts_dir, "Roboto", None)
            .map_err(|_| AppError::FontNotFound(format!("Fonte não encontrada na pasta {}", self.fonts_dir)))?;

        let mut doc = genpdf::Document::new(font_family);
        doc.set_title(content.title.clone());
        let mut decorator = genpdf::SimplePageDecorator::new();
        decorator.set_margins(10);
        doc.set_page_decorator(decorator);

        // --- CABEÇALHO ---
        let mut title = elements::Paragraph::new(content.title.clone());
        title.set_alignment(genpdf::Alignment::Center);
        doc.push(title.styled(style::Style::new().bold().with_font_size(18)));
        doc.push(elements::Break::new(1.5));

        // --- CLIENTE E PRESTADOR ---
        push_block(&mut doc, &content.client_heading, &content.client_lines);
        push_block(&mut doc, &content.provider_heading, &content.provider_lines);

        // --- SERVIÇOS ---
        doc.push(elements::Paragraph::new(content.services_heading.clone())
            .styled(style::Style::new().bold().with_font_size(14)));
        doc.push(elements::Paragraph::new(content.services_line.clone()));
        doc.push(elements::Paragraph::new(content.boxes_line.clone())
            .styled(style::Style::new().with_font_size(10)));
        doc.push(elements::Break::new(1));

        for section in &content.sections {
            doc.push(elements::Paragraph::new(section.heading.clone())
                .styled(style::Style::new().bold().with_font_size(12)));
            let mut list = elements::UnorderedList::new();
            for bullet in &section.bullets {
                list.push(elements::Paragraph::new(bullet.clone()));
            }
            doc.push(list);
            doc.push(elements::Break::new(1));
        }

        doc.push(elements::Paragraph::new(content.glass_note.clone())
            .styled(style::Style::new().italic()));
        doc.push(elements::Break::new(1.5));

        // --- GARANTIA ---
        doc.push(elements::Paragraph::new(content.warranty_heading.clone())
            .styled(style::Style::new().bold().with_font_size(12)));
        doc.push(elements::Paragraph::new(content.warranty.clone()));

        // --- QR CODE (link do certificado online) ---
        if let Some(url) = &content.document_url {
            doc.push(elements::Break::new(1.5));

            let code = QrCode::new(url.as_bytes())
                .map_err(|e| AppError::InternalServerError(anyhow::Error::msg(e.to_string())))?;

            let image_buffer = code.render::<Luma<u8>>().build();
            let dynamic_image = image::DynamicImage::ImageLuma8(image_buffer);

            let pdf_image = elements::Image::from_dynamic_image(dynamic_image)
                .map_err(|e| AppError::InternalServerError(anyhow::Error::msg(e.to_string())))?
                .with_scale(genpdf::Scale::new(0.5, 0.5));

            doc.push(pdf_image);
        }

        // --- RODAPÉ ---
        doc.push(elements::Break::new(2));
        doc.push(elements::Paragraph::new(content.footer.clone())
            .styled(style::Style::new().italic().with_font_size(8)));

        // Renderiza para Buffer (Memória)
        let mut buffer = Vec::new();
        doc.render(&mut buffer)
            .map_err(|e| AppError::InternalServerError(anyhow::Error::msg(e.to_string())))?;

        Ok(buffer)
    }
}

fn push_block(doc: &mut genpdf::Document, heading: &str, lines: &[InfoLine]) {
    doc.push(elements::Paragraph::new(heading.to_string())
        .styled(style::Style::new().bold().with_font_size(14)));
    for line in lines {
        doc.push(elements::Paragraph::new(format!("{}: {}", line.label, line.value)));
    }
    doc.push(elements::Break::new(1));
}
