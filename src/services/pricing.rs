// src/services/pricing.rs

use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use crate::models::{checklist::ServiceKind, order::ShowerBox};

/// Preços fixos por serviço, por box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PriceTable {
    #[schema(example = "250.00")]
    pub maintenance: Decimal,
    #[schema(example = "350.00")]
    pub film: Decimal,
}

impl Default for PriceTable {
    fn default() -> Self {
        Self {
            maintenance: Decimal::new(25000, 2),
            film: Decimal::new(35000, 2),
        }
    }
}

impl PriceTable {
    pub fn unit_price(&self, kind: ServiceKind) -> Decimal {
        match kind {
            ServiceKind::Maintenance => self.maintenance,
            ServiceKind::Film => self.film,
        }
    }

    /// Soma dos serviços selecionados em todos os boxes (concluídos ou não).
    pub fn total(&self, boxes: &[ShowerBox]) -> Decimal {
        boxes
            .iter()
            .flat_map(|b| b.selected_services())
            .map(|kind| self.unit_price(kind))
            .sum()
    }
}
