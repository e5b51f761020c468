// src/models/checklist.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::common::error::AppError;

// --- Enums ---

/// Linha de serviço aplicada a um box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceKind {
    /// Manutenção anual
    Maintenance,
    /// Instalação de película protetora
    Film,
}

impl ServiceKind {
    pub const ALL: [ServiceKind; 2] = [ServiceKind::Maintenance, ServiceKind::Film];

    /// Nome curto usado em caminhos de arquivo e colunas.
    pub fn slug(&self) -> &'static str {
        match self {
            ServiceKind::Maintenance => "manutencao",
            ServiceKind::Film => "pelicula",
        }
    }

    fn template(&self) -> &'static [StepTemplate] {
        match self {
            ServiceKind::Maintenance => &MAINTENANCE_STEPS,
            ServiceKind::Film => &FILM_STEPS,
        }
    }
}

// --- Modelos fixos dos checklists ---

struct StepTemplate {
    title: &'static str,
    description: &'static str,
}

/// A inspeção dos vidros é sempre a primeira etapa, nos dois checklists.
pub const GLASS_INSPECTION_STEP: u8 = 1;

static MAINTENANCE_STEPS: [StepTemplate; 6] = [
    StepTemplate {
        title: "Inspeção dos vidros",
        description: "Verificar trincas, lascas e pontos de tensão em todas as folhas de vidro.",
    },
    StepTemplate {
        title: "Roldanas e trilhos",
        description: "Checar desgaste das roldanas e alinhamento dos trilhos; substituir se necessário.",
    },
    StepTemplate {
        title: "Fixações e parafusos",
        description: "Reapertar parafusos, suportes e perfis de fixação.",
    },
    StepTemplate {
        title: "Vedações",
        description: "Avaliar borrachas e silicone; refazer a vedação onde houver infiltração.",
    },
    StepTemplate {
        title: "Limpeza e lubrificação",
        description: "Limpar trilhos e perfis e lubrificar as partes móveis.",
    },
    StepTemplate {
        title: "Teste de funcionamento",
        description: "Abrir e fechar o box completo, confirmando deslizamento e travamento.",
    },
];

static FILM_STEPS: [StepTemplate; 7] = [
    StepTemplate {
        title: "Inspeção dos vidros",
        description: "Verificar trincas e lascas antes da aplicação da película.",
    },
    StepTemplate {
        title: "Limpeza profunda",
        description: "Remover gordura, calcário e resíduos da superfície do vidro.",
    },
    StepTemplate {
        title: "Medição e corte",
        description: "Medir cada folha e cortar a película com sobra de acabamento.",
    },
    StepTemplate {
        title: "Aplicação da película",
        description: "Aplicar a película com solução deslizante, do centro para as bordas.",
    },
    StepTemplate {
        title: "Remoção de bolhas",
        description: "Espatular toda a área até eliminar bolhas e excesso de solução.",
    },
    StepTemplate {
        title: "Acabamento das bordas",
        description: "Refilar e selar as bordas da película.",
    },
    StepTemplate {
        title: "Inspeção final",
        description: "Conferir aderência, transparência e acabamento com o cliente.",
    },
];

// --- Structs ---

/// Achados da inspeção dos vidros.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GlassFindings {
    pub cracks: bool,
    pub needs_replacement: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistStep {
    #[schema(example = 1)]
    pub number: u8,
    #[schema(example = "Inspeção dos vidros")]
    pub title: String,
    pub description: String,
    pub completed: bool,
    pub photo_url: Option<String>,
    pub note: Option<String>,
    /// Presente apenas na etapa de inspeção dos vidros.
    pub glass_findings: Option<GlassFindings>,
}

impl ChecklistStep {
    pub fn set_completed(&mut self, completed: bool) {
        self.completed = completed;
    }

    pub fn set_photo(&mut self, photo_url: Option<String>) {
        self.photo_url = photo_url;
    }

    pub fn set_note(&mut self, note: Option<String>) {
        self.note = note.filter(|n| !n.trim().is_empty());
    }

    pub fn set_flags(&mut self, findings: GlassFindings) -> Result<(), AppError> {
        match self.glass_findings.as_mut() {
            Some(current) => {
                *current = findings;
                Ok(())
            }
            None => Err(AppError::InvalidField(format!("glassFindings (etapa {})", self.number))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Checklist {
    pub kind: ServiceKind,
    pub steps: Vec<ChecklistStep>,
}

impl Checklist {
    /// Instancia o modelo fixo do serviço para um box.
    pub fn for_kind(kind: ServiceKind) -> Self {
        let steps = kind
            .template()
            .iter()
            .zip(1u8..)
            .map(|(template, number)| ChecklistStep {
                number,
                title: template.title.to_string(),
                description: template.description.to_string(),
                completed: false,
                photo_url: None,
                note: None,
                glass_findings: (number == GLASS_INSPECTION_STEP).then(GlassFindings::default),
            })
            .collect();

        Self { kind, steps }
    }

    pub fn step(&self, number: u8) -> Result<&ChecklistStep, AppError> {
        self.steps
            .iter()
            .find(|s| s.number == number)
            .ok_or(AppError::InvalidStep(number))
    }

    pub fn step_mut(&mut self, number: u8) -> Result<&mut ChecklistStep, AppError> {
        self.steps
            .iter_mut()
            .find(|s| s.number == number)
            .ok_or(AppError::InvalidStep(number))
    }

    pub fn first_incomplete(&self) -> Option<&ChecklistStep> {
        self.steps.iter().find(|s| !s.completed)
    }

    /// Falha com a primeira etapa pendente.
    pub fn ensure_done(&self) -> Result<(), AppError> {
        match self.first_incomplete() {
            Some(step) => Err(AppError::IncompleteChecklist {
                number: step.number,
                title: step.title.clone(),
            }),
            None => Ok(()),
        }
    }

    pub fn glass_findings(&self) -> GlassFindings {
        self.step(GLASS_INSPECTION_STEP)
            .ok()
            .and_then(|s| s.glass_findings)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn templates_have_fixed_sizes() {
        assert_eq!(Checklist::for_kind(ServiceKind::Maintenance).steps.len(), 6);
        assert_eq!(Checklist::for_kind(ServiceKind::Film).steps.len(), 7);
    }

    #[test]
    fn only_glass_step_accepts_flags() {
        let mut checklist = Checklist::for_kind(ServiceKind::Film);
        let flags = GlassFindings { cracks: true, needs_replacement: false };

        assert!(checklist.step_mut(GLASS_INSPECTION_STEP).unwrap().set_flags(flags).is_ok());
        assert_eq!(checklist.glass_findings(), flags);

        let err = checklist.step_mut(4).unwrap().set_flags(flags).unwrap_err();
        assert!(matches!(err, AppError::InvalidField(_)));
    }

    #[test]
    fn ensure_done_names_first_pending_step() {
        let mut checklist = Checklist::for_kind(ServiceKind::Maintenance);
        for number in [1, 2, 4, 5, 6] {
            checklist.step_mut(number).unwrap().set_completed(true);
        }

        match checklist.ensure_done() {
            Err(AppError::IncompleteChecklist { number, title }) => {
                assert_eq!(number, 3);
                assert_eq!(title, "Fixações e parafusos");
            }
            other => panic!("esperava checklist incompleto, veio {:?}", other),
        }

        checklist.step_mut(3).unwrap().set_completed(true);
        assert!(checklist.ensure_done().is_ok());
        assert!(checklist.first_incomplete().is_none());
    }

    #[test]
    fn steps_are_independent() {
        let mut checklist = Checklist::for_kind(ServiceKind::Film);
        checklist.step_mut(7).unwrap().set_completed(true);

        assert!(checklist.step(7).unwrap().completed);
        assert_eq!(checklist.first_incomplete().map(|s| s.number), Some(1));
    }

    #[test]
    fn blank_notes_are_cleared() {
        let mut checklist = Checklist::for_kind(ServiceKind::Maintenance);
        let step = checklist.step_mut(2).unwrap();

        step.set_note(Some("roldana trocada".into()));
        assert_eq!(step.note.as_deref(), Some("roldana trocada"));

        step.set_note(Some("   ".into()));
        assert!(step.note.is_none());
    }

    #[test]
    fn unknown_step_is_rejected() {
        let checklist = Checklist::for_kind(ServiceKind::Maintenance);
        assert!(matches!(checklist.step(7), Err(AppError::InvalidStep(7))));
    }
}
