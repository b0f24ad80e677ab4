use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use shared_database::{Document, StoreError};
use shared_models::error::AppError;

pub const PHYSICIANS_COLLECTION: &str = "medicos";
pub const PLAN_AGREEMENTS_COLLECTION: &str = "medico_convenios";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Specialty {
    pub category_id: String,
    pub subcategories: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Physician {
    pub id: String,
    pub name: String,
    pub crm: String,
    pub specialties: Vec<Specialty>,
}

impl Physician {
    /// Older records carry a single `especialidadeId` instead of the list.
    pub fn from_document(doc: &Document) -> Option<Self> {
        let name = doc.str_field("nome").filter(|n| !n.trim().is_empty())?;

        let mut specialties: Vec<Specialty> = doc
            .field("especialidades")
            .and_then(Value::as_array)
            .map(|entries| entries.iter().filter_map(parse_specialty).collect())
            .unwrap_or_default();

        if specialties.is_empty() {
            if let Some(category_id) = doc.str_field("especialidadeId").filter(|c| !c.is_empty()) {
                specialties.push(Specialty {
                    category_id: category_id.to_string(),
                    subcategories: Vec::new(),
                });
            }
        }

        Some(Self {
            id: doc.id.clone(),
            name: name.to_string(),
            crm: doc.str_field("crm").unwrap_or_default().to_string(),
            specialties,
        })
    }

    /// A physician with no subcategories listed for the category covers all of them.
    pub fn offers(&self, category_id: &str, subcategory_id: Option<&str>) -> bool {
        self.specialties.iter().any(|specialty| {
            specialty.category_id == category_id
                && match subcategory_id {
                    None => true,
                    Some(sub) => {
                        specialty.subcategories.is_empty() || specialty.subcategories.iter().any(|s| s == sub)
                    }
                }
        })
    }
}

fn parse_specialty(entry: &Value) -> Option<Specialty> {
    let category_id = entry.get("categoriaId").and_then(Value::as_str)?;
    let subcategories = entry
        .get("subcategorias")
        .and_then(Value::as_array)
        .map(|subs| subs.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default();

    Some(Specialty {
        category_id: category_id.to_string(),
        subcategories,
    })
}

/// A physician's acceptance of one insurance plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanAgreement {
    pub physician_id: String,
    pub insurance_plan_id: String,
    pub plan_name: String,
    /// `None` when the agreement sets no monthly cap.
    pub monthly_limit: Option<u32>,
}

impl PlanAgreement {
    pub fn from_document(doc: &Document) -> Option<Self> {
        let physician_id = doc.str_field("medicoId")?;
        let insurance_plan_id = doc.str_field("convenioId")?;

        let monthly_limit = match doc.field("limiteMensal") {
            None | Some(Value::Null) => None,
            Some(value) => match value.as_i64().and_then(|n| u32::try_from(n).ok()) {
                Some(limit) => Some(limit),
                None => {
                    warn!("Plan agreement {} has an unreadable limiteMensal {}", doc.id, value);
                    Some(0)
                }
            },
        };

        Some(Self {
            physician_id: physician_id.to_string(),
            insurance_plan_id: insurance_plan_id.to_string(),
            plan_name: doc.str_field("nome").unwrap_or_default().to_string(),
            monthly_limit,
        })
    }

    pub fn has_room(&self, booked_this_month: usize) -> bool {
        self.monthly_limit.map_or(true, |limit| booked_this_month < limit as usize)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DirectoryQuery {
    pub category: String,
    pub subcategory: Option<String>,
    pub plan: String,
    pub year: Option<i32>,
    pub month: Option<u32>,
}

/// A physician the patient may pick for the chosen specialty and plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EligiblePhysician {
    pub id: String,
    pub name: String,
    pub crm: String,
    pub plan_name: String,
    pub monthly_limit: Option<u32>,
    pub booked_this_month: usize,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DirectoryError {
    #[error("Invalid physician query: {0}")]
    InvalidQuery(String),

    #[error("Document store unavailable: {0}")]
    StoreUnavailable(String),
}

impl From<StoreError> for DirectoryError {
    fn from(err: StoreError) -> Self {
        DirectoryError::StoreUnavailable(err.to_string())
    }
}

impl From<DirectoryError> for AppError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::InvalidQuery(_) => AppError::BadRequest(err.to_string()),
            DirectoryError::StoreUnavailable(_) => AppError::StoreUnavailable(err.to_string()),
        }
    }
}
