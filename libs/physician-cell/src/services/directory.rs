use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use serde_json::Value;
use tracing::{debug, warn};

use availability_cell::BOOKINGS_COLLECTION;
use shared_database::{Document, DocumentStore};
use shared_utils::{AppState, Clock};

use crate::models::{
    DirectoryError, DirectoryQuery, EligiblePhysician, Physician, PlanAgreement, PHYSICIANS_COLLECTION,
    PLAN_AGREEMENTS_COLLECTION,
};

/// Physician lookups for the booking wizard.
pub struct PhysicianDirectory {
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
}

impl PhysicianDirectory {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: state.store.clone(),
            clock: state.clock.clone(),
        }
    }

    /// Physicians offering the specialty who accept the plan and still have
    /// room under its monthly limit. Year and month default to the current ones.
    pub async fn eligible_physicians(&self, query: DirectoryQuery) -> Result<Vec<EligiblePhysician>, DirectoryError> {
        if query.category.trim().is_empty() || query.plan.trim().is_empty() {
            return Err(DirectoryError::InvalidQuery("category and plan are required".to_string()));
        }

        let today = self.clock.today();
        let year = query.year.unwrap_or(today.year());
        let month = query.month.unwrap_or(today.month());
        if NaiveDate::from_ymd_opt(year, month, 1).is_none() {
            return Err(DirectoryError::InvalidQuery(format!("invalid month {}-{}", year, month)));
        }

        let (physician_docs, agreement_docs, booking_docs) = futures::try_join!(
            self.store.list(PHYSICIANS_COLLECTION),
            self.store.find_by(PLAN_AGREEMENTS_COLLECTION, "convenioId", &query.plan),
            self.store.find_by(BOOKINGS_COLLECTION, "convenioId", &query.plan),
        )?;

        let agreements: HashMap<String, PlanAgreement> = agreement_docs
            .iter()
            .filter_map(PlanAgreement::from_document)
            .map(|agreement| (agreement.physician_id.clone(), agreement))
            .collect();

        let mut monthly_counts: HashMap<&str, usize> = HashMap::new();
        for doc in &booking_docs {
            if let Some(physician_id) = doc.str_field("medicoId") {
                if booking_month(doc) == Some((year, month)) {
                    *monthly_counts.entry(physician_id).or_insert(0) += 1;
                }
            }
        }

        let mut eligible: Vec<EligiblePhysician> = physician_docs
            .iter()
            .filter_map(|doc| {
                let parsed = Physician::from_document(doc);
                if parsed.is_none() {
                    warn!("Skipping physician {} without a name", doc.id);
                }
                parsed
            })
            .filter(|physician| physician.offers(&query.category, query.subcategory.as_deref()))
            .filter_map(|physician| {
                let agreement = agreements.get(&physician.id)?;
                let booked = monthly_counts.get(physician.id.as_str()).copied().unwrap_or(0);
                if !agreement.has_room(booked) {
                    debug!(
                        "Physician {} reached the {} limit for plan {} in {}-{}",
                        physician.id, booked, query.plan, year, month
                    );
                    return None;
                }

                Some(EligiblePhysician {
                    id: physician.id,
                    name: physician.name,
                    crm: physician.crm,
                    plan_name: agreement.plan_name.clone(),
                    monthly_limit: agreement.monthly_limit,
                    booked_this_month: booked,
                })
            })
            .collect();

        eligible.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(eligible)
    }
}

/// Uses `mes`/`ano` when present, otherwise the booking date.
fn booking_month(doc: &Document) -> Option<(i32, u32)> {
    let stored = doc
        .field("ano")
        .and_then(Value::as_i64)
        .zip(doc.field("mes").and_then(Value::as_i64));
    if let Some((year, month)) = stored {
        return Some((i32::try_from(year).ok()?, u32::try_from(month).ok()?));
    }

    let date = NaiveDate::parse_from_str(doc.str_field("data")?, "%Y-%m-%d").ok()?;
    Some((date.year(), date.month()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    use shared_utils::test_utils::{MockStoreDocuments, TestConfig};

    fn query(category: &str, subcategory: Option<&str>, plan: &str) -> DirectoryQuery {
        DirectoryQuery {
            category: category.to_string(),
            subcategory: subcategory.map(str::to_string),
            plan: plan.to_string(),
            year: None,
            month: None,
        }
    }

    async fn seeded() -> (AppState, Arc<shared_database::MemoryStore>) {
        let (state, store, _) = TestConfig::default().to_state("2025-03-10T10:30");
        store.insert_with_id(
            PHYSICIANS_COLLECTION,
            "m1",
            MockStoreDocuments::physician("Dra. Ana Costa", "12345-SP", &[("cat-cardio", &["sub-arritmia"])]),
        ).await;
        store.insert_with_id(
            PHYSICIANS_COLLECTION,
            "m2",
            MockStoreDocuments::physician("Dr. Bruno Lima", "54321-SP", &[("cat-cardio", &[])]),
        ).await;
        store.insert_with_id(
            PHYSICIANS_COLLECTION,
            "m3",
            MockStoreDocuments::physician("Dra. Carla Dias", "11111-SP", &[("cat-derma", &[])]),
        ).await;
        store.insert_with_id(PLAN_AGREEMENTS_COLLECTION, "a1", MockStoreDocuments::plan_agreement("m1", "plan-1", "Unimed", 1)).await;
        store.insert_with_id(PLAN_AGREEMENTS_COLLECTION, "a2", MockStoreDocuments::plan_agreement("m2", "plan-1", "Unimed", 5)).await;
        store.insert_with_id(PLAN_AGREEMENTS_COLLECTION, "a3", MockStoreDocuments::plan_agreement("m3", "plan-1", "Unimed", 5)).await;
        (state, store)
    }

    #[tokio::test]
    async fn test_filters_by_specialty_and_plan() {
        let (state, _) = seeded().await;
        let directory = PhysicianDirectory::new(&state);

        let found = directory.eligible_physicians(query("cat-cardio", None, "plan-1")).await.unwrap();
        let names: Vec<&str> = found.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Dr. Bruno Lima", "Dra. Ana Costa"]);

        let none = directory.eligible_physicians(query("cat-cardio", None, "plan-9")).await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_monthly_limit_excludes_full_physicians() {
        let (state, store) = seeded().await;
        store.insert_with_id(BOOKINGS_COLLECTION, "b1", MockStoreDocuments::booking("m1", "plan-1", "2025-03-20", "09:00")).await;
        store.insert_with_id(BOOKINGS_COLLECTION, "b2", MockStoreDocuments::booking("m2", "plan-1", "2025-04-02", "09:00")).await;
        let directory = PhysicianDirectory::new(&state);

        let march = directory.eligible_physicians(query("cat-cardio", None, "plan-1")).await.unwrap();
        assert_eq!(march.iter().map(|p| p.id.as_str()).collect::<Vec<_>>(), vec!["m2"]);

        let mut april = query("cat-cardio", Some("sub-arritmia"), "plan-1");
        april.year = Some(2025);
        april.month = Some(4);
        let april = directory.eligible_physicians(april).await.unwrap();
        let ids: Vec<&str> = april.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["m2", "m1"]);
        assert_eq!(april[0].booked_this_month, 1);
    }

    #[tokio::test]
    async fn test_invalid_queries() {
        let (state, _) = seeded().await;
        let directory = PhysicianDirectory::new(&state);

        assert_matches!(
            directory.eligible_physicians(query("", None, "plan-1")).await,
            Err(DirectoryError::InvalidQuery(_))
        );

        let mut bad_month = query("cat-cardio", None, "plan-1");
        bad_month.month = Some(13);
        assert_matches!(directory.eligible_physicians(bad_month).await, Err(DirectoryError::InvalidQuery(_)));
    }

    #[test]
    fn test_booking_month_falls_back_to_date() {
        let doc = Document::new("b1", json!({"medicoId": "m1", "data": "2025-06-15"}));
        assert_eq!(booking_month(&doc), Some((2025, 6)));
    }
}
