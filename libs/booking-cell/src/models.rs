use std::sync::LazyLock;

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use availability_cell::{ScheduleError, SlotTime};
use shared_database::StoreError;
use shared_models::error::AppError;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("email pattern compiles")
});

static CPF_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{3}\.?\d{3}\.?\d{3}-?\d{2}$").expect("CPF pattern compiles"));

static PHONE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[\d\s\-\.\(\)]{8,20}$").expect("phone pattern compiles"));

// ==============================================================================
// PATIENT DATA
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientData {
    pub name: String,
    pub email: String,
    /// CPF, with or without punctuation.
    pub national_id: String,
    pub phone: String,
    pub address: String,
}

impl PatientData {
    /// Checks every field before anything touches the store.
    pub fn validate(&self) -> Result<(), BookingError> {
        let required = [
            ("name", &self.name),
            ("email", &self.email),
            ("national_id", &self.national_id),
            ("phone", &self.phone),
            ("address", &self.address),
        ];
        if let Some((field, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(BookingError::ValidationFailure(format!("patient {} is required", field)));
        }

        let email = self.email.trim();
        if email.len() > 254 || !EMAIL_PATTERN.is_match(email) {
            return Err(BookingError::ValidationFailure(format!("invalid email '{}'", email)));
        }
        if !is_valid_cpf(self.national_id.trim()) {
            return Err(BookingError::ValidationFailure("invalid CPF".to_string()));
        }
        if !PHONE_PATTERN.is_match(self.phone.trim()) {
            return Err(BookingError::ValidationFailure(format!("invalid phone '{}'", self.phone.trim())));
        }

        Ok(())
    }

    fn to_document(&self) -> Value {
        json!({
            "nome": self.name.trim(),
            "email": self.email.trim(),
            "cpf": self.national_id.trim(),
            "telefone": self.phone.trim(),
            "endereco": self.address.trim(),
        })
    }
}

/// Shape check plus the two CPF check digits.
fn is_valid_cpf(raw: &str) -> bool {
    if !CPF_PATTERN.is_match(raw) {
        return false;
    }

    let digits: Vec<u32> = raw.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.iter().all(|d| *d == digits[0]) {
        return false;
    }

    let check_digit = |len: usize| {
        let sum: u32 = digits[..len]
            .iter()
            .enumerate()
            .map(|(i, d)| d * (len as u32 + 1 - i as u32))
            .sum();
        match (sum * 10) % 11 {
            10 => 0,
            rest => rest,
        }
    };

    check_digit(9) == digits[9] && check_digit(10) == digits[10]
}

// ==============================================================================
// BOOKINGS
// ==============================================================================

/// A fully specified booking, ready for the writer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BookingRequest {
    pub physician_id: String,
    pub insurance_plan_id: String,
    pub category_id: String,
    pub subcategory_id: Option<String>,
    pub date: NaiveDate,
    pub time: SlotTime,
    pub patient: PatientData,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Booking {
    pub id: String,
    pub physician_id: String,
    pub insurance_plan_id: String,
    pub category_id: String,
    pub subcategory_id: Option<String>,
    pub date: NaiveDate,
    pub time: SlotTime,
    pub patient: PatientData,
    pub created_at: DateTime<FixedOffset>,
}

impl Booking {
    pub fn from_request(request: BookingRequest, created_at: DateTime<FixedOffset>) -> Self {
        Self {
            id: String::new(),
            physician_id: request.physician_id,
            insurance_plan_id: request.insurance_plan_id,
            category_id: request.category_id,
            subcategory_id: request.subcategory_id,
            date: request.date,
            time: request.time,
            patient: request.patient,
            created_at,
        }
    }

    /// Stored shape. `mes`/`ano` duplicate the date for month filters.
    pub fn to_document(&self) -> Value {
        json!({
            "medicoId": self.physician_id,
            "convenioId": self.insurance_plan_id,
            "categoriaId": self.category_id,
            "subcategoriaId": self.subcategory_id,
            "data": self.date.format("%Y-%m-%d").to_string(),
            "horario": self.time.to_string(),
            "paciente": self.patient.to_document(),
            "createdAt": self.created_at.to_rfc3339(),
            "mes": self.date.month(),
            "ano": self.date.year(),
        })
    }

    pub fn receipt(&self) -> BookingReceipt {
        BookingReceipt {
            id: self.id.clone(),
            physician_id: self.physician_id.clone(),
            date: self.date,
            time: self.time,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookingReceipt {
    pub id: String,
    pub physician_id: String,
    pub date: NaiveDate,
    pub time: SlotTime,
    pub created_at: DateTime<FixedOffset>,
}

// ==============================================================================
// WIZARD STATE
// ==============================================================================

/// Booking wizard state, filled in one step at a time. Never stored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct BookingDraft {
    pub patient: Option<PatientData>,
    pub category_id: Option<String>,
    pub subcategory_id: Option<String>,
    pub insurance_plan_id: Option<String>,
    pub physician_id: Option<String>,
    pub date: Option<NaiveDate>,
    pub time: Option<SlotTime>,
}

impl BookingDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_patient(mut self, patient: PatientData) -> Self {
        self.patient = Some(patient);
        self
    }

    pub fn with_specialty(mut self, category_id: &str, subcategory_id: Option<&str>) -> Self {
        self.category_id = Some(category_id.to_string());
        self.subcategory_id = subcategory_id.map(str::to_string);
        self
    }

    pub fn with_insurance_plan(mut self, insurance_plan_id: &str) -> Self {
        self.insurance_plan_id = Some(insurance_plan_id.to_string());
        self
    }

    /// Choosing a physician clears any slot picked for a previous one.
    pub fn with_physician(mut self, physician_id: &str) -> Self {
        if self.physician_id.as_deref() != Some(physician_id) {
            self.date = None;
            self.time = None;
        }
        self.physician_id = Some(physician_id.to_string());
        self
    }

    pub fn with_slot(mut self, date: NaiveDate, time: SlotTime) -> Self {
        self.date = Some(date);
        self.time = Some(time);
        self
    }

    /// Fails on the first wizard step that is still missing, in wizard order.
    pub fn complete(self) -> Result<BookingRequest, BookingError> {
        let missing = |step: &str| BookingError::ValidationFailure(format!("{} step is incomplete", step));
        let present = |value: Option<String>| value.filter(|v| !v.trim().is_empty());

        let patient = self.patient.ok_or_else(|| missing("patient data"))?;
        let category_id = present(self.category_id).ok_or_else(|| missing("specialty"))?;
        let insurance_plan_id = present(self.insurance_plan_id).ok_or_else(|| missing("insurance plan"))?;
        let physician_id = present(self.physician_id).ok_or_else(|| missing("physician"))?;
        let (date, time) = self.date.zip(self.time).ok_or_else(|| missing("date and time"))?;

        Ok(BookingRequest {
            physician_id,
            insurance_plan_id,
            category_id,
            subcategory_id: present(self.subcategory_id),
            date,
            time,
            patient,
        })
    }
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BookingError {
    #[error("The {time} slot on {date} is no longer available, please pick another time")]
    SlotUnavailable { date: NaiveDate, time: SlotTime },

    #[error("Invalid booking: {0}")]
    ValidationFailure(String),

    #[error("Document store unavailable: {0}")]
    StoreUnavailable(String),
}

impl From<StoreError> for BookingError {
    fn from(err: StoreError) -> Self {
        BookingError::StoreUnavailable(err.to_string())
    }
}

impl From<ScheduleError> for BookingError {
    fn from(err: ScheduleError) -> Self {
        match err {
            ScheduleError::StoreUnavailable(message) => BookingError::StoreUnavailable(message),
            other => BookingError::ValidationFailure(other.to_string()),
        }
    }
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::SlotUnavailable { .. } => AppError::Conflict(err.to_string()),
            BookingError::ValidationFailure(_) => AppError::ValidationError(err.to_string()),
            BookingError::StoreUnavailable(_) => AppError::StoreUnavailable(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use availability_cell::BookedSlot;
    use shared_database::Document;

    fn patient() -> PatientData {
        PatientData {
            name: "Maria Silva".to_string(),
            email: "maria@example.com".to_string(),
            national_id: "123.456.789-09".to_string(),
            phone: "+55 11 98765-4321".to_string(),
            address: "Rua das Flores, 100".to_string(),
        }
    }

    fn date(raw: &str) -> NaiveDate {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_valid_patient_passes() {
        assert_eq!(patient().validate(), Ok(()));
    }

    #[test]
    fn test_blank_fields_are_named() {
        let mut data = patient();
        data.address = "   ".to_string();

        assert_eq!(
            data.validate(),
            Err(BookingError::ValidationFailure("patient address is required".to_string()))
        );
    }

    #[test]
    fn test_email_and_cpf_shapes() {
        let mut bad_email = patient();
        bad_email.email = "maria.example.com".to_string();
        assert!(bad_email.validate().is_err());

        let mut bad_cpf = patient();
        bad_cpf.national_id = "123.456.789-00".to_string();
        assert!(bad_cpf.validate().is_err());

        let mut repeated = patient();
        repeated.national_id = "111.111.111-11".to_string();
        assert!(repeated.validate().is_err());

        let mut bare_digits = patient();
        bare_digits.national_id = "12345678909".to_string();
        assert!(bare_digits.validate().is_ok());
    }

    #[test]
    fn test_booking_document_carries_month_and_year() {
        let created_at = DateTime::parse_from_rfc3339("2025-03-10T10:30:00-03:00").unwrap();
        let request = BookingDraft::new()
            .with_patient(patient())
            .with_specialty("cat-cardio", None)
            .with_insurance_plan("plan-1")
            .with_physician("m1")
            .with_slot(date("2025-04-01"), SlotTime::parse("09:00").unwrap())
            .complete()
            .unwrap();

        let doc = Booking::from_request(request, created_at).to_document();

        assert_eq!(doc["medicoId"], "m1");
        assert_eq!(doc["data"], "2025-04-01");
        assert_eq!(doc["horario"], "09:00");
        assert_eq!(doc["mes"], 4);
        assert_eq!(doc["ano"], 2025);
        assert_eq!(doc["createdAt"], "2025-03-10T10:30:00-03:00");
        assert_eq!(doc["paciente"]["cpf"], "123.456.789-09");
        assert!(doc["subcategoriaId"].is_null());
    }

    #[test]
    fn test_stored_booking_counts_against_its_slot() {
        let created_at = DateTime::parse_from_rfc3339("2025-03-10T10:30:00-03:00").unwrap();
        let request = BookingDraft::new()
            .with_patient(patient())
            .with_specialty("cat-cardio", Some("sub-1"))
            .with_insurance_plan("plan-1")
            .with_physician("m1")
            .with_slot(date("2025-04-01"), SlotTime::parse("09:00").unwrap())
            .complete()
            .unwrap();
        let booking = Booking::from_request(request, created_at);

        let stored = Document::new("b1", booking.to_document());
        let slot = BookedSlot::from_document(&stored).unwrap();

        assert_eq!(slot, BookedSlot::new("m1", date("2025-04-01"), SlotTime::parse("09:00").unwrap()));
        assert_eq!(stored.str_field("subcategoriaId"), Some("sub-1"));
        assert_eq!(stored.field("paciente").and_then(|p| p.get("cpf")), Some(&json!("123.456.789-09")));
    }

    #[test]
    fn test_draft_reports_first_missing_step() {
        let draft = BookingDraft::new()
            .with_patient(patient())
            .with_specialty("cat-cardio", None);

        assert_eq!(
            draft.complete(),
            Err(BookingError::ValidationFailure("insurance plan step is incomplete".to_string()))
        );
    }

    #[test]
    fn test_changing_physician_clears_slot() {
        let draft = BookingDraft::new()
            .with_physician("m1")
            .with_slot(date("2025-04-01"), SlotTime::parse("09:00").unwrap())
            .with_physician("m2");

        assert_eq!(draft.date, None);
        assert_eq!(draft.time, None);
    }

    #[test]
    fn test_errors_map_to_http_statuses() {
        let conflict: AppError = BookingError::SlotUnavailable {
            date: date("2025-04-01"),
            time: SlotTime::parse("09:00").unwrap(),
        }
        .into();
        assert_eq!(conflict.status(), axum::http::StatusCode::CONFLICT);

        let invalid: AppError = BookingError::ValidationFailure("x".to_string()).into();
        assert_eq!(invalid.status(), axum::http::StatusCode::BAD_REQUEST);

        let offline: AppError = BookingError::StoreUnavailable("x".to_string()).into();
        assert_eq!(offline.status(), axum::http::StatusCode::SERVICE_UNAVAILABLE);
    }
}
