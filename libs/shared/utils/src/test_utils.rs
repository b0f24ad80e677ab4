use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose};
use chrono::{Datelike, Duration, FixedOffset, NaiveDate, Utc};
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;
use uuid::Uuid;

use shared_config::{AppConfig, ClinicSettings, HolidayCalendar, StoreBackend};
use shared_database::MemoryStore;
use shared_models::auth::User;

use crate::clock::FixedClock;
use crate::state::AppState;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub holidays: Vec<&'static str>,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            holidays: vec!["2025-01-01", "2025-02-20", "2025-04-21", "2025-05-01"],
        }
    }
}

impl TestConfig {
    pub fn clinic_offset() -> FixedOffset {
        FixedOffset::west_opt(3 * 3600).expect("valid offset")
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            store_backend: StoreBackend::Memory,
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_jwt_secret: self.jwt_secret.clone(),
            clinic: ClinicSettings {
                utc_offset: Self::clinic_offset(),
                holidays: HolidayCalendar::parse_list(&self.holidays.join(",")),
            },
            port: 0,
        }
    }

    /// State over a fresh in-memory store, with the clock pinned to `local_now`
    /// (for example `2025-03-10T10:30`).
    pub fn to_state(&self, local_now: &str) -> (AppState, Arc<MemoryStore>, Arc<FixedClock>) {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(
            FixedClock::at_local(Self::clinic_offset(), local_now).expect("valid local timestamp"),
        );
        let state = AppState::new(self.to_app_config(), store.clone(), clock.clone());
        (state, store, clock)
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: "test@example.com".to_string(),
            role: "patient".to_string(),
        }
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, "admin")
    }

    pub fn patient(email: &str) -> Self {
        Self::new(email, "patient")
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": user.id,
            "email": user.email,
            "role": user.role,
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }

    pub fn bearer(token: &str) -> String {
        format!("Bearer {}", token)
    }
}

/// Raw documents in the shapes the clinic front-end writes.
pub struct MockStoreDocuments;

impl MockStoreDocuments {
    pub fn slot(time: &str, capacity: i64) -> Value {
        json!({ "horario": time, "limite": capacity })
    }

    /// `days` pairs a stored weekday name (`Segunda`, `Terça`, ...) with its slots.
    pub fn fixed_availability(physician_id: &str, days: &[(&str, Vec<Value>)]) -> Value {
        let mut by_day = serde_json::Map::new();
        for (day, slots) in days {
            by_day.insert(day.to_string(), Value::Array(slots.clone()));
        }

        json!({
            "tipo": "fixa",
            "medicoId": physician_id,
            "diasDaSemanaComHorarios": by_day,
        })
    }

    pub fn rotating_availability(physician_id: &str, dates: &[(&str, Vec<Value>)]) -> Value {
        let mut by_date = serde_json::Map::new();
        for (date, slots) in dates {
            by_date.insert(date.to_string(), Value::Array(slots.clone()));
        }
        let calendar: Vec<&str> = dates.iter().map(|(date, _)| *date).collect();

        json!({
            "tipo": "rotativa",
            "medicoId": physician_id,
            "diasCalendario": calendar,
            "horariosPorData": by_date,
        })
    }

    pub fn booking(physician_id: &str, plan_id: &str, date: &str, time: &str) -> Value {
        let parsed = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok();
        let year = parsed.map(|d| d.year());
        let month = parsed.map(|d| d.month());

        json!({
            "medicoId": physician_id,
            "convenioId": plan_id,
            "data": date,
            "horario": time,
            "paciente": Self::patient(),
            "categoriaId": "cat-cardio",
            "subcategoriaId": null,
            "createdAt": "2025-01-02T09:00:00-03:00",
            "mes": month,
            "ano": year,
        })
    }

    pub fn patient() -> Value {
        json!({
            "nome": "Maria Silva",
            "email": "maria@example.com",
            "cpf": "123.456.789-09",
            "telefone": "+55 11 98765-4321",
            "endereco": "Rua das Flores, 100",
        })
    }

    pub fn physician(name: &str, crm: &str, specialties: &[(&str, &[&str])]) -> Value {
        let specialties: Vec<Value> = specialties
            .iter()
            .map(|(category, subs)| json!({ "categoriaId": category, "subcategorias": subs }))
            .collect();

        json!({
            "nome": name,
            "crm": crm,
            "especialidades": specialties,
        })
    }

    pub fn plan_agreement(physician_id: &str, plan_id: &str, plan_name: &str, monthly_limit: i64) -> Value {
        json!({
            "medicoId": physician_id,
            "convenioId": plan_id,
            "nome": plan_name,
            "limiteMensal": monthly_limit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::Clock;

    #[test]
    fn test_config_creation() {
        let app_config = TestConfig::default().to_app_config();

        assert_eq!(app_config.store_backend, StoreBackend::Memory);
        assert!(app_config.is_configured());
        assert_eq!(app_config.clinic.holidays.dates().count(), 4);
    }

    #[test]
    fn test_state_clock_is_pinned() {
        let (state, _, _) = TestConfig::default().to_state("2025-03-10T10:30");
        assert_eq!(state.clock.today().day(), 10);
    }

    #[test]
    fn test_booking_fixture_carries_month_and_year() {
        let doc = MockStoreDocuments::booking("m1", "plan-1", "2025-04-01", "09:00");
        assert_eq!(doc["mes"], 4);
        assert_eq!(doc["ano"], 2025);
    }

    #[test]
    fn test_jwt_token_creation() {
        let token = JwtTestUtils::create_test_token(&TestUser::default(), "test-secret", Some(1));
        assert_eq!(token.split('.').count(), 3);
    }
}
