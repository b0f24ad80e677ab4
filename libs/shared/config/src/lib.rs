use std::collections::BTreeSet;
use std::env;

use chrono::{FixedOffset, NaiveDate};
use tracing::warn;

const DEFAULT_UTC_OFFSET: &str = "-03:00";
const DEFAULT_HOLIDAYS: &[&str] = &["2025-01-01", "2025-02-20", "2025-04-21", "2025-05-01"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Supabase,
    Memory,
}

/// Static set of clinic holidays, checked before any slot is considered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HolidayCalendar {
    dates: BTreeSet<NaiveDate>,
}

impl HolidayCalendar {
    pub fn new<I: IntoIterator<Item = NaiveDate>>(dates: I) -> Self {
        Self {
            dates: dates.into_iter().collect(),
        }
    }

    /// Parses a comma-separated list of ISO dates, skipping entries that do not parse.
    pub fn parse_list(raw: &str) -> Self {
        let dates = raw
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .filter_map(|entry| match NaiveDate::parse_from_str(entry, "%Y-%m-%d") {
                Ok(date) => Some(date),
                Err(_) => {
                    warn!("Ignoring invalid holiday entry: {}", entry);
                    None
                }
            });

        Self::new(dates)
    }

    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.dates.contains(&date)
    }

    pub fn dates(&self) -> impl Iterator<Item = &NaiveDate> {
        self.dates.iter()
    }
}

/// Clinic-local time is a fixed UTC offset; "today" and "now" are read through it.
#[derive(Debug, Clone)]
pub struct ClinicSettings {
    pub utc_offset: FixedOffset,
    pub holidays: HolidayCalendar,
}

impl Default for ClinicSettings {
    fn default() -> Self {
        Self {
            utc_offset: FixedOffset::west_opt(3 * 3600).unwrap_or_else(utc),
            holidays: HolidayCalendar::parse_list(&DEFAULT_HOLIDAYS.join(",")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub store_backend: StoreBackend,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_jwt_secret: String,
    pub clinic: ClinicSettings,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let store_backend = match env::var("STORE_BACKEND").as_deref() {
            Ok("memory") => StoreBackend::Memory,
            Ok("supabase") => StoreBackend::Supabase,
            Ok(other) => {
                warn!("Unknown STORE_BACKEND '{}', using supabase", other);
                StoreBackend::Supabase
            }
            Err(_) => StoreBackend::Supabase,
        };

        let utc_offset_raw = env::var("CLINIC_UTC_OFFSET").unwrap_or_else(|_| {
            warn!("CLINIC_UTC_OFFSET not set, using default {}", DEFAULT_UTC_OFFSET);
            DEFAULT_UTC_OFFSET.to_string()
        });
        let utc_offset = parse_utc_offset(&utc_offset_raw).unwrap_or_else(|| {
            warn!("CLINIC_UTC_OFFSET '{}' is invalid, using {}", utc_offset_raw, DEFAULT_UTC_OFFSET);
            parse_utc_offset(DEFAULT_UTC_OFFSET).unwrap_or_else(utc)
        });

        let holidays = env::var("CLINIC_HOLIDAYS")
            .map(|raw| HolidayCalendar::parse_list(&raw))
            .unwrap_or_else(|_| ClinicSettings::default().holidays);

        let config = Self {
            store_backend,
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            clinic: ClinicSettings {
                utc_offset,
                holidays,
            },
            port: env::var("PORT")
                .ok()
                .and_then(|port| port.parse().ok())
                .unwrap_or(3000),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        let store_ready = match self.store_backend {
            StoreBackend::Memory => true,
            StoreBackend::Supabase => {
                !self.supabase_url.is_empty() && !self.supabase_anon_key.is_empty()
            }
        };

        store_ready && !self.supabase_jwt_secret.is_empty()
    }
}

/// Parses offsets of the form `+HH:MM` / `-HH:MM`.
pub fn parse_utc_offset(raw: &str) -> Option<FixedOffset> {
    let raw = raw.trim();
    let (sign, rest) = match raw.chars().next()? {
        '+' => (1, &raw[1..]),
        '-' => (-1, &raw[1..]),
        _ => return None,
    };
    let (hours, minutes) = rest.split_once(':')?;
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if hours > 14 || minutes > 59 {
        return None;
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

fn utc() -> FixedOffset {
    FixedOffset::east_opt(0).expect("zero offset is always valid")
}
