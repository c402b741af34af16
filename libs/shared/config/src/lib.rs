use std::env;
use std::str::FromStr;
use std::time::Duration;

use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// What `ReserveSlot` does when the patient already holds an active reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationPolicy {
    /// Refuse the new booking with `already_booked`.
    Reject,
    /// Cancel the prior reservation, then book the new slot.
    Replace,
}

impl FromStr for ReservationPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(ReservationPolicy::Reject),
            "replace" | "auto_cancel" => Ok(ReservationPolicy::Replace),
            other => Err(format!("unknown reservation policy: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_service_key: String,
    pub mirror_timeout_secs: u64,
    pub legacy_store_url: String,
    pub legacy_store_token: String,
    pub legacy_store_timeout_secs: u64,
    pub redis_url: Option<String>,
    pub webhook_signature_keys: Vec<String>,
    pub webhook_notification_url: Option<String>,
    pub default_slot_capacity: u32,
    pub reservation_policy: ReservationPolicy,
    pub intake_lock_timeout_secs: u64,
    pub slot_lock_timeout_secs: u64,
    pub lock_lease_secs: u64,
    pub edge_cache_ttl_secs: u64,
    pub local_cache_ttl_secs: u64,
    pub clinic_utc_offset_hours: i32,
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_service_key: String::new(),
            mirror_timeout_secs: 10,
            legacy_store_url: String::new(),
            legacy_store_token: String::new(),
            legacy_store_timeout_secs: 10,
            redis_url: None,
            webhook_signature_keys: Vec::new(),
            webhook_notification_url: None,
            default_slot_capacity: 2,
            reservation_policy: ReservationPolicy::Reject,
            intake_lock_timeout_secs: 20,
            slot_lock_timeout_secs: 5,
            lock_lease_secs: 30,
            edge_cache_ttl_secs: 300,
            local_cache_ttl_secs: 30,
            clinic_utc_offset_hours: 9,
            port: 3000,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, relational mirror will run in memory");
                    String::new()
                }),
            supabase_service_key: env::var("SUPABASE_SERVICE_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_SERVICE_KEY not set, using empty value");
                    String::new()
                }),
            mirror_timeout_secs: parse_or("MIRROR_TIMEOUT_SECS", defaults.mirror_timeout_secs),
            legacy_store_url: env::var("LEGACY_STORE_URL")
                .unwrap_or_else(|_| {
                    warn!("LEGACY_STORE_URL not set, legacy writes will be queued as inconsistent");
                    String::new()
                }),
            legacy_store_token: env::var("LEGACY_STORE_TOKEN").unwrap_or_default(),
            legacy_store_timeout_secs: parse_or("LEGACY_STORE_TIMEOUT_SECS", defaults.legacy_store_timeout_secs),
            redis_url: env::var("REDIS_URL").ok().filter(|url| !url.is_empty()),
            webhook_signature_keys: env::var("PAYMENT_WEBHOOK_SIGNATURE_KEYS")
                .map(|raw| split_keys(&raw))
                .unwrap_or_else(|_| {
                    warn!("PAYMENT_WEBHOOK_SIGNATURE_KEYS not set, webhook signatures will not be verified");
                    Vec::new()
                }),
            webhook_notification_url: env::var("PAYMENT_WEBHOOK_NOTIFICATION_URL")
                .ok()
                .filter(|url| !url.is_empty()),
            default_slot_capacity: parse_or("DEFAULT_SLOT_CAPACITY", defaults.default_slot_capacity),
            reservation_policy: parse_or("RESERVATION_POLICY", defaults.reservation_policy),
            intake_lock_timeout_secs: parse_or("INTAKE_LOCK_TIMEOUT_SECS", defaults.intake_lock_timeout_secs),
            slot_lock_timeout_secs: parse_or("SLOT_LOCK_TIMEOUT_SECS", defaults.slot_lock_timeout_secs),
            lock_lease_secs: parse_or("LOCK_LEASE_SECS", defaults.lock_lease_secs),
            edge_cache_ttl_secs: parse_or("EDGE_CACHE_TTL_SECS", defaults.edge_cache_ttl_secs),
            local_cache_ttl_secs: parse_or("LOCAL_CACHE_TTL_SECS", defaults.local_cache_ttl_secs),
            clinic_utc_offset_hours: parse_or("CLINIC_UTC_OFFSET_HOURS", defaults.clinic_utc_offset_hours),
            port: parse_or("PORT", defaults.port),
        };

        if !config.is_mirror_configured() {
            warn!("Relational mirror not configured - falling back to in-memory store");
        }

        config
    }

    pub fn is_mirror_configured(&self) -> bool {
        !self.supabase_url.is_empty() && !self.supabase_service_key.is_empty()
    }

    pub fn is_legacy_store_configured(&self) -> bool {
        !self.legacy_store_url.is_empty()
    }

    pub fn mirror_timeout(&self) -> Duration {
        Duration::from_secs(self.mirror_timeout_secs)
    }

    pub fn legacy_store_timeout(&self) -> Duration {
        Duration::from_secs(self.legacy_store_timeout_secs)
    }

    pub fn intake_lock_timeout(&self) -> Duration {
        Duration::from_secs(self.intake_lock_timeout_secs)
    }

    pub fn slot_lock_timeout(&self) -> Duration {
        Duration::from_secs(self.slot_lock_timeout_secs)
    }

    pub fn lock_lease(&self) -> Duration {
        Duration::from_secs(self.lock_lease_secs)
    }

    pub fn edge_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.edge_cache_ttl_secs)
    }

    pub fn local_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.local_cache_ttl_secs)
    }

    /// Clinic wall-clock offset. Out-of-range values fall back to UTC.
    pub fn clinic_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.clinic_utc_offset_hours * 3600).unwrap_or_else(|| Utc.fix())
    }
}

fn parse_or<T: FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has an invalid value '{}', using default", name, raw);
            default
        }),
        Err(_) => default,
    }
}

fn split_keys(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(str::to_string)
        .collect()
}
