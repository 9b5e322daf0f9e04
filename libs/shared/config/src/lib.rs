use std::env;
use tracing::warn;

/// Process-wide configuration, loaded once at startup and passed into the
/// engine services at construction. Values come from the environment with
/// defaults so a bare dev machine still boots.
#[derive(Debug, Clone)]
pub struct AppConfig {
    // Offer lifecycle
    pub max_contact_attempts: u32,
    pub contact_interval_hours: i64,
    pub response_window_minutes: i64,
    pub overall_fill_window_hours: i64,

    // Scoring
    pub urgency_weight: f64,
    pub wait_time_weight: f64,
    pub history_weight: f64,
    pub insurance_weight: f64,
    pub wait_saturation_days: i64,

    // Notification delivery
    pub channel_priority: Vec<String>,
    pub sms_gateway_url: String,
    pub email_gateway_url: String,
    pub push_gateway_url: String,

    // External collaborators
    pub booking_api_url: String,

    // Background loop cadence
    pub match_interval_seconds: u64,
    pub expiry_sweep_interval_seconds: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            max_contact_attempts: 3,
            contact_interval_hours: 24,
            response_window_minutes: 120,
            overall_fill_window_hours: 24,
            urgency_weight: 0.4,
            wait_time_weight: 0.3,
            history_weight: 0.15,
            insurance_weight: 0.15,
            wait_saturation_days: 14,
            channel_priority: vec![
                "sms".to_string(),
                "email".to_string(),
                "in_app".to_string(),
                "push".to_string(),
            ],
            sms_gateway_url: String::new(),
            email_gateway_url: String::new(),
            push_gateway_url: String::new(),
            booking_api_url: String::new(),
            match_interval_seconds: 5,
            expiry_sweep_interval_seconds: 30,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let config = Self {
            max_contact_attempts: parse_env("MAX_CONTACT_ATTEMPTS", defaults.max_contact_attempts),
            contact_interval_hours: parse_env("CONTACT_INTERVAL_HOURS", defaults.contact_interval_hours),
            response_window_minutes: parse_env("RESPONSE_WINDOW_MINUTES", defaults.response_window_minutes),
            overall_fill_window_hours: parse_env("OVERALL_FILL_WINDOW_HOURS", defaults.overall_fill_window_hours),
            urgency_weight: parse_env("URGENCY_WEIGHT", defaults.urgency_weight),
            wait_time_weight: parse_env("WAIT_TIME_WEIGHT", defaults.wait_time_weight),
            history_weight: parse_env("HISTORY_WEIGHT", defaults.history_weight),
            insurance_weight: parse_env("INSURANCE_WEIGHT", defaults.insurance_weight),
            wait_saturation_days: parse_env("WAIT_SATURATION_DAYS", defaults.wait_saturation_days),
            channel_priority: env::var("CHANNEL_PRIORITY")
                .map(|raw| raw.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(defaults.channel_priority),
            sms_gateway_url: env::var("SMS_GATEWAY_URL").unwrap_or_else(|_| {
                warn!("SMS_GATEWAY_URL not set, SMS delivery disabled");
                String::new()
            }),
            email_gateway_url: env::var("EMAIL_GATEWAY_URL").unwrap_or_else(|_| {
                warn!("EMAIL_GATEWAY_URL not set, email delivery disabled");
                String::new()
            }),
            push_gateway_url: env::var("PUSH_GATEWAY_URL").unwrap_or_else(|_| {
                warn!("PUSH_GATEWAY_URL not set, push delivery disabled");
                String::new()
            }),
            booking_api_url: env::var("BOOKING_API_URL").unwrap_or_else(|_| {
                warn!("BOOKING_API_URL not set, accepted offers cannot be booked");
                String::new()
            }),
            match_interval_seconds: parse_env("MATCH_INTERVAL_SECONDS", defaults.match_interval_seconds),
            expiry_sweep_interval_seconds: parse_env(
                "EXPIRY_SWEEP_INTERVAL_SECONDS",
                defaults.expiry_sweep_interval_seconds,
            ),
        };

        if !config.is_dispatch_configured() {
            warn!("No notification gateway configured - only in-app delivery is available");
        }

        config
    }

    pub fn is_dispatch_configured(&self) -> bool {
        !self.sms_gateway_url.is_empty()
            || !self.email_gateway_url.is_empty()
            || !self.push_gateway_url.is_empty()
    }

    pub fn is_booking_configured(&self) -> bool {
        !self.booking_api_url.is_empty()
    }
}

fn parse_env<T: std::str::FromStr + std::fmt::Display>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                warn!("{} has invalid value {:?}, using default {}", name, raw, default);
                default
            }
        },
        Err(_) => default,
    }
}
