use chrono::NaiveTime;
use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub clinic_open: NaiveTime,
    pub clinic_close: NaiveTime,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            port: env::var("PORT")
                .ok()
                .and_then(|raw| raw.parse().ok())
                .unwrap_or_else(|| {
                    warn!("PORT not set, defaulting to 3000");
                    3000
                }),
            clinic_open: parse_time_var("CLINIC_OPEN", "08:00"),
            clinic_close: parse_time_var("CLINIC_CLOSE", "18:00"),
        };

        if !config.is_valid() {
            warn!(
                "Clinic hours misconfigured ({} >= {}), falling back to defaults",
                config.clinic_open, config.clinic_close
            );
            return Self {
                port: config.port,
                ..Self::default()
            };
        }

        config
    }

    pub fn is_valid(&self) -> bool {
        self.clinic_open < self.clinic_close
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            clinic_open: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            clinic_close: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
        }
    }
}

fn parse_time_var(name: &str, default: &str) -> NaiveTime {
    let raw = env::var(name).unwrap_or_else(|_| {
        warn!("{} not set, using {}", name, default);
        default.to_string()
    });
    NaiveTime::parse_from_str(&raw, "%H:%M").unwrap_or_else(|_| {
        warn!(
            "{} is not a valid HH:MM time ({}), using {}",
            name, raw, default
        );
        NaiveTime::parse_from_str(default, "%H:%M").unwrap()
    })
}
