//! Application settings read from Rocket's figment.
//!
//! Values live under the `manuflow` key of `Rocket.toml` and can be
//! overridden with `MANUFLOW_*` environment variables, e.g.
//! `MANUFLOW_CRON_SECRET=...` or `MANUFLOW_ALERT_WINDOW_DAYS=15`.

use rocket::figment::{Figment, providers::Env};
use serde::{Deserialize, Serialize};

pub const CONFIG_KEY: &str = "manuflow";

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// Shared secret expected in `Authorization: Bearer` by cron endpoints.
    /// Cron endpoints reject every call while this is unset.
    pub cron_secret: Option<String>,
    /// Reports expiring within this many days trigger an alert.
    pub alert_window_days: i64,
    /// Minimum number of days between two alerts for the same report.
    pub alert_dedup_days: i64,
    /// Upper bound of alert e-mails sent per batch run.
    pub max_alert_emails: i64,
    pub upload_dir: String,
    /// URL prefix the upload directory is served under.
    pub public_upload_url: String,
    pub email_api_url: String,
    /// When unset, e-mails are logged instead of sent.
    pub email_api_key: Option<String>,
    pub email_from: String,
    pub session_ttl_hours: i64,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            cron_secret: None,
            alert_window_days: 30,
            alert_dedup_days: 7,
            max_alert_emails: 50,
            upload_dir: "uploads".to_string(),
            public_upload_url: "/uploads".to_string(),
            email_api_url: "https://api.resend.com/emails".to_string(),
            email_api_key: None,
            email_from: "ManuFlow <alerts@manuflow.local>".to_string(),
            session_ttl_hours: 168,
        }
    }
}

impl AppConfig {
    /// Extracts the `manuflow` section, falling back to defaults for any
    /// missing value.
    pub fn from_figment(figment: &Figment) -> Result<AppConfig, rocket::figment::Error> {
        let figment = figment.clone().merge(
            Env::prefixed("MANUFLOW_")
                .ignore(&["DEFAULT_EMAIL", "DEFAULT_PASSWORD"])
                .map(|key| format!("{}.{}", CONFIG_KEY, key).into())
                .global(),
        );
        match figment.find_value(CONFIG_KEY) {
            Ok(_) => figment.extract_inner(CONFIG_KEY),
            Err(_) => Ok(AppConfig::default()),
        }
    }

    /// Public URL prefix without a trailing slash.
    pub fn upload_url_prefix(&self) -> &str {
        self.public_upload_url.trim_end_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rocket::figment::providers::Serialized;

    #[test]
    fn test_defaults_when_section_missing() {
        let config = AppConfig::from_figment(&Figment::new()).expect("defaults");
        assert_eq!(config.alert_window_days, 30);
        assert_eq!(config.alert_dedup_days, 7);
        assert_eq!(config.max_alert_emails, 50);
        assert_eq!(config.upload_dir, "uploads");
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let figment = Figment::new().merge(Serialized::default(
            "manuflow",
            serde_json::json!({ "cron_secret": "s3cret", "alert_window_days": 10 }),
        ));
        let config = AppConfig::from_figment(&figment).expect("config");
        assert_eq!(config.cron_secret.as_deref(), Some("s3cret"));
        assert_eq!(config.alert_window_days, 10);
        assert_eq!(config.max_alert_emails, 50);
    }

    #[test]
    fn test_upload_url_prefix_trims_slash() {
        let config = AppConfig {
            public_upload_url: "/files/".to_string(),
            ..AppConfig::default()
        };
        assert_eq!(config.upload_url_prefix(), "/files");
    }
}
