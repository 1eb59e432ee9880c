use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:3000"). Optional for worker processes.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// PostgreSQL connection string
    pub database_url: String,

    /// Upper bound on pooled Postgres connections
    #[serde(default = "default_database_max_connections")]
    pub database_max_connections: u32,

    /// Redis connection string for the sweep lock. Sweeps run unlocked when absent.
    #[serde(default)]
    pub redis_url: Option<String>,

    /// Send unit photos to the vision model. When false every photo passes.
    #[serde(default)]
    pub photo_verification_enabled: bool,

    /// Cloudflare account ID
    #[serde(default)]
    pub cf_account_id: Option<String>,

    /// Cloudflare Workers AI API token
    #[serde(default)]
    pub cf_api_token: Option<String>,

    /// Driving-distance API key. Crow-flies estimates are used when absent.
    #[serde(default)]
    pub routes_api_key: Option<String>,

    #[serde(default)]
    pub twilio_account_sid: Option<String>,

    #[serde(default)]
    pub twilio_auth_token: Option<String>,

    #[serde(default)]
    pub twilio_from_phone: Option<String>,

    #[serde(default)]
    pub sendgrid_api_key: Option<String>,

    #[serde(default)]
    pub sendgrid_from_email: Option<String>,

    /// Comma-separated on-call phone numbers
    #[serde(default)]
    pub oncall_phones: Vec<String>,

    /// Comma-separated on-call email addresses
    #[serde(default)]
    pub oncall_emails: Vec<String>,

    /// Internal team address for informational alerts
    #[serde(default)]
    pub team_email: Option<String>,

    #[serde(default = "default_organization_name")]
    pub organization_name: String,

    /// Seconds between escalation sweeps
    #[serde(default = "default_escalation_interval_secs")]
    pub escalation_interval_secs: u64,

    /// Lease length for the sweep lock; keep it below the sweep interval
    #[serde(default = "default_sweep_lock_ttl_secs")]
    pub sweep_lock_ttl_secs: u64,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_database_max_connections() -> u32 {
    10
}

fn default_organization_name() -> String {
    "Valet Dispatch".to_string()
}

fn default_escalation_interval_secs() -> u64 {
    120
}

fn default_sweep_lock_ttl_secs() -> u64 {
    110
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// Vision credentials, only when photo verification is switched on.
    pub fn vision_credentials(&self) -> Option<(&str, &str)> {
        if !self.photo_verification_enabled {
            return None;
        }
        match (self.cf_account_id.as_deref(), self.cf_api_token.as_deref()) {
            (Some(account), Some(token)) if !account.is_empty() && !token.is_empty() => {
                Some((account, token))
            }
            _ => None,
        }
    }
}
