use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Serialize;
use uuid::Uuid;

use crate::config::AppConfig;

/// An escalation message about one instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub property_id: Uuid,
    pub property_name: String,
    pub definition_id: Uuid,
    pub instance_id: Uuid,
    pub service_date: NaiveDate,
    pub subject: String,
    pub body: String,
}

impl Notice {
    fn text(&self) -> String {
        format!(
            "{}\n{}\nProperty: {}\nService date: {}\nJob: {}",
            self.subject, self.body, self.property_name, self.service_date, self.instance_id
        )
    }
}

/// Best-effort delivery to staff. Callers log failures and carry on.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    /// Staff who can cover or reassign the job.
    async fn notify_on_call(&self, notice: &Notice) -> Result<(), NotifyError>;

    /// Internal team, informational only.
    async fn notify_team(&self, notice: &Notice) -> Result<(), NotifyError>;
}

/// Writes notices to the log instead of sending them.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl NotificationDispatcher for LogNotifier {
    async fn notify_on_call(&self, notice: &Notice) -> Result<(), NotifyError> {
        tracing::info!(
            instance_id = %notice.instance_id,
            subject = %notice.subject,
            "On-call notice (delivery disabled)"
        );
        Ok(())
    }

    async fn notify_team(&self, notice: &Notice) -> Result<(), NotifyError> {
        tracing::info!(
            instance_id = %notice.instance_id,
            subject = %notice.subject,
            "Team notice (delivery disabled)"
        );
        Ok(())
    }
}

struct TwilioAccount {
    account_sid: String,
    auth_token: String,
    from_phone: String,
}

struct SendGridAccount {
    api_key: String,
    from_email: String,
}

/// SMS through Twilio, email through SendGrid.
pub struct SmsEmailNotifier {
    http: Client,
    twilio: Option<TwilioAccount>,
    sendgrid: Option<SendGridAccount>,
    oncall_phones: Vec<String>,
    oncall_emails: Vec<String>,
    team_email: Option<String>,
    sender_name: String,
}

#[derive(Serialize)]
struct SendGridMail<'a> {
    personalizations: Vec<SendGridPersonalization<'a>>,
    from: SendGridAddress<'a>,
    subject: &'a str,
    content: Vec<SendGridContent<'a>>,
}

#[derive(Serialize)]
struct SendGridPersonalization<'a> {
    to: Vec<SendGridAddress<'a>>,
}

#[derive(Serialize)]
struct SendGridAddress<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Serialize)]
struct SendGridContent<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    value: &'a str,
}

fn non_empty(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

impl SmsEmailNotifier {
    /// `None` when no delivery channel is configured.
    pub fn from_config(config: &AppConfig) -> Result<Option<Self>, NotifyError> {
        let twilio = match (
            config.twilio_account_sid.as_deref(),
            config.twilio_auth_token.as_deref(),
            config.twilio_from_phone.as_deref(),
        ) {
            (Some(sid), Some(token), Some(from)) => Some(TwilioAccount {
                account_sid: sid.to_string(),
                auth_token: token.to_string(),
                from_phone: from.to_string(),
            }),
            _ => None,
        };
        let sendgrid = match (
            config.sendgrid_api_key.as_deref(),
            config.sendgrid_from_email.as_deref(),
        ) {
            (Some(key), Some(from)) => Some(SendGridAccount {
                api_key: key.to_string(),
                from_email: from.to_string(),
            }),
            _ => None,
        };
        if twilio.is_none() && sendgrid.is_none() {
            return Ok(None);
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .map_err(NotifyError::Http)?;
        Ok(Some(Self {
            http,
            twilio,
            sendgrid,
            oncall_phones: non_empty(&config.oncall_phones),
            oncall_emails: non_empty(&config.oncall_emails),
            team_email: config.team_email.clone().filter(|e| !e.trim().is_empty()),
            sender_name: config.organization_name.clone(),
        }))
    }

    async fn send_sms(&self, to: &str, body: &str) -> Result<(), NotifyError> {
        let Some(twilio) = &self.twilio else {
            return Ok(());
        };
        let url = format!(
            "https://api.twilio.com/2010-04-01/Accounts/{}/Messages.json",
            twilio.account_sid
        );
        self.http
            .post(&url)
            .basic_auth(&twilio.account_sid, Some(&twilio.auth_token))
            .form(&[("To", to), ("From", twilio.from_phone.as_str()), ("Body", body)])
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
        let Some(sendgrid) = &self.sendgrid else {
            return Ok(());
        };
        let mail = SendGridMail {
            personalizations: vec![SendGridPersonalization {
                to: vec![SendGridAddress {
                    email: to,
                    name: None,
                }],
            }],
            from: SendGridAddress {
                email: &sendgrid.from_email,
                name: Some(&self.sender_name),
            },
            subject,
            content: vec![SendGridContent {
                kind: "text/plain",
                value: body,
            }],
        };
        self.http
            .post("https://api.sendgrid.com/v3/mail/send")
            .bearer_auth(&sendgrid.api_key)
            .json(&mail)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[async_trait]
impl NotificationDispatcher for SmsEmailNotifier {
    async fn notify_on_call(&self, notice: &Notice) -> Result<(), NotifyError> {
        let text = notice.text();
        let mut failures = 0usize;

        for phone in &self.oncall_phones {
            if let Err(e) = self.send_sms(phone, &text).await {
                tracing::warn!(error = %e, instance_id = %notice.instance_id, "On-call SMS failed");
                failures += 1;
            }
        }
        for email in &self.oncall_emails {
            if let Err(e) = self.send_email(email, &notice.subject, &text).await {
                tracing::warn!(error = %e, instance_id = %notice.instance_id, "On-call email failed");
                failures += 1;
            }
        }

        let attempted = self.oncall_phones.len() + self.oncall_emails.len();
        if attempted > 0 && failures == attempted {
            return Err(NotifyError::AllChannelsFailed);
        }
        Ok(())
    }

    async fn notify_team(&self, notice: &Notice) -> Result<(), NotifyError> {
        match &self.team_email {
            Some(email) => self.send_email(email, &notice.subject, &notice.text()).await,
            None => {
                tracing::warn!(
                    instance_id = %notice.instance_id,
                    subject = %notice.subject,
                    "TEAM_EMAIL not configured, team notice not sent"
                );
                Ok(())
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("every notification channel failed")]
    AllChannelsFailed,
}
