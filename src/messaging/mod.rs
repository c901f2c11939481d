//! Messaging transport
//!
//! ## Responsibilities
//!
//! - Outbound alert delivery to receiver addresses
//! - WhatsApp channel first, plain SMS fallback on failure
//! - Per-call timeout; a failed send never aborts the batch upstream

use crate::error::{Error, Result};
use std::future::Future;
use std::time::Duration;

/// One outbound alert
#[derive(Debug, Clone)]
pub struct AlertMessage {
    pub receiver: String,
    pub resource: String,
    pub incident: String,
    pub location: String,
    pub timestamp: String,
}

impl AlertMessage {
    /// Rich body for the primary channel
    pub fn body(&self) -> String {
        format!(
            "*RESQ ALERT*\nIncident: {}\nResource: {}\nLocation: {}\nTime: {}\n\n\
             Reply 'Confirm Dispatch' or 'Decline'.",
            self.incident, self.resource, self.location, self.timestamp
        )
    }

    /// Compact body for the SMS fallback
    pub fn short_body(&self) -> String {
        format!(
            "RESQ ALERT: Incident: {}, Resource: {}, Location: {}, Time: {}",
            self.incident, self.resource, self.location, self.timestamp
        )
    }
}

/// Seam between the dispatch coordinator and the provider API.
///
/// Returns the provider message id on success; failure is definitive for
/// that single receiver (fallback already attempted inside).
pub trait MessageTransport: Send + Sync + 'static {
    fn send_alert(&self, msg: &AlertMessage) -> impl Future<Output = Result<String>> + Send;
}

/// Twilio-backed transport
pub struct TwilioTransport {
    http: reqwest::Client,
    api_base: String,
    account_sid: String,
    auth_token: String,
    from_sms: String,
    from_whatsapp: String,
}

/// Transport settings, read from the environment by `AppConfig`
#[derive(Debug, Clone)]
pub struct TwilioSettings {
    pub api_base: String,
    pub account_sid: String,
    pub auth_token: String,
    pub from_sms: String,
    pub from_whatsapp: String,
}

impl TwilioTransport {
    pub fn new(settings: TwilioSettings) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            http,
            api_base: settings.api_base,
            account_sid: settings.account_sid,
            auth_token: settings.auth_token,
            from_sms: settings.from_sms,
            from_whatsapp: settings.from_whatsapp,
        }
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.api_base, self.account_sid
        )
    }

    async fn post_message(&self, from: &str, to: &str, body: &str) -> Result<String> {
        if self.account_sid.is_empty() || self.auth_token.is_empty() {
            return Err(Error::Config("messaging credentials not configured".into()));
        }

        let params = [("From", from), ("To", to), ("Body", body)];
        let response = self
            .http
            .post(self.messages_url())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::Transport(format!(
                "provider returned {}",
                response.status()
            )));
        }

        let payload: serde_json::Value = response.json().await?;
        payload["sid"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| Error::Transport("provider response missing sid".into()))
    }
}

impl MessageTransport for TwilioTransport {
    async fn send_alert(&self, msg: &AlertMessage) -> Result<String> {
        let whatsapp_to = format!("whatsapp:{}", msg.receiver);
        match self
            .post_message(&self.from_whatsapp, &whatsapp_to, &msg.body())
            .await
        {
            Ok(sid) => {
                tracing::info!(receiver = %msg.receiver, sid = %sid, "WhatsApp alert sent");
                Ok(sid)
            }
            Err(e) => {
                tracing::warn!(
                    receiver = %msg.receiver,
                    error = %e,
                    "WhatsApp send failed, falling back to SMS"
                );
                let sid = self
                    .post_message(&self.from_sms, &msg.receiver, &msg.short_body())
                    .await
                    .map_err(|sms_err| {
                        tracing::error!(
                            receiver = %msg.receiver,
                            error = %sms_err,
                            "SMS fallback also failed"
                        );
                        sms_err
                    })?;
                tracing::info!(receiver = %msg.receiver, sid = %sid, "SMS fallback sent");
                Ok(sid)
            }
        }
    }
}
