use crate::config::AppConfig;
use crate::errors::ServiceError;
use async_trait::async_trait;
use std::time::Duration;
use tracing::instrument;

/// Narrow interface over the outbound messaging gateway.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageGateway: Send + Sync {
    async fn send_text(&self, phone: &str, message: &str) -> Result<(), ServiceError>;
}

/// WhatsApp delivery through the bhashsms HTTP gateway. Credentials and
/// sender id come from configuration; the call is bounded by the messaging
/// timeout so a slow gateway cannot stall payment verification.
#[derive(Clone)]
pub struct WhatsAppClient {
    http: reqwest::Client,
    api_url: String,
    user: String,
    pass: String,
    sender: String,
}

impl WhatsAppClient {
    pub fn new(config: &AppConfig) -> Result<Self, ServiceError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.messaging_timeout_secs))
            .build()
            .map_err(|e| ServiceError::InternalError(format!("http client init: {}", e)))?;

        Ok(Self {
            http,
            api_url: config.whatsapp_api_url.clone(),
            user: config.whatsapp_user.clone().unwrap_or_default(),
            pass: config.whatsapp_pass.clone().unwrap_or_default(),
            sender: config.whatsapp_sender.clone(),
        })
    }
}

#[async_trait]
impl MessageGateway for WhatsAppClient {
    #[instrument(skip(self, message))]
    async fn send_text(&self, phone: &str, message: &str) -> Result<(), ServiceError> {
        let response = self
            .http
            .get(&self.api_url)
            .query(&[
                ("user", self.user.as_str()),
                ("pass", self.pass.as_str()),
                ("sender", self.sender.as_str()),
                ("phone", phone),
                ("text", message),
                ("priority", "wa"),
                ("stype", "normal"),
            ])
            .send()
            .await
            .map_err(|e| ServiceError::ExternalServiceError(format!("WhatsApp gateway: {}", e)))?;

        if !response.status().is_success() {
            return Err(ServiceError::ExternalServiceError(format!(
                "WhatsApp gateway returned {}",
                response.status()
            )));
        }

        Ok(())
    }
}
