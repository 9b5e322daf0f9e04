// libs/notification-cell/src/services/dispatch.rs
use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, error, info, warn};

use shared_config::AppConfig;

use crate::models::{Channel, ContactDetails, DeliveryResult, NotificationError};
use crate::services::inapp::InAppNotificationService;

/// Outbound notification boundary. Concrete transports live behind this trait
/// so the engine never knows which gateway carries a message.
#[async_trait]
pub trait NotificationDispatch: Send + Sync {
    async fn send(
        &self,
        channel: Channel,
        contact: &ContactDetails,
        message: &str,
    ) -> Result<DeliveryResult, NotificationError>;
}

/// HTTP gateway transport for SMS, email and push. Each channel posts a JSON
/// envelope to its configured gateway URL.
pub struct HttpGatewayDispatch {
    client: reqwest::Client,
    sms_gateway_url: String,
    email_gateway_url: String,
    push_gateway_url: String,
    phone_pattern: Regex,
    email_pattern: Regex,
}

impl HttpGatewayDispatch {
    pub fn new(config: &AppConfig) -> Self {
        let phone_pattern = Regex::new(r"^\+?[1-9]\d{6,14}$")
            .expect("phone pattern is a valid regex");
        let email_pattern = Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("email pattern is a valid regex");

        Self {
            client: reqwest::Client::new(),
            sms_gateway_url: config.sms_gateway_url.clone(),
            email_gateway_url: config.email_gateway_url.clone(),
            push_gateway_url: config.push_gateway_url.clone(),
            phone_pattern,
            email_pattern,
        }
    }

    fn gateway_url(&self, channel: Channel) -> Result<&str, NotificationError> {
        let url = match channel {
            Channel::Sms => &self.sms_gateway_url,
            Channel::Email => &self.email_gateway_url,
            Channel::Push => &self.push_gateway_url,
            Channel::InApp => {
                return Err(NotificationError::GatewayError(
                    "in-app delivery does not use an HTTP gateway".to_string(),
                ))
            }
        };

        if url.is_empty() {
            return Err(NotificationError::GatewayError(format!(
                "no gateway configured for channel {}",
                channel
            )));
        }
        Ok(url)
    }

    fn recipient_address(
        &self,
        channel: Channel,
        contact: &ContactDetails,
    ) -> Result<String, NotificationError> {
        match channel {
            Channel::Sms => {
                let phone = contact.phone.as_deref().ok_or_else(|| {
                    NotificationError::InvalidContact("no phone number on file".to_string())
                })?;
                if !self.phone_pattern.is_match(phone) {
                    return Err(NotificationError::InvalidContact(format!(
                        "phone number {:?} is not dialable",
                        phone
                    )));
                }
                Ok(phone.to_string())
            }
            Channel::Email => {
                let email = contact.email.as_deref().ok_or_else(|| {
                    NotificationError::InvalidContact("no email address on file".to_string())
                })?;
                if !self.email_pattern.is_match(email) || email.len() > 254 {
                    return Err(NotificationError::InvalidContact(format!(
                        "email address {:?} is malformed",
                        email
                    )));
                }
                Ok(email.to_string())
            }
            Channel::Push => contact
                .device_token
                .clone()
                .filter(|token| !token.is_empty())
                .ok_or_else(|| {
                    NotificationError::InvalidContact("no device token on file".to_string())
                }),
            Channel::InApp => Err(NotificationError::GatewayError(
                "in-app delivery does not use an HTTP gateway".to_string(),
            )),
        }
    }
}

#[async_trait]
impl NotificationDispatch for HttpGatewayDispatch {
    async fn send(
        &self,
        channel: Channel,
        contact: &ContactDetails,
        message: &str,
    ) -> Result<DeliveryResult, NotificationError> {
        let url = self.gateway_url(channel)?;
        let to = self.recipient_address(channel, contact)?;

        debug!("Dispatching {} notification via {}", channel, url);

        let response = self
            .client
            .post(url)
            .json(&serde_json::json!({
                "to": to,
                "message": message,
            }))
            .send()
            .await
            .map_err(|e| {
                error!("Gateway request for {} failed: {}", channel, e);
                NotificationError::GatewayError(e.to_string())
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!("Gateway rejected {} delivery: {} {}", channel, status, body);
            return Err(NotificationError::DeliveryRejected(format!(
                "{}: {}",
                status, body
            )));
        }

        let provider_message_id = response
            .json::<serde_json::Value>()
            .await
            .ok()
            .and_then(|body| body.get("id").and_then(|id| id.as_str()).map(String::from));

        info!("Delivered {} notification to recipient", channel);
        Ok(DeliveryResult {
            channel,
            accepted: true,
            provider_message_id,
            detail: None,
        })
    }
}

/// Routes each channel to its transport: HTTP gateways for SMS/email/push,
/// the broadcast fan-out for in-app.
pub struct DispatchRouter {
    gateway: HttpGatewayDispatch,
    in_app: Arc<InAppNotificationService>,
}

impl DispatchRouter {
    pub fn new(gateway: HttpGatewayDispatch, in_app: Arc<InAppNotificationService>) -> Self {
        Self { gateway, in_app }
    }
}

#[async_trait]
impl NotificationDispatch for DispatchRouter {
    async fn send(
        &self,
        channel: Channel,
        contact: &ContactDetails,
        message: &str,
    ) -> Result<DeliveryResult, NotificationError> {
        match channel {
            Channel::InApp => self.in_app.publish_to_contact(contact, message).await,
            _ => self.gateway.send(channel, contact, message).await,
        }
    }
}
