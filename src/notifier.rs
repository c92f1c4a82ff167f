//! Webhook notifier: consumes `Message` events and posts them to the
//! configured endpoint. Delivery failures are logged, never raised into
//! the dispatcher.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use futures::FutureExt;
use reqwest::Client;
use tracing::{info, warn};

use engine::{register_weak_callback, Component, Engine, EventType, Payload};

use crate::config::NotifyConfig;

pub struct WebhookNotifier {
    engine: Arc<Engine>,
    client: Client,
    webhook_url: String,
}

impl WebhookNotifier {
    pub fn new(engine: Arc<Engine>, config: NotifyConfig) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self { engine, client, webhook_url: config.webhook_url })
    }

    async fn deliver(&self, text: &str) {
        if self.webhook_url.is_empty() {
            info!(message = text, "notification (no webhook configured)");
            return;
        }
        let body = serde_json::json!({"msgtype": "text", "text": {"content": text}});
        match self.client.post(&self.webhook_url).json(&body).send().await {
            Ok(response) => info!(status = %response.status(), "notification delivered"),
            Err(e) => warn!(error = %e, "notification delivery failed"),
        }
    }
}

#[async_trait]
impl Component for WebhookNotifier {
    fn name(&self) -> &str {
        "notifier"
    }

    async fn init(self: Arc<Self>) -> Result<()> {
        register_weak_callback(&self.engine, EventType::Message, Arc::downgrade(&self), |n, event| {
            async move {
                let Payload::Message(message) = event.payload.as_ref() else {
                    return Ok(());
                };
                n.deliver(&message.content).await;
                Ok(())
            }
            .boxed()
        });
        Ok(())
    }

    async fn run(self: Arc<Self>) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine::Message;

    #[tokio::test]
    async fn message_events_are_consumed_without_a_webhook() {
        let engine = Arc::new(Engine::new());
        let notifier =
            Arc::new(WebhookNotifier::new(engine.clone(), NotifyConfig::default()).unwrap());
        notifier.clone().init().await.unwrap();

        engine
            .publish(EventType::Message, Payload::Message(Message::new("hello")))
            .await
            .unwrap();
    }
}
