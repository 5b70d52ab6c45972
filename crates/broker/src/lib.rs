//! Broker gateway: topology declaration and confirmed publishing on the
//! `notifications` topic exchange.
//!
//! Topology (declared once at startup, idempotent on the broker side):
//!
//! - durable topic exchange `notifications`
//! - durable queues `email_queue` / `push_queue`, bound with
//!   `notification.email` / `notification.push`
//! - an optional durable observability queue bound with `notification.*`
//!
//! Publishes are persistent and publisher-confirmed; a negative ack is
//! surfaced as an error so the orchestrator can record `QUEUE_ERROR`.

use std::sync::Arc;

use chrono::Utc;
use lapin::options::{
    BasicPublishOptions, BasicQosOptions, ConfirmSelectOptions, ExchangeDeclareOptions,
    QueueBindOptions, QueueDeclareOptions,
};
use lapin::publisher_confirm::Confirmation;
use lapin::types::{AMQPValue, FieldTable, ShortString};
use lapin::{BasicProperties, Connection, ConnectionProperties, ExchangeKind};
use tokio::sync::OnceCell;

use courier_core::Channel;

pub mod message;

pub use message::EnrichedNotification;

/// AMQP delivery mode 2: persist the message to disk.
const DELIVERY_MODE_PERSISTENT: u8 = 2;

#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    #[error("broker error: {0}")]
    Amqp(#[from] lapin::Error),

    #[error("broker negatively acknowledged the publish")]
    Nack,

    #[error("failed to serialize message body: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Connection settings for the broker gateway.
#[derive(Debug, Clone)]
pub struct BrokerSettings {
    pub url: String,
    pub exchange_name: String,
    pub exchange_type: String,
    /// When set, an extra durable queue bound to `notification.*` for
    /// observability.
    pub orchestrator_queue: Option<String>,
    pub prefetch_count: u16,
}

/// Persistent channel on the topic exchange. [`lapin::Channel`] is safe for
/// concurrent publishers, so one gateway is shared by all orchestrator tasks.
///
/// Construction performs no I/O; the channel is opened (and the topology
/// declared) on first use. Startup wiring goes through
/// [`connect`](Self::connect) to fail fast on an unreachable broker.
#[derive(Clone)]
pub struct BrokerGateway {
    settings: BrokerSettings,
    channel: Arc<OnceCell<lapin::Channel>>,
}

impl BrokerGateway {
    pub fn new(settings: BrokerSettings) -> Self {
        Self {
            settings,
            channel: Arc::new(OnceCell::new()),
        }
    }

    /// Connect eagerly: open the channel, enable publisher confirms, and
    /// declare the topology.
    pub async fn connect(settings: &BrokerSettings) -> Result<Self, BrokerError> {
        let gateway = Self::new(settings.clone());
        gateway.channel().await?;
        Ok(gateway)
    }

    /// The shared confirmed channel, opened on first use.
    async fn channel(&self) -> Result<&lapin::Channel, BrokerError> {
        self.channel
            .get_or_try_init(|| async {
                let connection =
                    Connection::connect(&self.settings.url, ConnectionProperties::default())
                        .await?;
                let channel = connection.create_channel().await?;
                channel
                    .confirm_select(ConfirmSelectOptions::default())
                    .await?;

                Self::declare_topology(&channel, &self.settings).await?;

                tracing::info!(
                    exchange = %self.settings.exchange_name,
                    "Connected to broker, topology declared"
                );
                Ok(channel)
            })
            .await
    }

    async fn declare_topology(
        channel: &lapin::Channel,
        settings: &BrokerSettings,
    ) -> Result<(), BrokerError> {
        channel
            .exchange_declare(
                settings.exchange_name.as_str(),
                exchange_kind(&settings.exchange_type),
                ExchangeDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;

        for queue_channel in [Channel::Email, Channel::Push] {
            channel
                .queue_declare(
                    queue_channel.queue_name(),
                    QueueDeclareOptions {
                        durable: true,
                        ..Default::default()
                    },
                    FieldTable::default(),
                )
                .await?;
            channel
                .queue_bind(
                    queue_channel.queue_name(),
                    settings.exchange_name.as_str(),
                    &queue_channel.routing_key(),
                    QueueBindOptions::default(),
                    FieldTable::default(),
                )
                .await?;
        }

        if let Some(queue_name) = &settings.orchestrator_queue {
            channel
                .queue_declare(
                    queue_name.as_str(),
                    QueueDeclareOptions {
                        durable: true,
                        ..Default::default()
                    },
                    FieldTable::default(),
                )
                .await?;
            channel
                .queue_bind(
                    queue_name.as_str(),
                    settings.exchange_name.as_str(),
                    "notification.*",
                    QueueBindOptions::default(),
                    FieldTable::default(),
                )
                .await?;
        }

        if settings.prefetch_count > 0 {
            channel
                .basic_qos(settings.prefetch_count, BasicQosOptions::default())
                .await?;
        }

        Ok(())
    }

    /// Publish one persistent message for the notification's channel and
    /// wait for the broker's confirmation.
    pub async fn publish(&self, notification: &EnrichedNotification) -> Result<(), BrokerError> {
        let channel = self.channel().await?;
        let body = serde_json::to_vec(notification)?;
        let routing_key = notification.channel.routing_key();

        let mut headers = FieldTable::default();
        headers.insert(
            ShortString::from("channel"),
            AMQPValue::LongString(notification.channel.as_str().to_string().into()),
        );
        headers.insert(
            ShortString::from("priority"),
            AMQPValue::LongString(notification.priority.as_str().to_string().into()),
        );

        let properties = BasicProperties::default()
            .with_content_type(ShortString::from("application/json"))
            .with_delivery_mode(DELIVERY_MODE_PERSISTENT)
            .with_message_id(ShortString::from(notification.notification_id.to_string()))
            .with_correlation_id(ShortString::from(notification.correlation_id.clone()))
            .with_timestamp(Utc::now().timestamp() as u64)
            .with_headers(headers);

        tracing::info!(
            routing_key = %routing_key,
            notification_id = %notification.notification_id,
            "Publishing notification to broker"
        );

        let confirmation = channel
            .basic_publish(
                self.settings.exchange_name.as_str(),
                &routing_key,
                BasicPublishOptions::default(),
                &body,
                properties,
            )
            .await?
            .await?;

        if let Confirmation::Nack(_) = confirmation {
            return Err(BrokerError::Nack);
        }

        tracing::info!(
            routing_key = %routing_key,
            notification_id = %notification.notification_id,
            "Broker confirmed publish"
        );
        Ok(())
    }
}

fn exchange_kind(exchange_type: &str) -> ExchangeKind {
    match exchange_type {
        "direct" => ExchangeKind::Direct,
        "fanout" => ExchangeKind::Fanout,
        "headers" => ExchangeKind::Headers,
        _ => ExchangeKind::Topic,
    }
}
