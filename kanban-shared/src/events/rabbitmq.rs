/// RabbitMQ event bus over lapin
///
/// The publisher owns one channel in confirm mode and serializes publishes
/// through a mutex; each publish waits for the broker's confirmation. The
/// consumer declares its own exclusive, server-named, auto-deleted queue,
/// binds it with the handler's patterns and dispatches deliveries one at a
/// time with auto-ack.

use super::{dispatch, EventBusConfig, EventBusError, EventHandler, EventPublisher};
use async_trait::async_trait;
use futures::StreamExt;
use lapin::{
    options::*, types::FieldTable, BasicProperties, Channel, Connection, ConnectionProperties,
    ExchangeKind,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

async fn open_channel(config: &EventBusConfig) -> Result<(Connection, Channel), EventBusError> {
    let connection = Connection::connect(&config.url, ConnectionProperties::default()).await?;
    let channel = connection.create_channel().await?;

    channel
        .exchange_declare(
            &config.exchange,
            ExchangeKind::Topic,
            ExchangeDeclareOptions {
                durable: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await?;

    Ok((connection, channel))
}

/// Service-wide publisher
pub struct LapinPublisher {
    // kept so the connection outlives the channel
    _connection: Connection,
    channel: Mutex<Channel>,
    exchange: String,
}

impl LapinPublisher {
    pub async fn connect(config: &EventBusConfig) -> Result<Self, EventBusError> {
        let (connection, channel) = open_channel(config).await?;
        channel.confirm_select(ConfirmSelectOptions::default()).await?;

        tracing::info!(exchange = %config.exchange, "Event publisher connected");

        Ok(Self {
            _connection: connection,
            channel: Mutex::new(channel),
            exchange: config.exchange.clone(),
        })
    }
}

#[async_trait]
impl EventPublisher for LapinPublisher {
    async fn publish(&self, routing_key: &str, payload: Vec<u8>) -> Result<(), EventBusError> {
        let channel = self.channel.lock().await;
        if !channel.status().connected() {
            return Err(EventBusError::Closed);
        }

        let confirmation = channel
            .basic_publish(
                &self.exchange,
                routing_key,
                BasicPublishOptions::default(),
                &payload,
                BasicProperties::default()
                    .with_delivery_mode(2)
                    .with_content_type("application/json".into()),
            )
            .await?
            .await?;

        if confirmation.is_nack() {
            return Err(EventBusError::Nacked);
        }
        Ok(())
    }
}

/// Consumes deliveries for `handler` until `shutdown` is cancelled
///
/// Returns an error when the broker connection fails, during setup or
/// while consuming.
pub async fn run_consumer(
    config: &EventBusConfig,
    consumer_tag: &str,
    handler: Arc<dyn EventHandler>,
    shutdown: CancellationToken,
) -> Result<(), EventBusError> {
    let (_connection, channel) = open_channel(config).await?;

    let queue = channel
        .queue_declare(
            "",
            QueueDeclareOptions {
                exclusive: true,
                auto_delete: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await?;
    let queue_name = queue.name().as_str().to_string();

    for pattern in handler.bindings() {
        channel
            .queue_bind(
                &queue_name,
                &config.exchange,
                pattern,
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await?;
    }

    let mut consumer = channel
        .basic_consume(
            &queue_name,
            consumer_tag,
            BasicConsumeOptions {
                no_ack: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await?;

    tracing::info!(
        queue = %queue_name,
        exchange = %config.exchange,
        bindings = ?handler.bindings(),
        "Event consumer started"
    );

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::info!(consumer = %consumer_tag, "Event consumer stopping");
                break;
            }
            next = consumer.next() => match next {
                Some(Ok(delivery)) => {
                    dispatch(handler.as_ref(), delivery.routing_key.as_str(), &delivery.data).await;
                }
                Some(Err(e)) => {
                    tracing::error!(consumer = %consumer_tag, error = %e, "Event consumer failed");
                    return Err(e.into());
                }
                None => {
                    tracing::warn!(consumer = %consumer_tag, "Event stream closed by broker");
                    break;
                }
            }
        }
    }

    Ok(())
}
