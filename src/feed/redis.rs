//! Redis pub/sub transport for change events.

use futures_util::{Stream, StreamExt, future};
use redis::AsyncCommands;
use tracing::warn;

use super::ChangeEvent;
use crate::Result;

/// Subscribe to `channel` and yield each message payload.
///
/// The stream ends when the connection drops; reconnecting is up to the
/// caller.
pub async fn subscribe(
    client: &redis::Client,
    channel: &str,
) -> Result<impl Stream<Item = String> + Send + 'static> {
    let mut pubsub = client.get_async_pubsub().await?;
    pubsub.subscribe(channel).await?;
    Ok(pubsub.into_on_message().filter_map(|msg| {
        let payload = match msg.get_payload::<String>() {
            Ok(payload) => Some(payload),
            Err(e) => {
                warn!(channel = msg.get_channel_name(), error = %e, "dropping non-text change payload");
                None
            }
        };
        future::ready(payload)
    }))
}

/// Publish a change event, returning the number of subscribers that got it.
pub async fn publish(client: &redis::Client, channel: &str, event: &ChangeEvent) -> Result<u64> {
    let payload = serde_json::to_string(event)?;
    let mut conn = client.get_multiplexed_async_connection().await?;
    let receivers: u64 = conn.publish(channel, payload).await?;
    Ok(receivers)
}
