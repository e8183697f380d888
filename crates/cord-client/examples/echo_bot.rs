//! Minimal bot: connects, logs the session, and answers "!ping".
//!
//! Needs `CORD_TOKEN` in the environment (or a `.env` file).

use cord_client::{Client, Event};
use cord_common::config::{ClientConfig, Environment};
use cord_common::telemetry::{init_tracing_with_config, TracingConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ClientConfig::from_env()?;
    init_tracing_with_config(if config.env == Environment::Production {
        TracingConfig::production()
    } else {
        TracingConfig::development()
    });

    let mut client = Client::builder(config).build()?;

    client.on("on_ready", |event| async move {
        if let Event::Ready(ready) = event {
            tracing::info!(
                session_id = %ready.session_id,
                user = %ready.user.username,
                "logged in"
            );
        }
        Ok(())
    });

    let http = client.http().clone();
    client.on("on_message", move |event| {
        let http = http.clone();
        async move {
            if let Event::MessageCreate(message) = event {
                if message.content == "!ping" && !message.author.is_bot() {
                    let body = serde_json::json!({ "content": "pong" });
                    http.post(&format!("channels/{}/messages", message.channel_id), &body)
                        .await?;
                }
            }
            Ok(())
        }
    });

    client.start();
    client.wait().await?;
    Ok(())
}
