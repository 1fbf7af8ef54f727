use std::time::Duration;

use chat_exporter::extension_bridge::PageBridge;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::{connect_async, tungstenite::Message};

/// Connects a fake extension that answers every eval with `reply(id, code)`
pub async fn fake_extension<F>(bridge: &PageBridge, reply: F)
where
    F: Fn(&str, &str) -> String + Send + 'static,
{
    let url = format!("ws://{}", bridge.local_addr());
    let (ws, _) = connect_async(url).await.expect("ws connect");
    let (mut writer, mut reader) = ws.split();
    writer
        .send(Message::Text(r#"{"type":"hello","from":"test"}"#.into()))
        .await
        .expect("send hello");

    tokio::spawn(async move {
        while let Some(Ok(msg)) = reader.next().await {
            let txt = msg.into_text().unwrap_or_default();
            let Ok(request) = serde_json::from_str::<serde_json::Value>(&txt) else {
                continue;
            };
            if request["action"] != "eval" {
                continue;
            }
            let id = request["id"].as_str().unwrap_or_default();
            let code = request["code"].as_str().unwrap_or_default();
            if writer.send(Message::Text(reply(id, code))).await.is_err() {
                break;
            }
        }
    });

    bridge
        .wait_for_client(Duration::from_secs(5))
        .await
        .expect("client registered");
}
