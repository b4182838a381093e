//! Builders for certstream JSON payloads.
use serde_json::json;
use tokio_tungstenite::tungstenite::Message;

pub fn cert_update_json(domains: &[&str]) -> String {
    json!({
        "message_type": "certificate_update",
        "data": {
            "update_type": "X509LogEntry",
            "leaf_cert": { "all_domains": domains },
            "cert_index": 1,
            "seen": 1_700_000_000.0
        }
    })
    .to_string()
}

pub fn heartbeat_json() -> String {
    json!({ "message_type": "heartbeat", "timestamp": 1_700_000_000.0 }).to_string()
}

pub fn cert_update(domains: &[&str]) -> Message {
    Message::Text(cert_update_json(domains).into())
}

pub fn heartbeat() -> Message {
    Message::Text(heartbeat_json().into())
}
