//! Integration tests for the room directory watchdog

mod cli_list;
mod matrix_directory;
mod watch_cycle;

use serde_json::{json, Value};

/// `publicRooms` response body for the given `(room_id, name)` pairs
pub(crate) fn rooms_page(rooms: &[(&str, &str)], next_batch: Option<&str>) -> Value {
    let chunk: Vec<Value> = rooms
        .iter()
        .map(|(id, name)| json!({"room_id": id, "name": name, "num_joined_members": 1}))
        .collect();
    match next_batch {
        Some(next) => json!({"chunk": chunk, "next_batch": next}),
        None => json!({"chunk": chunk}),
    }
}

/// Message bodies of every `PUT .../send/...` request received so far
pub(crate) async fn sent_bodies(server: &wiremock::MockServer) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.method.as_str() == "PUT")
        .map(|request| serde_json::from_slice(&request.body).unwrap())
        .collect()
}
