pub mod auth;
pub mod calendar;
pub mod entries;
pub mod health;
pub mod tasks;
pub mod ws;

use tokio::sync::broadcast;
use uuid::Uuid;

/// Broadcast a record-change event to the owner's live WebSocket
/// connections. Best-effort: dropped silently when nobody is listening.
pub(crate) fn notify_change(
    tx: Option<&broadcast::Sender<String>>,
    user_id: Uuid,
    event: &str,
    id: Uuid,
) {
    if let Some(tx) = tx {
        let msg = serde_json::json!({
            "type": event,
            "user_id": user_id,
            "id": id,
        });
        let _ = tx.send(msg.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notify_change_reaches_subscribers() {
        let (tx, mut rx) = broadcast::channel::<String>(8);
        let user = Uuid::new_v4();
        let record = Uuid::new_v4();

        notify_change(Some(&tx), user, "entry_changed", record);

        let msg = rx.try_recv().unwrap();
        let value: serde_json::Value = serde_json::from_str(&msg).unwrap();
        assert_eq!(value["type"], "entry_changed");
        assert_eq!(value["user_id"], user.to_string());
        assert_eq!(value["id"], record.to_string());
    }

    #[test]
    fn notify_change_without_channel_is_a_no_op() {
        notify_change(None, Uuid::new_v4(), "task_changed", Uuid::new_v4());
    }
}
