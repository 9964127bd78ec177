use serde::{Deserialize, Serialize};

/// One row of the hosted `conversations` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub user_id: String,
    pub chat_id: String,
    pub message: String,
    pub is_bot: bool,
    /// Server-assigned insertion timestamp; absent on rows we are about to send.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Insert payload for one `conversations` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewStoredMessage {
    pub user_id: String,
    pub chat_id: String,
    pub message: String,
    pub is_bot: bool,
}

/// Upsert payload for one `message_ratings` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RatingUpsert {
    pub message_index: u32,
    pub user_id: String,
    pub chat_id: String,
    pub rating: u8,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_message_serializes_to_column_names() {
        let input = NewStoredMessage {
            user_id: "user-1".to_string(),
            chat_id: "chat_1_abc".to_string(),
            message: "Hello".to_string(),
            is_bot: false,
        };

        let payload = serde_json::to_value(&input).unwrap();
        assert_eq!(
            payload,
            serde_json::json!({
                "user_id": "user-1",
                "chat_id": "chat_1_abc",
                "message": "Hello",
                "is_bot": false,
            })
        );
    }

    #[test]
    fn stored_message_decodes_with_and_without_timestamp() {
        let with_timestamp: StoredMessage = serde_json::from_str(
            r#"{"user_id":"u","chat_id":"c","message":"m","is_bot":true,"created_at":"2026-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert!(with_timestamp.is_bot);
        assert_eq!(
            with_timestamp.created_at.as_deref(),
            Some("2026-01-01T00:00:00Z")
        );

        let without_timestamp: StoredMessage =
            serde_json::from_str(r#"{"user_id":"u","chat_id":"c","message":"m","is_bot":false}"#)
                .unwrap();
        assert_eq!(without_timestamp.created_at, None);
    }

    #[test]
    fn rating_upsert_serializes_star_value_as_number() {
        let input = RatingUpsert {
            message_index: 2,
            user_id: "user-1".to_string(),
            chat_id: "chat_1_abc".to_string(),
            rating: 4,
            message: "reply".to_string(),
        };

        let payload = serde_json::to_value(&input).unwrap();
        assert_eq!(payload["rating"], serde_json::json!(4));
        assert_eq!(payload["message_index"], serde_json::json!(2));
    }
}
