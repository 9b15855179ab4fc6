//! Discord REST API client.

mod client;
mod error;
mod receiver;
mod types;

pub use client::{DiscordClient, DEFAULT_API_URL};
pub use error::DiscordError;
pub use receiver::MessageReceiver;
pub use types::*;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio_stream::StreamExt;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn create_test_client(mock_server: &MockServer) -> DiscordClient {
        DiscordClient::new(mock_server.uri(), "test-token").unwrap()
    }

    fn message_json(id: &str, author_id: &str, content: &str) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "channel_id": "chan-1",
            "author": { "id": author_id, "username": "someone" },
            "content": content,
            "timestamp": "2024-01-01T00:00:00+00:00"
        })
    }

    #[tokio::test]
    async fn test_current_user() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/users/@me"))
            .and(header("Authorization", "Bot test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "42",
                "username": "dobby",
                "bot": true
            })))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server);
        let user = client.current_user().await.unwrap();

        assert_eq!(user.id, "42");
        assert!(user.bot);
        assert!(client.health_check().await);
    }

    #[tokio::test]
    async fn test_health_check_bad_token() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/users/@me"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server);
        assert!(matches!(
            client.current_user().await,
            Err(DiscordError::Unauthorized)
        ));
        assert!(!client.health_check().await);
    }

    #[tokio::test]
    async fn test_message_ids_with_limit() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/channels/chan-1/messages"))
            .and(query_param("limit", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                message_json("200", "7", "newer"),
                message_json("100", "7", "older")
            ])))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server);
        let ids = client.message_ids("chan-1", Some(2)).await.unwrap();

        assert_eq!(ids, vec!["200".to_string(), "100".to_string()]);
    }

    #[tokio::test]
    async fn test_send_message() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/channels/chan-1/messages"))
            .and(body_json(serde_json::json!({ "content": "Hello!" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(message_json("1", "42", "Hello!")))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server);
        client.send("chan-1", "Hello!").await.unwrap();
    }

    #[tokio::test]
    async fn test_send_message_failure() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/channels/chan-1/messages"))
            .respond_with(ResponseTemplate::new(403).set_body_string("Missing Permissions"))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server);
        let result = client.send("chan-1", "Hello!").await;

        assert!(matches!(result, Err(DiscordError::SendFailed(_))));
    }

    #[tokio::test]
    async fn test_bulk_delete_many() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/channels/chan-1/messages/bulk-delete"))
            .and(body_json(serde_json::json!({ "messages": ["1", "2", "3"] })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server);
        let ids = vec!["1".to_string(), "2".to_string(), "3".to_string()];
        client.bulk_delete("chan-1", &ids).await.unwrap();
    }

    #[tokio::test]
    async fn test_bulk_delete_single_uses_delete() {
        let mock_server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/channels/chan-1/messages/9"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server);
        client.bulk_delete("chan-1", &["9".to_string()]).await.unwrap();
    }

    #[tokio::test]
    async fn test_bulk_delete_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/channels/chan-1/messages/bulk-delete"))
            .respond_with(
                ResponseTemplate::new(400).set_body_string("messages older than 2 weeks"),
            )
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server);
        let ids = vec!["1".to_string(), "2".to_string()];
        let result = client.bulk_delete("chan-1", &ids).await;

        assert!(matches!(result, Err(DiscordError::Api { status: 400, .. })));
    }

    #[tokio::test]
    async fn test_receiver_yields_only_new_messages_in_order() {
        let mock_server = MockServer::start().await;

        // Startup probe: newest existing message is 100.
        Mock::given(method("GET"))
            .and(path("/channels/chan-1/messages"))
            .and(query_param("limit", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                message_json("100", "7", "old message")
            ])))
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/channels/chan-1/messages"))
            .and(query_param("after", "100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                message_json("300", "7", "dobby clear 5"),
                message_json("200", "7", "dobby")
            ])))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server);
        let receiver = MessageReceiver::new(
            client,
            vec!["chan-1".to_string()],
            Duration::from_millis(10),
        );
        let mut stream = Box::pin(receiver.stream());

        let first = stream.next().await.unwrap();
        let second = stream.next().await.unwrap();

        assert_eq!(first.id, "200");
        assert_eq!(first.text, "dobby");
        assert_eq!(second.id, "300");
        assert_eq!(second.text, "dobby clear 5");
        assert_eq!(second.channel_id, "chan-1");
        assert_eq!(second.author_id, "7");
    }

    #[tokio::test]
    async fn test_receiver_waits_for_baseline_after_failed_lookup() {
        let mock_server = MockServer::start().await;

        // First lookup of the newest message fails, the retry succeeds.
        Mock::given(method("GET"))
            .and(path("/channels/chan-1/messages"))
            .and(query_param("limit", "1"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/channels/chan-1/messages"))
            .and(query_param("limit", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                message_json("50", "7", "dobby clear 100")
            ])))
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/channels/chan-1/messages"))
            .and(query_param("after", "50"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                message_json("60", "7", "dobby")
            ])))
            .mount(&mock_server)
            .await;

        // History without a cursor; must never be replayed.
        Mock::given(method("GET"))
            .and(path("/channels/chan-1/messages"))
            .and(query_param("limit", "100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                message_json("50", "7", "dobby clear 100")
            ])))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server);
        let receiver = MessageReceiver::new(
            client,
            vec!["chan-1".to_string()],
            Duration::from_millis(10),
        );
        let mut stream = Box::pin(receiver.stream());

        let first = tokio::time::timeout(Duration::from_secs(5), stream.next())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(first.id, "60");
        assert_eq!(first.text, "dobby");
    }

    #[test]
    fn test_bot_message_skips_empty_content() {
        let msg: Message =
            serde_json::from_value(message_json("1", "7", "")).unwrap();
        assert!(BotMessage::from_message(&msg).is_none());
    }
}
