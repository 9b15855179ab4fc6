//! End-to-end integration tests for Dobby.

mod common;

use common::{harness, user_message, wait_for_sent, CHANNEL_ID};
use dobby::pairing::{pin_message, LINKED_MESSAGE};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

fn messages_path() -> String {
    format!("/channels/{}/messages", CHANNEL_ID)
}

async fn accept_sends(server: &wiremock::MockServer) {
    Mock::given(method("POST"))
        .and(path(messages_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "9999",
            "channel_id": CHANNEL_ID,
            "author": {"id": common::BOT_ID, "username": "dobby", "bot": true},
            "content": "ok"
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_keyword_alone_sends_help() {
    let h = harness().await;
    accept_sends(&h.discord).await;

    h.bot.handle(&user_message("dobby")).await;

    let texts = wait_for_sent(&h.discord, 1).await;
    assert_eq!(
        texts,
        vec!["Here is a list of available commands: \n`clear`\n`invite`\n"]
    );
}

#[tokio::test]
async fn test_unknown_command_is_reported() {
    let h = harness().await;
    accept_sends(&h.discord).await;

    h.bot.handle(&user_message("dobby dance")).await;

    let texts = wait_for_sent(&h.discord, 1).await;
    assert_eq!(texts, vec!["invalid command"]);
}

#[tokio::test]
async fn test_other_messages_are_ignored() {
    let h = harness().await;
    accept_sends(&h.discord).await;

    h.bot.handle(&user_message("hello there")).await;
    h.bot.handle(&user_message("dobbyclear")).await;

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(h.discord.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_clear_bulk_deletes_recent_messages() {
    let h = harness().await;

    Mock::given(method("GET"))
        .and(path(messages_path()))
        .and(query_param("limit", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "13", "channel_id": CHANNEL_ID, "author": {"id": "42", "username": "alice"}, "content": "c"},
            {"id": "12", "channel_id": CHANNEL_ID, "author": {"id": "42", "username": "alice"}, "content": "b"},
            {"id": "11", "channel_id": CHANNEL_ID, "author": {"id": "42", "username": "alice"}, "content": "a"}
        ])))
        .expect(1)
        .mount(&h.discord)
        .await;

    Mock::given(method("POST"))
        .and(path(format!("{}/bulk-delete", messages_path())))
        .and(body_json(json!({"messages": ["13", "12", "11"]})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&h.discord)
        .await;

    h.bot.handle(&user_message("dobby clear 3")).await;
}

#[tokio::test]
async fn test_clear_reports_delete_errors() {
    let h = harness().await;
    accept_sends(&h.discord).await;

    Mock::given(method("GET"))
        .and(path(messages_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "13", "channel_id": CHANNEL_ID, "author": {"id": "42", "username": "alice"}, "content": "c"},
            {"id": "12", "channel_id": CHANNEL_ID, "author": {"id": "42", "username": "alice"}, "content": "b"}
        ])))
        .mount(&h.discord)
        .await;

    Mock::given(method("POST"))
        .and(path(format!("{}/bulk-delete", messages_path())))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "message": "You can only bulk delete messages that are under 14 days old.",
            "code": 50034
        })))
        .mount(&h.discord)
        .await;

    h.bot.handle(&user_message("dobby clear")).await;

    let texts = wait_for_sent(&h.discord, 1).await;
    assert_eq!(texts.len(), 1);
    assert!(texts[0].contains("14 days"));
}

#[tokio::test]
async fn test_invite_pairs_then_invites() {
    let h = harness().await;
    accept_sends(&h.discord).await;

    Mock::given(method("POST"))
        .and(path("/api/v2/pins"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 77,
            "code": "WXYZ",
            "clientIdentifier": "Dobby (discord bot)test"
        })))
        .expect(1)
        .mount(&h.plex)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v2/pins/77"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 77,
            "code": "WXYZ",
            "clientIdentifier": "Dobby (discord bot)test",
            "authToken": "plex-token"
        })))
        .mount(&h.plex)
        .await;

    h.bot.handle(&user_message("dobby invite")).await;

    let texts = wait_for_sent(&h.discord, 2).await;
    assert_eq!(texts, vec![pin_message("WXYZ"), LINKED_MESSAGE.to_string()]);

    for _ in 0..200 {
        if h.store.load().await.unwrap().plex.token == "plex-token" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(h.store.load().await.unwrap().plex.token, "plex-token");
    assert!(h.pairing.is_authorized().await);

    // Paired now, so the invite itself runs and no new PIN is requested.
    h.bot.handle(&user_message("dobby invite")).await;

    let texts = wait_for_sent(&h.discord, 3).await;
    assert_eq!(texts[2], "inviting user to our Plex Media Server");
}

#[tokio::test]
async fn test_invite_reports_pin_request_failure() {
    let h = harness().await;
    accept_sends(&h.discord).await;

    Mock::given(method("POST"))
        .and(path("/api/v2/pins"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .mount(&h.plex)
        .await;

    h.bot.handle(&user_message("dobby invite")).await;

    let texts = wait_for_sent(&h.discord, 1).await;
    assert_eq!(texts.len(), 1);
    assert!(texts[0].starts_with("could not request a Plex PIN"));
    assert!(!h.pairing.is_authorized().await);
}
