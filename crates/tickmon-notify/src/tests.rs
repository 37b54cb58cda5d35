use httpmock::{Method::POST, MockServer};
use tickmon_common::types::{AlertRule, Channel, FieldValue, MetricsRow, Recipients, Trigger};

use crate::channels::desktop::DesktopChannel;
use crate::channels::email::EmailChannel;
use crate::channels::webhook::WebhookChannel;
use crate::dispatcher::{ChannelDefaults, Dispatcher};
use crate::{http_client, Delivery, NotificationChannel};

fn trigger(channel: Channel) -> Trigger {
    let row: MetricsRow = [
        ("Ticker", FieldValue::Text("AAPL".into())),
        ("RSI", FieldValue::Number(25.0)),
    ]
    .into_iter()
    .collect();
    Trigger {
        rule: AlertRule {
            id: "aapl_test1".into(),
            expression: "RSI < 30".into(),
            message: "oversold, have a look".into(),
            channel,
            ..Default::default()
        },
        symbol: "AAPL".into(),
        row,
    }
}

// ── Webhook channel ──

#[tokio::test]
async fn webhook_continues_past_failing_url() {
    let server = MockServer::start_async().await;
    let bad = server
        .mock_async(|when, then| {
            when.method(POST).path("/bad");
            then.status(500);
        })
        .await;
    let good = server
        .mock_async(|when, then| {
            when.method(POST).path("/good");
            then.status(204);
        })
        .await;

    let channel = WebhookChannel::new(http_client().unwrap(), "tickmon");
    let outcome = channel
        .send(
            &trigger(Channel::Webhook),
            &[server.url("/bad"), server.url("/good")],
        )
        .await
        .unwrap();

    assert_eq!(
        outcome,
        Delivery {
            delivered: 1,
            failed: 1
        }
    );
    assert_eq!(bad.hits_async().await, 1);
    assert_eq!(good.hits_async().await, 1);
}

#[tokio::test]
async fn webhook_sends_content_and_username() {
    let server = MockServer::start_async().await;
    let hook = server
        .mock_async(|when, then| {
            when.method(POST).path("/hook").json_body(serde_json::json!({
                "content": "oversold, have a look",
                "username": "sniper",
            }));
            then.status(200);
        })
        .await;

    let mut trigger = trigger(Channel::Webhook);
    trigger.rule.username = Some("sniper".into());

    let channel = WebhookChannel::new(http_client().unwrap(), "tickmon");
    let outcome = channel.send(&trigger, &[server.url("/hook")]).await.unwrap();

    assert_eq!(outcome.delivered, 1);
    hook.assert_async().await;
}

#[tokio::test]
async fn webhook_falls_back_to_default_username() {
    let server = MockServer::start_async().await;
    let hook = server
        .mock_async(|when, then| {
            when.method(POST).path("/hook").json_body(serde_json::json!({
                "content": "oversold, have a look",
                "username": "tickmon",
            }));
            then.status(204);
        })
        .await;

    let channel = WebhookChannel::new(http_client().unwrap(), "tickmon");
    channel
        .send(&trigger(Channel::Webhook), &[server.url("/hook")])
        .await
        .unwrap();

    hook.assert_async().await;
}

#[tokio::test]
async fn webhook_with_no_recipients_does_nothing() {
    let channel = WebhookChannel::new(http_client().unwrap(), "tickmon");
    let outcome = channel.send(&trigger(Channel::Webhook), &[]).await.unwrap();
    assert_eq!(outcome, Delivery::default());
}

#[tokio::test]
async fn webhook_unreachable_host_is_a_per_url_failure() {
    // nothing listens on this port; the send must come back, not hang
    let channel = WebhookChannel::new(http_client().unwrap(), "tickmon");
    let outcome = channel
        .send(
            &trigger(Channel::Webhook),
            &["http://127.0.0.1:1/hook".to_string()],
        )
        .await
        .unwrap();
    assert_eq!(outcome.failed, 1);
}

// ── Email channel ──

fn email_channel(server: &MockServer, api_key: Option<&str>) -> EmailChannel {
    EmailChannel::new(
        http_client().unwrap(),
        server.url("/v3/smtp/email"),
        api_key.map(str::to_string),
        "tickmon",
        "alerts@tickmon.local",
    )
}

#[tokio::test]
async fn email_posts_one_call_per_recipient() {
    let server = MockServer::start_async().await;
    let send = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v3/smtp/email")
                .header("api-key", "key-123")
                .header("accept", "application/json");
            then.status(201);
        })
        .await;

    let channel = email_channel(&server, Some("key-123"));
    let outcome = channel
        .send(
            &trigger(Channel::Email),
            &["a@b.c".to_string(), "d@e.f".to_string()],
        )
        .await
        .unwrap();

    assert_eq!(
        outcome,
        Delivery {
            delivered: 2,
            failed: 0
        }
    );
    assert_eq!(send.hits_async().await, 2);
}

#[tokio::test]
async fn email_payload_carries_sender_recipient_and_message() {
    let server = MockServer::start_async().await;
    let send = server
        .mock_async(|when, then| {
            when.method(POST).path("/v3/smtp/email").json_body(serde_json::json!({
                "sender": { "name": "tickmon", "email": "alerts@tickmon.local" },
                "to": [ { "email": "a@b.c" } ],
                "subject": "tickmon alert: AAPL",
                "textContent": "oversold, have a look",
            }));
            then.status(201);
        })
        .await;

    email_channel(&server, Some("key-123"))
        .send(&trigger(Channel::Email), &["a@b.c".to_string()])
        .await
        .unwrap();

    send.assert_async().await;
}

#[tokio::test]
async fn email_requires_created_status() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v3/smtp/email");
            then.status(200); // accepted-but-not-created is a provider error
        })
        .await;

    let outcome = email_channel(&server, Some("key-123"))
        .send(&trigger(Channel::Email), &["a@b.c".to_string()])
        .await
        .unwrap();

    assert_eq!(
        outcome,
        Delivery {
            delivered: 0,
            failed: 1
        }
    );
}

#[tokio::test]
async fn email_is_skipped_without_api_key() {
    let server = MockServer::start_async().await;
    let send = server
        .mock_async(|when, then| {
            when.method(POST).path("/v3/smtp/email");
            then.status(201);
        })
        .await;

    let outcome = email_channel(&server, None)
        .send(&trigger(Channel::Email), &["a@b.c".to_string()])
        .await
        .unwrap();

    assert_eq!(outcome, Delivery::default());
    assert_eq!(send.hits_async().await, 0);
}

// ── Dispatcher recipient resolution ──

fn dispatcher(defaults: ChannelDefaults) -> Dispatcher {
    let client = http_client().unwrap();
    Dispatcher::new(
        WebhookChannel::new(client.clone(), "tickmon"),
        EmailChannel::new(
            client,
            "https://api.brevo.com/v3/smtp/email",
            None,
            "tickmon",
            "alerts@tickmon.local",
        ),
        defaults,
    )
}

#[test]
fn rule_recipients_override_defaults() {
    let dispatcher = dispatcher(ChannelDefaults {
        webhook_urls: vec!["https://default.example".into()],
        email: Some("default@example.com".into()),
    });

    let mut t = trigger(Channel::Webhook);
    t.rule.recipients = Some(Recipients::Many(vec!["https://own.example".into()]));
    assert_eq!(dispatcher.recipients_for(&t), ["https://own.example"]);

    // a single-string recipient works the same as a one-element list
    t.rule.recipients = Some(Recipients::One("https://own.example".into()));
    assert_eq!(dispatcher.recipients_for(&t), ["https://own.example"]);
}

#[test]
fn empty_rule_recipients_fall_back_to_defaults() {
    let dispatcher = dispatcher(ChannelDefaults {
        webhook_urls: vec!["https://default.example".into()],
        email: Some("default@example.com".into()),
    });

    let mut t = trigger(Channel::Webhook);
    assert_eq!(dispatcher.recipients_for(&t), ["https://default.example"]);

    t.rule.recipients = Some(Recipients::Many(vec![]));
    assert_eq!(dispatcher.recipients_for(&t), ["https://default.example"]);

    let mut t = trigger(Channel::Email);
    t.rule.recipients = None;
    assert_eq!(dispatcher.recipients_for(&t), ["default@example.com"]);
}

#[test]
fn email_without_default_resolves_to_nobody() {
    let dispatcher = dispatcher(ChannelDefaults::default());
    let t = trigger(Channel::Email);
    assert!(dispatcher.recipients_for(&t).is_empty());
}

#[test]
fn desktop_needs_no_recipients() {
    let dispatcher = dispatcher(ChannelDefaults {
        webhook_urls: vec!["https://default.example".into()],
        email: Some("default@example.com".into()),
    });
    assert!(dispatcher.recipients_for(&trigger(Channel::Desktop)).is_empty());
}

// ── Desktop body formatting ──

#[test]
fn desktop_body_prefixes_symbol() {
    assert_eq!(
        DesktopChannel::body(&trigger(Channel::Desktop)),
        "AAPL - oversold, have a look"
    );
}

#[test]
fn desktop_body_is_truncated() {
    let mut t = trigger(Channel::Desktop);
    t.rule.message = "x".repeat(400);
    let body = DesktopChannel::body(&t);
    assert_eq!(body.len(), 250);
    assert!(body.starts_with("AAPL - "));
    assert!(body.ends_with("..."));
}
