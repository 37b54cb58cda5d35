use tickmon_common::types::{AlertRule, Channel, Recipients, RuleDocument};

use crate::RuleStore;

fn rule(id: &str, expression: &str, channel: Channel) -> AlertRule {
    AlertRule {
        id: id.to_string(),
        expression: expression.to_string(),
        message: format!("{expression} satisfied"),
        channel,
        ..Default::default()
    }
}

fn sample_doc() -> RuleDocument {
    let mut doc = RuleDocument::default();
    doc.tickers.insert(
        "AAPL".to_string(),
        vec![
            rule("aapl_desktop1", "RSI < 30", Channel::Desktop),
            AlertRule {
                recipients: Some(Recipients::One("https://hook.example/a".into())),
                username: Some("bot".into()),
                ..rule("aapl_webhook1", "Volume > 1000000", Channel::Webhook)
            },
        ],
    );
    doc.scanners.push(AlertRule {
        triggered: Some(vec!["MSFT".to_string()]),
        recipients: Some(Recipients::Many(vec!["a@b.c".into(), "d@e.f".into()])),
        ..rule("scanner_email1", "PE < 10", Channel::Email)
    });
    doc
}

#[test]
fn missing_file_yields_empty_document() {
    let dir = tempfile::tempdir().unwrap();
    let store = RuleStore::new(dir.path().join("alerts.json"));
    let doc = store.load().unwrap();
    assert!(doc.is_empty());
}

#[test]
fn corrupt_file_yields_empty_document() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("alerts.json");
    std::fs::write(&path, "{not json").unwrap();

    let store = RuleStore::new(&path);
    let doc = store.load().unwrap();
    assert!(doc.is_empty());
}

#[test]
fn save_then_load_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let store = RuleStore::new(dir.path().join("alerts.json"));

    let doc = sample_doc();
    store.save(&doc).unwrap();
    let loaded = store.load().unwrap();
    assert_eq!(loaded, doc);

    // saving again over the existing file keeps it readable
    store.save(&loaded).unwrap();
    assert_eq!(store.load().unwrap(), doc);
}

#[test]
fn save_creates_missing_parent_directories() {
    let dir = tempfile::tempdir().unwrap();
    let store = RuleStore::new(dir.path().join("alerts/alerts.json"));
    store.save(&sample_doc()).unwrap();
    assert_eq!(store.load().unwrap(), sample_doc());
}

#[test]
fn load_backfills_missing_ids() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("alerts.json");
    std::fs::write(
        &path,
        r#"{
            "tickers": {
                "AAPL": [
                    {"expression": "RSI < 30", "message": "m", "channel": "webhook"},
                    {"expression": "RSI < 20", "message": "m", "channel": "webhook"}
                ]
            },
            "scanners": [
                {"expression": "PE < 10", "message": "m", "channel": "desktop"}
            ]
        }"#,
    )
    .unwrap();

    let doc = RuleStore::new(&path).load().unwrap();
    let ids: Vec<_> = doc.tickers["AAPL"].iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, ["aapl_webhook1", "aapl_webhook2"]);
    assert_eq!(doc.scanners[0].id, "scanner_desktop1");
}

#[test]
fn backfill_skips_ids_already_taken() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("alerts.json");
    std::fs::write(
        &path,
        r#"{
            "tickers": {
                "AAPL": [
                    {"id": "aapl_webhook1", "expression": "RSI < 30", "message": "m", "channel": "webhook"},
                    {"expression": "RSI < 20", "message": "m", "channel": "webhook"}
                ]
            },
            "scanners": []
        }"#,
    )
    .unwrap();

    let doc = RuleStore::new(&path).load().unwrap();
    assert_eq!(doc.tickers["AAPL"][1].id, "aapl_webhook2");
}
