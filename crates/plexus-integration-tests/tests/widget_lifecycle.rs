//! A widget that subscribes on start and releases everything on stop.

mod common;

use std::time::Duration;

use plexus_events::SubscriptionSet;
use plexus_store::Listener;
use plexus_test::prelude::*;
use serde_json::{Value, json};

use common::Shell;

/// Minimal widget: counts heartbeats into the store and records titles.
struct ClockWidget {
    subscriptions: SubscriptionSet,
    titles: CallRecorder<Value>,
}

impl ClockWidget {
    fn start(shell: &Shell) -> anyhow::Result<Self> {
        let mut subscriptions = shell.bus.subscription_set();
        let titles = CallRecorder::new();

        let store = shell.store.clone();
        subscriptions.subscribe(Some("app"), "heartbeat", move |data| {
            store.set("clock.last", data.clone())?;
            Ok(Value::Null)
        })?;

        let sink = titles.clone();
        subscriptions.subscribe_once(Some("app"), "title", move |data| {
            sink.record(data.clone());
            Ok(json!("ack"))
        })?;

        Ok(Self {
            subscriptions,
            titles,
        })
    }

    fn stop(&mut self) -> usize {
        self.subscriptions.release()
    }
}

#[tokio::test]
async fn test_widget_receives_while_running() -> anyhow::Result<()> {
    let shell = Shell::new();
    let widget = ClockWidget::start(&shell)?;

    let last = shell.store.wait_for("clock.last", Some(Duration::from_secs(1)));
    shell
        .bus
        .publish(Some("app"), "heartbeat", heartbeat_payload(7));
    assert_eq!(last.await?, json!({ "t": 7 }));

    shell.bus.publish(Some("app"), "title", json!("first"));
    shell.bus.publish(Some("app"), "title", json!("second"));
    shell.settle().await;
    assert_eq!(widget.titles.calls(), vec![json!("first")]);
    Ok(())
}

#[tokio::test]
async fn test_widget_stop_releases_subscriptions() -> anyhow::Result<()> {
    let shell = Shell::new();
    let mut widget = ClockWidget::start(&shell)?;
    assert_eq!(shell.bus.subscriber_count(Some("app"), "heartbeat"), 1);

    assert_eq!(widget.stop(), 2);
    assert_eq!(shell.bus.subscriber_count(Some("app"), "heartbeat"), 0);
    assert_eq!(shell.bus.subscriber_count(Some("app"), "title"), 0);

    assert_eq!(
        shell
            .bus
            .publish(Some("app"), "heartbeat", heartbeat_payload(8)),
        0
    );
    shell.settle().await;
    assert!(!shell.store.has("clock.last"));
    Ok(())
}

#[tokio::test]
async fn test_dropping_widget_releases_subscriptions() -> anyhow::Result<()> {
    let shell = Shell::new();
    {
        let _widget = ClockWidget::start(&shell)?;
        assert_eq!(shell.bus.subscriber_count(Some("app"), "heartbeat"), 1);
    }
    assert_eq!(shell.bus.subscriber_count(Some("app"), "heartbeat"), 0);
    Ok(())
}

#[tokio::test]
async fn test_widgets_observe_each_other_through_store() -> anyhow::Result<()> {
    let shell = Shell::new();
    let seen: CallRecorder<(Value, Option<Value>)> = CallRecorder::new();
    {
        let seen = seen.clone();
        shell.store.listen(
            "clock.last",
            Listener::on_value(move |value: &Value, previous: Option<&Value>| {
                seen.record((value.clone(), previous.cloned()));
                Ok(())
            }),
        )?;
    }

    let _clock = ClockWidget::start(&shell)?;
    shell
        .bus
        .publish(Some("app"), "heartbeat", heartbeat_payload(1));
    shell
        .bus
        .publish(Some("app"), "heartbeat", heartbeat_payload(2));

    assert!(seen.wait_for_len(2, Duration::from_secs(1)).await);
    assert_eq!(
        seen.calls(),
        vec![
            (json!({ "t": 1 }), None),
            (json!({ "t": 2 }), Some(json!({ "t": 1 }))),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_failing_widget_does_not_block_others() -> anyhow::Result<()> {
    let shell = Shell::new();
    let mut faulty = shell.bus.subscription_set();
    faulty.subscribe(Some("app"), "heartbeat", |_| Err(test_error("widget crashed")))?;
    let _clock = ClockWidget::start(&shell)?;

    shell
        .bus
        .publish(Some("app"), "heartbeat", heartbeat_payload(3));
    shell.settle().await;

    assert_eq!(shell.store.get("clock.last"), Some(json!({ "t": 3 })));
    assert_eq!(shell.queue.stats().failed, 1);
    Ok(())
}
