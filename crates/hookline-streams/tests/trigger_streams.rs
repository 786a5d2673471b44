#![allow(missing_docs, unused_results)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use assert_matches::assert_matches;
use hookline_events::{EventKind, NamedEvent, TriggeredEvent, Value, define_trigger_events};
use hookline_streams::{DispatchOutcome, HandlerError, StreamSettings, TriggerStream};
use parking_lot::Mutex;
use serde_json::json;

define_trigger_events! {
    #[derive(Clone, Debug, PartialEq)]
    enum ToolEvent {
        PreToolUse { tool: String } => "tool.pre_use",
        PostToolUse { tool: String, ok: bool } => "tool.post_use",
        SessionEnd => "session.end",
    }
}

fn calls() -> Arc<AtomicUsize> {
    Arc::new(AtomicUsize::new(0))
}

fn count_into(calls: &Arc<AtomicUsize>) -> impl Fn(&mut TriggeredEvent) + Send + Sync + 'static {
    let calls = Arc::clone(calls);
    move |_event: &mut TriggeredEvent| {
        calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn initializes_open_and_empty() {
    let stream: TriggerStream = TriggerStream::default();

    assert!(stream.is_flowing());
    assert!(stream.event_types().is_empty());
    assert_eq!(stream.captured_len(), 0);
    assert!(!stream.has_downstream());
    assert_eq!(stream.subscription_count(), 0);
}

#[test]
fn bottled_stream_buffers_without_invoking() {
    let stream: TriggerStream = TriggerStream::bottled();
    let hits = calls();
    let subscription = stream.attach_fn("EventType1", count_into(&hits));

    let outcome = stream.dispatch(TriggeredEvent::named("EventType1"));

    assert!(outcome.is_captured());
    assert_eq!(hits.load(Ordering::SeqCst), 0);
    assert_eq!(stream.captured_len(), 1);
    assert!(!stream.is_flowing());

    subscription.cancel();
}

#[test]
fn siphon_flushes_buffer_through_both_streams() {
    let hits = calls();

    let stream: TriggerStream = TriggerStream::bottled();
    let subscription = stream.attach_fn("EventType1", count_into(&hits));
    stream.dispatch(TriggeredEvent::named("EventType1"));

    let stream2: TriggerStream = TriggerStream::new();
    let subscription2 = stream2.attach_fn("EventType1", count_into(&hits));

    let replayed = stream2.siphon(&stream).unwrap();

    assert!(stream.flows_into(&stream2));
    assert!(stream.is_flowing());
    assert_eq!(stream.captured_len(), 0);
    assert_eq!(stream.subscription_count(), 1);
    assert_eq!(stream2.subscription_count(), 1);
    assert_eq!(hits.load(Ordering::SeqCst), 2);

    assert_eq!(replayed.len(), 1);
    assert_eq!(replayed[0].report().levels, 2);
    assert_eq!(replayed[0].report().invoked, 2);

    subscription.cancel();
    subscription2.cancel();
}

#[test]
fn collates_responses_systematically() {
    let stream: TriggerStream = TriggerStream::new();
    let subscription = stream.attach_fn("EventType1", |event| event.respond(true));
    let subscription2 = stream.attach_fn("EventType1", |event| event.respond("Kevin"));

    let mut event = stream
        .dispatch(TriggeredEvent::named("EventType1"))
        .into_event()
        .unwrap();

    assert_eq!(event.responses().len(), 2);
    assert!(event.any_response_equals(true));
    assert!(event.any_response_equals("Kevin"));
    assert!(!event.any_response_equals(Value::Null));
    assert!(!event.any_response_equals("kevin"));

    assert!(event.any_response_with(Value::is_string));
    assert!(!event.any_response_with(Value::is_object));

    assert_eq!(event.response(), Some(json!(true)));
    assert_eq!(event.response(), Some(json!("Kevin")));
    assert_eq!(event.response(), None);

    subscription.cancel();
    subscription2.cancel();
}

#[test]
fn cancelled_subscription_stops_receiving() {
    let stream: TriggerStream = TriggerStream::new();
    let first = calls();
    let second = calls();
    let a = stream.attach_fn("T", count_into(&first));
    let b = stream.attach_fn("T", count_into(&second));
    assert_ne!(a.id(), b.id());

    assert!(a.cancel());
    assert!(!a.cancel());
    stream.dispatch(TriggeredEvent::named("T"));

    assert_eq!(first.load(Ordering::SeqCst), 0);
    assert_eq!(second.load(Ordering::SeqCst), 1);
}

#[test]
fn failing_subscriber_does_not_block_later_ones() {
    let stream: TriggerStream = TriggerStream::new();
    let hits = calls();
    stream.attach("T", |_event, _id| Err(HandlerError::failed("first one breaks")));
    stream.attach_fn("T", count_into(&hits));

    let outcome = stream.dispatch(TriggeredEvent::named("T"));

    assert!(outcome.is_delivered());
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(outcome.report().failures.len(), 1);
    assert_eq!(outcome.report().succeeded(), 1);
}

#[test]
fn failure_in_child_still_reaches_parent() {
    let child: TriggerStream = TriggerStream::new();
    let parent: TriggerStream = TriggerStream::new();
    let hits = calls();
    child.attach_fn("T", |_event| panic!("child handler"));
    parent.attach_fn("T", count_into(&hits));
    child.chain_into(&parent).unwrap();

    let outcome = child.dispatch(TriggeredEvent::named("T"));

    assert!(outcome.is_delivered());
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(outcome.report().failures[0].depth, 0);
}

#[test]
fn chain_runs_level_by_level() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let tick = calls();

    let level1: TriggerStream = TriggerStream::new();
    let level2: TriggerStream = TriggerStream::new();

    for (stream, label) in [(&level1, "l1-a"), (&level1, "l1-b"), (&level2, "l2-a"), (&level2, "l2-b")] {
        let order = Arc::clone(&order);
        let tick = Arc::clone(&tick);
        stream.attach_fn("T", move |event| {
            let n = tick.fetch_add(1, Ordering::SeqCst);
            order.lock().push((label, n, event.response_count()));
            event.respond(label);
        });
    }
    level1.chain_into(&level2).unwrap();

    let event = level1
        .dispatch(TriggeredEvent::named("T"))
        .into_event()
        .unwrap();

    assert_eq!(
        *order.lock(),
        vec![("l1-a", 0, 0), ("l1-b", 1, 1), ("l2-a", 2, 2), ("l2-b", 3, 3)]
    );
    let labels: Vec<Value> = event.responses().cloned().collect();
    assert_eq!(labels, vec![json!("l1-a"), json!("l1-b"), json!("l2-a"), json!("l2-b")]);
}

#[test]
fn three_level_chain_replays_in_order() {
    let leaf: TriggerStream = TriggerStream::bottled();
    let middle: TriggerStream = TriggerStream::bottled();
    let root: TriggerStream = TriggerStream::new();
    let seen = Arc::new(Mutex::new(Vec::new()));

    for (stream, label) in [(&leaf, "leaf"), (&middle, "middle"), (&root, "root")] {
        let seen = Arc::clone(&seen);
        stream.attach("T", move |event, _id| {
            seen.lock().push(format!("{label}:{}", event.response_count()));
            event.respond(label);
            Ok(())
        });
    }

    leaf.dispatch(TriggeredEvent::named("T"));
    leaf.dispatch(TriggeredEvent::named("T"));

    // leaf opens and forwards into a still-closed middle
    let replayed = leaf.chain_into(&middle).unwrap();
    assert_eq!(replayed.len(), 2);
    assert!(replayed.iter().all(|o| matches!(o, DispatchOutcome::Captured { depth: 1, .. })));
    assert_eq!(middle.captured_len(), 2);

    let replayed = middle.chain_into(&root).unwrap();
    assert_eq!(replayed.len(), 2);
    assert!(replayed.iter().all(DispatchOutcome::is_delivered));
    assert_eq!(
        *seen.lock(),
        ["leaf:0", "leaf:0", "middle:1", "root:2", "middle:1", "root:2"]
    );
}

#[test]
fn declared_event_kinds_route_by_their_tags() {
    let stream: TriggerStream<ToolEvent> = TriggerStream::new();
    stream.attach(ToolEvent::TAGS[0], |event, _id| {
        if let ToolEvent::PreToolUse { tool } = event.kind() {
            if tool == "rm" {
                return Err(HandlerError::rejected("destructive tool"));
            }
            let verdict = json!({ "allow": true, "tool": tool });
            event.respond(verdict);
        }
        Ok(())
    });
    let post = calls();
    let post_hits = Arc::clone(&post);
    stream.attach_fn("tool.post_use", move |event| {
        if let ToolEvent::PostToolUse { ok: true, .. } = event.kind() {
            post_hits.fetch_add(1, Ordering::SeqCst);
        }
    });

    let outcome = stream.trigger(ToolEvent::PreToolUse { tool: "ls".into() });
    let event = outcome.into_event().unwrap();
    assert_eq!(event.event_type(), "tool.pre_use");
    assert!(event.any_response_with(|v| v["allow"] == true));

    let refused = stream.trigger(ToolEvent::PreToolUse { tool: "rm".into() });
    assert_eq!(refused.report().failures[0].error, "handler rejected event: destructive tool");
    assert_eq!(refused.event().unwrap().response_count(), 0);

    stream.trigger(ToolEvent::PostToolUse { tool: "ls".into(), ok: true });
    stream.trigger(ToolEvent::PostToolUse { tool: "ls".into(), ok: false });
    stream.trigger(ToolEvent::SessionEnd);
    assert_eq!(post.load(Ordering::SeqCst), 1);

    assert_eq!(ToolEvent::SessionEnd.event_type(), "session.end");
}

#[test]
fn named_and_declared_tags_share_the_routing_key() {
    let stream: TriggerStream<NamedEvent> = TriggerStream::new();
    let hits = calls();
    stream.attach_fn(ToolEvent::SessionEnd.as_str(), count_into(&hits));

    stream.trigger(NamedEvent::new("session.end"));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[test]
fn settings_drive_initial_flow() {
    let stream: TriggerStream = TriggerStream::with_settings(StreamSettings::bottled());
    assert!(!stream.is_flowing());
    assert_matches!(
        stream.dispatch(TriggeredEvent::named("T")),
        DispatchOutcome::Captured { depth: 0, .. }
    );
    assert_eq!(stream.open().len(), 1);
}

#[test]
fn event_survives_dispatch_for_the_producer() {
    let stream: TriggerStream = TriggerStream::new();
    stream.attach_fn("T", |event| event.respond(1));

    let mut outcome = stream.dispatch(TriggeredEvent::named("T"));
    let event = outcome.event_mut().unwrap();
    event.respond(2);

    let again = stream.dispatch(outcome.into_event().unwrap());
    let responses: Vec<Value> = again.into_event().unwrap().drain_responses();
    assert_eq!(responses, vec![json!(1), json!(2), json!(1)]);
}
