mod common;

use std::time::Duration;

use common::{Harness, MODEL_REPLY, ScriptedModel};
use trip_planner_bot::{
    message::{Command, InboundEvent},
    services::{dispatch::ChatQueue, flow::Step},
};

const CHATS: i64 = 300;

fn text(chat_id: i64, text: &str) -> InboundEvent {
    InboundEvent::Text {
        chat_id,
        text: text.to_string(),
    }
}

async fn wait_for_messages(h: &Harness, count: usize) {
    for _ in 0..500 {
        if h.transport.sent().len() >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("expected {count} messages, got {}", h.transport.sent().len());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_events_for_a_chat_apply_in_arrival_order() {
    let h = Harness::new(ScriptedModel::replying(MODEL_REPLY));
    let queue = ChatQueue::new(h.controller.clone(), Duration::from_secs(60));

    for chat_id in 1..=CHATS {
        queue.push(InboundEvent::Command {
            chat_id,
            command: Command::Plan,
        });
        queue.push(text(chat_id, "Bangkok"));
        queue.push(text(chat_id, "5"));
    }

    // Welcome, destination question, duration question, time-of-year question.
    wait_for_messages(&h, CHATS as usize * 4).await;

    for chat_id in 1..=CHATS {
        let session = h.controller.sessions().get(chat_id).await.unwrap();
        assert_eq!(session.params.destination.as_deref(), Some("Bangkok"), "chat {chat_id}");
        assert_eq!(session.params.duration, "5 days", "chat {chat_id}");
        assert_eq!(session.step, Step::TimeOfYear, "chat {chat_id}");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_cancel_is_not_undone_by_earlier_answer() {
    let h = Harness::new(ScriptedModel::replying(MODEL_REPLY));
    let queue = ChatQueue::new(h.controller.clone(), Duration::from_secs(60));

    for chat_id in 1..=50 {
        queue.push(InboundEvent::Command {
            chat_id,
            command: Command::Plan,
        });
        queue.push(text(chat_id, "Bangkok"));
        queue.push(InboundEvent::Command {
            chat_id,
            command: Command::Cancel,
        });
    }

    // Welcome, destination question, duration question, cancellation.
    wait_for_messages(&h, 50 * 4).await;
    assert!(h.controller.sessions().is_empty().await);
}

#[tokio::test]
async fn test_idle_workers_stop_and_restart() {
    let h = Harness::new(ScriptedModel::replying(MODEL_REPLY));
    let queue = ChatQueue::new(h.controller.clone(), Duration::from_millis(20));

    queue.push(InboundEvent::Command {
        chat_id: 9,
        command: Command::Plan,
    });
    assert_eq!(queue.active_chats(), 1);
    wait_for_messages(&h, 2).await;

    for _ in 0..100 {
        if queue.active_chats() == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(queue.active_chats(), 0);

    queue.push(text(9, "Bangkok"));
    wait_for_messages(&h, 3).await;
    let session = h.controller.sessions().get(9).await.unwrap();
    assert_eq!(session.step, Step::Duration);
}
