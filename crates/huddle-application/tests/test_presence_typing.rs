mod common;

use common::*;
use huddle_core::realtime::TypingSignal;
use huddle_infrastructure::Operation;
use std::time::Duration;

#[tokio::test]
async fn test_members_see_each_other_come_and_go() {
    let backend = seeded_backend().await;
    let alice = start_session(&backend, ALICE).await;
    assert_eq!(alice.presence().online_user_ids().await, vec![ALICE.to_string()]);

    let bob = start_session(&backend, BOB).await;
    // Bob's first view comes from the sync and already includes Alice.
    assert!(bob.presence().is_online(ALICE).await);
    assert_eq!(bob.presence().online_count().await, 2);

    let joined = eventually(|| async { alice.presence().is_online(BOB).await }).await;
    assert!(joined, "Alice should see Bob join");

    bob.end().await.unwrap();
    let left = eventually(|| async { !alice.presence().is_online(BOB).await }).await;
    assert!(left, "Alice should see Bob leave");
    assert_eq!(bob.presence().online_count().await, 0);
    assert_eq!(backend.hub().online(WORKSPACE), vec![ALICE.to_string()]);
}

#[tokio::test]
async fn test_reconnect_starts_from_fresh_sync() {
    let backend = seeded_backend().await;
    let alice = start_session(&backend, ALICE).await;
    let carol = start_session(&backend, CAROL).await;
    assert!(eventually(|| async { alice.presence().online_count().await == 2 }).await);

    alice.presence().disconnect().await.unwrap();
    assert_eq!(alice.presence().online_count().await, 0);
    carol.end().await.unwrap();

    alice.presence().connect().await.unwrap();
    assert_eq!(alice.presence().online_user_ids().await, vec![ALICE.to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_typing_is_throttled_and_expires() {
    let backend = seeded_backend().await;
    let alice = start_session(&backend, ALICE).await;
    let bob = start_session(&backend, BOB).await;

    let monitor = bob.typing_monitor(DIRECT).await.unwrap();
    let typing = alice.typing_broadcaster();

    assert!(typing.keystroke(DIRECT).await.unwrap());
    assert!(!typing.keystroke(DIRECT).await.unwrap());
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!typing.keystroke(DIRECT).await.unwrap());
    assert_eq!(backend.call_count(Operation::SendTyping), 1);

    assert!(eventually(|| async { monitor.is_typing(ALICE).await }).await);
    assert_eq!(monitor.typing().await, vec!["Alice".to_string()]);

    // Past the throttle window a new signal goes out and re-arms expiry.
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(typing.keystroke(DIRECT).await.unwrap());
    assert_eq!(backend.call_count(Operation::SendTyping), 2);

    tokio::time::sleep(Duration::from_millis(2_900)).await;
    assert!(monitor.is_typing(ALICE).await, "Refreshed signal keeps the indicator");

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!monitor.is_typing(ALICE).await, "Indicator expires without new signals");
    monitor.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_stop_signal_clears_indicator() {
    let backend = seeded_backend().await;
    let alice = start_session(&backend, ALICE).await;
    let bob = start_session(&backend, BOB).await;

    let monitor = bob.typing_monitor(DIRECT).await.unwrap();
    let own = alice.typing_monitor(DIRECT).await.unwrap();
    let typing = alice.typing_broadcaster();

    typing.keystroke(DIRECT).await.unwrap();
    assert!(eventually(|| async { monitor.is_typing(ALICE).await }).await);
    assert!(own.typing().await.is_empty(), "Own signals are not shown");

    typing.stop(DIRECT).await.unwrap();
    assert!(eventually(|| async { !monitor.is_typing(ALICE).await }).await);

    // Stopping resets the throttle.
    assert!(typing.keystroke(DIRECT).await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_monitor_ignores_other_conversations() {
    let backend = seeded_backend().await;
    let bob = start_session(&backend, BOB).await;
    let monitor = bob.typing_monitor(GROUP).await.unwrap();

    monitor
        .apply(TypingSignal::Started {
            conversation_id: DIRECT.to_string(),
            user_id: ALICE.to_string(),
            display_name: "Alice".to_string(),
        })
        .await;
    assert!(monitor.typing().await.is_empty());

    monitor
        .apply(TypingSignal::Started {
            conversation_id: GROUP.to_string(),
            user_id: CAROL.to_string(),
            display_name: "Carol".to_string(),
        })
        .await;
    assert_eq!(monitor.typing().await, vec!["Carol".to_string()]);
}
