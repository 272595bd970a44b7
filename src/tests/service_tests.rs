use super::support::{FakeApi, create_history, create_test_room, create_test_service, ts};
use crate::Error;
use crate::model::{MediaKind, OutgoingMessage, RoomPatch, RoomStatus};
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

fn create_test_api() -> std::sync::Arc<FakeApi> {
    FakeApi::with_rooms(vec![
        create_test_room(1, "Bella", "Is she eating?", 30, 2),
        create_test_room(2, "Max", "Thanks!", 20, 0),
        create_test_room(3, "Luna", "See you tomorrow", 10, 4),
    ])
}

#[tokio::test]
async fn test_list_rooms_served_from_cache_within_ttl() {
    let api = create_test_api();
    let (service, clock) = create_test_service(api.clone());

    let first = assert_ok!(service.list_rooms(1, 50, false).await);
    clock.advance(Duration::from_millis(2500));
    let second = assert_ok!(service.list_rooms(1, 50, false).await);

    assert_eq!(api.room_call_count(), 1);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_list_rooms_refetches_after_ttl() {
    let api = create_test_api();
    let (service, clock) = create_test_service(api.clone());

    assert_ok!(service.list_rooms(1, 50, false).await);
    clock.advance(Duration::from_secs(3));
    assert_ok!(service.list_rooms(1, 50, false).await);

    assert_eq!(api.room_call_count(), 2);
}

#[tokio::test]
async fn test_force_refresh_bypasses_fresh_cache() {
    let api = create_test_api();
    let (service, _clock) = create_test_service(api.clone());

    assert_ok!(service.list_rooms(1, 50, false).await);
    assert_ok!(service.list_rooms(1, 50, true).await);

    assert_eq!(api.room_call_count(), 2);
}

#[tokio::test]
async fn test_list_rooms_fills_display_timestamps() {
    let api = create_test_api();
    let (service, _clock) = create_test_service(api);

    let response = assert_ok!(service.list_rooms(1, 50, false).await);
    assert!(
        response
            .rooms
            .iter()
            .all(|room| !room.last_message_display.is_empty())
    );
}

#[tokio::test]
async fn test_list_rooms_error_propagates_and_keeps_nothing() {
    let api = create_test_api();
    api.fail_rooms.store(true, Ordering::SeqCst);
    let (service, _clock) = create_test_service(api.clone());

    let err = assert_err!(service.list_rooms(1, 50, false).await);
    assert!(matches!(err, Error::Transport(_)));

    api.fail_rooms.store(false, Ordering::SeqCst);
    assert_ok!(service.list_rooms(1, 50, false).await);
    assert_eq!(api.room_call_count(), 2);
}

#[tokio::test]
async fn test_send_patches_cached_room() {
    let api = create_test_api();
    let (service, _clock) = create_test_service(api.clone());
    assert_ok!(service.list_rooms(1, 50, false).await);

    let long_text = "x".repeat(150);
    let confirmed = assert_ok!(
        service
            .send_message(3, &OutgoingMessage::Text(long_text))
            .await
    );

    // Still within the window, so this is the patched cache
    let cached = assert_ok!(service.list_rooms(1, 50, false).await);
    assert_eq!(api.room_call_count(), 1);

    let room = &cached.rooms[0];
    assert_eq!(room.room_id, 3);
    assert_eq!(room.unread_count, 0);
    assert_eq!(room.last_message, format!("{}...", "x".repeat(100)));
    assert_eq!(room.last_message_at, confirmed.created_at);

    let ids: Vec<i64> = cached.rooms.iter().map(|r| r.room_id).collect();
    assert_eq!(ids, vec![3, 1, 2]);
}

#[tokio::test]
async fn test_media_send_patches_placeholder_preview() {
    let api = create_test_api();
    let (service, _clock) = create_test_service(api);
    assert_ok!(service.list_rooms(1, 50, false).await);

    let outgoing = OutgoingMessage::Media {
        kind: MediaKind::Video,
        url: "https://cdn.test/clip.mp4".to_string(),
    };
    assert_ok!(service.send_message(2, &outgoing).await);

    let cached = assert_ok!(service.list_rooms(1, 50, false).await);
    assert_eq!(cached.rooms[0].room_id, 2);
    assert_eq!(cached.rooms[0].last_message, "[Video]");
}

#[tokio::test]
async fn test_failed_send_leaves_cache_untouched() {
    let api = create_test_api();
    api.fail_send.store(true, Ordering::SeqCst);
    let (service, _clock) = create_test_service(api);
    let before = assert_ok!(service.list_rooms(1, 50, false).await);

    let err = assert_err!(
        service
            .send_message(3, &OutgoingMessage::Text("hello".to_string()))
            .await
    );
    assert!(matches!(err, Error::Api { status: 500, .. }));

    let after = assert_ok!(service.list_rooms(1, 50, false).await);
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_mark_read_zeroes_unread_without_reordering() {
    let api = create_test_api();
    let (service, _clock) = create_test_service(api.clone());
    assert_ok!(service.list_rooms(1, 50, false).await);

    assert_ok!(service.mark_read(3).await);

    let cached = assert_ok!(service.list_rooms(1, 50, false).await);
    let ids: Vec<i64> = cached.rooms.iter().map(|r| r.room_id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(cached.room(3).map(|r| r.unread_count), Some(0));
    assert_eq!(*api.mark_read_calls.lock().expect("lock"), vec![3]);
}

#[tokio::test]
async fn test_local_changes_are_broadcast() {
    let api = create_test_api();
    let (service, _clock) = create_test_service(api);
    let mut changes = service.subscribe_local_changes();

    assert_ok!(service.mark_read(1).await);
    let confirmed = assert_ok!(
        service
            .send_message(2, &OutgoingMessage::Text("On my way".to_string()))
            .await
    );

    assert_eq!(assert_ok!(changes.try_recv()), RoomPatch::read(1));
    let sent = assert_ok!(changes.try_recv());
    assert_eq!(
        sent,
        RoomPatch::sent(
            2,
            "On my way".to_string(),
            confirmed.created_at.unwrap_or(ts(0))
        )
    );
}

#[tokio::test]
async fn test_assign_and_status_do_not_patch_cache() {
    let api = create_test_api();
    let (service, _clock) = create_test_service(api.clone());
    let before = assert_ok!(service.list_rooms(1, 50, false).await);

    assert_ok!(service.assign_room(1).await);
    assert_ok!(service.update_status(2, RoomStatus::Completed).await);

    let after = assert_ok!(service.list_rooms(1, 50, false).await);
    assert_eq!(before, after);
    assert_eq!(*api.assign_calls.lock().expect("lock"), vec![1]);
    assert_eq!(
        *api.status_calls.lock().expect("lock"),
        vec![(2, RoomStatus::Completed)]
    );
}

#[tokio::test]
async fn test_clear_cache_forces_network() {
    let api = create_test_api();
    let (service, _clock) = create_test_service(api.clone());

    assert_ok!(service.list_rooms(1, 50, false).await);
    service.clear_cache().await;
    assert_ok!(service.list_rooms(1, 50, false).await);

    assert_eq!(api.room_call_count(), 2);
}

#[tokio::test]
async fn test_list_messages_always_hits_network() {
    let api = create_test_api();
    api.set_history(1, create_history(5));
    let (service, _clock) = create_test_service(api.clone());

    let first = assert_ok!(service.list_messages(1, 1, 20, false).await);
    assert_ok!(service.list_messages(1, 1, 20, false).await);

    assert_eq!(first.messages.len(), 5);
    assert_eq!(api.message_calls_for_page(1), 2);
}
