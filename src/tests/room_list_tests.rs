use super::support::{FakeApi, create_test_room, create_test_service, ts};
use crate::model::{RoomListResponse, RoomPatch, RoomStatus};
use crate::sync::{ChangeDescriptor, UpdateType};
use crate::view::{RoomListUpdate, RoomListView};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tokio_test::{assert_err, assert_ok};

fn create_test_api() -> Arc<FakeApi> {
    let mut waiting = create_test_room(3, "Luna", "Hello?", 10, 4);
    waiting.status = RoomStatus::Pending;
    FakeApi::with_rooms(vec![
        create_test_room(1, "Bella", "Is she eating?", 30, 2),
        create_test_room(2, "Max", "Thanks!", 20, 0),
        waiting,
    ])
}

async fn create_loaded_view(api: Arc<FakeApi>) -> RoomListView {
    let (service, _clock) = create_test_service(api);
    let mut view = RoomListView::new(service, 50);
    assert_ok!(view.load(false).await);
    view
}

fn room_ids(view: &RoomListView) -> Vec<i64> {
    view.rooms().iter().map(|r| r.room_id).collect()
}

fn visible_ids(view: &RoomListView) -> Vec<i64> {
    view.visible_rooms().iter().map(|r| r.room_id).collect()
}

#[tokio::test]
async fn test_load_selects_first_room() {
    let view = create_loaded_view(create_test_api()).await;

    assert_eq!(room_ids(&view), vec![1, 2, 3]);
    assert_eq!(view.selected_id(), Some(1));
    assert_eq!(view.total_unread(), 6);
    assert!(!view.is_loading());
    assert_eq!(view.last_error(), None);
}

#[tokio::test]
async fn test_load_failure_keeps_current_rooms() {
    let api = create_test_api();
    let mut view = create_loaded_view(api.clone()).await;

    api.fail_rooms.store(true, Ordering::SeqCst);
    assert_err!(view.refresh().await);

    assert_eq!(room_ids(&view), vec![1, 2, 3]);
    assert!(view.last_error().is_some());
}

#[tokio::test]
async fn test_polled_update_replaces_rooms_and_highlights() {
    let api = create_test_api();
    let mut view = create_loaded_view(api).await;

    let mut changed = create_test_room(2, "Max", "He ate the sock", 40, 1);
    changed.refresh_display();
    let response = RoomListResponse::from_rooms(vec![
        changed,
        create_test_room(1, "Bella", "Is she eating?", 30, 2),
    ]);
    let change = ChangeDescriptor {
        has_new_messages: true,
        has_new_rooms: false,
        update_type: UpdateType::Message,
        is_external_update: true,
        changed_rooms: vec![2],
    };
    view.apply_update(RoomListUpdate::Polled { response, change });

    assert_eq!(room_ids(&view), vec![2, 1]);
    assert!(view.is_highlighted(2));
    assert!(!view.is_highlighted(1));
    assert_eq!(view.selected_id(), Some(1));
}

#[tokio::test]
async fn test_local_patch_moves_room_to_front() {
    let api = create_test_api();
    let mut view = create_loaded_view(api).await;

    let patch = RoomPatch::sent(3, "Bring her at 10".to_string(), ts(50));
    view.apply_update(RoomListUpdate::Local(patch));

    assert_eq!(room_ids(&view), vec![3, 1, 2]);
    let room = &view.rooms()[0];
    assert_eq!(room.last_message, "Bring her at 10");
    assert_eq!(room.unread_count, 0);
    assert!(!room.last_message_display.is_empty());
}

#[tokio::test]
async fn test_local_read_patch_keeps_order() {
    let api = create_test_api();
    let mut view = create_loaded_view(api).await;

    view.apply_update(RoomListUpdate::Local(RoomPatch::read(3)));
    view.apply_update(RoomListUpdate::Local(RoomPatch::read(99)));

    assert_eq!(room_ids(&view), vec![1, 2, 3]);
    assert_eq!(view.total_unread(), 2);
}

#[tokio::test]
async fn test_cycle_filter_walks_every_status() {
    let api = create_test_api();
    let mut view = create_loaded_view(api).await;

    view.cycle_filter();
    assert_eq!(view.filter(), Some(RoomStatus::Pending));
    assert_eq!(visible_ids(&view), vec![3]);
    assert_eq!(view.selected_id(), Some(3));

    view.cycle_filter();
    assert_eq!(view.filter(), Some(RoomStatus::Active));
    assert_eq!(visible_ids(&view), vec![1, 2]);

    view.cycle_filter();
    assert_eq!(view.filter(), Some(RoomStatus::Completed));
    assert!(visible_ids(&view).is_empty());
    assert_eq!(view.selected_id(), None);

    view.cycle_filter();
    assert_eq!(view.filter(), Some(RoomStatus::Cancelled));

    view.cycle_filter();
    assert_eq!(view.filter(), None);
    assert_eq!(visible_ids(&view), vec![1, 2, 3]);
}

#[tokio::test]
async fn test_selection_wraps_around() {
    let api = create_test_api();
    let mut view = create_loaded_view(api).await;

    view.select_previous();
    assert_eq!(view.selected_id(), Some(3));
    view.select_next();
    assert_eq!(view.selected_id(), Some(1));
    view.select_next();
    assert_eq!(view.selected_room().map(|r| r.customer_name.as_str()), Some("Max"));

    view.select(99);
    assert_eq!(view.selected_id(), Some(2));
}

#[tokio::test]
async fn test_assign_selected_refreshes_from_server() {
    let api = create_test_api();
    let mut view = create_loaded_view(api.clone()).await;
    view.select(3);

    assert_ok!(view.assign_selected().await);

    assert_eq!(*api.assign_calls.lock().expect("lock"), vec![3]);
    assert_eq!(view.selected_room().map(|r| r.status), Some(RoomStatus::Active));
    assert_eq!(api.room_call_count(), 2);
}

#[tokio::test]
async fn test_set_selected_status() {
    let api = create_test_api();
    let mut view = create_loaded_view(api.clone()).await;
    view.select(2);

    assert_ok!(view.set_selected_status(RoomStatus::Completed).await);

    assert_eq!(
        view.selected_room().map(|r| r.status),
        Some(RoomStatus::Completed)
    );
}
