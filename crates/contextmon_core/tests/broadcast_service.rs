mod common;

use common::{authority, item, RecordingNotifier, COLLECTION};
use contextmon_core::db::open_db_in_memory;
use contextmon_core::{
    BroadcastProvider, BroadcastService, BroadcastValidationError, FieldValues, NewBroadcast,
    ServiceError, SqliteBroadcastProvider,
};

#[test]
fn record_and_get_roundtrip() {
    let conn = open_db_in_memory().unwrap();
    let provider = SqliteBroadcastProvider::try_new(&conn, RecordingNotifier::new(), authority())
        .unwrap();
    let service = BroadcastService::new(provider);

    let broadcast = NewBroadcast::new("android.intent.action.BOOT_COMPLETED", 1_000)
        .with_extras(r#"{"reason":"cold"}"#);
    let id = service.record(&broadcast).unwrap();

    let loaded = service.get(id).unwrap().unwrap();
    assert_eq!(loaded.id, id);
    assert_eq!(loaded.action, broadcast.action);
    assert_eq!(loaded.extras, broadcast.extras);
    assert_eq!(loaded.timestamp, 1_000);
    assert!(!loaded.uploaded);

    assert!(service.get(id + 1).unwrap().is_none());
}

#[test]
fn record_rejects_invalid_broadcast_without_touching_store() {
    let conn = open_db_in_memory().unwrap();
    let notifier = RecordingNotifier::new();
    let provider = SqliteBroadcastProvider::try_new(&conn, notifier.clone(), authority()).unwrap();
    let service = BroadcastService::new(provider);

    let err = service.record(&NewBroadcast::new(" ", 1)).unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Validation(BroadcastValidationError::BlankAction)
    ));
    assert!(notifier.published().is_empty());
}

#[test]
fn upload_tracking_flow() {
    let conn = open_db_in_memory().unwrap();
    let provider = SqliteBroadcastProvider::try_new(&conn, RecordingNotifier::new(), authority())
        .unwrap();
    let service = BroadcastService::new(provider);

    let late = service.record(&NewBroadcast::new("SCREEN_OFF", 300)).unwrap();
    let early = service.record(&NewBroadcast::new("SCREEN_ON", 100)).unwrap();
    let middle = service.record(&NewBroadcast::new("USER_PRESENT", 200)).unwrap();

    let pending: Vec<i64> = service
        .list_pending_uploads(10)
        .unwrap()
        .into_iter()
        .map(|record| record.id)
        .collect();
    assert_eq!(pending, [early, middle, late]);

    let first_page = service.list_pending_uploads(2).unwrap();
    assert_eq!(first_page.len(), 2);

    assert_eq!(service.mark_uploaded(&[early, middle]).unwrap(), 2);
    assert_eq!(service.mark_uploaded(&[]).unwrap(), 0);

    let pending = service.list_pending_uploads(10).unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, late);
    assert!(service.get(early).unwrap().unwrap().uploaded);

    assert_eq!(service.purge_uploaded().unwrap(), 2);
    assert!(service.get(early).unwrap().is_none());
    assert!(service.get(late).unwrap().is_some());
}

#[test]
fn mapping_reports_rows_with_unexpected_types() {
    let conn = open_db_in_memory().unwrap();
    let provider = SqliteBroadcastProvider::try_new(&conn, RecordingNotifier::new(), authority())
        .unwrap();
    provider
        .insert(
            COLLECTION,
            &FieldValues::new()
                .put("action", "SCREEN_ON")
                .put("timestamp", "not a number"),
        )
        .unwrap();
    let service = BroadcastService::new(provider);

    let err = service.get(1).unwrap_err();
    assert!(matches!(err, ServiceError::InvalidData(_)));
}

#[test]
fn service_addresses_match_provider_router() {
    let conn = open_db_in_memory().unwrap();
    let provider = SqliteBroadcastProvider::try_new(&conn, RecordingNotifier::new(), authority())
        .unwrap();
    let service = BroadcastService::new(provider);

    assert_eq!(service.provider().collection_address(), COLLECTION);
    assert_eq!(service.provider().item_address(12), item(12));
}
