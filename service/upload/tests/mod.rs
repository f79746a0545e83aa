use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use domain_upload::{
    command::{CreateMultipartSessionCommand, CreateSingleSessionCommand, MarkPartUploadedCommand},
    exception::SessionException,
    mock::{
        MockClock, MockCompletedPartRepo, MockDistributedLockManager, MockEventPublisher,
        MockObjectStoreClient, MockSessionRepo,
    },
    model::entity::{CompletedPart, SessionKind, SessionStatus, UploadSession},
    model::vo::{ETag, SessionEvent, SweepReport},
    service::{
        ExpirationSweepService, PartTrackingService, SessionCreationService, SessionQueryService,
        UploadCompletionService,
    },
};
use mockall::Sequence;
use service_upload::{
    ExpirationSweepServiceImpl, PartTrackingServiceImpl, SessionCreationServiceImpl,
    SessionQueryServiceImpl, UploadCompletionServiceImpl,
};

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

fn fixed_clock(secs: i64) -> Arc<MockClock> {
    let mut clock = MockClock::new();
    clock.expect_now().returning(move || at(secs));
    Arc::new(clock)
}

fn active_single() -> UploadSession {
    let mut session = UploadSession::new_single(
        "uploads".into(),
        "docs/report.pdf".into(),
        "idem-1".into(),
        at(0),
        at(3600),
    );
    session.activate(at(1)).unwrap();
    session
}

fn active_multipart(parts: u32) -> UploadSession {
    let mut session = UploadSession::new_multipart(
        "uploads".into(),
        "videos/raw.mov".into(),
        "mpu-1".into(),
        parts,
        at(0),
        at(3600),
    );
    session.activate(at(1)).unwrap();
    session
}

fn filled_part(session: &UploadSession, part_number: u32, etag: &str) -> CompletedPart {
    let mut part = CompletedPart::placeholder(
        session.id,
        part_number,
        format!("https://store/part/{part_number}"),
    );
    part.mark_uploaded(ETag::new(etag), 1024);
    part
}

// --- creation ---

#[tokio::test]
async fn create_single_provisions_presigned_put_and_activates() {
    let mut session_repo = MockSessionRepo::new();
    session_repo.expect_find_by_idempotency_key().returning(|_| Ok(None));
    session_repo.expect_insert().times(1).returning(|_| Ok(None));
    session_repo.expect_save().times(1).returning(|_| Ok(()));
    let mut object_store = MockObjectStoreClient::new();
    object_store
        .expect_presign_put_url()
        .times(1)
        .returning(|_, _, _| Ok("https://store/put/abc".to_string()));

    let service = SessionCreationServiceImpl::builder()
        .session_repo(Arc::new(session_repo))
        .part_repo(Arc::new(MockCompletedPartRepo::new()))
        .object_store(Arc::new(object_store))
        .clock(fixed_clock(0))
        .build();

    let session = service
        .create_single(CreateSingleSessionCommand {
            idempotency_key: "idem-1".into(),
            bucket: "uploads".into(),
            s3_key: "docs/report.pdf".into(),
        })
        .await
        .unwrap();

    assert_eq!(session.status, SessionStatus::Active);
    assert_eq!(session.presigned_url(), Some("https://store/put/abc"));
    assert_eq!(session.expires_at, at(3600));
}

#[tokio::test]
async fn create_single_replays_for_known_idempotency_key() {
    let existing = active_single();
    let existing_id = existing.id;

    let mut session_repo = MockSessionRepo::new();
    session_repo
        .expect_find_by_idempotency_key()
        .withf(|key| key == "idem-1")
        .returning(move |_| Ok(Some(existing.clone())));
    session_repo.expect_insert().times(0);
    session_repo.expect_save().times(0);
    let mut object_store = MockObjectStoreClient::new();
    object_store.expect_presign_put_url().times(0);

    let service = SessionCreationServiceImpl::builder()
        .session_repo(Arc::new(session_repo))
        .part_repo(Arc::new(MockCompletedPartRepo::new()))
        .object_store(Arc::new(object_store))
        .clock(fixed_clock(500))
        .build();

    let replayed = service
        .create_single(CreateSingleSessionCommand {
            idempotency_key: "idem-1".into(),
            bucket: "uploads".into(),
            s3_key: "docs/report.pdf".into(),
        })
        .await
        .unwrap();

    // second call returns the original session, nothing new provisioned
    assert_eq!(replayed.id, existing_id);
}

#[tokio::test]
async fn create_single_yields_the_winner_when_the_key_is_claimed_concurrently() {
    // Two creations race past the lookup with the same key; the losing
    // insert hands back the session that claimed the key first.
    let winner = active_single();
    let winner_id = winner.id;

    let mut session_repo = MockSessionRepo::new();
    session_repo.expect_find_by_idempotency_key().returning(|_| Ok(None));
    session_repo
        .expect_insert()
        .times(1)
        .returning(move |_| Ok(Some(winner.clone())));
    session_repo.expect_save().times(0);
    let mut object_store = MockObjectStoreClient::new();
    object_store.expect_presign_put_url().times(0);

    let service = SessionCreationServiceImpl::builder()
        .session_repo(Arc::new(session_repo))
        .part_repo(Arc::new(MockCompletedPartRepo::new()))
        .object_store(Arc::new(object_store))
        .clock(fixed_clock(0))
        .build();

    let replayed = service
        .create_single(CreateSingleSessionCommand {
            idempotency_key: "idem-1".into(),
            bucket: "uploads".into(),
            s3_key: "docs/report.pdf".into(),
        })
        .await
        .unwrap();

    assert_eq!(replayed.id, winner_id);
}

#[tokio::test]
async fn create_multipart_provisions_one_placeholder_per_part() {
    let mut session_repo = MockSessionRepo::new();
    session_repo.expect_insert().times(1).returning(|_| Ok(None));
    session_repo.expect_save().times(1).returning(|_| Ok(()));
    let mut part_repo = MockCompletedPartRepo::new();
    part_repo
        .expect_save()
        .times(3)
        .withf(|part| {
            (1..=3).contains(&part.part_number)
                && !part.is_uploaded()
                && part.presigned_url == format!("https://store/part/{}", part.part_number)
        })
        .returning(|_| Ok(()));
    let mut object_store = MockObjectStoreClient::new();
    object_store
        .expect_initiate_multipart()
        .times(1)
        .returning(|_, _| Ok("mpu-1".to_string()));
    object_store
        .expect_presign_part_url()
        .times(3)
        .withf(|_, _, upload_id, _, _| upload_id == "mpu-1")
        .returning(|_, _, _, part_number, _| Ok(format!("https://store/part/{part_number}")));

    let service = SessionCreationServiceImpl::builder()
        .session_repo(Arc::new(session_repo))
        .part_repo(Arc::new(part_repo))
        .object_store(Arc::new(object_store))
        .clock(fixed_clock(0))
        .build();

    let session = service
        .create_multipart(CreateMultipartSessionCommand {
            bucket: "uploads".into(),
            s3_key: "videos/raw.mov".into(),
            part_count: 3,
        })
        .await
        .unwrap();

    assert_eq!(session.status, SessionStatus::Active);
    assert_eq!(session.upload_id(), Some("mpu-1"));
}

// --- single-upload completion ---

#[tokio::test]
async fn complete_single_records_store_verified_etag() {
    let session = active_single();
    let session_id = session.id;

    let mut session_repo = MockSessionRepo::new();
    session_repo
        .expect_find_by_id()
        .returning(move |_| Ok(Some(session.clone())));
    session_repo
        .expect_save()
        .times(1)
        .withf(|saved| saved.status == SessionStatus::Completed)
        .returning(|_| Ok(()));
    let mut object_store = MockObjectStoreClient::new();
    object_store
        .expect_get_object_etag()
        .returning(|_, _| Ok(Some(ETag::new("\"abc123\""))));
    let mut publisher = MockEventPublisher::new();
    publisher
        .expect_publish()
        .times(1)
        .withf(|event, _| {
            matches!(event, SessionEvent::UploadCompleted { etag, .. } if etag.as_str() == "abc123")
        })
        .returning(|_, _| Ok(()));

    let service = UploadCompletionServiceImpl::builder()
        .session_repo(Arc::new(session_repo))
        .part_repo(Arc::new(MockCompletedPartRepo::new()))
        .object_store(Arc::new(object_store))
        .event_publisher(Arc::new(publisher))
        .clock(fixed_clock(60))
        .build();

    let completed = service
        .complete_single(session_id, ETag::new("abc123"))
        .await
        .unwrap();

    assert_eq!(completed.status, SessionStatus::Completed);
    match &completed.kind {
        SessionKind::Single {
            client_etag,
            verified_etag,
            ..
        } => {
            assert_eq!(client_etag.as_ref().unwrap().as_str(), "abc123");
            assert_eq!(verified_etag.as_ref().unwrap().as_str(), "abc123");
        }
        _ => panic!("expected single session"),
    }
}

#[tokio::test]
async fn etag_mismatch_is_non_destructive() {
    let session = active_single();
    let session_id = session.id;

    let mut session_repo = MockSessionRepo::new();
    session_repo
        .expect_find_by_id()
        .returning(move |_| Ok(Some(session.clone())));
    session_repo.expect_save().times(0);
    let mut object_store = MockObjectStoreClient::new();
    object_store
        .expect_get_object_etag()
        .returning(|_, _| Ok(Some(ETag::new("stored"))));
    let mut publisher = MockEventPublisher::new();
    publisher.expect_publish().times(0);

    let service = UploadCompletionServiceImpl::builder()
        .session_repo(Arc::new(session_repo))
        .part_repo(Arc::new(MockCompletedPartRepo::new()))
        .object_store(Arc::new(object_store))
        .event_publisher(Arc::new(publisher))
        .clock(fixed_clock(60))
        .build();

    let err = service
        .complete_single(session_id, ETag::new("reported"))
        .await
        .unwrap_err();
    assert!(matches!(err, SessionException::ETagMismatch { .. }));
}

#[tokio::test]
async fn completion_with_correct_etag_succeeds_after_a_mismatch() {
    let session = active_single();
    let session_id = session.id;

    let mut session_repo = MockSessionRepo::new();
    session_repo
        .expect_find_by_id()
        .returning(move |_| Ok(Some(session.clone())));
    session_repo.expect_save().times(1).returning(|_| Ok(()));
    let mut object_store = MockObjectStoreClient::new();
    object_store
        .expect_get_object_etag()
        .returning(|_, _| Ok(Some(ETag::new("stored"))));
    let mut publisher = MockEventPublisher::new();
    publisher.expect_publish().times(1).returning(|_, _| Ok(()));

    let service = UploadCompletionServiceImpl::builder()
        .session_repo(Arc::new(session_repo))
        .part_repo(Arc::new(MockCompletedPartRepo::new()))
        .object_store(Arc::new(object_store))
        .event_publisher(Arc::new(publisher))
        .clock(fixed_clock(60))
        .build();

    let err = service
        .complete_single(session_id, ETag::new("reported"))
        .await
        .unwrap_err();
    assert!(matches!(err, SessionException::ETagMismatch { .. }));

    let completed = service
        .complete_single(session_id, ETag::new("stored"))
        .await
        .unwrap();
    assert_eq!(completed.status, SessionStatus::Completed);
}

#[tokio::test]
async fn complete_single_rejects_a_multipart_session_before_any_store_call() {
    let session = active_multipart(3);
    let session_id = session.id;

    let mut session_repo = MockSessionRepo::new();
    session_repo
        .expect_find_by_id()
        .returning(move |_| Ok(Some(session.clone())));
    session_repo.expect_save().times(0);
    let mut object_store = MockObjectStoreClient::new();
    object_store.expect_get_object_etag().times(0);

    let service = UploadCompletionServiceImpl::builder()
        .session_repo(Arc::new(session_repo))
        .part_repo(Arc::new(MockCompletedPartRepo::new()))
        .object_store(Arc::new(object_store))
        .event_publisher(Arc::new(MockEventPublisher::new()))
        .clock(fixed_clock(60))
        .build();

    let err = service
        .complete_single(session_id, ETag::new("abc"))
        .await
        .unwrap_err();
    assert!(matches!(err, SessionException::NotSingle { .. }));
}

#[tokio::test]
async fn a_publish_failure_does_not_undo_a_persisted_completion() {
    let session = active_single();
    let session_id = session.id;

    let mut session_repo = MockSessionRepo::new();
    session_repo
        .expect_find_by_id()
        .returning(move |_| Ok(Some(session.clone())));
    session_repo
        .expect_save()
        .times(1)
        .withf(|saved| saved.status == SessionStatus::Completed)
        .returning(|_| Ok(()));
    let mut object_store = MockObjectStoreClient::new();
    object_store
        .expect_get_object_etag()
        .returning(|_, _| Ok(Some(ETag::new("abc123"))));
    let mut publisher = MockEventPublisher::new();
    publisher
        .expect_publish()
        .times(1)
        .returning(|_, _| Err(anyhow::anyhow!("broker unavailable")));

    let service = UploadCompletionServiceImpl::builder()
        .session_repo(Arc::new(session_repo))
        .part_repo(Arc::new(MockCompletedPartRepo::new()))
        .object_store(Arc::new(object_store))
        .event_publisher(Arc::new(publisher))
        .clock(fixed_clock(60))
        .build();

    let completed = service
        .complete_single(session_id, ETag::new("abc123"))
        .await
        .unwrap();
    assert_eq!(completed.status, SessionStatus::Completed);
}

#[tokio::test]
async fn absent_object_is_reported_as_missing_not_mismatched() {
    let session = active_single();
    let session_id = session.id;

    let mut session_repo = MockSessionRepo::new();
    session_repo
        .expect_find_by_id()
        .returning(move |_| Ok(Some(session.clone())));
    session_repo.expect_save().times(0);
    let mut object_store = MockObjectStoreClient::new();
    object_store.expect_get_object_etag().returning(|_, _| Ok(None));

    let service = UploadCompletionServiceImpl::builder()
        .session_repo(Arc::new(session_repo))
        .part_repo(Arc::new(MockCompletedPartRepo::new()))
        .object_store(Arc::new(object_store))
        .event_publisher(Arc::new(MockEventPublisher::new()))
        .clock(fixed_clock(60))
        .build();

    let err = service
        .complete_single(session_id, ETag::new("abc"))
        .await
        .unwrap_err();
    assert!(matches!(err, SessionException::MissingObject { .. }));
}

// --- multipart completion ---

#[tokio::test]
async fn multipart_completion_submits_parts_sorted_ascending() {
    let session = active_multipart(3);
    let session_id = session.id;
    // reported out of order: 3, 1, 2
    let ledger = vec![
        filled_part(&session, 3, "etag-3"),
        filled_part(&session, 1, "etag-1"),
        filled_part(&session, 2, "etag-2"),
    ];

    let mut session_repo = MockSessionRepo::new();
    session_repo
        .expect_find_by_id()
        .returning(move |_| Ok(Some(session.clone())));
    session_repo
        .expect_save()
        .times(1)
        .withf(|saved| saved.status == SessionStatus::Completed)
        .returning(|_| Ok(()));
    let mut part_repo = MockCompletedPartRepo::new();
    part_repo
        .expect_find_all_by_session()
        .returning(move |_| Ok(ledger.clone()));
    let mut object_store = MockObjectStoreClient::new();
    object_store
        .expect_complete_multipart()
        .times(1)
        .withf(|_, _, upload_id, parts| {
            upload_id == "mpu-1"
                && parts.iter().map(|p| p.part_number).collect::<Vec<_>>() == vec![1, 2, 3]
        })
        .returning(|_, _, _, _| Ok(ETag::new("merged-etag")));
    let mut publisher = MockEventPublisher::new();
    publisher
        .expect_publish()
        .times(1)
        .withf(|event, _| {
            matches!(event, SessionEvent::UploadCompleted { etag, .. } if etag.as_str() == "merged-etag")
        })
        .returning(|_, _| Ok(()));

    let service = UploadCompletionServiceImpl::builder()
        .session_repo(Arc::new(session_repo))
        .part_repo(Arc::new(part_repo))
        .object_store(Arc::new(object_store))
        .event_publisher(Arc::new(publisher))
        .clock(fixed_clock(120))
        .build();

    let completed = service.complete_multipart(session_id).await.unwrap();

    assert_eq!(completed.status, SessionStatus::Completed);
    match &completed.kind {
        SessionKind::Multipart { merged_etag, .. } => {
            assert_eq!(merged_etag.as_ref().unwrap().as_str(), "merged-etag");
        }
        _ => panic!("expected multipart session"),
    }
}

#[tokio::test]
async fn multipart_completion_without_reported_parts_is_rejected_before_any_call() {
    let session = active_multipart(3);
    let session_id = session.id;
    let placeholders = vec![
        CompletedPart::placeholder(session_id, 1, "u1".into()),
        CompletedPart::placeholder(session_id, 2, "u2".into()),
    ];

    let mut session_repo = MockSessionRepo::new();
    session_repo
        .expect_find_by_id()
        .returning(move |_| Ok(Some(session.clone())));
    session_repo.expect_save().times(0);
    let mut part_repo = MockCompletedPartRepo::new();
    part_repo
        .expect_find_all_by_session()
        .returning(move |_| Ok(placeholders.clone()));
    let mut object_store = MockObjectStoreClient::new();
    object_store.expect_complete_multipart().times(0);

    let service = UploadCompletionServiceImpl::builder()
        .session_repo(Arc::new(session_repo))
        .part_repo(Arc::new(part_repo))
        .object_store(Arc::new(object_store))
        .event_publisher(Arc::new(MockEventPublisher::new()))
        .clock(fixed_clock(120))
        .build();

    let err = service.complete_multipart(session_id).await.unwrap_err();
    assert!(matches!(err, SessionException::NoCompletedParts { .. }));
}

#[tokio::test]
async fn cancelling_a_multipart_session_aborts_the_store_upload() {
    let session = active_multipart(2);
    let session_id = session.id;

    let mut session_repo = MockSessionRepo::new();
    session_repo
        .expect_find_by_id()
        .returning(move |_| Ok(Some(session.clone())));
    session_repo
        .expect_save()
        .times(1)
        .withf(|saved| saved.status == SessionStatus::Failed)
        .returning(|_| Ok(()));
    let mut object_store = MockObjectStoreClient::new();
    object_store
        .expect_abort_multipart()
        .times(1)
        .withf(|_, _, upload_id| upload_id == "mpu-1")
        .returning(|_, _, _| Ok(()));

    let service = UploadCompletionServiceImpl::builder()
        .session_repo(Arc::new(session_repo))
        .part_repo(Arc::new(MockCompletedPartRepo::new()))
        .object_store(Arc::new(object_store))
        .event_publisher(Arc::new(MockEventPublisher::new()))
        .clock(fixed_clock(60))
        .build();

    let cancelled = service.cancel(session_id).await.unwrap();
    assert_eq!(cancelled.status, SessionStatus::Failed);
}

// --- part reporting ---

#[tokio::test]
async fn mark_part_uploaded_fills_the_preallocated_placeholder() {
    let session = active_multipart(3);
    let session_id = session.id;

    let mut session_repo = MockSessionRepo::new();
    session_repo
        .expect_find_by_id()
        .returning(move |_| Ok(Some(session.clone())));
    let mut part_repo = MockCompletedPartRepo::new();
    part_repo
        .expect_find_by_session_and_part_number()
        .withf(move |id, part_number| *id == session_id && *part_number == 2)
        .returning(move |id, n| Ok(Some(CompletedPart::placeholder(id, n, "u2".into()))));
    part_repo
        .expect_save()
        .times(1)
        .withf(|part| {
            part.part_number == 2
                && part.etag.as_ref().map(ETag::as_str) == Some("etag-2")
                && part.size_bytes == Some(2048)
        })
        .returning(|_| Ok(()));

    let service = PartTrackingServiceImpl::builder()
        .session_repo(Arc::new(session_repo))
        .part_repo(Arc::new(part_repo))
        .object_store(Arc::new(MockObjectStoreClient::new()))
        .build();

    service
        .mark_part_uploaded(MarkPartUploadedCommand {
            session_id,
            part_number: 2,
            etag: ETag::new("etag-2"),
            size_bytes: 2048,
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn part_number_outside_the_agreed_range_is_rejected_outright() {
    let session = active_multipart(3);
    let session_id = session.id;

    let mut session_repo = MockSessionRepo::new();
    session_repo
        .expect_find_by_id()
        .returning(move |_| Ok(Some(session.clone())));
    let mut part_repo = MockCompletedPartRepo::new();
    part_repo.expect_find_by_session_and_part_number().times(0);
    part_repo.expect_save().times(0);

    let service = PartTrackingServiceImpl::builder()
        .session_repo(Arc::new(session_repo))
        .part_repo(Arc::new(part_repo))
        .object_store(Arc::new(MockObjectStoreClient::new()))
        .build();

    let err = service
        .mark_part_uploaded(MarkPartUploadedCommand {
            session_id,
            part_number: 4,
            etag: ETag::new("etag-4"),
            size_bytes: 2048,
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SessionException::PartNotFound { part_number: 4, .. }
    ));
}

#[tokio::test]
async fn part_report_on_a_terminal_session_is_rejected() {
    let mut session = active_multipart(3);
    session.expire(at(10)).unwrap();
    session.poll_events();
    let session_id = session.id;

    let mut session_repo = MockSessionRepo::new();
    session_repo
        .expect_find_by_id()
        .returning(move |_| Ok(Some(session.clone())));

    let service = PartTrackingServiceImpl::builder()
        .session_repo(Arc::new(session_repo))
        .part_repo(Arc::new(MockCompletedPartRepo::new()))
        .object_store(Arc::new(MockObjectStoreClient::new()))
        .build();

    let err = service
        .mark_part_uploaded(MarkPartUploadedCommand {
            session_id,
            part_number: 1,
            etag: ETag::new("etag-1"),
            size_bytes: 1024,
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SessionException::IllegalStateTransition { .. }
    ));
}

#[tokio::test]
async fn regenerating_a_part_url_refreshes_the_ledger_row() {
    let session = active_multipart(3);
    let session_id = session.id;

    let mut session_repo = MockSessionRepo::new();
    session_repo
        .expect_find_by_id()
        .returning(move |_| Ok(Some(session.clone())));
    let mut part_repo = MockCompletedPartRepo::new();
    part_repo
        .expect_find_by_session_and_part_number()
        .returning(move |id, n| Ok(Some(CompletedPart::placeholder(id, n, "stale".into()))));
    part_repo
        .expect_save()
        .times(1)
        .withf(|part| part.presigned_url == "https://store/part/fresh")
        .returning(|_| Ok(()));
    let mut object_store = MockObjectStoreClient::new();
    object_store
        .expect_presign_part_url()
        .times(1)
        .returning(|_, _, _, _, _| Ok("https://store/part/fresh".to_string()));

    let service = PartTrackingServiceImpl::builder()
        .session_repo(Arc::new(session_repo))
        .part_repo(Arc::new(part_repo))
        .object_store(Arc::new(object_store))
        .build();

    let url = service.regenerate_part_url(session_id, 2).await.unwrap();
    assert_eq!(url, "https://store/part/fresh");
}

// --- expiration sweep ---

fn expired_multipart() -> UploadSession {
    let mut session = UploadSession::new_multipart(
        "uploads".into(),
        "videos/raw.mov".into(),
        "mpu-1".into(),
        3,
        at(0),
        at(10),
    );
    session.activate(at(1)).unwrap();
    session
}

#[tokio::test]
async fn sweep_aborts_and_expires_abandoned_multipart_sessions() {
    let session = expired_multipart();
    let listed = session.clone();
    let reloaded = session.clone();

    let mut session_repo = MockSessionRepo::new();
    session_repo
        .expect_find_expired()
        .returning(move |_, _| Ok(vec![listed.clone()]));
    session_repo
        .expect_find_by_id()
        .returning(move |_| Ok(Some(reloaded.clone())));
    session_repo
        .expect_save()
        .times(1)
        .withf(|saved| saved.status == SessionStatus::Expired)
        .returning(|_| Ok(()));
    let mut object_store = MockObjectStoreClient::new();
    object_store
        .expect_abort_multipart()
        .times(1)
        .withf(|_, _, upload_id| upload_id == "mpu-1")
        .returning(|_, _, _| Ok(()));
    let mut lock_manager = MockDistributedLockManager::new();
    lock_manager
        .expect_try_lock()
        .times(1)
        .withf(move |key, wait, _| {
            key == format!("upload_session_lock_{}", session.id) && *wait == Duration::ZERO
        })
        .returning(|_, _, _| Ok(true));
    lock_manager.expect_unlock().times(1).returning(|_| Ok(()));
    let mut publisher = MockEventPublisher::new();
    publisher
        .expect_publish()
        .times(1)
        .withf(|event, _| matches!(event, SessionEvent::SessionExpired { .. }))
        .returning(|_, _| Ok(()));

    let service = ExpirationSweepServiceImpl::builder()
        .session_repo(Arc::new(session_repo))
        .object_store(Arc::new(object_store))
        .lock_manager(Arc::new(lock_manager))
        .event_publisher(Arc::new(publisher))
        .clock(fixed_clock(7200))
        .build();

    let report = service.run_sweep(10).await.unwrap();
    assert_eq!(
        report,
        SweepReport {
            total: 1,
            succeeded: 1,
            failed: 0
        }
    );
}

#[tokio::test]
async fn sweep_expires_a_single_session_without_any_abort() {
    // created at T with expires_at = T+1h, swept at T+2h with batch size 10
    let mut session = UploadSession::new_single(
        "uploads".into(),
        "docs/report.pdf".into(),
        "idem-9".into(),
        at(0),
        at(3600),
    );
    session.activate(at(1)).unwrap();
    let listed = session.clone();
    let reloaded = session.clone();

    let mut session_repo = MockSessionRepo::new();
    session_repo
        .expect_find_expired()
        .withf(|now, limit| *now == at(7200) && *limit == 10)
        .returning(move |_, _| Ok(vec![listed.clone()]));
    session_repo
        .expect_find_by_id()
        .returning(move |_| Ok(Some(reloaded.clone())));
    session_repo
        .expect_save()
        .times(1)
        .withf(|saved| saved.status == SessionStatus::Expired && saved.updated_at == at(7200))
        .returning(|_| Ok(()));
    let mut object_store = MockObjectStoreClient::new();
    object_store.expect_abort_multipart().times(0);
    let mut lock_manager = MockDistributedLockManager::new();
    lock_manager.expect_try_lock().returning(|_, _, _| Ok(true));
    lock_manager.expect_unlock().returning(|_| Ok(()));
    let mut publisher = MockEventPublisher::new();
    publisher.expect_publish().times(1).returning(|_, _| Ok(()));

    let service = ExpirationSweepServiceImpl::builder()
        .session_repo(Arc::new(session_repo))
        .object_store(Arc::new(object_store))
        .lock_manager(Arc::new(lock_manager))
        .event_publisher(Arc::new(publisher))
        .clock(fixed_clock(7200))
        .build();

    let report = service.run_sweep(10).await.unwrap();
    assert_eq!(
        report,
        SweepReport {
            total: 1,
            succeeded: 1,
            failed: 0
        }
    );
}

#[tokio::test]
async fn sweep_silently_skips_sessions_whose_lock_is_held_elsewhere() {
    let session = expired_multipart();

    let mut session_repo = MockSessionRepo::new();
    session_repo
        .expect_find_expired()
        .returning(move |_, _| Ok(vec![session.clone()]));
    session_repo.expect_find_by_id().times(0);
    session_repo.expect_save().times(0);
    let mut object_store = MockObjectStoreClient::new();
    object_store.expect_abort_multipart().times(0);
    let mut lock_manager = MockDistributedLockManager::new();
    lock_manager.expect_try_lock().returning(|_, _, _| Ok(false));
    lock_manager.expect_unlock().times(0);

    let service = ExpirationSweepServiceImpl::builder()
        .session_repo(Arc::new(session_repo))
        .object_store(Arc::new(object_store))
        .lock_manager(Arc::new(lock_manager))
        .event_publisher(Arc::new(MockEventPublisher::new()))
        .clock(fixed_clock(7200))
        .build();

    let report = service.run_sweep(10).await.unwrap();
    // the skip is neither a success nor a failure
    assert_eq!(
        report,
        SweepReport {
            total: 1,
            succeeded: 0,
            failed: 0
        }
    );
}

#[tokio::test]
async fn sweep_performs_exactly_one_expiry_across_a_missed_lock_and_a_retry() {
    let session = expired_multipart();
    let listed = session.clone();
    let reloaded = session.clone();

    let mut session_repo = MockSessionRepo::new();
    session_repo
        .expect_find_expired()
        .times(2)
        .returning(move |_, _| Ok(vec![listed.clone()]));
    session_repo
        .expect_find_by_id()
        .times(1)
        .returning(move |_| Ok(Some(reloaded.clone())));
    session_repo.expect_save().times(1).returning(|_| Ok(()));
    let mut object_store = MockObjectStoreClient::new();
    object_store
        .expect_abort_multipart()
        .times(1)
        .returning(|_, _, _| Ok(()));
    let mut lock_manager = MockDistributedLockManager::new();
    let mut seq = Sequence::new();
    lock_manager
        .expect_try_lock()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _, _| Ok(false));
    lock_manager
        .expect_try_lock()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _, _| Ok(true));
    lock_manager.expect_unlock().times(1).returning(|_| Ok(()));
    let mut publisher = MockEventPublisher::new();
    publisher.expect_publish().times(1).returning(|_, _| Ok(()));

    let service = ExpirationSweepServiceImpl::builder()
        .session_repo(Arc::new(session_repo))
        .object_store(Arc::new(object_store))
        .lock_manager(Arc::new(lock_manager))
        .event_publisher(Arc::new(publisher))
        .clock(fixed_clock(7200))
        .build();

    let first = service.run_sweep(10).await.unwrap();
    assert_eq!(first.succeeded, 0);
    let second = service.run_sweep(10).await.unwrap();
    assert_eq!(second.succeeded, 1);
}

#[tokio::test]
async fn sweep_counts_an_abort_failure_and_leaves_the_session_non_terminal() {
    let session = expired_multipart();
    let listed = session.clone();
    let reloaded = session.clone();

    let mut session_repo = MockSessionRepo::new();
    session_repo
        .expect_find_expired()
        .returning(move |_, _| Ok(vec![listed.clone()]));
    session_repo
        .expect_find_by_id()
        .returning(move |_| Ok(Some(reloaded.clone())));
    session_repo.expect_save().times(0);
    let mut object_store = MockObjectStoreClient::new();
    object_store
        .expect_abort_multipart()
        .times(1)
        .returning(|_, _, _| Err(anyhow::anyhow!("store unavailable")));
    let mut lock_manager = MockDistributedLockManager::new();
    lock_manager.expect_try_lock().returning(|_, _, _| Ok(true));
    // the lock is released even when the reclaim fails
    lock_manager.expect_unlock().times(1).returning(|_| Ok(()));

    let service = ExpirationSweepServiceImpl::builder()
        .session_repo(Arc::new(session_repo))
        .object_store(Arc::new(object_store))
        .lock_manager(Arc::new(lock_manager))
        .event_publisher(Arc::new(MockEventPublisher::new()))
        .clock(fixed_clock(7200))
        .build();

    let report = service.run_sweep(10).await.unwrap();
    assert_eq!(
        report,
        SweepReport {
            total: 1,
            succeeded: 0,
            failed: 1
        }
    );
}

// --- detail query ---

#[tokio::test]
async fn detail_returns_the_session_with_parts_in_order() {
    let session = active_multipart(3);
    let session_id = session.id;
    let ledger = vec![
        filled_part(&session, 2, "etag-2"),
        CompletedPart::placeholder(session_id, 3, "u3".into()),
        filled_part(&session, 1, "etag-1"),
    ];

    let mut session_repo = MockSessionRepo::new();
    session_repo
        .expect_find_by_id()
        .returning(move |_| Ok(Some(session.clone())));
    let mut part_repo = MockCompletedPartRepo::new();
    part_repo
        .expect_find_all_by_session()
        .returning(move |_| Ok(ledger.clone()));

    let service = SessionQueryServiceImpl::builder()
        .session_repo(Arc::new(session_repo))
        .part_repo(Arc::new(part_repo))
        .build();

    let detail = service.detail(session_id).await.unwrap();
    assert_eq!(detail.session.id, session_id);
    assert_eq!(
        detail.parts.iter().map(|p| p.part_number).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
    assert!(!detail.parts[2].is_uploaded());
}

#[tokio::test]
async fn detail_for_an_unknown_session_is_not_found() {
    let mut session_repo = MockSessionRepo::new();
    session_repo.expect_find_by_id().returning(|_| Ok(None));

    let service = SessionQueryServiceImpl::builder()
        .session_repo(Arc::new(session_repo))
        .part_repo(Arc::new(MockCompletedPartRepo::new()))
        .build();

    let err = service.detail(uuid::Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, SessionException::SessionNotFound { .. }));
}
