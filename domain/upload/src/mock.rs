use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::mock;
use uuid::Uuid;

use crate::model::entity::{CompletedPart, UploadSession};
use crate::model::vo::{ETag, SessionEvent};
use crate::repository::{CompletedPartRepo, SessionRepo};
use crate::service::{Clock, DistributedLockManager, EventPublisher, ObjectStoreClient};

mock! {
    pub SessionRepo {}
    #[async_trait]
    impl SessionRepo for SessionRepo {
        async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<UploadSession>>;
        async fn find_by_idempotency_key(
            &self,
            key: &str,
        ) -> anyhow::Result<Option<UploadSession>>;
        async fn insert(&self, session: &UploadSession) -> anyhow::Result<Option<UploadSession>>;
        async fn save(&self, session: &UploadSession) -> anyhow::Result<()>;
        async fn find_expired(
            &self,
            now: DateTime<Utc>,
            limit: usize,
        ) -> anyhow::Result<Vec<UploadSession>>;
    }
}

mock! {
    pub CompletedPartRepo {}
    #[async_trait]
    impl CompletedPartRepo for CompletedPartRepo {
        async fn find_all_by_session(
            &self,
            session_id: Uuid,
        ) -> anyhow::Result<Vec<CompletedPart>>;
        async fn find_by_session_and_part_number(
            &self,
            session_id: Uuid,
            part_number: u32,
        ) -> anyhow::Result<Option<CompletedPart>>;
        async fn save(&self, part: &CompletedPart) -> anyhow::Result<()>;
    }
}

mock! {
    pub ObjectStoreClient {}
    #[async_trait]
    impl ObjectStoreClient for ObjectStoreClient {
        async fn initiate_multipart(&self, bucket: &str, s3_key: &str) -> anyhow::Result<String>;
        async fn presign_put_url(
            &self,
            bucket: &str,
            s3_key: &str,
            expires_in: Duration,
        ) -> anyhow::Result<String>;
        async fn presign_part_url(
            &self,
            bucket: &str,
            s3_key: &str,
            upload_id: &str,
            part_number: u32,
            expires_in: Duration,
        ) -> anyhow::Result<String>;
        async fn complete_multipart(
            &self,
            bucket: &str,
            s3_key: &str,
            upload_id: &str,
            parts: &[CompletedPart],
        ) -> anyhow::Result<ETag>;
        async fn abort_multipart(
            &self,
            bucket: &str,
            s3_key: &str,
            upload_id: &str,
        ) -> anyhow::Result<()>;
        async fn get_object_etag(
            &self,
            bucket: &str,
            s3_key: &str,
        ) -> anyhow::Result<Option<ETag>>;
    }
}

mock! {
    pub DistributedLockManager {}
    #[async_trait]
    impl DistributedLockManager for DistributedLockManager {
        async fn try_lock(
            &self,
            key: &str,
            wait: Duration,
            hold: Duration,
        ) -> anyhow::Result<bool>;
        async fn unlock(&self, key: &str) -> anyhow::Result<()>;
    }
}

mock! {
    pub EventPublisher {}
    #[async_trait]
    impl EventPublisher for EventPublisher {
        async fn publish(&self, event: &SessionEvent, topic: &str) -> anyhow::Result<()>;
    }
}

mock! {
    pub Clock {}
    impl Clock for Clock {
        fn now(&self) -> DateTime<Utc>;
    }
}
