use std::sync::Arc;
use std::time::Duration;

use domain_upload::service::{
    ExpirationSweepService, PartTrackingService, SessionCreationService, SessionQueryService,
    UploadCompletionService, UtcClock,
};
use service_upload::{
    ExpirationSweepServiceImpl, PartTrackingServiceImpl, SessionCreationServiceImpl,
    SessionQueryServiceImpl, UploadCompletionServiceImpl,
};

use crate::config::BrokerConfig;
use crate::infrastructure::database::RedisClient;
use crate::infrastructure::event::RedisEventPublisher;
use crate::infrastructure::lock::RedisLockManager;
use crate::infrastructure::object_store::S3ObjectStoreClient;
use crate::infrastructure::repository::{RedisPartRepo, RedisSessionRepo};

/// Composition root: adapters constructed once, services handed out as
/// trait objects.
pub struct ServiceProvider {
    pub creation_service: Arc<dyn SessionCreationService>,
    pub completion_service: Arc<dyn UploadCompletionService>,
    pub part_service: Arc<dyn PartTrackingService>,
    pub query_service: Arc<dyn SessionQueryService>,
    pub sweep_service: Arc<dyn ExpirationSweepService>,
}

impl ServiceProvider {
    pub async fn build(config: &BrokerConfig) -> anyhow::Result<Self> {
        let redis_client = Arc::new(RedisClient::open(&config.redis.urls)?);
        let object_store: Arc<S3ObjectStoreClient> =
            Arc::new(S3ObjectStoreClient::from_config(&config.object_store).await?);
        let session_repo: Arc<RedisSessionRepo> =
            Arc::new(RedisSessionRepo::builder().client(redis_client.clone()).build());
        let part_repo: Arc<RedisPartRepo> =
            Arc::new(RedisPartRepo::builder().client(redis_client.clone()).build());
        let lock_manager =
            Arc::new(RedisLockManager::builder().client(redis_client.clone()).build());
        let event_publisher = Arc::new(RedisEventPublisher::builder().client(redis_client).build());
        let clock = Arc::new(UtcClock);

        let creation_service = Arc::new(
            SessionCreationServiceImpl::builder()
                .session_repo(session_repo.clone())
                .part_repo(part_repo.clone())
                .object_store(object_store.clone())
                .clock(clock.clone())
                .session_ttl(Duration::from_secs(config.session.ttl_secs))
                .presign_ttl(Duration::from_secs(config.session.presign_ttl_secs))
                .build(),
        );
        let completion_service = Arc::new(
            UploadCompletionServiceImpl::builder()
                .session_repo(session_repo.clone())
                .part_repo(part_repo.clone())
                .object_store(object_store.clone())
                .event_publisher(event_publisher.clone())
                .clock(clock.clone())
                .event_topic(config.session.event_topic.clone())
                .build(),
        );
        let part_service = Arc::new(
            PartTrackingServiceImpl::builder()
                .session_repo(session_repo.clone())
                .part_repo(part_repo.clone())
                .object_store(object_store.clone())
                .presign_ttl(Duration::from_secs(config.session.presign_ttl_secs))
                .build(),
        );
        let query_service = Arc::new(
            SessionQueryServiceImpl::builder()
                .session_repo(session_repo.clone())
                .part_repo(part_repo.clone())
                .build(),
        );
        let sweep_service = Arc::new(
            ExpirationSweepServiceImpl::builder()
                .session_repo(session_repo)
                .object_store(object_store)
                .lock_manager(lock_manager)
                .event_publisher(event_publisher)
                .clock(clock)
                .event_topic(config.session.event_topic.clone())
                .lock_hold(Duration::from_secs(config.sweep.lock_hold_secs))
                .build(),
        );

        Ok(Self {
            creation_service,
            completion_service,
            part_service,
            query_service,
            sweep_service,
        })
    }
}
