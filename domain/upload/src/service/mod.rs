mod clock;
mod completion;
mod creation;
mod event;
mod lock;
mod object_store;
mod part;
mod query;
mod sweep;

#[rustfmt::skip]
pub use {
    clock::{Clock, UtcClock},
    completion::UploadCompletionService,
    creation::SessionCreationService,
    event::EventPublisher,
    lock::DistributedLockManager,
    object_store::ObjectStoreClient,
    part::PartTrackingService,
    query::SessionQueryService,
    sweep::ExpirationSweepService,
};
