mod completion;
mod creation;
mod part;
mod query;
mod sweep;

#[rustfmt::skip]
pub use {
    completion::UploadCompletionServiceImpl,
    creation::SessionCreationServiceImpl,
    part::PartTrackingServiceImpl,
    query::SessionQueryServiceImpl,
    sweep::ExpirationSweepServiceImpl,
};
