use async_trait::async_trait;

use crate::command::{CreateMultipartSessionCommand, CreateSingleSessionCommand};
use crate::exception::SessionResult;
use crate::model::entity::UploadSession;

/// # Session creation service
///
/// Orchestrates: idempotency check → object-store provisioning → persist →
/// (multipart) presigned URL and ledger-placeholder provisioning → activate.
/// Persisting the PENDING session is the durability boundary: once the
/// record exists, the recovery sweep can reclaim whatever object-store
/// resources were already provisioned for it.
#[async_trait]
pub trait SessionCreationService: Send + Sync {
    /// Replay-safe: a second call with the same idempotency key returns the
    /// existing session unchanged and provisions nothing.
    async fn create_single(
        &self,
        command: CreateSingleSessionCommand,
    ) -> SessionResult<UploadSession>;

    /// Initiates the store-side multipart upload, then provisions one
    /// presigned URL and one placeholder ledger row per expected part.
    async fn create_multipart(
        &self,
        command: CreateMultipartSessionCommand,
    ) -> SessionResult<UploadSession>;
}
