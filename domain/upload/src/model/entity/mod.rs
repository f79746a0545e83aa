mod part;
mod session;

#[rustfmt::skip]
pub use {
    part::CompletedPart,
    session::{SessionKind, SessionStatus, UploadSession},
};
