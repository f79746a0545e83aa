mod part;
mod session;

#[rustfmt::skip]
pub use {
    part::CompletedPartRepo,
    session::SessionRepo,
};
