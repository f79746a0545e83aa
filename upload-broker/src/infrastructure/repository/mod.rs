mod part;
mod session;

pub use part::RedisPartRepo;
pub use session::RedisSessionRepo;
