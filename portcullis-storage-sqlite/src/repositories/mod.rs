mod account;
mod cleanup;
mod session;
mod verification;

pub use account::SqliteAccountRepository;
pub use cleanup::SqliteCleanupRepository;
pub use session::SqliteSessionRepository;
pub use verification::SqliteVerificationRepository;
