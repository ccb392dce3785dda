//! Service layer for the authentication use cases
//!
//! Leaf services ([`OneTimeCodeManager`], [`SessionManager`]) operate on an
//! open unit of work handed to them by [`AccountService`], which owns the
//! transaction boundary through [`TransactionCoordinator`].

pub mod account;
pub mod one_time_code;
pub mod session;
pub mod transaction;

pub use account::{AccountService, LoginOutcome, RegisterRequest, Registration};
pub use one_time_code::OneTimeCodeManager;
pub use session::SessionManager;
pub use transaction::TransactionCoordinator;
