//! Authentication and request throttling middleware

pub mod rate_limit;
pub mod session;

pub use rate_limit::{RateLimitPreset, RateLimiter};
pub use session::{StaffIdentity, UserIdentity};
