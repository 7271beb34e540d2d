//! Rate limiting logic and state management.

mod identity;
mod limiter;
mod policy;
mod window;

pub use identity::{resolve_client_key, UNKNOWN_CLIENT};
pub use limiter::{Decision, RateLimiter};
pub use policy::Policy;
pub use window::{WindowEntry, WindowStore};
