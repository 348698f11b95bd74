pub mod config;
pub mod core_community;
pub mod logging;
pub mod metrics;

#[cfg(test)]
pub mod test_utils;

pub use config::Config;
pub use core_community::{MembershipError, MembershipManager, Role};
pub use logging::{init_logging, LogLevel};
