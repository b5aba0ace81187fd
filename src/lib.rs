pub mod config;
pub mod error;
pub mod logging;
pub mod membership;
pub mod mentions;
pub mod metadata;
pub mod reminder;
pub mod slack;

#[cfg(test)]
mod test_support;

pub use error::{ReminderError, Result};
