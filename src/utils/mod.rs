pub mod command;
pub mod locker;
pub mod mail;
pub mod schedule;
pub mod systemd;
pub mod tools;

// Trait-based abstractions for testability
pub mod executor;

// Re-export commonly used types and traits (used by test crate)
pub use command::{CommandOutput, CommandSpec};
pub use executor::{CommandExecutor, RealExecutor};
pub use mail::{MailTransport, NotifyError, SmtpMailer};
