pub mod backup;
pub mod cleanup;
pub mod logging;
pub mod notification;
pub mod verify;
