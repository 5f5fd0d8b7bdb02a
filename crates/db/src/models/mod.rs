//! Row models and DTOs.

pub mod board;
pub mod equipment;
pub mod serial_port;
pub mod settings;
