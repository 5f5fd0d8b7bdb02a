//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async query methods
//! that accept `&PgPool` as the first argument.

pub mod board_repo;
pub mod equipment_repo;
pub mod serial_port_repo;
pub mod settings_repo;

pub use board_repo::BoardRepo;
pub use equipment_repo::EquipmentRepo;
pub use serial_port_repo::SerialPortRepo;
pub use settings_repo::SettingsRepo;
