pub mod boards;
pub mod live;
pub mod locks;
pub mod relay;
pub mod serial;
pub mod settings;
