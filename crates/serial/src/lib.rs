//! Serial console multiplexing.
//!
//! One physical connection per device is shared by any number of viewers:
//! inbound text is fanned out to every viewer and kept in a bounded replay
//! buffer, so a viewer that joins (or reconnects) late first receives the
//! recent history.
//!
//! - [`SerialSessionManager`]: owns the sessions and their lifecycle.
//! - [`SerialOpener`] / [`SerialLink`]: the port to the physical device;
//!   [`SystemSerialOpener`] implements it with the `serialport` crate.
//! - [`ServerFrame`] / [`parse_client_input`]: the viewer wire protocol.

pub mod frame;
pub mod link;
pub mod manager;
pub mod replay;
pub mod system;

pub use frame::{parse_client_input, ServerFrame};
pub use link::{LinkEvent, LinkWriter, PortInfo, SerialError, SerialLink, SerialOpener};
pub use manager::{SerialConfig, SerialSessionManager, ViewerHandle};
pub use replay::ReplayBuffer;
pub use system::SystemSerialOpener;
