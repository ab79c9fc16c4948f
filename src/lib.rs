// Serial (TTY) device discovery, inspection and port access for a host
// application, exposed through a method-call bridge.
//
// Flow: driver table -> serial drivers -> device nodes under /dev -> the host
// picks a path -> port session -> single bounded reads.

#[macro_use]
mod logging;

pub mod bridge;
pub mod channel;
pub mod devices;
pub mod drivers;
pub mod error;
pub mod inspect;
pub mod port;
pub mod settings;

pub use bridge::{MethodCall, MethodResult, SerialBridge, ERROR_CODE};
pub use devices::{DeviceEnumerator, DeviceNode};
pub use drivers::Driver;
pub use error::{BridgeError, BridgeResult};
pub use inspect::{DeviceInfo, DeviceKind};
pub use logging::{init_file_logging, stop_file_logging};
pub use port::{PortOpener, PortSession, SystemPortOpener, READ_BUFFER_SIZE};
pub use settings::BridgeSettings;
