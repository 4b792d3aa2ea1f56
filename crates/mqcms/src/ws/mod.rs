//! Realtime broadcast over websockets.
//!
//! One [`BroadcastHub`] actor per logical channel owns a
//! [`ConnectionRegistry`]. Transport tasks and HTTP handlers talk to it only
//! through a cloneable [`HubHandle`]; the [`HubLocator`] maps channel names to
//! handles and creates hubs on first use.

mod connection;
mod error;
mod handler;
mod hub;
mod locator;
mod registry;

pub use connection::{Connection, ConnectionId, ConnectionState, Payload, SendFailure};
pub use error::{HubError, RegistryError};
pub use handler::{handle_socket, upgrade_to_hub, ws_handler};
pub use hub::{BroadcastHub, Departure, HubHandle, HubPhase, HubStats, PublishAck};
pub use locator::{GLOBAL_CHANNEL, HubLocator};
pub use registry::{ConnectionRegistry, Visit};
