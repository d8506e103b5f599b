//! ks-stream: Multiplexed stdin/stdout/stderr/resize streams for containers
//!
//! [`Multiplexer`] owns one upgraded connection per operation and splits
//! inbound frames by channel tag. [`Binder`] wires local sinks and an
//! input source to those channels for one attach or exec operation.

pub mod binder;
pub mod connection;
pub mod handler;
pub mod input;
pub mod multiplexer;
pub mod target;
pub mod tls;
pub mod ws;

pub use binder::{Binder, BoundStream, StreamOptions};
pub use connection::Connection;
pub use handler::{handle_standard_streams, Callbacks, HandlerAction, StreamHandler};
pub use input::{InputEvent, InputSource};
pub use multiplexer::{stream_url, Multiplexer, SUBPROTOCOLS};
pub use target::{StreamFlags, Target};
pub use ws::WsConnector;
