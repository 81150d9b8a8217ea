pub mod broadcaster;
pub mod connection;
pub mod handler;

pub use broadcaster::{Broadcaster, InMemoryBroadcaster, Outbound};
pub use connection::Connection;
pub use handler::SessionHandler;
