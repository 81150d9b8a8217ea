pub mod janitor;
pub mod registry;
#[allow(clippy::module_inception)]
pub mod room;

pub use registry::{RoomRegistry, SharedRoom};
pub use room::Room;
