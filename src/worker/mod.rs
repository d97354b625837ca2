pub mod engine;
pub mod protocol;
pub mod snapshot;

pub use engine::{Engine, EngineOptions};
pub use protocol::{Command, Notification, ParamMap};
pub use snapshot::{build_update, UpdateThrottle};
