pub mod backward;
pub mod forward;

pub use backward::{accumulate_backward, backward};
pub use forward::{forward, forward_training};
