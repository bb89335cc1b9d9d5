//! Camera synchronization between engine instances
//!
//! A publish/subscribe channel holding one camera state per room. Each
//! engine stamps what it publishes with its own id and ignores states that
//! carry that id when they come back.

mod bus;
mod camera_state;

pub use bus::{should_apply, CameraSyncBus, Subscription, SyncOutcome};
pub use camera_state::{CameraState, CameraStateError, Orientation, Position};
