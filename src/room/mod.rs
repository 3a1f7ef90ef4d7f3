//! Room event reconciliation
//!
//! Keeps the render surface in lockstep with the room's event stream. The
//! reconciliation logic is a pure reducer over [`RoomState`]; the
//! [`RoomDriver`] is the thin adapter that executes the resulting render
//! commands against the surface, the tracks and the session context.

pub mod driver;
pub mod reducer;
pub mod state;

pub use driver::RoomDriver;
pub use reducer::{reduce, RenderCommand, Update};
pub use state::{Owner, RoomState, SessionPhase};
