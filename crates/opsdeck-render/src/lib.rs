//! Query composition and the result display cycle.
//!
//! [`compose`] turns form state into a validated [`opsdeck_core::QuerySelection`];
//! [`ResultRenderer`] runs it against the backend, installs the returned
//! fragment, replays its scripts and schedules a history refresh.

pub mod composer;
pub mod renderer;
pub mod state;
pub mod surface;
pub mod ticker;

pub use composer::{compose, time_range_visible, ToolSelection};
pub use renderer::{exec_time_label, CycleError, Rendered, ResultRenderer};
pub use state::CycleState;
pub use surface::{Affordance, ErrorBlock, RecordingSurface, ResultSurface, SurfaceEvent};
pub use ticker::ElapsedTicker;
