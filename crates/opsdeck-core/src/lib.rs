pub mod backend;
pub mod clock;
pub mod config;
pub mod error;
pub mod feeds;
pub mod tools;
pub mod types;

pub use backend::Backend;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::DeckConfig;
pub use error::{HistoryError, ScriptTaskError, TransportError, ValidationError};
pub use types::*;
