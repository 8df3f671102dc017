mod controller;
mod events;
mod state;

pub use controller::ScanController;
pub use events::ScanEvent;
pub use state::{ProductSummary, ScanFailure, ScanPhase, ScanSessionState};
