//! bft-cover - Supervisor and HTTP bridge for BFT U-Control gates and doors.
//!
//! A cover is polled through the vendor cloud; its dual-engine telemetry is
//! classified into a discrete state, and a motion watcher keeps polling after
//! each command until the gate settles.

// ============================================================================
// Always Available
// ============================================================================

pub mod config;
pub mod cover;
pub mod gate;

// ============================================================================
// Server-only (behind `server` feature)
// ============================================================================

#[cfg(feature = "server")]
pub mod handlers;
#[cfg(feature = "server")]
pub mod response;
#[cfg(feature = "server")]
pub mod server;

#[cfg(test)]
mod test_support;
