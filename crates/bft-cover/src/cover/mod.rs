//! Cover entities: controller, motion watcher and the host registry.

mod controller;
mod error;
mod registry;
mod watcher;

pub use controller::{CommandOutcome, CoverAttributes, CoverController, DEVICE_CLASS};
pub use error::CoverError;
pub use registry::CoverRegistry;
