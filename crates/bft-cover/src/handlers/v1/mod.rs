//! Version 1 API handlers.

mod covers;

pub use covers::{close_cover, get_cover, list_covers, open_cover, stop_cover, update_cover};
