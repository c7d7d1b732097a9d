//! Element catalogs, status feeds and visibility filtering

mod catalog;
mod loader;
mod visibility;

pub use catalog::*;
pub use loader::*;
pub use visibility::*;
