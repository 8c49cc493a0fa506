//! HTTP request handlers.

pub mod bookmarks;
pub mod disk;
pub mod index;
pub mod roms;
pub mod saves;
pub mod sync;

pub use bookmarks::*;
pub use disk::*;
pub use index::*;
pub use roms::*;
pub use saves::*;
pub use sync::*;

use retroshelf_core::Error;
use retroshelf_core::paths::safe_component;

/// A required query parameter, reduced to its final path component.
pub(crate) fn required_name(field: &str, value: Option<&str>) -> Result<String, Error> {
    let value = value.map(str::trim).unwrap_or_default();
    if value.is_empty() {
        return Err(Error::InvalidInput(format!("missing parameter '{field}'")));
    }
    safe_component(value)
        .map(str::to_string)
        .ok_or_else(|| Error::InvalidInput(format!("invalid value for '{field}': {value}")))
}
