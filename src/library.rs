//! Track model, library scanning and catalog queries.

mod catalog;
mod model;
mod scan;

pub use catalog::{Catalog, GroupEntry, LibraryCatalog};
pub use model::{Track, TrackId, UNKNOWN_ALBUM, UNKNOWN_ARTIST};
pub use scan::scan;
