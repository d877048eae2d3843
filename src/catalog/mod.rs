//! Catalog wiring.
//!
//! `Catalog` is the authoritative ordered record set for one loaded root plus
//! the filtered view derived from the active query. `Pager` slices whichever
//! of the two is active into fixed-size pages.

pub mod index;
pub mod pager;

pub use index::Catalog;
pub use pager::{DEFAULT_PAGE_SIZE, Page, Pager};
