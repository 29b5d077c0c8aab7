//! Output formats.  `portable` is what the runtime loads; `listing` is for
//! people.
pub mod listing;
pub mod portable;
