mod entry;
mod spin;

pub use entry::Entry;
pub use spin::{SpinKey, SpinRecord, DEFAULT_FILTER};
