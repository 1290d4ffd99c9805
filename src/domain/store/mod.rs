//! Store domain - the keyed TTL store every other component goes through

mod backend;
mod pattern;

pub use backend::StoreBackend;
pub use pattern::{escape_glob, glob_to_regex};

#[cfg(test)]
pub use backend::mock::MockStore;
#[cfg(test)]
pub use backend::MockStoreBackend;
