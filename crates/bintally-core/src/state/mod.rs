mod store;

pub use store::{StateError, StateStore};
