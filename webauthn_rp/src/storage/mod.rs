mod errors;
mod memory;
mod types;

pub use errors::StorageError;
pub use memory::InMemoryStore;
pub use types::{Challenges, Credentials, Users};
