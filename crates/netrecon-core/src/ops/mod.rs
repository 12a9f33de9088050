pub mod store;

pub use store::{detach_reference, InMemoryRegistry, RegistryStore};
