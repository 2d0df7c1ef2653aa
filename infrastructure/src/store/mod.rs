//! Session Store adapters

mod memory;

pub use memory::InMemorySessionStore;
