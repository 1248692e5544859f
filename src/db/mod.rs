pub mod memory;
pub mod mongo;
pub mod store;

pub use memory::InMemoryStore;
pub use mongo::MongoStore;
pub use store::{BookingStore, ListingStore, StoreError};
