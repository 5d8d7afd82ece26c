pub mod schema;
pub mod sqlite;
mod traits;

pub use traits::RecordStore;
