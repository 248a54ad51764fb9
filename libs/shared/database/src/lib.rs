pub mod clinic;
pub mod error;
pub mod sqlite;
pub mod store;

pub use clinic::ClinicData;
pub use error::StoreError;
pub use store::Database;
