pub mod memory;
pub mod models;
pub mod store;
pub mod supabase;

pub use models::{Appointment, Doctor, Profile};
pub use store::{AppState, DirectoryStore, StoreError};
