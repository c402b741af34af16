pub mod legacy;
pub mod memory;
pub mod mirror;
pub mod store;
pub mod supabase;

pub use legacy::{HttpLegacyStore, LegacyOperation, LegacyStore, LegacyStoreError};
pub use memory::MemoryClinicStore;
pub use mirror::SupabaseClinicStore;
pub use store::{ClinicStore, StoreError};
