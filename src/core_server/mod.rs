pub mod core_status;

pub use core_status::{CoreState, CoreStatus};
