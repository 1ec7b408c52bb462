pub mod dir_property;
pub mod manager;
pub mod user_home;

pub use dir_property::{Action, DirProperty, RegexRule, RegexpActionResult, Target};
pub use manager::PermissionsManager;
pub use user_home::{UserHome, VirtualFolder};
