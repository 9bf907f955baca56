pub mod health;
pub mod root;

pub use health::get as health_get;
pub use root::get as root_get;
