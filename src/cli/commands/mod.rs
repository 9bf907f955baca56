pub mod logs;
pub mod provider;
pub mod sync;
