pub mod autosave;
pub mod download;
pub mod latest;

pub use autosave::get as autosave_get;
pub use autosave::put as autosave_put;
pub use download::all as download_all;
pub use download::selected as download_selected;
pub use latest::get as latest_get;
pub use latest::supervisor as supervisor_latest_get;
