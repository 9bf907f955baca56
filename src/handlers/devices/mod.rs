pub mod assign;
pub mod list;

pub use assign::post as assign_post;
pub use list::get as devices_get;
pub use list::owner_details as owner_details_get;
pub use list::unassigned as unassigned_get;
