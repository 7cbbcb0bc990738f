mod action;
mod id;
mod permission;
mod resource;

pub use self::action::Action;
pub use self::id::Id;
pub use self::permission::Permission;
pub use self::resource::{Resource, ResourceType};
