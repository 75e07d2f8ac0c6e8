pub mod model;
pub mod repository;

pub use model::{Profile, Workspace, WorkspaceMember, WorkspaceRole};
pub use repository::{ProfileRepository, WorkspaceRepository};
