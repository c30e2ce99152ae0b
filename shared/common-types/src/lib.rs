//! Row shapes shared by the studio storage clients and the application.

mod gallery;
mod project;
mod session;

pub use gallery::{DesignStyle, GalleryEntry, GalleryEntryPatch, NewGalleryEntry, RoomType};
pub use project::{NewProject, ProjectPatch, UserProject, VisualizationRequest};
pub use session::{AuthUser, Session};
