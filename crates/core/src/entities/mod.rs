pub mod image;
pub mod project;
pub mod relation;
pub mod todo;

pub use image::{ImageUpload, ProjectImage};
pub use project::{ArchiveNotes, NewProject, Project, ProjectRow, ProjectStatus};
pub use relation::ProjectRelation;
pub use todo::{Todo, TodoRow};
