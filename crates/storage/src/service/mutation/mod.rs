pub mod images;
pub mod projects;
pub mod relations;
pub mod todos;
