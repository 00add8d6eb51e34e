pub mod assist;
pub mod images;
pub mod projects;
pub mod transfer;
