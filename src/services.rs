pub mod calendar;
pub mod projects;
pub mod sync;
pub mod timeline;
