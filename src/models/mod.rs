pub mod entry;
pub mod task;
pub mod user;
