pub mod inactivity;
pub mod tasks;
