pub mod analytics;
pub mod auth;
pub mod classes;
pub mod core;
pub mod reports;
pub mod students;
