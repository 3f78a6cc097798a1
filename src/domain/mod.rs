pub mod connector;
pub mod models;
pub mod status_tracker;
