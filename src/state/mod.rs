pub mod app_settings;
pub mod messages;
pub mod partition;
pub mod refresher;
pub mod scheduler;
pub mod snapshot;
pub mod store;
pub mod worker;
