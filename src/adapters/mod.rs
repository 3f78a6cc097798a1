pub mod api;
pub mod apns;
pub mod apns_credentials;
pub mod availability_log;
pub mod device_registry;
pub mod persistence;
pub mod places;
pub mod places_replay;
