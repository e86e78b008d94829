pub mod analyze;
pub mod config_cmd;
pub mod doctor;
pub mod gates;
pub mod monitor;
pub mod profiles;
pub mod status;
