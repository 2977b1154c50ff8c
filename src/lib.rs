pub mod backup;
pub mod cache;
pub mod cluster_control;
pub mod configuration;
pub mod control_service;
pub mod entity;
pub mod error_handling;
pub mod process_management;
pub mod web_interface;

pub use cluster_control::{ClusterControl, ClusterController};
pub use configuration::Config;
pub use control_service::ControlService;
