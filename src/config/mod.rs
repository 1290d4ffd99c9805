//! Process configuration

mod app_config;

pub use app_config::{
    AdminConfig, AdmissionConfig, AppConfig, LogFormat, LoggingConfig, ServerConfig,
};
