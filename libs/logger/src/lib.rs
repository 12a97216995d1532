pub mod config;
pub mod logger_layer;
pub mod sink;
