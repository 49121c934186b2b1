pub mod app_services;
pub mod bulk;
pub mod error;
pub mod group_service;
pub mod item_service;
pub mod list_service;
pub mod logging;
pub mod path;
pub mod pipeline;
pub mod progress;
mod remote_call;
pub mod settings;
pub mod upload;
