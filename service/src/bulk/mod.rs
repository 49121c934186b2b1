pub mod context;
pub(crate) mod deletion;
pub mod options;
pub mod pipeline;
pub mod scanner;
pub mod service;
pub mod steps;

pub use options::{DeleteOptions, DeleteSummary, FetchOptions, ViewSpec};
pub use service::BulkService;
