pub mod service;
pub mod session;

pub use service::{UploadOptions, UploadService};
pub use session::UploadSession;
