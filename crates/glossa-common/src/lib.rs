pub mod errors;
pub mod id;
pub mod types;

pub use errors::{BridgeError, DrmError, GlossaError};
pub use id::new_callback_id;
pub use types::{DocumentKey, DocumentMetadata};

pub type Result<T> = std::result::Result<T, GlossaError>;
