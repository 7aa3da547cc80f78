//! Listen descriptors, TLS attachments, and errors shared across the address
//! binding crates.

pub mod error;
pub mod listen;
pub mod tls;

pub use error::{BindError, TransportError};
pub use listen::{ListenDescriptor, ListenTarget, Scheme};
pub use tls::{HttpsOptions, Password, ServerCertificate, StoredCertificate};
