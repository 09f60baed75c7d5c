pub mod authenticator;

pub use authenticator::{Attestation, SoftAuthenticator};
pub use fixtures::*;
