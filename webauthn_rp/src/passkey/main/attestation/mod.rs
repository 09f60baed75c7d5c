mod core;
mod none;
mod object;
mod packed;
mod utils;

pub use core::verify_attestation;
pub use object::AttestationObject;
