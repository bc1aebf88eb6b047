pub mod fees;
pub mod normalizer;
pub mod prelude;
pub mod rate_limiter;
pub mod rest;
pub mod signer;
pub mod traits;

pub use fees::*;
pub use normalizer::*;
pub use rate_limiter::*;
pub use rest::*;
pub use signer::*;
pub use traits::*;
