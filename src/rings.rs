//! Residue-number-system polynomial arithmetic in `Z_Q[X]/(X^N + 1)` with a
//! runtime ring degree.

pub mod basis;
pub mod chain;
pub mod errors;
pub mod ntt;
pub mod poly;
mod poly_io;

pub use basis::RnsBasis;
pub use chain::ModulusChain;
pub use errors::{RingError, RingResult};
pub use ntt::NttTable;
pub use poly::RnsPoly;
