//! Number theory, sampling and parameter-security helpers shared by the ring
//! layer and the scheme backends.

pub mod modular;
pub mod primes;
pub mod sampling;
pub mod security;

pub use modular::{
    add_mod, centered, find_primitive_root, mod_inverse, mod_pow, mul_mod,
    reduce_i64, reduce_i128, sub_mod,
};
pub use primes::{
    generate_primes, get_first_prime_down, get_first_prime_up,
    is_ntt_friendly_prime, is_prime,
};
pub use sampling::{gaussian_integers, ternary_integers, uniform_residues};
pub use security::{SecurityTable, estimate_security_level, max_log_qp};
