//! Classical security estimates for RLWE parameters.
//!
//! Bounds follow the HomomorphicEncryption.org standard tables for ternary
//! secrets: for a ring degree `n`, the largest `log2(Q * P)` that still
//! reaches a given security level.

/// Security levels covered by the table, strongest first.
pub const LEVELS: [u32; 3] = [256, 192, 128];

/// Read-only view of the standard bounds.
#[derive(Debug, Clone, Copy)]
pub struct SecurityTable;

// (n, max_log_qp_128, max_log_qp_192, max_log_qp_256)
const TABLE: [(usize, u32, u32, u32); 6] = [
    (1024, 27, 19, 14),
    (2048, 54, 37, 29),
    (4096, 109, 75, 58),
    (8192, 218, 152, 118),
    (16384, 438, 305, 237),
    (32768, 881, 611, 476),
];

impl SecurityTable {
    pub const MAX_RING_DEGREE: usize = 32768;

    pub fn rows() -> impl Iterator<Item = (usize, u32, u32, u32)> {
        TABLE.iter().copied()
    }
}

/// Largest modulus size (bits) allowed at `level` for ring degree `n`.
///
/// Level 0 means "no requirement" and returns `u32::MAX`. Unknown levels or
/// degrees below the table return `None`.
pub fn max_log_qp(n: usize, level: u32) -> Option<u32> {
    if level == 0 {
        return Some(u32::MAX);
    }
    let row = TABLE.iter().find(|row| row.0 == n)?;
    match level {
        128 => Some(row.1),
        192 => Some(row.2),
        256 => Some(row.3),
        _ => None,
    }
}

/// Highest tabulated security level reached by `(n, log_qp)`, or 0.
pub fn estimate_security_level(n: usize, log_qp: u32) -> u32 {
    LEVELS
        .iter()
        .copied()
        .find(|&level| max_log_qp(n, level).is_some_and(|max| log_qp <= max))
        .unwrap_or(0)
}
