//! Slot packing for BGV.
//!
//! With `t = 1 mod 2N`, `X^N + 1` splits into linear factors mod `t` and a
//! polynomial is determined by its values at the roots `psi^(2k+1)`. Slot
//! `i` is the pair of roots `psi^(5^i)` and `psi^(-5^i)`; both hold the slot
//! value, so the automorphism `X -> X^(5^r)` rotates the slots left by `r`
//! and conjugation leaves them unchanged.

use crate::{
    error::HeResult,
    math::{centered, reduce_i64},
    rings::NttTable,
};

#[derive(Debug, Clone)]
pub(crate) struct BgvBatching {
    table: NttTable,
    slot_index: Vec<usize>,
    mirror_index: Vec<usize>,
}

impl BgvBatching {
    pub fn new(plaintext_modulus: u64, degree: usize) -> HeResult<Self> {
        let table = NttTable::new(plaintext_modulus, degree)?;
        let two_n = 2 * degree;
        let mut slot_index = Vec::with_capacity(degree / 2);
        let mut mirror_index = Vec::with_capacity(degree / 2);
        let mut power = 1usize;
        for _ in 0..degree / 2 {
            slot_index.push((power - 1) / 2);
            mirror_index.push((two_n - power - 1) / 2);
            power = power * 5 % two_n;
        }
        Ok(Self {
            table,
            slot_index,
            mirror_index,
        })
    }

    pub fn plaintext_modulus(&self) -> u64 {
        self.table.modulus()
    }

    pub fn slot_count(&self) -> usize {
        self.slot_index.len()
    }

    /// Coefficients mod `t` of the polynomial holding `values` in its first
    /// slots and zero elsewhere.
    pub fn encode(&self, values: &[i64]) -> Vec<u64> {
        let t = self.plaintext_modulus();
        let mut evals = vec![0u64; self.table.degree()];
        for ((&v, &slot), &mirror) in values.iter().zip(&self.slot_index).zip(&self.mirror_index) {
            let v = reduce_i64(v, t);
            evals[slot] = v;
            evals[mirror] = v;
        }
        self.table.inverse(&mut evals);
        evals
    }

    /// Slot values, centered in `(-t/2, t/2]`.
    pub fn decode(&self, coeffs: &[u64]) -> Vec<i64> {
        let t = self.plaintext_modulus();
        let mut evals = coeffs.to_vec();
        self.table.forward(&mut evals);
        self.slot_index
            .iter()
            .map(|&slot| centered(evals[slot], t))
            .collect()
    }
}
