use std::io::{Read, Write};

use crate::{
    error::{HeError, HeResult},
    hebase::{HeConfigRequirement, bin_io},
};

pub const DEFAULT_NUM_SLOTS: usize = 4096;
pub const DEFAULT_TOP_CHAIN_INDEX: i32 = 3;
pub const DEFAULT_NUM_BITS: u32 = 16;
/// Widest integer the bitwise operations handle. Slots hold `f64`, whose
/// 53-bit mantissa is the limit for exact integers.
pub const MAX_NUM_BITS: u32 = 53;

/// Shape of the simulated scheme. Nothing here affects security: the mockup
/// keeps its values in the clear and reports whatever level it is asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockupConfig {
    pub num_slots: usize,
    pub top_chain_index: i32,
    pub default_num_bits: u32,
    pub security_level: u32,
}

impl Default for MockupConfig {
    fn default() -> Self {
        Self {
            num_slots: DEFAULT_NUM_SLOTS,
            top_chain_index: DEFAULT_TOP_CHAIN_INDEX,
            default_num_bits: DEFAULT_NUM_BITS,
            security_level: 128,
        }
    }
}

impl MockupConfig {
    pub fn from_requirement(requirement: &HeConfigRequirement) -> HeResult<Self> {
        if requirement.bootstrappable {
            return Err(HeError::infeasible("bootstrapping is not supported"));
        }
        let config = Self {
            num_slots: requirement.num_slots.unwrap_or(DEFAULT_NUM_SLOTS),
            top_chain_index: requirement
                .multiplication_depth
                .map_or(DEFAULT_TOP_CHAIN_INDEX, |depth| depth as i32),
            default_num_bits: DEFAULT_NUM_BITS,
            security_level: requirement.security_level,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> HeResult<()> {
        if self.num_slots == 0 {
            return Err(HeError::infeasible("mockup needs at least one slot"));
        }
        if self.top_chain_index < 0 {
            return Err(HeError::infeasible(format!(
                "top chain index {} is negative",
                self.top_chain_index
            )));
        }
        if !(1..=MAX_NUM_BITS).contains(&self.default_num_bits) {
            return Err(HeError::infeasible(format!(
                "default bit width {} outside 1..={MAX_NUM_BITS}",
                self.default_num_bits
            )));
        }
        Ok(())
    }

    pub fn save(&self, out: &mut dyn Write) -> HeResult<()> {
        bin_io::write_len(out, self.num_slots)?;
        bin_io::write_i32(out, self.top_chain_index)?;
        bin_io::write_u32(out, self.default_num_bits)?;
        bin_io::write_u32(out, self.security_level)?;
        Ok(())
    }

    pub fn load(input: &mut dyn Read) -> HeResult<Self> {
        let config = Self {
            num_slots: bin_io::read_len(input)?,
            top_chain_index: bin_io::read_i32(input)?,
            default_num_bits: bin_io::read_u32(input)?,
            security_level: bin_io::read_u32(input)?,
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requirement_maps_to_shape() {
        let config = MockupConfig::from_requirement(&HeConfigRequirement::insecure(8, 5)).unwrap();
        assert_eq!(config.num_slots, 8);
        assert_eq!(config.top_chain_index, 5);
        assert_eq!(config.security_level, 0);

        let mut bootstrappable = HeConfigRequirement::default();
        bootstrappable.bootstrappable = true;
        assert!(MockupConfig::from_requirement(&bootstrappable).is_err());
    }

    #[test]
    fn rejects_bad_widths() {
        for bits in [0, 54, 63] {
            let config = MockupConfig {
                default_num_bits: bits,
                ..MockupConfig::default()
            };
            assert!(config.validate().is_err(), "{bits}");
        }
        let widest = MockupConfig {
            default_num_bits: MAX_NUM_BITS,
            ..MockupConfig::default()
        };
        assert!(widest.validate().is_ok());
    }
}
