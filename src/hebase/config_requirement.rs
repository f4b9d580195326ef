use std::{
    fmt,
    io::{Read, Write},
};

use super::bin_io;
use crate::error::{HeError, HeResult};

/// Which evaluation keys a context should generate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicFunctions {
    pub relinearize: bool,
    pub rotate: RotationKeys,
    pub conjugate: bool,
}

/// Rotation key material requested from a context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RotationKeys {
    None,
    /// Keys for left rotations by every power of two below the slot count.
    /// Any rotation is then a product of at most `log2(slots)` of them.
    PowersOfTwo,
    /// Keys only for the listed rotation offsets.
    Custom(Vec<i32>),
}

impl Default for PublicFunctions {
    fn default() -> Self {
        Self {
            relinearize: true,
            rotate: RotationKeys::PowersOfTwo,
            conjugate: true,
        }
    }
}

impl PublicFunctions {
    pub fn save(&self, out: &mut dyn Write) -> HeResult<()> {
        bin_io::write_bool(out, self.relinearize)?;
        bin_io::write_bool(out, self.conjugate)?;
        match &self.rotate {
            RotationKeys::None => bin_io::write_i32(out, 0)?,
            RotationKeys::PowersOfTwo => bin_io::write_i32(out, 1)?,
            RotationKeys::Custom(offsets) => {
                bin_io::write_i32(out, 2)?;
                bin_io::write_len(out, offsets.len())?;
                for &offset in offsets {
                    bin_io::write_i32(out, offset)?;
                }
            }
        }
        Ok(())
    }

    pub fn load(input: &mut dyn Read) -> HeResult<Self> {
        let relinearize = bin_io::read_bool(input)?;
        let conjugate = bin_io::read_bool(input)?;
        let rotate = match bin_io::read_i32(input)? {
            0 => RotationKeys::None,
            1 => RotationKeys::PowersOfTwo,
            2 => {
                let count = bin_io::read_len(input)?;
                let offsets = (0..count)
                    .map(|_| bin_io::read_i32(input))
                    .collect::<std::io::Result<Vec<_>>>()?;
                RotationKeys::Custom(offsets)
            }
            tag => return Err(HeError::corrupt(format!("unknown rotation key tag {tag}"))),
        };
        Ok(Self {
            relinearize,
            rotate,
            conjugate,
        })
    }
}

/// Scheme-agnostic description of what a context must support.
///
/// A context turns a requirement into concrete parameters with
/// [`HeContext::init`](crate::HeContext::init), or reports whether it could
/// with [`HeContext::is_config_requirement_feasible`](crate::HeContext::is_config_requirement_feasible).
#[derive(Debug, Clone, PartialEq)]
pub struct HeConfigRequirement {
    /// Required classical security in bits. 0 accepts insecure toy rings.
    pub security_level: u32,
    /// Bits needed for the integer part of encoded values.
    pub integer_part_precision: u32,
    /// Bits of fixed-point precision after the binary point.
    pub fractional_part_precision: u32,
    pub num_slots: Option<usize>,
    pub multiplication_depth: Option<usize>,
    pub bootstrappable: bool,
    pub public_functions: PublicFunctions,
}

impl Default for HeConfigRequirement {
    fn default() -> Self {
        Self::new(128, 10, 38)
    }
}

impl HeConfigRequirement {
    pub fn new(
        security_level: u32,
        integer_part_precision: u32,
        fractional_part_precision: u32,
    ) -> Self {
        Self {
            security_level,
            integer_part_precision,
            fractional_part_precision,
            num_slots: None,
            multiplication_depth: None,
            bootstrappable: false,
            public_functions: PublicFunctions::default(),
        }
    }

    /// A small, fast, insecure requirement for tests and demos.
    pub fn insecure(num_slots: usize, multiplication_depth: usize) -> Self {
        Self {
            num_slots: Some(num_slots),
            multiplication_depth: Some(multiplication_depth),
            ..Self::new(0, 10, 30)
        }
    }

    pub fn with_num_slots(mut self, num_slots: usize) -> Self {
        self.num_slots = Some(num_slots);
        self
    }

    pub fn with_multiplication_depth(mut self, depth: usize) -> Self {
        self.multiplication_depth = Some(depth);
        self
    }

    pub fn with_public_functions(mut self, functions: PublicFunctions) -> Self {
        self.public_functions = functions;
        self
    }
}

impl fmt::Display for HeConfigRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "security={} int={} frac={}",
            self.security_level, self.integer_part_precision, self.fractional_part_precision
        )?;
        if let Some(slots) = self.num_slots {
            write!(f, " slots={slots}")?;
        }
        if let Some(depth) = self.multiplication_depth {
            write!(f, " depth={depth}")?;
        }
        if self.bootstrappable {
            write!(f, " bootstrappable")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_common_ckks_settings() {
        let req = HeConfigRequirement::default();
        assert_eq!(req.security_level, 128);
        assert_eq!(req.integer_part_precision, 10);
        assert_eq!(req.fractional_part_precision, 38);
        assert_eq!(req.num_slots, None);
        assert_eq!(req.to_string(), "security=128 int=10 frac=38");
    }

    #[test]
    fn insecure_preset_sets_shape() {
        let req = HeConfigRequirement::insecure(16, 4);
        assert_eq!(req.security_level, 0);
        assert_eq!(req.to_string(), "security=0 int=10 frac=30 slots=16 depth=4");
    }

    #[test]
    fn public_functions_persist() {
        let functions = PublicFunctions {
            relinearize: false,
            rotate: RotationKeys::Custom(vec![1, -3]),
            conjugate: true,
        };
        let mut buf = Vec::new();
        functions.save(&mut buf).unwrap();
        let loaded = PublicFunctions::load(&mut std::io::Cursor::new(buf)).unwrap();
        assert_eq!(loaded, functions);
    }
}
