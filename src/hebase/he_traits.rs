use std::fmt;

macro_rules! trait_flags {
    ($( $(#[$doc:meta])* $field:ident / $setter:ident ),* $(,)?) => {
        /// Static capability flags of a scheme.
        ///
        /// Code driving a context through [`CTile`](crate::CTile) consults
        /// these to decide, for example, whether chain indices must be managed
        /// by hand.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
        pub struct HeTraits {
            $( $field: bool, )*
            arithmetic_modulus: u64,
        }

        impl HeTraits {
            $(
                $(#[$doc])*
                #[inline]
                pub fn $field(&self) -> bool {
                    self.$field
                }

                #[inline]
                pub fn $setter(&mut self, value: bool) -> &mut Self {
                    self.$field = value;
                    self
                }
            )*

            /// Keeps only the capabilities both sides have. The arithmetic
            /// modulus survives only when both agree on it.
            pub fn intersect(&mut self, other: &HeTraits) {
                $( self.$field &= other.$field; )*
                if self.arithmetic_modulus != other.arithmetic_modulus {
                    self.arithmetic_modulus = 0;
                }
            }

            fn flag_entries(&self) -> Vec<(&'static str, bool)> {
                vec![$( (stringify!($field), self.$field), )*]
            }
        }
    };
}

trait_flags! {
    supports_bootstrapping / set_supports_bootstrapping,
    /// Rescale must be requested explicitly (`rescale_raw`).
    supports_explicit_rescale / set_supports_explicit_rescale,
    /// Chain indices are hidden and handled by the backend.
    automatically_manages_chain_indices / set_automatically_manages_chain_indices,
    automatically_manages_rescale / set_automatically_manages_rescale,
    /// Chain indices are visible and settable.
    supports_explicit_chain_indices / set_supports_explicit_chain_indices,
    supports_complex_numbers / set_supports_complex_numbers,
    supports_bitwise_operations / set_supports_bitwise_operations,
    supports_native_functions / set_supports_native_functions,
    /// Slots hold integers modulo [`HeTraits::arithmetic_modulus`].
    is_modular_arithmetic / set_is_modular_arithmetic,
    supports_scaled_encoding / set_supports_scaled_encoding,
    /// Ciphertexts carry no data (timing and bookkeeping simulation only).
    is_debug_empty / set_is_debug_empty,
    supports_decrypt_added_noise / set_supports_decrypt_added_noise,
}

impl HeTraits {
    /// Plaintext modulus for modular-arithmetic schemes, 0 otherwise.
    #[inline]
    pub fn arithmetic_modulus(&self) -> u64 {
        self.arithmetic_modulus
    }

    #[inline]
    pub fn set_arithmetic_modulus(&mut self, value: u64) -> &mut Self {
        self.arithmetic_modulus = value;
        self
    }
}

impl fmt::Display for HeTraits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in self.flag_entries() {
            if value {
                writeln!(f, "{name}")?;
            }
        }
        if self.arithmetic_modulus != 0 {
            writeln!(f, "arithmetic_modulus={}", self.arithmetic_modulus)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_all_off() {
        let traits = HeTraits::default();
        assert!(!traits.supports_bootstrapping());
        assert!(!traits.supports_explicit_chain_indices());
        assert_eq!(traits.arithmetic_modulus(), 0);
        assert_eq!(traits.to_string(), "");
    }

    #[test]
    fn intersect_keeps_common_flags() {
        let mut a = HeTraits::default();
        a.set_supports_complex_numbers(true)
            .set_supports_explicit_rescale(true)
            .set_arithmetic_modulus(257);
        let mut b = HeTraits::default();
        b.set_supports_complex_numbers(true).set_arithmetic_modulus(257);

        let mut both = a;
        both.intersect(&b);
        assert!(both.supports_complex_numbers());
        assert!(!both.supports_explicit_rescale());
        assert_eq!(both.arithmetic_modulus(), 257);

        b.set_arithmetic_modulus(65537);
        a.intersect(&b);
        assert_eq!(a.arithmetic_modulus(), 0);
    }

    #[test]
    fn display_lists_enabled_flags() {
        let mut traits = HeTraits::default();
        traits.set_is_modular_arithmetic(true).set_arithmetic_modulus(17);
        assert_eq!(traits.to_string(), "is_modular_arithmetic\narithmetic_modulus=17\n");
    }
}
