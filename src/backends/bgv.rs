//! BGV with batching over a prime plaintext modulus.

mod batching;
pub mod ciphertext;
pub mod config;
pub mod context;
pub mod encoder;
pub mod plaintext;

pub use ciphertext::BgvCiphertext;
pub use config::{BgvConfig, BgvConfigBuilder, BgvPreset};
pub use context::BgvContext;
pub use encoder::BgvEncoder;
pub use plaintext::BgvPlaintext;

pub(crate) const BACKEND_NAME: &str = "ToyHe_BGV";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hebase::HeContext;

    fn context() -> BgvContext {
        let config = BgvConfig::builder()
            .ring_degree(64)
            .multiplication_depth(3)
            .security_level(0)
            .seed(11)
            .build()
            .unwrap();
        let mut he = BgvContext::new();
        he.init_with_config(config).unwrap();
        he
    }

    #[test]
    fn products_are_exact_mod_t() {
        let he = context();
        let encoder = he.get_encoder().unwrap();
        let a: Vec<i64> = (0..32).map(|i| i - 16).collect();
        let b: Vec<i64> = (0..32).map(|i| i % 7 + 1).collect();

        let mut ca = encoder.create_cipher();
        let mut cb = encoder.create_cipher();
        encoder.encode_encrypt_i64(ca.as_mut(), &a, -1).unwrap();
        encoder.encode_encrypt_i64(cb.as_mut(), &b, -1).unwrap();

        ca.multiply(cb.as_ref()).unwrap();
        ca.multiply(cb.as_ref()).unwrap();
        ca.add_scalar_int(5).unwrap();

        let expected: Vec<i64> = a.iter().zip(&b).map(|(x, y)| x * y * y + 5).collect();
        assert_eq!(encoder.decrypt_decode_i64(ca.as_ref()).unwrap(), expected);
        assert_eq!(ca.chain_index(), -1);
    }

    #[test]
    fn rotation_and_wraparound() {
        let he = context();
        let t = he.plaintext_modulus().unwrap() as i64;
        let encoder = he.get_encoder().unwrap();
        let vals: Vec<i64> = (0..32).collect();
        let mut c = encoder.create_cipher();
        encoder.encode_encrypt_i64(c.as_mut(), &vals, -1).unwrap();

        c.rotate(3).unwrap();
        let rotated = encoder.decrypt_decode_i64(c.as_ref()).unwrap();
        assert_eq!(rotated[0], 3);
        assert_eq!(rotated[31], 2);

        c.multiply_scalar_int(t / 2 + 1).unwrap();
        let wrapped = encoder.decrypt_decode_i64(c.as_ref()).unwrap();
        let expected = (3 * (t / 2 + 1)).rem_euclid(t);
        let expected = if expected > t / 2 { expected - t } else { expected };
        assert_eq!(wrapped[0], expected);
    }

    #[test]
    fn complex_input_must_be_real() {
        let he = context();
        let encoder = he.get_encoder().unwrap();
        let mut plain = encoder.create_plain();
        let err = encoder
            .encode_complex(plain.as_mut(), &[num_complex::Complex64::new(1.0, 0.5)], -1)
            .unwrap_err();
        assert!(err.to_string().contains("imaginary"));
        encoder.encode_f64(plain.as_mut(), &[2.4, -1.6], -1).unwrap();
        assert_eq!(&encoder.decode_i64(plain.as_ref()).unwrap()[..3], &[2, -2, 0]);
    }
}
