//! A context that keeps values in the clear.
//!
//! It enforces the same chain-index discipline as CKKS and carries the
//! bit-width metadata bitwise circuits need, so programs can be debugged
//! quickly before running them under real encryption.

pub mod bitwise_evaluator;
pub mod ciphertext;
pub mod config;
pub mod context;
pub mod encoder;
pub mod plaintext;

pub use bitwise_evaluator::MockupBitwiseEvaluator;
pub use ciphertext::MockupCiphertext;
pub use config::MockupConfig;
pub use context::MockupContext;
pub use encoder::MockupEncoder;
pub use plaintext::MockupPlaintext;

pub(crate) const BACKEND_NAME: &str = "Mockup_MOCKUP";

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::{
        error::HeError,
        hebase::{HeContext, bin_io},
    };

    fn context(slots: usize, top: i32) -> MockupContext {
        let mut he = MockupContext::new();
        he.init_with_config(MockupConfig {
            num_slots: slots,
            top_chain_index: top,
            ..MockupConfig::default()
        })
        .unwrap();
        he
    }

    #[test]
    fn multiplication_consumes_levels() {
        let he = context(8, 2);
        let encoder = he.get_encoder().unwrap();
        let mut c = encoder.create_cipher();
        encoder.encode_encrypt_f64(c.as_mut(), &[1.5, -2.0], -1).unwrap();
        assert_eq!(c.chain_index(), 2);

        let other = c.clone_box();
        c.multiply(other.as_ref()).unwrap();
        c.multiply_scalar(2.0).unwrap();
        assert_eq!(c.chain_index(), 0);
        assert_eq!(&encoder.decrypt_decode_f64(c.as_ref()).unwrap()[..2], &[4.5, 8.0]);

        let err = c.multiply(other.as_ref()).unwrap_err();
        assert!(matches!(err, HeError::ChainIndexOutOfRange { .. }));
    }

    #[test]
    fn raw_operations_need_matching_chain_indices() {
        let he = context(4, 3);
        let encoder = he.get_encoder().unwrap();
        let mut a = encoder.create_cipher();
        let mut b = encoder.create_cipher();
        encoder.encode_encrypt_f64(a.as_mut(), &[1.0], 3).unwrap();
        encoder.encode_encrypt_f64(b.as_mut(), &[2.0], 1).unwrap();

        assert!(matches!(
            a.add_raw(b.as_ref()).unwrap_err(),
            HeError::ChainIndexMismatch { lhs: 3, rhs: 1 }
        ));
        a.add(b.as_ref()).unwrap();
        assert_eq!(a.chain_index(), 1);
    }

    fn stored_values(out: &mut Vec<u8>, values: &[f64]) {
        bin_io::write_bool(out, true).unwrap();
        bin_io::write_len(out, values.len()).unwrap();
        for &v in values {
            bin_io::write_f64(out, v).unwrap();
            bin_io::write_f64(out, 0.0).unwrap();
        }
    }

    fn cipher_stream(chain_index: i32, num_bits: u32, values: &[f64]) -> Vec<u8> {
        let mut out = Vec::new();
        bin_io::write_i32(&mut out, chain_index).unwrap();
        bin_io::write_u32(&mut out, num_bits).unwrap();
        bin_io::write_bool(&mut out, true).unwrap();
        stored_values(&mut out, values);
        out
    }

    #[test]
    fn inconsistent_ciphertext_streams_are_rejected() {
        let he = context(4, 2);
        let encoder = he.get_encoder().unwrap();
        let mut c = encoder.create_cipher();
        encoder.encode_encrypt_f64(c.as_mut(), &[1.0, 2.0], 1).unwrap();

        let four = [5.0; 4];
        let streams = [
            cipher_stream(1, 16, &[]),
            cipher_stream(1, 16, &[5.0; 3]),
            cipher_stream(3, 16, &four),
            cipher_stream(-1, 16, &four),
            cipher_stream(1, 0, &four),
            cipher_stream(1, 54, &four),
        ];
        for stream in &streams {
            let err = c.load(&mut Cursor::new(stream)).unwrap_err();
            assert!(matches!(err, HeError::CorruptStream { .. }), "{err}");
            assert_eq!(c.chain_index(), 1);
            assert_eq!(encoder.decrypt_decode_f64(c.as_ref()).unwrap(), vec![1.0, 2.0, 0.0, 0.0]);
        }

        c.load(&mut Cursor::new(cipher_stream(0, 53, &four))).unwrap();
        assert_eq!(c.chain_index(), 0);
        assert_eq!(encoder.decrypt_decode_f64(c.as_ref()).unwrap(), four.to_vec());

        let mut empty = Vec::new();
        encoder.create_cipher().save(&mut empty).unwrap();
        c.load(&mut Cursor::new(empty)).unwrap();
        assert!(c.is_empty());
    }

    #[test]
    fn inconsistent_plaintext_streams_are_rejected() {
        let he = context(4, 2);
        let encoder = he.get_encoder().unwrap();
        let mut p = encoder.create_plain();
        encoder.encode_f64(p.as_mut(), &[1.0], -1).unwrap();

        for (chain_index, values) in [(2, &[1.0; 5][..]), (3, &[1.0; 4][..]), (-1, &[1.0; 4][..])] {
            let mut stream = Vec::new();
            bin_io::write_i32(&mut stream, chain_index).unwrap();
            stored_values(&mut stream, values);
            let err = p.load(&mut Cursor::new(stream)).unwrap_err();
            assert!(matches!(err, HeError::CorruptStream { .. }), "{err}");
            assert_eq!(p.chain_index(), 2);
        }
    }

    #[test]
    fn rotation_is_cyclic() {
        let he = context(4, 1);
        let encoder = he.get_encoder().unwrap();
        let mut c = encoder.create_cipher();
        encoder
            .encode_encrypt_f64(c.as_mut(), &[1.0, 2.0, 3.0, 4.0], -1)
            .unwrap();
        c.rotate(-1).unwrap();
        assert_eq!(
            encoder.decrypt_decode_f64(c.as_ref()).unwrap(),
            vec![4.0, 1.0, 2.0, 3.0]
        );
    }

    #[test]
    fn secret_key_travels_separately() {
        let he = context(4, 1);
        let mut public = Vec::new();
        he.save(&mut public, false).unwrap();
        let mut key = Vec::new();
        he.save_secret_key(&mut key).unwrap();

        let mut loaded = MockupContext::new();
        loaded.load(&mut Cursor::new(&public)).unwrap();
        assert!(!loaded.has_secret_key());

        let encoder = loaded.get_encoder().unwrap();
        let mut c = encoder.create_cipher();
        encoder.encode_encrypt_f64(c.as_mut(), &[7.0], -1).unwrap();
        assert!(matches!(
            encoder.decrypt_decode_f64(c.as_ref()).unwrap_err(),
            HeError::MissingSecretKey
        ));

        loaded.load_secret_key(&mut Cursor::new(&key)).unwrap();
        assert_eq!(encoder.decrypt_decode_f64(c.as_ref()).unwrap()[0], 7.0);
    }

    #[test]
    fn foreign_secret_key_is_rejected() {
        let he = context(4, 1);
        let other = context(4, 1);
        let mut public = Vec::new();
        he.save(&mut public, false).unwrap();
        let mut key = Vec::new();
        other.save_secret_key(&mut key).unwrap();

        let mut loaded = MockupContext::new();
        loaded.load(&mut Cursor::new(&public)).unwrap();
        assert!(loaded.load_secret_key(&mut Cursor::new(&key)).is_err());
    }
}
