use std::{
    io::{Read, Write},
    sync::Arc,
};

use super::{basis::RnsBasis, poly::RnsPoly};
use crate::{
    error::{HeError, HeResult},
    hebase::bin_io,
};

impl RnsPoly {
    /// Writes the domain flag, then every channel as a length-prefixed
    /// `u64` run. The basis itself is not written.
    pub fn save(&self, out: &mut dyn Write) -> HeResult<()> {
        bin_io::write_bool(out, self.is_ntt_domain())?;
        bin_io::write_len(out, self.channel_count())?;
        for channel in self.channels() {
            bin_io::write_u64_slice(out, channel)?;
        }
        Ok(())
    }

    /// Reads a polynomial written by [`RnsPoly::save`] over `basis`.
    pub fn load(input: &mut dyn Read, basis: Arc<RnsBasis>) -> HeResult<Self> {
        let in_ntt_domain = bin_io::read_bool(input)?;
        let count = bin_io::read_len(input)?;
        if count != basis.channel_count() {
            return Err(HeError::corrupt(format!(
                "polynomial has {count} channels, basis has {}",
                basis.channel_count()
            )));
        }
        let channels = (0..count)
            .map(|_| bin_io::read_u64_vec(input))
            .collect::<HeResult<Vec<_>>>()?;
        Ok(RnsPoly::from_channels(channels, basis, in_ntt_domain)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn save_load_keeps_domain_and_residues() {
        let basis = Arc::new(RnsBasis::new(8, vec![17, 97]).unwrap());
        let mut poly = RnsPoly::from_coeffs(&[1, -2, 3, 0, 5, -6, 7, 8], Arc::clone(&basis));
        poly.to_ntt_domain();

        let mut buf = Vec::new();
        poly.save(&mut buf).unwrap();
        let loaded = RnsPoly::load(&mut Cursor::new(buf), basis).unwrap();
        assert_eq!(loaded, poly);
    }

    #[test]
    fn load_rejects_wrong_basis() {
        let basis = Arc::new(RnsBasis::new(8, vec![17, 97]).unwrap());
        let poly = RnsPoly::zero(Arc::clone(&basis));
        let mut buf = Vec::new();
        poly.save(&mut buf).unwrap();

        let smaller = Arc::new(basis.drop_last(1).unwrap());
        let err = RnsPoly::load(&mut Cursor::new(buf), smaller).unwrap_err();
        assert!(matches!(err, HeError::CorruptStream { .. }));
    }
}
