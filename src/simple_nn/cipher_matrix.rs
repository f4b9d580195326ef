use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use tracing::instrument;

use super::double_matrix_array::DoubleMatrixArray;
use crate::{
    error::{HeError, HeResult},
    hebase::{
        CTile, HeContext, PTile, bin_io,
        he_context::{counted_load, counted_save},
    },
};

const INCOMPATIBLE: &str = "Other has incompatible dimensions";

/// A `rows x cols` grid of ciphertexts. Slot `k` of every tile belongs to
/// matrix `k` of the batch, so one grid holds up to `slot_count` matrices.
#[derive(Debug, Clone)]
pub struct CipherMatrix {
    prototype: CTile,
    rows: usize,
    cols: usize,
    filled_slots: usize,
    tiles: Vec<CTile>,
}

impl CipherMatrix {
    /// An empty matrix. Fill it with a
    /// [`CipherMatrixEncoder`](super::CipherMatrixEncoder) or [`load`](Self::load).
    pub fn new(he: &dyn HeContext) -> HeResult<Self> {
        Ok(Self {
            prototype: CTile::new(he)?,
            rows: 0,
            cols: 0,
            filled_slots: 0,
            tiles: Vec::new(),
        })
    }

    pub(crate) fn reset(&mut self, rows: usize, cols: usize, filled_slots: usize) {
        self.rows = rows;
        self.cols = cols;
        self.filled_slots = filled_slots;
        self.tiles = vec![self.prototype.clone(); rows * cols];
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Number of slots in use per tile, i.e. the batch size.
    pub fn filled_slots(&self) -> usize {
        self.filled_slots
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// # Panics
    ///
    /// Panics if `(i, j)` is out of bounds.
    pub fn tile(&self, i: usize, j: usize) -> &CTile {
        assert!(i < self.rows && j < self.cols, "({i}, {j}) out of bounds");
        &self.tiles[i * self.cols + j]
    }

    /// # Panics
    ///
    /// Panics if `(i, j)` is out of bounds.
    pub fn tile_mut(&mut self, i: usize, j: usize) -> &mut CTile {
        assert!(i < self.rows && j < self.cols, "({i}, {j}) out of bounds");
        &mut self.tiles[i * self.cols + j]
    }

    fn require_same_shape(&self, other_rows: usize, other_cols: usize, other_slots: usize) -> HeResult<()> {
        if self.rows != other_rows || self.cols != other_cols || self.filled_slots != other_slots {
            return Err(HeError::dimensions(INCOMPATIBLE));
        }
        Ok(())
    }

    pub fn add(&mut self, other: &CipherMatrix) -> HeResult<()> {
        self.require_same_shape(other.rows, other.cols, other.filled_slots)?;
        for (tile, other) in self.tiles.iter_mut().zip(&other.tiles) {
            tile.add(other)?;
        }
        Ok(())
    }

    pub fn sub(&mut self, other: &CipherMatrix) -> HeResult<()> {
        self.require_same_shape(other.rows, other.cols, other.filled_slots)?;
        for (tile, other) in self.tiles.iter_mut().zip(&other.tiles) {
            tile.sub(other)?;
        }
        Ok(())
    }

    /// Encodes element `(i, j)` of every matrix in `plain` at tile
    /// `(i, j)`'s chain index and applies `op` to the pair.
    fn with_plain(
        &mut self,
        plain: &DoubleMatrixArray,
        op: impl Fn(&mut CTile, &PTile) -> HeResult<()>,
    ) -> HeResult<()> {
        self.require_same_shape(plain.rows(), plain.cols(), plain.depth())?;
        let encoder = self.prototype.as_abstract().encoder();
        for i in 0..self.rows {
            for j in 0..self.cols {
                let tile = &mut self.tiles[i * self.cols + j];
                let mut encoded = encoder.create_plain();
                encoder.encode_f64(encoded.as_mut(), &plain.get_in_all_depth(i, j), tile.chain_index())?;
                op(tile, &PTile::from_abstract(encoded))?;
            }
        }
        Ok(())
    }

    pub fn add_plain(&mut self, plain: &DoubleMatrixArray) -> HeResult<()> {
        self.with_plain(plain, CTile::add_plain)
    }

    /// Element-wise product with `plain`. Consumes a chain index on schemes
    /// with explicit rescale.
    pub fn multiply_plain(&mut self, plain: &DoubleMatrixArray) -> HeResult<()> {
        self.with_plain(plain, CTile::multiply_plain)
    }

    /// Batched matrix product. Every output tile is a sum of raw products,
    /// relinearized and rescaled once.
    #[instrument(skip_all, fields(rows = self.rows, inner = self.cols, cols = other.cols))]
    pub fn matmul(&self, other: &CipherMatrix) -> HeResult<CipherMatrix> {
        if self.cols != other.rows || self.filled_slots != other.filled_slots || self.is_empty() {
            return Err(HeError::dimensions(INCOMPATIBLE));
        }
        let mut res = self.clone();
        res.reset(self.rows, other.cols, self.filled_slots);
        for i in 0..self.rows {
            for j in 0..other.cols {
                let mut acc = self.tile(i, 0).clone();
                acc.multiply_raw(other.tile(0, j))?;
                for k in 1..self.cols {
                    let mut term = self.tile(i, k).clone();
                    term.multiply_raw(other.tile(k, j))?;
                    acc.add(&term)?;
                }
                *res.tile_mut(i, j) = acc;
            }
        }
        res.relinearize()?;
        res.rescale()?;
        Ok(res)
    }

    pub fn square(&mut self) -> HeResult<()> {
        self.tiles.iter_mut().try_for_each(CTile::square)
    }

    pub fn squared(&self) -> HeResult<CipherMatrix> {
        let mut res = self.clone();
        res.square()?;
        Ok(res)
    }

    pub fn relinearize(&mut self) -> HeResult<()> {
        self.tiles.iter_mut().try_for_each(CTile::relinearize)
    }

    pub fn rescale(&mut self) -> HeResult<()> {
        self.tiles.iter_mut().try_for_each(CTile::rescale)
    }

    /// Chain index of the tiles. Fails before the matrix is encoded.
    pub fn chain_index(&self) -> HeResult<i32> {
        self.tiles
            .first()
            .map(CTile::chain_index)
            .ok_or(HeError::Empty { what: "cipher matrix" })
    }

    pub fn set_chain_index(&mut self, chain_index: i32) -> HeResult<()> {
        self.tiles
            .iter_mut()
            .try_for_each(|tile| tile.set_chain_index(chain_index))
    }

    /// `rows`, `cols` and the filled slot count as `i32`, then the tiles
    /// row by row.
    pub fn save(&self, out: &mut dyn Write) -> HeResult<u64> {
        counted_save(out, |out| {
            bin_io::write_len(out, self.rows)?;
            bin_io::write_len(out, self.cols)?;
            bin_io::write_len(out, self.filled_slots)?;
            for tile in &self.tiles {
                tile.save(out)?;
            }
            Ok(())
        })
    }

    pub fn load(&mut self, input: &mut dyn Read) -> HeResult<u64> {
        let mut loaded = self.clone();
        let read = counted_load(input, |input| {
            let rows = bin_io::read_len(input)?;
            let cols = bin_io::read_len(input)?;
            let filled_slots = bin_io::read_len(input)?;
            if rows.saturating_mul(cols) > bin_io::MAX_LENGTH {
                return Err(HeError::corrupt(format!("cipher matrix of {rows}x{cols}")));
            }
            loaded.reset(rows, cols, filled_slots);
            loaded.tiles.iter_mut().try_for_each(|tile| tile.load(input).map(|_| ()))
        })?;
        *self = loaded;
        Ok(read)
    }

    pub fn save_to_file(&self, path: &Path) -> HeResult<u64> {
        let mut out = BufWriter::new(File::create(path)?);
        let written = self.save(&mut out)?;
        out.flush()?;
        Ok(written)
    }

    pub fn load_from_file(&mut self, path: &Path) -> HeResult<u64> {
        let mut input = BufReader::new(File::open(path)?);
        self.load(&mut input)
    }
}
