//! A small fully connected network that runs either on clear matrices or on
//! batches of encrypted ones.
//!
//! Batching runs along the slots: a [`CipherMatrix`] keeps one ciphertext
//! per matrix element, and slot `k` of every ciphertext belongs to sample
//! `k`. Matrix products therefore need no rotations.

pub mod cipher_matrix;
pub mod cipher_matrix_encoder;
pub mod double_matrix;
pub mod double_matrix_array;
pub mod layers;
pub mod neural_net;

pub use cipher_matrix::CipherMatrix;
pub use cipher_matrix_encoder::CipherMatrixEncoder;
pub use double_matrix::DoubleMatrix;
pub use double_matrix_array::DoubleMatrixArray;
pub use layers::{SimpleFcLayer, SimpleFcPlainLayer, SquareActivationLayer, SquareActivationPlainLayer};
pub use neural_net::{NETWORK_DEPTH, SimpleNeuralNet, SimpleNeuralNetPlain};
