mod common;

use common::{Backend, context_with};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use toy_he_tiles::{
    CipherMatrix, CipherMatrixEncoder, DoubleMatrix, DoubleMatrixArray, HeConfigRequirement,
    HeContext, SimpleNeuralNet, SimpleNeuralNetPlain, simple_nn::NETWORK_DEPTH,
};

const DIMS: [usize; 4] = [4, 3, 3, 2];
const BATCH: usize = 8;

fn ckks() -> Box<dyn HeContext> {
    context_with(
        Backend::Ckks,
        &HeConfigRequirement::insecure(32, NETWORK_DEPTH as usize),
    )
}

fn trained_net(seed: u64) -> SimpleNeuralNetPlain {
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    let mut net = SimpleNeuralNetPlain::new(DIMS, BATCH);
    net.init_random(&mut rng);
    net
}

fn batch(seed: u64) -> DoubleMatrixArray {
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    let mut input = DoubleMatrixArray::random(DIMS[0], 1, BATCH, &mut rng);
    // spread the inputs over [-1, 1)
    input.multiply_by_scalar(DIMS[0] as f64);
    input
}

#[test]
fn encrypted_inference_tracks_the_clear_net() {
    let he = ckks();
    let plain = trained_net(11);
    let mut net = SimpleNeuralNet::new(he.as_ref()).unwrap();
    net.init_from_net(he.as_ref(), &plain, -1).unwrap();

    let input = batch(12);
    let encoder = CipherMatrixEncoder::new(he.as_ref()).unwrap();
    let mut cin = CipherMatrix::new(he.as_ref()).unwrap();
    encoder.encode_encrypt(&mut cin, &input, -1).unwrap();

    let out = net.predict(&cin).unwrap();
    assert_eq!(out.chain_index().unwrap(), 0);
    assert_eq!((out.rows(), out.cols(), out.filled_slots()), (DIMS[3], 1, BATCH));

    let expected = plain.predict(&input).unwrap();
    let actual = encoder.decrypt_decode(&out).unwrap();
    let max_diff = actual.test_equals("prediction", &expected, 1e-3).unwrap();
    assert!(max_diff < 1e-3);
}

#[test]
fn encrypted_net_survives_a_round_trip() {
    let he = ckks();
    let plain = trained_net(21);
    let mut net = SimpleNeuralNet::new(he.as_ref()).unwrap();
    net.init_from_net(he.as_ref(), &plain, -1).unwrap();

    let mut buf = Vec::new();
    let written = net.save(&mut buf).unwrap();
    assert_eq!(written, buf.len() as u64);
    let mut loaded = SimpleNeuralNet::new(he.as_ref()).unwrap();
    assert_eq!(loaded.load(&mut buf.as_slice()).unwrap(), written);

    let names: Vec<&str> = loaded.layers().iter().map(|l| l.name()).collect();
    assert_eq!(names, ["dense_1", "dense_2", "dense_3"]);

    let input = batch(22);
    let encoder = CipherMatrixEncoder::new(he.as_ref()).unwrap();
    let mut cin = CipherMatrix::new(he.as_ref()).unwrap();
    encoder.encode_encrypt(&mut cin, &input, -1).unwrap();
    let original = encoder.decrypt_decode(&net.predict(&cin).unwrap()).unwrap();
    let reloaded = encoder.decrypt_decode(&loaded.predict(&cin).unwrap()).unwrap();
    assert!(original.check_if_equal(&reloaded, 1e-3));
}

#[test]
fn lower_base_chain_index_shifts_every_layer() {
    let he = context_with(
        Backend::Mockup,
        &HeConfigRequirement::insecure(16, NETWORK_DEPTH as usize + 2),
    );
    let mut plain = SimpleNeuralNetPlain::new([2, 2, 2, 1], 2);
    plain.init_const(1.0);
    let mut net = SimpleNeuralNet::new(he.as_ref()).unwrap();
    net.init_from_net(he.as_ref(), &plain, NETWORK_DEPTH + 1).unwrap();

    let chains: Vec<i32> = net
        .layers()
        .iter()
        .map(|l| l.weights().chain_index().unwrap())
        .collect();
    assert_eq!(chains, [7, 5, 3]);

    let input = DoubleMatrixArray::from_matrix(2, &DoubleMatrix::filled(2, 1, 1.0));
    let encoder = CipherMatrixEncoder::new(he.as_ref()).unwrap();
    let mut cin = CipherMatrix::new(he.as_ref()).unwrap();
    encoder.encode_encrypt(&mut cin, &input, NETWORK_DEPTH + 1).unwrap();
    let out = net.predict(&cin).unwrap();
    assert_eq!(out.chain_index().unwrap(), 1);
    // weights of 0.5 and a zero bias keep an all-ones input at one
    let actual = encoder.decrypt_decode(&out).unwrap();
    assert!(actual.check_if_equal(&plain.predict(&input).unwrap(), 1e-9));
}

#[test]
fn clear_tensors_persist() {
    let input = batch(31);
    let mut buf = Vec::new();
    let written = input.save(&mut buf).unwrap();
    let mut loaded = DoubleMatrixArray::default();
    assert_eq!(loaded.load(&mut buf.as_slice()).unwrap(), written);
    assert_eq!(loaded, input);

    let plain = trained_net(32);
    let mut buf = Vec::new();
    plain.save(&mut buf).unwrap();
    let mut loaded = SimpleNeuralNetPlain::new([1, 1, 1, 1], 1);
    loaded.load(&mut buf.as_slice()).unwrap();
    assert_eq!(loaded, plain);
}
