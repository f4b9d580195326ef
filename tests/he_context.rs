mod common;

use common::{Backend, SLOTS, assert_slots, context, context_with, encrypt};
use paste::paste;
use toy_he_tiles::{
    BgvContext, CTile, CkksContext, Encoder, HeConfigRequirement, HeContext, HeError,
    MockupContext, builtin_registry,
    hebase::{PublicFunctions, RotationKeys},
    load_he_context,
};

const VALS: [f64; 3] = [1.0, -2.0, 3.0];

fn reports_shape(he: &dyn HeContext) {
    assert!(he.is_initialized());
    assert!(he.has_secret_key());
    assert_eq!(he.slot_count().unwrap(), SLOTS);
    assert!(he.signature().ends_with(he.scheme_name()));
    assert!(he.signature().starts_with(he.library_name()));

    let mut out = Vec::new();
    he.debug_print("ctx", &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.starts_with("ctx\n"));
    assert!(text.contains(&format!("slots               : {SLOTS}")));
    assert!(text.contains("has secret key      : true"));
}

fn init_is_one_shot(he: &dyn HeContext) {
    let mut fresh = he.clone_empty();
    assert!(!fresh.is_initialized());
    assert!(matches!(fresh.slot_count().unwrap_err(), HeError::NotInitialized));
    assert!(matches!(Encoder::new(fresh.as_ref()).unwrap_err(), HeError::NotInitialized));

    let requirement = HeConfigRequirement::insecure(SLOTS, 2);
    fresh.init(&requirement).unwrap();
    assert!(matches!(fresh.init(&requirement).unwrap_err(), HeError::AlreadyInitialized));
}

fn bootstrapping_is_infeasible(he: &dyn HeContext) {
    let mut requirement = HeConfigRequirement::insecure(SLOTS, 2);
    assert!(he.is_config_requirement_feasible(&requirement));
    requirement.bootstrappable = true;
    assert!(!he.is_config_requirement_feasible(&requirement));
    assert!(matches!(
        he.check_config_requirement(&requirement).unwrap_err(),
        HeError::InfeasibleConfig { .. }
    ));
}

fn round_trip_with_secret_key(he: &dyn HeContext) {
    let mut buf = Vec::new();
    let written = he.save(&mut buf, true).unwrap();
    assert_eq!(written, buf.len() as u64);

    let loaded = load_he_context(&mut buf.as_slice()).unwrap();
    assert_eq!(loaded.signature(), he.signature());
    assert!(loaded.has_secret_key());
    assert_eq!(loaded.slot_count().unwrap(), he.slot_count().unwrap());
    assert_eq!(loaded.top_chain_index().unwrap(), he.top_chain_index().unwrap());

    // a tile encrypted under the original decrypts under the copy
    let c = encrypt(he, &VALS);
    let mut tile_bytes = Vec::new();
    c.save(&mut tile_bytes).unwrap();
    let mut moved = CTile::new(loaded.as_ref()).unwrap();
    moved.load(&mut tile_bytes.as_slice()).unwrap();
    assert_slots(loaded.as_ref(), &moved, &VALS);
}

fn secret_key_is_shipped_separately(he: &dyn HeContext) {
    let mut public = Vec::new();
    he.save(&mut public, false).unwrap();
    let mut secret = Vec::new();
    he.save_secret_key(&mut secret).unwrap();

    let mut server = load_he_context(&mut public.as_slice()).unwrap();
    assert!(!server.has_secret_key());

    // the public copy can still encrypt and compute
    let mut c = encrypt(server.as_ref(), &VALS);
    c.add(&encrypt(server.as_ref(), &VALS)).unwrap();
    let encoder = Encoder::new(server.as_ref()).unwrap();
    assert!(matches!(encoder.decrypt_decode(&c).unwrap_err(), HeError::MissingSecretKey));

    server.load_secret_key(&mut secret.as_slice()).unwrap();
    assert!(server.has_secret_key());
    assert_slots(server.as_ref(), &c, &[2.0, -4.0, 6.0]);
    assert!(matches!(
        server.load_secret_key(&mut secret.as_slice()).unwrap_err(),
        HeError::SecretKeyExists
    ));
}

fn files_round_trip(he: &dyn HeContext) {
    let dir = std::env::temp_dir();
    let tag = format!("{}-{}", he.scheme_name(), std::process::id());
    let ctx_path = dir.join(format!("ctx-{tag}.bin"));
    let key_path = dir.join(format!("sk-{tag}.bin"));

    he.save_to_file(&ctx_path, false).unwrap();
    he.save_secret_key_to_file(&key_path).unwrap();

    let mut loaded = he.clone_empty();
    loaded.load_from_file(&ctx_path).unwrap();
    loaded.load_secret_key_from_file(&key_path).unwrap();
    let from_registry = builtin_registry().unwrap().load_from_file(&ctx_path).unwrap();
    std::fs::remove_file(&ctx_path).unwrap();
    std::fs::remove_file(&key_path).unwrap();

    assert!(!from_registry.has_secret_key());
    let c = encrypt(he, &VALS);
    let mut bytes = Vec::new();
    c.save(&mut bytes).unwrap();
    let mut moved = CTile::new(loaded.as_ref()).unwrap();
    moved.load(&mut bytes.as_slice()).unwrap();
    assert_slots(loaded.as_ref(), &moved, &VALS);
}

macro_rules! for_each_backend {
    ($($body:ident),* $(,)?) => {
        paste! {
            $(
                #[test]
                fn [<$body _ckks>]() {
                    $body(context(Backend::Ckks).as_ref());
                }

                #[test]
                fn [<$body _bgv>]() {
                    $body(context(Backend::Bgv).as_ref());
                }

                #[test]
                fn [<$body _mockup>]() {
                    $body(context(Backend::Mockup).as_ref());
                }
            )*
        }
    };
}

for_each_backend!(
    reports_shape,
    init_is_one_shot,
    bootstrapping_is_infeasible,
    round_trip_with_secret_key,
    secret_key_is_shipped_separately,
    files_round_trip,
);

#[test]
fn signatures() {
    assert_eq!(CkksContext::new().signature(), "ToyHe_CKKS");
    assert_eq!(BgvContext::new().signature(), "ToyHe_BGV");
    assert_eq!(MockupContext::new().signature(), "Mockup_MOCKUP");

    let mut out = Vec::new();
    CkksContext::new().print_signature(&mut out).unwrap();
    assert_eq!(out, b"ToyHe_CKKS\n");
}

#[test]
fn traits_describe_each_scheme() {
    let ckks = context(Backend::Ckks).traits();
    assert!(ckks.supports_explicit_chain_indices());
    assert!(ckks.supports_scaled_encoding());
    assert!(ckks.supports_complex_numbers());
    assert!(!ckks.supports_native_functions());
    assert!(!ckks.is_modular_arithmetic());

    let bgv = context(Backend::Bgv).traits();
    assert!(bgv.automatically_manages_chain_indices());
    assert!(bgv.is_modular_arithmetic());
    assert!(bgv.supports_native_functions());
    assert!(!bgv.supports_complex_numbers());

    let mockup = context(Backend::Mockup).traits();
    assert!(mockup.supports_bitwise_operations());
    assert!(mockup.supports_explicit_rescale());

    let mut common = ckks;
    common.intersect(&mockup);
    assert!(common.supports_explicit_chain_indices());
    assert!(!common.supports_bitwise_operations());
}

#[test]
fn ckks_chain_follows_the_requirement() {
    let he = context_with(Backend::Ckks, &HeConfigRequirement::insecure(32, 6));
    assert_eq!(he.top_chain_index().unwrap(), 6);
    let chain = he.modulus_chain().unwrap();
    assert_eq!(chain.len(), 7);
    assert!(chain[1..].iter().all(|&q| q < 1 << 30 && q > 1 << 29));
    assert_eq!(he.default_scale().unwrap(), 2f64.powi(30));
    assert_eq!(he.min_chain_index_for_encryption(), 0);
}

#[test]
fn secure_requirement_reaches_its_level() {
    let requirement = HeConfigRequirement::new(128, 10, 30)
        .with_multiplication_depth(2)
        .with_public_functions(PublicFunctions {
            relinearize: true,
            rotate: RotationKeys::None,
            conjugate: false,
        });
    let he = context_with(Backend::Ckks, &requirement);
    assert!(he.security_level().unwrap() >= 128);
}

#[test]
fn loading_into_the_wrong_kind_fails() {
    let ckks = context(Backend::Ckks);
    let mut buf = Vec::new();
    ckks.save(&mut buf, false).unwrap();

    let mut bgv = BgvContext::new();
    assert!(matches!(
        bgv.load(&mut buf.as_slice()).unwrap_err(),
        HeError::HeaderMismatch { .. }
    ));

    let mut already = context(Backend::Ckks);
    assert!(matches!(
        already.load(&mut buf.as_slice()).unwrap_err(),
        HeError::AlreadyInitialized
    ));
}

#[test]
fn unknown_streams_are_rejected() {
    let mut buf = Vec::new();
    buf.extend_from_slice(&5i32.to_le_bytes());
    buf.extend_from_slice(b"Nope!");
    assert!(matches!(
        load_he_context(&mut buf.as_slice()).unwrap_err(),
        HeError::UnrecognizedContext { name } if name == "Nope!"
    ));
}
