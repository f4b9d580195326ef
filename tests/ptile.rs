mod common;

use common::{Backend, assert_slots, chain_after, context, encrypt};
use paste::paste;
use toy_he_tiles::{Encoder, HeContext, HeError, PTile};

fn encoded(he: &dyn HeContext, vals: &[f64], chain_index: i32) -> PTile {
    let mut p = PTile::new(he).unwrap();
    Encoder::new(he).unwrap().encode(&mut p, vals, chain_index).unwrap();
    p
}

fn persists(he: &dyn HeContext) {
    let p = encoded(he, &[4.0, -1.0, 0.0, 9.0], -1);
    let mut buf = Vec::new();
    let written = p.save(&mut buf).unwrap();

    let mut loaded = PTile::new(he).unwrap();
    assert!(loaded.is_empty());
    assert_eq!(loaded.load(&mut buf.as_slice()).unwrap(), written);
    assert_eq!(loaded.chain_index(), p.chain_index());
    let decoded = Encoder::new(he).unwrap().decode_int(&loaded).unwrap();
    assert_eq!(&decoded[..4], &[4, -1, 0, 9]);
}

fn lower_plaintext_pulls_cipher_down(he: &dyn HeContext) {
    let mut p = encoded(he, &[1.0, 1.0], -1);
    p.reduce_chain_index().unwrap();
    assert_eq!(p.chain_index(), chain_after(he, 1));

    let mut c = encrypt(he, &[2.0, 3.0]);
    c.add_plain(&p).unwrap();
    assert_eq!(c.chain_index(), chain_after(he, 1));
    assert_slots(he, &c, &[3.0, 4.0]);
}

fn debug_print_shows_slots(he: &dyn HeContext) {
    let p = encoded(he, &[1.0, 2.0], -1);
    let mut out = Vec::new();
    p.debug_print("plain", 2, &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("plain"));
    assert_eq!(
        lines.next(),
        Some(format!("chain index         : {}", p.chain_index()).as_str())
    );
    assert_eq!(
        lines.next(),
        Some(format!("slots               : {}", p.slot_count()).as_str())
    );
    assert!(lines.next().is_some_and(|l| l.contains(" ... ")));

    let mut out = Vec::new();
    PTile::new(he).unwrap().debug_print("", 2, &mut out).unwrap();
    assert!(String::from_utf8(out).unwrap().ends_with("  <empty>\n"));
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

for_each_backend!(persists, lower_plaintext_pulls_cipher_down, debug_print_shows_slots);

#[test]
fn chain_index_cannot_be_raised() {
    let he = context(Backend::Ckks);
    let mut p = encoded(he.as_ref(), &[1.0], 1);
    assert_eq!(p.chain_index(), 1);
    assert!(matches!(
        p.set_chain_index(2).unwrap_err(),
        HeError::ChainIndexIncrease { current: 1, requested: 2 }
    ));

    let top = encoded(he.as_ref(), &[1.0], -1);
    let mut lowered = top.clone();
    lowered.set_chain_index_like(&p).unwrap();
    assert_eq!(lowered.chain_index(), 1);
    assert_eq!(top.chain_index(), he.top_chain_index().unwrap());
}

#[test]
fn ckks_plaintext_keeps_its_scale() {
    let he = context(Backend::Ckks);
    let p = encoded(he.as_ref(), &[1.0], -1);
    assert_eq!(p.scale().unwrap(), he.default_scale().unwrap());
}
