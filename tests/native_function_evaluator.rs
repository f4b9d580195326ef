mod common;

use common::{Backend, assert_slots, chain_after, context, encrypt};
use paste::paste;
use toy_he_tiles::{CTile, HeContext, HeError, NativeFunctionEvaluator};

const X: [f64; 3] = [2.0, -1.0, 3.0];

fn power(he: &dyn HeContext) {
    let eval = NativeFunctionEvaluator::new(he).unwrap();
    let c = encrypt(he, &X);

    let cubed = eval.power(&c, 3).unwrap();
    assert_slots(he, &cubed, &[8.0, -1.0, 27.0]);
    assert_eq!(cubed.chain_index(), chain_after(he, 2));

    let mut fifth = c.clone();
    eval.power_in_place(&mut fifth, 5).unwrap();
    assert_slots(he, &fifth, &[32.0, -1.0, 243.0]);

    let mut same = c.clone();
    eval.power_in_place(&mut same, 1).unwrap();
    assert_slots(he, &same, &X);

    assert!(matches!(eval.power(&c, 0).unwrap_err(), HeError::InvalidArgument { .. }));
}

fn products(he: &dyn HeContext) {
    let eval = NativeFunctionEvaluator::new(he).unwrap();
    let cs = [
        encrypt(he, &[1.0, 2.0]),
        encrypt(he, &[3.0, -1.0]),
        encrypt(he, &[-2.0, 2.0]),
    ];
    let total = eval.total_product(&cs).unwrap();
    assert_slots(he, &total, &[-6.0, -4.0]);
    assert_eq!(total.chain_index(), chain_after(he, 2));

    let single = eval.total_product(&cs[..1]).unwrap();
    assert_slots(he, &single, &[1.0, 2.0]);
    assert!(matches!(eval.total_product(&[]).unwrap_err(), HeError::Empty { .. }));

    let dot = eval.inner_product(&cs[..2], &cs[1..]).unwrap();
    assert_slots(he, &dot, &[3.0 - 6.0, -2.0 - 2.0]);
    assert!(matches!(
        eval.inner_product(&cs[..2], &cs).unwrap_err(),
        HeError::DimensionMismatch { .. }
    ));
    let none: [CTile; 0] = [];
    assert!(eval.inner_product(&none, &none).is_err());
}

macro_rules! with_native_functions {
    ($($body:ident),* $(,)?) => {
        paste! {
            $(
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

with_native_functions!(power, products);

#[test]
fn ckks_has_no_native_functions() {
    let he = context(Backend::Ckks);
    let err = NativeFunctionEvaluator::new(he.as_ref()).unwrap_err();
    assert!(matches!(err, HeError::Unsupported { .. }), "{err}");
}

#[test]
fn mockup_power_runs_out_of_levels() {
    let he = context(Backend::Mockup);
    let eval = NativeFunctionEvaluator::new(he.as_ref()).unwrap();
    let c = encrypt(he.as_ref(), &X);
    // x^9 needs four multiplications on a chain of three
    assert!(matches!(
        eval.power(&c, 9).unwrap_err(),
        HeError::ChainIndexOutOfRange { .. }
    ));
}
