use crate::{
    error::HeResult,
    hebase::{
        AbstractCiphertext, AbstractFunctionEvaluator,
        abstract_function_evaluator::{power_by_squaring, product_tree},
    },
};

/// Native functions built from the backend's own multiply: powers by
/// repeated squaring and a balanced product tree, so both use logarithmic
/// depth.
#[derive(Debug, Clone, Copy)]
pub struct SquaringFunctionEvaluator {
    backend_name: &'static str,
}

impl SquaringFunctionEvaluator {
    pub(crate) fn new(backend_name: &'static str) -> Self {
        Self { backend_name }
    }
}

impl AbstractFunctionEvaluator for SquaringFunctionEvaluator {
    fn backend_name(&self) -> &'static str {
        self.backend_name
    }

    fn power_in_place(&self, c: &mut dyn AbstractCiphertext, power: u32) -> HeResult<()> {
        power_by_squaring(c, power)
    }

    fn total_product(&self, cs: &[&dyn AbstractCiphertext]) -> HeResult<Box<dyn AbstractCiphertext>> {
        product_tree(cs)
    }
}
