use super::{
    abstract_function_evaluator::AbstractFunctionEvaluator, ctile::CTile, he_context::HeContext,
};
use crate::error::{HeError, HeResult};

/// Functions evaluated natively by the backend.
#[derive(Debug)]
pub struct NativeFunctionEvaluator {
    inner: Box<dyn AbstractFunctionEvaluator>,
}

impl NativeFunctionEvaluator {
    /// Fails with [`HeError::Unsupported`] for contexts without native
    /// functions.
    pub fn new(he: &dyn HeContext) -> HeResult<Self> {
        if !he.traits().supports_native_functions() {
            return Err(HeError::unsupported("native functions", he.signature()));
        }
        Ok(Self {
            inner: he.get_function_evaluator()?,
        })
    }

    pub fn power_in_place(&self, c: &mut CTile, power: u32) -> HeResult<()> {
        self.inner.power_in_place(c.as_abstract_mut(), power)
    }

    pub fn power(&self, c: &CTile, power: u32) -> HeResult<CTile> {
        let mut res = c.clone();
        self.power_in_place(&mut res, power)?;
        Ok(res)
    }

    pub fn total_product(&self, cs: &[CTile]) -> HeResult<CTile> {
        let refs: Vec<_> = cs.iter().map(CTile::as_abstract).collect();
        self.inner.total_product(&refs).map(CTile::from_abstract)
    }

    /// `sum_i a[i] * b[i]`, slot-wise.
    pub fn inner_product(&self, a: &[CTile], b: &[CTile]) -> HeResult<CTile> {
        if a.len() != b.len() {
            return Err(HeError::dimensions(format!(
                "inner_product of {} and {} ciphertexts",
                a.len(),
                b.len()
            )));
        }
        let mut terms = a.iter().zip(b);
        let Some((first_a, first_b)) = terms.next() else {
            return Err(HeError::Empty { what: "inner_product input" });
        };
        let mut res = first_a.clone();
        res.multiply(first_b)?;
        for (x, y) in terms {
            let mut term = x.clone();
            term.multiply(y)?;
            res.add(&term)?;
        }
        Ok(res)
    }
}
