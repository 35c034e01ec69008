use std::collections::HashMap;

use nalgebra::RealField;

/// Binomial coefficients built from Pascal's rule, memoized per `(n, k)`.
#[derive(Debug, Clone)]
pub struct Binomial<T> {
    memo: HashMap<(usize, usize), T>,
}

impl<T: RealField + Copy> Default for Binomial<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: RealField + Copy> Binomial<T> {
    pub fn new() -> Self {
        Self {
            memo: HashMap::new(),
        }
    }

    pub fn get(&mut self, n: usize, k: usize) -> T {
        if k > n {
            return T::zero();
        }
        let k = k.min(n - k);
        if k == 0 {
            return T::one();
        }
        if let Some(v) = self.memo.get(&(n, k)) {
            return *v;
        }
        let r = self.get(n - 1, k) + self.get(n - 1, k - 1);
        self.memo.insert((n, k), r);
        r
    }
}
