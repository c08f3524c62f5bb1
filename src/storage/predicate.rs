use std::fmt;
use std::sync::Arc;

/// Typed filter evaluated by the store.
///
/// Filters compose through `and`/`or`/`negate` instead of being assembled
/// from expression strings.
pub struct Predicate<T> {
    test: Arc<dyn Fn(&T) -> bool + Send + Sync>,
}

impl<T> Clone for Predicate<T> {
    fn clone(&self) -> Self {
        Self {
            test: Arc::clone(&self.test),
        }
    }
}

impl<T> fmt::Debug for Predicate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predicate").finish_non_exhaustive()
    }
}

impl<T: 'static> Predicate<T> {
    pub fn new<F>(test: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Self {
            test: Arc::new(test),
        }
    }

    pub fn always() -> Self {
        Self::new(|_| true)
    }

    pub fn matches(&self, value: &T) -> bool {
        (self.test)(value)
    }

    pub fn and(self, other: Predicate<T>) -> Self {
        Self::new(move |value| self.matches(value) && other.matches(value))
    }

    pub fn or(self, other: Predicate<T>) -> Self {
        Self::new(move |value| self.matches(value) || other.matches(value))
    }

    pub fn negate(self) -> Self {
        Self::new(move |value| !self.matches(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combinators() {
        let even = Predicate::new(|n: &i32| n % 2 == 0);
        let large = Predicate::new(|n: &i32| *n > 10);

        let both = even.clone().and(large.clone());
        assert!(both.matches(&12));
        assert!(!both.matches(&8));
        assert!(!both.matches(&13));

        let either = even.clone().or(large);
        assert!(either.matches(&8));
        assert!(either.matches(&13));
        assert!(!either.matches(&7));

        let odd = even.negate();
        assert!(odd.matches(&7));
        assert!(Predicate::<i32>::always().matches(&0));
    }
}
