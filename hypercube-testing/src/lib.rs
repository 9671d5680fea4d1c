//! Internal testing utilities for the hypercube crates.

use std::fmt::Debug;
use std::panic::{RefUnwindSafe, UnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Table-driven test runner.
///
/// Each test declares a `Case` struct holding the inputs and expectations for
/// one scenario, builds a collection of them and hands a checking closure to
/// one of the `test_each*` methods. Every case is run even if an earlier one
/// panics. Once all cases have run, the method panics with the number of
/// failures and the debug representation of each failing case.
///
/// ```
/// use hypercube_testing::TestCases;
///
/// #[derive(Debug)]
/// struct Case {
///     shape: Vec<u64>,
///     size: u64,
/// }
///
/// let cases = [
///     Case { shape: vec![2, 3], size: 6 },
///     Case { shape: vec![], size: 1 },
/// ];
///
/// cases.test_each(|case| {
///     assert_eq!(case.shape.iter().product::<u64>(), case.size);
/// });
/// ```
///
/// The test closure and the cases must be unwind safe, since panics are
/// caught per case. Values with interior mutability (such as cubes) should be
/// created inside the closure from a plain description stored in the case.
pub trait TestCases {
    /// The data for a single test case.
    type Case;

    /// Run `test` with a reference to each case.
    fn test_each(self, test: impl Fn(&Self::Case) + RefUnwindSafe)
    where
        Self::Case: Debug + RefUnwindSafe;

    /// Run `test` with a clone of each case.
    fn test_each_clone(self, test: impl Fn(Self::Case) + RefUnwindSafe)
    where
        Self::Case: Debug + Clone + UnwindSafe;

    /// Run `test` with each case by value.
    ///
    /// The case is formatted before the test runs so that it can still be
    /// reported after being moved into the closure.
    fn test_each_value(self, test: impl Fn(Self::Case) + RefUnwindSafe)
    where
        Self::Case: Debug + UnwindSafe;
}

fn report_failures<F: Debug>(failures: &[F]) {
    assert!(
        failures.is_empty(),
        "{} test cases failed: {:?}",
        failures.len(),
        failures
    );
}

impl<I: IntoIterator> TestCases for I {
    type Case = I::Item;

    fn test_each(self, test: impl Fn(&I::Item) + RefUnwindSafe)
    where
        Self::Case: Debug + RefUnwindSafe,
    {
        let failures: Vec<_> = self
            .into_iter()
            .filter(|case| std::panic::catch_unwind(|| test(case)).is_err())
            .collect();
        report_failures(&failures);
    }

    fn test_each_clone(self, test: impl Fn(I::Item) + RefUnwindSafe)
    where
        Self::Case: Debug + Clone + UnwindSafe,
    {
        let test = &test;
        let failures: Vec<_> = self
            .into_iter()
            .filter(|case| {
                let value = case.clone();
                std::panic::catch_unwind(move || test(value)).is_err()
            })
            .collect();
        report_failures(&failures);
    }

    fn test_each_value(self, test: impl Fn(I::Item) + RefUnwindSafe)
    where
        Self::Case: Debug + UnwindSafe,
    {
        let test = &test;
        let failures: Vec<String> = self
            .into_iter()
            .filter_map(|case| {
                let desc = format!("{:?}", case);
                std::panic::catch_unwind(move || test(case))
                    .err()
                    .map(|_| desc)
            })
            .collect();
        report_failures(&failures);
    }
}

/// A file in the system temp directory which is deleted when dropped.
///
/// Names are made unique per process and per instance, so tests running in
/// parallel can use the same `prefix`.
pub struct TempFile {
    path: PathBuf,
}

impl TempFile {
    /// Reserve a path for a new temporary file. The file is not created.
    pub fn new(prefix: &str) -> Self {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        let id = COUNTER.fetch_add(1, Ordering::Relaxed);

        // temp_dir is not available on WASM / WASI.
        let mut path = if cfg!(target_arch = "wasm32") {
            PathBuf::new()
        } else {
            std::env::temp_dir()
        };
        path.push(format!("{}-{}-{}.bin", prefix, std::process::id(), id));
        Self { path }
    }

    /// Create a temporary file with the given contents.
    pub fn with_contents(prefix: &str, content: &[u8]) -> std::io::Result<Self> {
        let file = Self::new(prefix);
        std::fs::write(&file.path, content)?;
        Ok(file)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        // The file may never have been created.
        let _ = std::fs::remove_file(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::{TempFile, TestCases};

    #[derive(Clone, Debug)]
    struct Case {
        x: i32,
    }

    #[test]
    fn test_all_cases_pass() {
        let cases = [Case { x: 1 }, Case { x: 2 }];
        cases.clone().test_each(|case| assert!(case.x > 0));
        cases.clone().test_each_clone(|case| assert!(case.x > 0));
        cases.test_each_value(|case| assert!(case.x > 0));
    }

    #[test]
    #[should_panic(expected = "1 test cases failed")]
    fn test_each_reports_failures() {
        let cases = [Case { x: 1 }, Case { x: -1 }];
        cases.test_each(|case| assert!(case.x > 0));
    }

    #[test]
    #[should_panic(expected = "2 test cases failed")]
    fn test_each_clone_reports_failures() {
        let cases = [Case { x: -2 }, Case { x: -1 }];
        cases.test_each_clone(|case| assert!(case.x > 0));
    }

    #[test]
    #[should_panic(expected = "Case { x: -3 }")]
    fn test_each_value_reports_case() {
        let cases = [Case { x: -3 }];
        cases.test_each_value(|case| assert!(case.x > 0));
    }

    #[test]
    fn test_temp_file_removed_on_drop() {
        let path = {
            let file = TempFile::with_contents("hypercube-testing", b"abc").unwrap();
            assert_eq!(std::fs::read(file.path()).unwrap(), b"abc");
            file.path().to_path_buf()
        };
        assert!(!path.exists());

        let a = TempFile::new("same");
        let b = TempFile::new("same");
        assert_ne!(a.path(), b.path());
    }
}
