//! Assertion macros for triage results.
//!
//! - [`crate::assert_close!`] compares floats with a tolerance; confidence
//!   sums such as `0.5 + 0.2 + 0.2 + 0.1` are not exact.
//! - [`crate::assert_format_error!`] checks a result failed with a
//!   wrong-artifact error naming the expected artifact.

/// Assert two floats are within `1e-9` (or a given tolerance).
#[macro_export]
macro_rules! assert_close {
    ($left:expr, $right:expr) => {
        $crate::assert_close!($left, $right, 1e-9)
    };
    ($left:expr, $right:expr, $tolerance:expr) => {{
        let (left, right): (f64, f64) = ($left, $right);
        assert!(
            (left - right).abs() <= $tolerance,
            "expected {} to be within {} of {}\n  at {}:{}",
            left,
            $tolerance,
            right,
            file!(),
            line!()
        );
    }};
}

/// Assert a `Result` is a format error whose message names `$expected`.
#[macro_export]
macro_rules! assert_format_error {
    ($result:expr, $expected:expr) => {
        match $result {
            Ok(value) => panic!(
                "expected a format error, got Ok({:?})\n  at {}:{}",
                value,
                file!(),
                line!()
            ),
            Err(e) => {
                assert!(e.is_format_error(), "expected a format error, got {}", e);
                assert!(
                    e.to_string().contains($expected),
                    "format error '{}' does not name '{}'",
                    e,
                    $expected
                );
            }
        }
    };
}
