/*!

  Utils for dipsim development.

*/

/// Compare multi-line text up to indentation. Blank lines are ignored.
#[macro_export]
macro_rules! assert_lines_eq {
    ($left:expr, $right:expr $(,)?) => {
        match (&$left, &$right) {
            (left_val, right_val) => {
                let left_lines: Vec<&str> = left_val
                    .lines()
                    .map(|l| l.trim())
                    .filter(|l| !l.is_empty())
                    .collect();
                let right_lines: Vec<&str> = right_val
                    .lines()
                    .map(|l| l.trim())
                    .filter(|l| !l.is_empty())
                    .collect();
                assert_eq!(left_lines, right_lines);
            }
        }
    };
    ($left:expr, $right:expr, $($arg:tt)+) => {
        match (&$left, &$right) {
            (left_val, right_val) => {
                let left_lines: Vec<&str> = left_val
                    .lines()
                    .map(|l| l.trim())
                    .filter(|l| !l.is_empty())
                    .collect();
                let right_lines: Vec<&str> = right_val
                    .lines()
                    .map(|l| l.trim())
                    .filter(|l| !l.is_empty())
                    .collect();
                assert_eq!(left_lines, right_lines, std::format_args!($($arg)+));
            }
        }
    };
}
