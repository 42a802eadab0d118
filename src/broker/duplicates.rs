//! Global uniqueness of `(queue-module, queue-name)` pairs.

use std::collections::HashMap;

use super::catalog::ErrorCode;
use super::result::ConfigError;

/// Scan pairs in document order. The first pair equal to an earlier one is
/// reported against the later entry.
pub fn check<'a, I>(pairs: I) -> Result<(), ConfigError>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut seen: HashMap<(&str, &str), usize> = HashMap::new();
    for (index, pair) in pairs.into_iter().enumerate() {
        if let Some(first) = seen.insert(pair, index) {
            let (module, name) = pair;
            return Err(ConfigError::new(
                ErrorCode::QueueDefinedTwice,
                format!(
                    "workers[{index}]: queue '{name}' on module '{module}' already defined by workers[{first}]"
                ),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_pairs_pass() {
        let pairs = [("memory", "a"), ("memory", "b"), ("redis", "a")];
        assert!(check(pairs).is_ok());
    }

    #[test]
    fn repeat_is_reported_against_later_entry() {
        let pairs = [("memory", "a"), ("memory", "b"), ("memory", "a")];
        let err = check(pairs).unwrap_err();
        assert_eq!(err.code, ErrorCode::QueueDefinedTwice);
        assert!(err.detail.starts_with("workers[2]"));
        assert!(err.detail.contains("workers[0]"));
    }

    #[test]
    fn first_repeat_wins() {
        let pairs = [("m", "x"), ("m", "y"), ("m", "y"), ("m", "x")];
        let err = check(pairs).unwrap_err();
        assert!(err.detail.starts_with("workers[2]"));
    }

    #[test]
    fn comparison_is_exact() {
        assert!(check([("memory", "Jobs"), ("memory", "jobs")]).is_ok());
        assert!(check([("Memory", "jobs"), ("memory", "jobs")]).is_ok());
    }
}
