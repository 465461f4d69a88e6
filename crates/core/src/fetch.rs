//! Result state of a single data read.

use std::fmt::Display;

/// Outcome of one read: the data, whether it is still loading, and an error
/// message if the read failed.
///
/// A missing document is not an error: it is `data: None` with no error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetch<T> {
    pub data: Option<T>,
    pub loading: bool,
    pub error: Option<String>,
}

impl<T> Fetch<T> {
    /// A read that has been issued but not completed.
    #[must_use]
    pub const fn pending() -> Self {
        Self {
            data: None,
            loading: true,
            error: None,
        }
    }

    /// A completed read with data.
    #[must_use]
    pub const fn ready(data: T) -> Self {
        Self {
            data: Some(data),
            loading: false,
            error: None,
        }
    }

    /// A completed read that found nothing.
    #[must_use]
    pub const fn missing() -> Self {
        Self {
            data: None,
            loading: false,
            error: None,
        }
    }

    /// A failed read.
    #[must_use]
    pub fn failed(error: impl Display) -> Self {
        Self {
            data: None,
            loading: false,
            error: Some(error.to_string()),
        }
    }

    /// Map the data, keeping the state.
    #[must_use]
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Fetch<U> {
        Fetch {
            data: self.data.map(f),
            loading: self.loading,
            error: self.error,
        }
    }

    /// State of a completed list read.
    #[must_use]
    pub fn from_result<E: Display>(result: Result<T, E>) -> Self {
        match result {
            Ok(data) => Self::ready(data),
            Err(e) => Self::failed(e),
        }
    }

    /// State of a completed lookup, where `Ok(None)` means not found.
    #[must_use]
    pub fn from_lookup<E: Display>(result: Result<Option<T>, E>) -> Self {
        match result {
            Ok(Some(data)) => Self::ready(data),
            Ok(None) => Self::missing(),
            Err(e) => Self::failed(e),
        }
    }

    /// Whether the read failed.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_is_not_an_error() {
        let fetch: Fetch<u8> = Fetch::from_lookup(Ok::<_, String>(None));
        assert_eq!(fetch, Fetch::missing());
        assert!(!fetch.loading);
        assert!(!fetch.is_error());
    }

    #[test]
    fn test_failure_keeps_message() {
        let fetch: Fetch<u8> = Fetch::from_result(Err("permission denied"));
        assert_eq!(fetch.error.as_deref(), Some("permission denied"));
        assert!(fetch.data.is_none());
    }

    #[test]
    fn test_map_preserves_state() {
        let fetch = Fetch::ready(2).map(|n| n * 10);
        assert_eq!(fetch.data, Some(20));
        assert!(Fetch::<u8>::pending().map(u16::from).loading);
    }
}
