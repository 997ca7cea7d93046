use std::fmt;

/// Coarse classification shared by every error enum in the crate.
///
/// Command handlers use it to pick the user-facing presentation without
/// matching on each module's variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed input: reference syntax, key text, wrong algorithm, key mismatch
    Validation,
    /// Alias/type/network combination or ledger entity absent
    NotFound,
    /// Something resolved but its backing entity or key is inconsistent
    State,
    /// The ledger query service rejected the request
    External,
    /// Local persistence failed
    Storage,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not-found",
            ErrorKind::State => "state",
            ErrorKind::External => "external",
            ErrorKind::Storage => "storage",
        };
        f.write_str(name)
    }
}
