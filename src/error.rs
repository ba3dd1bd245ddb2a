use serde::{Deserialize, Serialize};

/// An error made of a human readable context and, when the failure originated somewhere
/// else, the rendered message of that source error.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ContextError {
    pub context: String,
    pub source_error: Option<String>,
}

impl std::fmt::Display for ContextError {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.source_error {
            Some(source_error) => write!(
                formatter,
                "{}: {}",
                self.context,
                minimize_first_letter(source_error),
            ),
            None => write!(formatter, "{}", self.context),
        }
    }
}

impl std::error::Error for ContextError {}

impl ContextError {
    /// Create a new `ContextError` with the given context.
    pub fn with_context<S: Into<String>>(context: S) -> ContextError {
        ContextError {
            context: context.into(),
            source_error: None,
        }
    }

    /// Create a new `ContextError` with the given context and source error.
    pub fn with_error<S: Into<String>>(context: S, error: &dyn std::error::Error) -> ContextError {
        ContextError {
            context: context.into(),
            source_error: Some(error.to_string()),
        }
    }
}

/// Attaches a context to the error of a foreign `Result`, turning it into a `ContextError`.
///
/// ```
/// use ticketr::error::ResultExt as _;
///
/// let error = "x".parse::<u32>().context("Unable to parse the roll count").unwrap_err();
/// assert_eq!(error.context, "Unable to parse the roll count");
/// ```
pub trait ResultExt<T> {
    fn context<S: Into<String>>(self, context: S) -> Result<T, ContextError>;

    /// Like `context`, but the message is only built when an error actually occurred.
    fn with_context<S: Into<String>, F: FnOnce() -> S>(self, context: F)
        -> Result<T, ContextError>;
}

impl<T, E: std::error::Error> ResultExt<T> for Result<T, E> {
    fn context<S: Into<String>>(self, context: S) -> Result<T, ContextError> {
        self.map_err(|error| ContextError::with_error(context, &error))
    }

    fn with_context<S: Into<String>, F: FnOnce() -> S>(
        self,
        context: F,
    ) -> Result<T, ContextError> {
        self.map_err(|error| ContextError::with_error(context(), &error))
    }
}

/// Minimizes the first letter of a string, so that a chained message reads as one sentence.
fn minimize_first_letter(string: &str) -> String {
    let mut characters = string.chars();
    match characters.next() {
        None => String::new(),
        Some(character) => character.to_lowercase().chain(characters).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_error_is_chained_after_the_context() {
        let source = std::io::Error::new(std::io::ErrorKind::NotFound, "No such file");
        let error = ContextError::with_error("Unable to read the configuration", &source);

        assert_eq!(
            error.to_string(),
            "Unable to read the configuration: no such file"
        );
    }

    #[test]
    fn context_only_error_prints_the_context() {
        let error = ContextError::with_context("Unable to find the bold font");

        assert_eq!(error.to_string(), "Unable to find the bold font");
        assert!(error.source_error.is_none());
    }
}
