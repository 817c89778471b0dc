//! Result and error types for pagebind.

use thiserror::Error;

/// Result type for pagebind operations
pub type PageResult<T> = Result<T, PageError>;

/// Message used when navigation has neither a url nor a literal mapping
pub const URL_MISSING_MSG: &str = "a path must be mapped or a url supplied";

/// Message used when the only mapping for a page is a pattern
pub const REGEXP_MAPPING_MSG: &str = "mapping must be a string in order to be navigable";

/// Message used when the browser driver cannot execute scripts
pub const UNSUPPORTED_OPERATION_MSG: &str = "execute_script not supported by browser";

/// Suffix used when a node does not expose an interaction verb
pub const EVENT_NOT_SUPPORTED_MSG: &str = "not supported by this element";

/// Message used when a watcher names nothing on its host
pub const ELEMENT_MISSING_MSG: &str = "No element or method with that name defined";

/// Errors that can occur while modelling or driving a page
#[derive(Debug, Error)]
pub enum PageError {
    /// Resolution attempted with an empty selector and no prefetched node
    #[error("Undefined selector for '{name}': pass a locator or define one on the class")]
    UndefinedSelector {
        /// Element name
        name: String,
    },

    /// Locator kind not valid for the element type
    #[error("Unsupported criteria '{criteria}' for element type '{element_type}'")]
    UnsupportedCriteria {
        /// Offending locator kind
        criteria: String,
        /// Element type the selector was declared for
        element_type: String,
    },

    /// Nothing declared or watchable under this name
    #[error("{message}: {name}")]
    ElementMissing {
        /// Name that was looked up
        name: String,
        /// Error message
        message: String,
    },

    /// Member lookup exhausted own members, sub-elements and the bound node
    #[error("undefined member '{name}' for {host}")]
    NoSuchMember {
        /// Member name
        name: String,
        /// Description of the receiver
        host: String,
    },

    /// Helper method name collides with a declared element
    #[error("Invalid method name '{name}': an element with that name is already defined")]
    InvalidMethodName {
        /// Method name
        name: String,
    },

    /// Element name collides with a method or another element
    #[error("Invalid element name '{name}': {message}")]
    InvalidElementName {
        /// Element name
        name: String,
        /// Error message
        message: String,
    },

    /// Navigation has no usable url
    #[error("Invalid URL: {message}")]
    InvalidUrl {
        /// Error message
        message: String,
    },

    /// Operation not supported by the underlying node or driver
    #[error("Not supported: {message}")]
    NotSupported {
        /// Error message
        message: String,
    },

    /// Operation timed out
    #[error("Operation timed out after {ms}ms")]
    Timeout {
        /// Timeout in milliseconds
        ms: u64,
    },

    /// Browser driver found no node for the query
    #[error("Unable to find {query}")]
    ElementNotFound {
        /// Rendered query
        query: String,
    },

    /// Browser driver found more than one node for the query
    #[error("Ambiguous match, found {count} elements matching {query}")]
    AmbiguousMatch {
        /// Rendered query
        query: String,
        /// Number of matching nodes
        count: usize,
    },

    /// Owning page or section was discarded
    #[error("'{name}' is detached: its owning page or section no longer exists")]
    Detached {
        /// Element name
        name: String,
    },

    /// `changed` called for a name that was never watched
    #[error("No watcher registered for '{name}'")]
    UnknownWatcher {
        /// Watcher name
        name: String,
    },

    /// Opaque browser driver failure
    #[error("Browser driver error: {message}")]
    Driver {
        /// Error message
        message: String,
    },

    /// Base url or page url could not be parsed
    #[error("Malformed URL: {0}")]
    MalformedUrl(#[from] url::ParseError),

    /// Page mapping pattern failed to compile
    #[error("Invalid mapping pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// Configuration could not be parsed
    #[error("Configuration error: {0}")]
    Config(#[from] serde_yaml_ng::Error),
}

impl PageError {
    /// Create a not-supported error
    #[must_use]
    pub fn not_supported(message: impl Into<String>) -> Self {
        Self::NotSupported {
            message: message.into(),
        }
    }

    /// Create an invalid url error
    #[must_use]
    pub fn invalid_url(message: impl Into<String>) -> Self {
        Self::InvalidUrl {
            message: message.into(),
        }
    }

    /// Create a driver error
    #[must_use]
    pub fn driver(message: impl Into<String>) -> Self {
        Self::Driver {
            message: message.into(),
        }
    }

    /// Error for an interaction verb the node does not expose
    #[must_use]
    pub fn event_not_supported(verb: &str) -> Self {
        Self::NotSupported {
            message: format!("{verb} {EVENT_NOT_SUPPORTED_MSG}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_display() {
        let err = PageError::Timeout { ms: 5000 };
        assert!(err.to_string().contains("5000"));
    }

    #[test]
    fn test_invalid_url_carries_message() {
        let err = PageError::invalid_url(REGEXP_MAPPING_MSG);
        assert_eq!(err.to_string(), format!("Invalid URL: {REGEXP_MAPPING_MSG}"));
    }

    #[test]
    fn test_event_not_supported_names_verb() {
        let err = PageError::event_not_supported("click");
        assert!(err.to_string().contains("click not supported by this element"));
    }

    #[test]
    fn test_no_such_member_display() {
        let err = PageError::NoSuchMember {
            name: "bobbins".to_string(),
            host: "element 'form'".to_string(),
        };
        assert_eq!(err.to_string(), "undefined member 'bobbins' for element 'form'");
    }
}
