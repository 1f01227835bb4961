#![forbid(unsafe_code)]

//! Error taxonomy for the render pipeline.
//!
//! Every failure class maps to a recovery path; none of them may take the
//! host down:
//!
//! | Variant        | Raised by                         | Recovery                                  |
//! |----------------|-----------------------------------|-------------------------------------------|
//! | `Structural`   | direct compile of malformed input | reroute to the chunked path, static tabs   |
//! | `Chunk`        | compile of a single chunk         | raw-text panel for that chunk only         |
//! | `ResourceLoad` | deferred chunk-renderer factory   | preformatted fallback for every chunk      |
//! | `Unrecoverable`| panic caught by the fault boundary| fallback view with retry/reload actions    |

use std::error::Error;
use std::fmt;

/// A failure somewhere in the render pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// The compiler could not build a tree from the input.
    Structural {
        /// What was malformed.
        message: String,
    },
    /// One chunk of a chunked document failed to compile.
    Chunk {
        /// Index of the failing chunk.
        index: usize,
        /// What went wrong.
        message: String,
    },
    /// A lazily constructed pipeline piece could not be built.
    ResourceLoad {
        /// What the factory reported.
        message: String,
    },
    /// A panic escaped the pipeline and was caught by the boundary.
    Unrecoverable {
        /// The captured panic message.
        message: String,
    },
}

impl RenderError {
    /// Construct a structural error.
    pub fn structural(message: impl Into<String>) -> Self {
        Self::Structural {
            message: message.into(),
        }
    }

    /// The human-readable failure message, whatever the variant.
    pub fn message(&self) -> &str {
        match self {
            Self::Structural { message }
            | Self::ResourceLoad { message }
            | Self::Unrecoverable { message }
            | Self::Chunk { message, .. } => message,
        }
    }

    /// Whether this failure stems from tab markup. Such failures are
    /// rerouted to the chunked path with the static tab substitute
    /// instead of surfacing an error panel.
    pub fn mentions_tabs(&self) -> bool {
        self.message().contains("Tabs")
    }
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Structural { message } => write!(f, "markdown structure error: {message}"),
            Self::Chunk { index, message } => {
                write!(f, "chunk {index} failed to compile: {message}")
            }
            Self::ResourceLoad { message } => {
                write!(f, "chunk renderer unavailable: {message}")
            }
            Self::Unrecoverable { message } => write!(f, "render panicked: {message}"),
        }
    }
}

impl Error for RenderError {}
