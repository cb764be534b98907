//! Message level errors

/// Errors from encoding or decoding a message
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An error from the value codec outside of any particular section
    #[error("Codec {0}")]
    Codec(#[from] amqp_data::Error),

    /// An error tied to one message section
    #[error("{section} section: {source}")]
    Section {
        /// The section that failed
        section: &'static str,
        /// The underlying codec error
        source: amqp_data::Error,
    },

    /// A top-level value of the message was not a described section
    #[error("Expecting a described section value")]
    NotASection,

    /// A described value carried a descriptor that names no known section
    #[error("Unknown section descriptor")]
    UnknownSection,
}

impl Error {
    pub(crate) fn section(section: &'static str, source: amqp_data::Error) -> Self {
        Self::Section { section, source }
    }
}
