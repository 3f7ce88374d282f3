#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("operation not supported on this target: {0}")]
    Unsupported(String),

    #[error("literal value {value} does not fit in a {bits}-bit word")]
    LiteralOutOfRange { value: i64, bits: u32 },

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;
