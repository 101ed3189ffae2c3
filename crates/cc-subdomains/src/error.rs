use derive_more::From;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, From)]
pub enum Error {
    CliUsage(String),
    InvalidDomain(String),
    InvalidHttpResponse(String),
    InvalidCollection(String),
    Extraction(String),
    Cancelled,

    #[from]
    SystemTime(std::time::SystemTimeError),

    #[from]
    Io(std::io::Error),

    #[from]
    Tracing(tracing::subscriber::SetGlobalDefaultError),

    #[from]
    Network(reqwest::Error),

    #[from]
    Decode(serde_json::Error),
}

// region:    --- Error Boilerplate

impl core::fmt::Display for Error {
    fn fmt(&self, fmt: &mut core::fmt::Formatter) -> core::result::Result<(), core::fmt::Error> {
        match self {
            Self::CliUsage(msg) => write!(fmt, "usage: {msg}"),
            Self::InvalidDomain(domain) => write!(fmt, "invalid domain: {domain:?}"),
            Self::InvalidHttpResponse(msg) => write!(fmt, "invalid http response: {msg}"),
            Self::InvalidCollection(msg) => write!(fmt, "invalid collection: {msg}"),
            Self::Extraction(msg) => write!(fmt, "cannot extract host: {msg}"),
            Self::Cancelled => write!(fmt, "cancelled"),
            Self::Network(err) => write!(fmt, "network error: {err}"),
            Self::Decode(err) => write!(fmt, "decode error: {err}"),
            _ => write!(fmt, "{self:?}"),
        }
    }
}

impl std::error::Error for Error {}

// endregion: --- Error Boilerplate
