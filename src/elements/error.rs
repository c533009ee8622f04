use thiserror::Error;

#[derive(Debug, Error)]
pub enum ElementsError {
    #[error("TLE file read error: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("invalid TLE: {0}")]
    InvalidTle(#[from] sgp4::TleError),
    #[error("orbital model rejected elements: {0}")]
    ModelInit(#[from] sgp4::ElementsError),
}
