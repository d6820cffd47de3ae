use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("prometheus registry error: {0}")]
    Prometheus(#[from] prometheus::Error),
}
