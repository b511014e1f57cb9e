use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouterError {
    #[error("No route matches {0}")]
    NotFound(String),

    #[error("Too many redirects while navigating to {0}")]
    RedirectLoop(String),
}
