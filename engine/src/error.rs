use thiserror::Error;

/// Failure reported by the trip-tracking collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("trip service unreachable: {0}")]
    Transport(String),
    #[error("trip service rejected {operation}: {message}")]
    Rejected {
        operation: &'static str,
        message: String,
    },
    #[error("trip service returned an invalid response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Error)]
pub enum TripError {
    #[error("Unable to get origin location")]
    MissingOrigin,
    #[error("Please set a destination first")]
    MissingDestination,
    #[error("a trip is already being tracked")]
    AlreadyTracking,
    #[error("another trip transition is still in progress")]
    TransitionInFlight,
    #[error("no trip is being tracked")]
    NotTracking,
    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl TripError {
    /// Rejected before any I/O was attempted.
    pub fn is_precondition(&self) -> bool {
        !matches!(self, TripError::Service(_))
    }
}
