//! Observable lifecycle of a request stream.

/// How a request stream ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The handler's stream completed; a COMPLETE frame was sent.
    Completed,
    /// The stream ended with an ERROR frame.
    Errored,
    /// The stream was cancelled; no terminal frame was sent.
    Cancelled,
}

impl Outcome {
    /// Label value used in logs and metrics.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Completed => "completed",
            Outcome::Errored => "errored",
            Outcome::Cancelled => "cancelled",
        }
    }
}

/// Where a stream currently is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamState {
    /// Collecting fragments of the request payload.
    Reassembling,
    /// The request is whole; waiting for the handler's subscription.
    Subscribing,
    /// The handler's payload stream is subscribed.
    Active,
    Completed,
    Errored,
    Cancelled,
}

impl StreamState {
    /// Whether the stream has reached a terminal state.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            StreamState::Completed | StreamState::Errored | StreamState::Cancelled
        )
    }
}

impl From<Outcome> for StreamState {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Completed => StreamState::Completed,
            Outcome::Errored => StreamState::Errored,
            Outcome::Cancelled => StreamState::Cancelled,
        }
    }
}
