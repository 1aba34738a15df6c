//! ErrorReporter trait - error-notification side channel

/// Receives internal-consistency anomalies
///
/// Implementations must not panic and should return quickly; they are called
/// from producer threads.
pub trait ErrorReporter: Send + Sync {
    /// Report an anomaly. `fatal` tells the host whether execution can continue.
    fn report(&self, error: &str, fatal: bool);
}
