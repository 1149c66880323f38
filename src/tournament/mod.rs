/// Match finalisation and participant deltas.
pub mod completion;
/// Round-robin scheduling.
pub mod fixture;
/// Championship statistics.
pub mod metrics;
/// Standings and aggregate recomputation.
pub mod standings;
