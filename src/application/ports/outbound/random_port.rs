/// Source of randomness for draws, question building and fortune slips.
///
/// Kept behind a port so tests can script the exact sequence of picks.
pub trait RandomPort: Send + Sync {
    /// Uniform integer in `low..=high`
    fn pick(&self, low: u32, high: u32) -> u32;

    /// Uniform index into a collection of `len` elements (`len > 0`)
    fn index(&self, len: usize) -> usize;
}
