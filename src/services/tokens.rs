/// Measures text in the unit the token budget is expressed in.
pub trait TokenCounter: Send + Sync {
    fn count(&self, text: &str) -> usize;
}
