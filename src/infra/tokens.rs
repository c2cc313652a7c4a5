use crate::services::TokenCounter;

const BYTES_PER_TOKEN: usize = 4;

/// Approximates tokens as one per four bytes, rounded up.
#[derive(Debug, Default, Clone, Copy)]
pub struct EstimatingTokenCounter;

impl TokenCounter for EstimatingTokenCounter {
    fn count(&self, text: &str) -> usize {
        text.len().div_ceil(BYTES_PER_TOKEN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_up_partial_tokens() {
        let counter = EstimatingTokenCounter;
        assert_eq!(counter.count(""), 0);
        assert_eq!(counter.count("a"), 1);
        assert_eq!(counter.count("abcd"), 1);
        assert_eq!(counter.count("abcde"), 2);
    }
}
