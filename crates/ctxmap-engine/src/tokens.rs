/// Counts tokens in rendered text.
///
/// Implemented for any `Fn(&str) -> usize`, so a model-specific tokenizer can
/// be injected as a closure.
///
/// # Examples
///
/// ```
/// use ctxmap_engine::tokens::{CharEstimate, TokenCounter};
///
/// let words = |text: &str| text.split_whitespace().count();
/// assert_eq!(words.count_tokens("fn main() {}"), 3);
/// assert_eq!(CharEstimate.count_tokens("abcdefgh"), 2);
/// ```
pub trait TokenCounter {
    fn count_tokens(&self, text: &str) -> usize;
}

impl<F> TokenCounter for F
where
    F: Fn(&str) -> usize,
{
    fn count_tokens(&self, text: &str) -> usize {
        self(text)
    }
}

/// Roughly four characters per token, rounded up.
#[derive(Debug, Clone, Copy, Default)]
pub struct CharEstimate;

impl TokenCounter for CharEstimate {
    fn count_tokens(&self, text: &str) -> usize {
        text.chars().count().div_ceil(4)
    }
}

/// Texts shorter than this many bytes are always counted in full.
const SAMPLE_THRESHOLD: usize = 200;

/// Approximate number of lines sampled from long texts.
const SAMPLE_LINES: usize = 100;

/// Wraps an expensive counter, estimating long texts from a line sample.
///
/// Every `max(1, lines / 100)`-th line is counted and the result is scaled by
/// the ratio of total length to sample length.
///
/// # Examples
///
/// ```
/// use ctxmap_engine::tokens::{CharEstimate, Sampled, TokenCounter};
///
/// let sampled = Sampled::new(CharEstimate);
/// assert_eq!(sampled.count_tokens("short"), 2);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Sampled<C> {
    inner: C,
}

impl<C: TokenCounter> Sampled<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }
}

impl<C: TokenCounter> TokenCounter for Sampled<C> {
    fn count_tokens(&self, text: &str) -> usize {
        if text.len() < SAMPLE_THRESHOLD {
            return self.inner.count_tokens(text);
        }

        let lines: Vec<&str> = text.split_inclusive('\n').collect();
        let step = (lines.len() / SAMPLE_LINES).max(1);
        let sample: String = lines.iter().step_by(step).copied().collect();
        if sample.is_empty() {
            return self.inner.count_tokens(text);
        }

        let sample_tokens = self.inner.count_tokens(&sample) as f64;
        (sample_tokens / sample.len() as f64 * text.len() as f64) as usize
    }
}
