//! Context assembly from retrieved passages

use crate::vector_store::Passage;

/// Passages that make it into a prompt
pub const MAX_CONTEXT_PASSAGES: usize = 3;

const PASSAGE_SEPARATOR: &str = "\n\n";

/// Joins passage texts into the prompt context block
#[derive(Debug, Clone, Copy)]
pub struct ContextAssembler {
    max_passages: usize,
}

impl Default for ContextAssembler {
    fn default() -> Self {
        Self::new(MAX_CONTEXT_PASSAGES)
    }
}

impl ContextAssembler {
    #[must_use]
    pub const fn new(max_passages: usize) -> Self {
        Self { max_passages }
    }

    /// Contents of the leading passages, separated by blank lines
    #[must_use]
    pub fn assemble(&self, passages: &[Passage]) -> String {
        self.join(passages.iter().map(|p| p.content.as_str()))
    }

    /// Same as [`assemble`](Self::assemble) for bare texts, e.g. a re-ranked list
    #[must_use]
    pub fn assemble_texts<S: AsRef<str>>(&self, texts: &[S]) -> String {
        self.join(texts.iter().map(AsRef::as_ref))
    }

    fn join<'a>(&self, texts: impl Iterator<Item = &'a str>) -> String {
        texts
            .take(self.max_passages)
            .collect::<Vec<_>>()
            .join(PASSAGE_SEPARATOR)
    }
}
