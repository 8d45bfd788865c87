//! Grounded prompt assembly.

use crate::document::SearchResult;
use crate::generation::GenerationRequest;

/// Persona and instructions for the Oracle support consultant.
pub const DEFAULT_PREAMBLE: &str = "\
You are 'Oracle Sage', a world-class Oracle Techno-Functional Consultant.
Your Goal: Solve critical Oracle R12/Cloud issues using the provided context.

Process:
1. ANALYZE the error code or symptom.
2. CHECK the provided context for official fixes.
3. If context is empty, use your general Oracle knowledge to debug directly.";

/// Separator placed between retrieved chunks in the context block.
pub const DEFAULT_CONTEXT_DELIMITER: &str = "\n\n";

/// Builds the system instruction from a fixed preamble and retrieved chunks.
///
/// The output depends only on the preamble, the delimiter and the order of
/// the results passed in, so the same retrieval always yields the same prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptTemplate {
    preamble: String,
    delimiter: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::new(DEFAULT_PREAMBLE)
    }
}

impl PromptTemplate {
    /// Create a template with a custom preamble and the default delimiter.
    pub fn new(preamble: impl Into<String>) -> Self {
        Self { preamble: preamble.into(), delimiter: DEFAULT_CONTEXT_DELIMITER.to_string() }
    }

    /// Set the separator placed between retrieved chunks.
    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    /// The persona/instruction preamble.
    pub fn preamble(&self) -> &str {
        &self.preamble
    }

    /// Join the chunk texts in the order given.
    pub fn context(&self, results: &[SearchResult]) -> String {
        results.iter().map(|r| r.chunk.text.as_str()).collect::<Vec<_>>().join(&self.delimiter)
    }

    /// The full system instruction: preamble followed by the context block.
    pub fn system_instruction(&self, results: &[SearchResult]) -> String {
        format!("{}\n\nContext:\n{}", self.preamble, self.context(results))
    }

    /// Assemble a generation request for `question` grounded on `results`.
    pub fn render(
        &self,
        question: &str,
        results: &[SearchResult],
        temperature: f32,
    ) -> GenerationRequest {
        GenerationRequest {
            system_instruction: self.system_instruction(results),
            user_message: question.to_string(),
            temperature,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::document::Chunk;

    fn result(text: &str, score: f32) -> SearchResult {
        SearchResult {
            chunk: Chunk {
                id: text.to_string(),
                text: text.to_string(),
                embedding: vec![],
                metadata: HashMap::new(),
                document_id: "doc".to_string(),
            },
            score,
        }
    }

    #[test]
    fn context_keeps_result_order() {
        let template = PromptTemplate::new("Be helpful.").with_delimiter("\n---\n");
        let results = vec![result("first", 0.9), result("second", 0.4)];
        assert_eq!(template.context(&results), "first\n---\nsecond");
        assert_eq!(
            template.system_instruction(&results),
            "Be helpful.\n\nContext:\nfirst\n---\nsecond"
        );
    }

    #[test]
    fn empty_retrieval_renders_empty_context() {
        let request = PromptTemplate::default().render("What is FND_GLOBAL?", &[], 0.3);
        assert!(request.system_instruction.starts_with("You are 'Oracle Sage'"));
        assert!(request.system_instruction.ends_with("Context:\n"));
        assert_eq!(request.user_message, "What is FND_GLOBAL?");
        assert!((request.temperature - 0.3).abs() < f32::EPSILON);
    }
}
