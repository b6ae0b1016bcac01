//! Fixed prompt templates.
//!
//! The QnA template is a strict grounding instruction: the model answers
//! from the supplied context alone and replies with the sentinel phrase when
//! the context does not contain the answer. Callers treat a sentinel reply
//! as a successful "no answer" result, not a failure.

/// Reply the model is instructed to give when the context has no answer.
pub const NOT_FOUND_REPLY: &str = "Not found in document.";

pub fn qna_prompt(question: &str, context: &str) -> String {
    format!(
        "Answer the following question using only the provided context. \
         If the answer is not present in the context, reply with exactly \
         \"{NOT_FOUND_REPLY}\".\n\nContext:\n{context}\n\nQuestion: {question}\n\nAnswer:"
    )
}

pub fn summary_prompt(text: &str) -> String {
    format!("Summarize the following document or text chunks as concisely as possible:\n\n{text}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qna_prompt_carries_context_verbatim() {
        let prompt = qna_prompt("What color is the sky?", "The sky is blue.");
        assert!(prompt.contains("Context:\nThe sky is blue.\n"));
        assert!(prompt.contains("Question: What color is the sky?"));
        assert!(prompt.contains(NOT_FOUND_REPLY));
    }

    #[test]
    fn empty_context_section_stays_empty() {
        let prompt = qna_prompt("Anything?", "");
        assert!(prompt.contains("Context:\n\nQuestion:"));
    }
}
