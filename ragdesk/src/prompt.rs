//! Prompt composition
//!
//! Retrieved passages are rendered into a single context block and merged with
//! the user's question into a fixed instruction scaffold. The formatting rules
//! in the scaffold are requests to the model, not something checked here.

use crate::search::RetrievedPassage;

/// Context used when retrieval found nothing
pub const NO_CONTEXT_SENTINEL: &str = "No relevant information found.";

/// Reply the model is told to give when the context has nothing relevant
pub const NO_INFORMATION_REPLY: &str = "I don't have information about this topic in my knowledge base. Please ask questions related to DSA or Computer Networks.";

const PASSAGE_SEPARATOR: &str = "\n\n---\n\n";

/// Render passages as one context string, keeping retrieval order
pub fn format_context(passages: &[RetrievedPassage]) -> String {
    if passages.is_empty() {
        return NO_CONTEXT_SENTINEL.to_string();
    }

    passages
        .iter()
        .map(|p| format!("[Source: {}]\n{}", p.partition, p.content))
        .collect::<Vec<_>>()
        .join(PASSAGE_SEPARATOR)
}

/// Merge context and question into the model prompt
pub fn build_prompt(context: &str, question: &str) -> String {
    format!(
        r#"You are an intelligent assistant specialized in Networking and Data Structures & Algorithms (DSA).

Context from knowledge base:
{context}

User Question: {question}

CRITICAL INSTRUCTIONS - YOU MUST FOLLOW THESE STRICTLY:

1. Use ONLY the information provided in the Context above.
2. If the Context is empty or says "{sentinel}", respond with:
   "{no_info}"

3. Never use symbols like hash, dollar, percent, asterisk or star, or any other decorative formatting symbols in your response.

4. Response format:
   - Write in plain natural language with a conversational tone
   - Use clear, flowing paragraphs instead of rigid definitions
   - For enumerations, use simple numbered points like: 1. First point
   2. Second point
   - No markdown formatting and no bold or italics

5. When code is requested:
   - Present it in a clean block with proper indentation and clear variable names
   - Add short comments inside the code
   - Follow it with a step-by-step walkthrough of what each section does and the key logic used

6. STRICT RULE: Only answer if the information is in the Context section above. Do not add anything from your general knowledge.

Provide your answer now:"#,
        context = context,
        question = question,
        sentinel = NO_CONTEXT_SENTINEL,
        no_info = NO_INFORMATION_REPLY,
    )
}
