//! Prompt templates for RAG generation

use crate::retrieval::SearchResult;
use crate::types::ChatMessage;

/// Default chat prompt; `{context}`, `{chat_history}` and `{input}` are filled in
pub const DEFAULT_PROMPT_TEMPLATE: &str =
    "Answer based on this context:\n{context}\n\nChat history:\n{chat_history}\n\nQuestion: {input}\nAnswer:";

/// Placeholders understood by [`PromptBuilder::render`]
pub const PLACEHOLDERS: [&str; 3] = ["{context}", "{chat_history}", "{input}"];

/// Prompt builder for RAG queries
pub struct PromptBuilder;

impl PromptBuilder {
    /// Stuff the retrieved chunk texts into one context block
    pub fn build_context(results: &[SearchResult]) -> String {
        results
            .iter()
            .map(|r| r.chunk.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Render the conversation as `Human: ...` / `AI: ...` lines
    pub fn format_history(messages: &[ChatMessage]) -> String {
        messages
            .iter()
            .map(|m| format!("{}: {}", m.role.prompt_prefix(), m.content))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Build the full chat prompt with the default template
    pub fn build_chat_prompt(context: &str, chat_history: &str, question: &str) -> String {
        Self::render(DEFAULT_PROMPT_TEMPLATE, context, chat_history, question)
    }

    /// Fill a template's placeholders in a single pass
    ///
    /// Substituted text is never scanned again, so a document that happens
    /// to contain `{input}` is left as written. Unknown braces are kept.
    pub fn render(template: &str, context: &str, chat_history: &str, question: &str) -> String {
        let values = [context, chat_history, question];
        let mut out = String::with_capacity(
            template.len() + context.len() + chat_history.len() + question.len(),
        );

        let mut rest = template;
        while let Some(pos) = rest.find('{') {
            out.push_str(&rest[..pos]);
            let tail = &rest[pos..];
            match PLACEHOLDERS.iter().position(|p| tail.starts_with(p)) {
                Some(i) => {
                    out.push_str(values[i]);
                    rest = &tail[PLACEHOLDERS[i].len()..];
                }
                None => {
                    out.push('{');
                    rest = &tail[1..];
                }
            }
        }
        out.push_str(rest);
        out
    }
}
