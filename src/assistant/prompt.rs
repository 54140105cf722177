// Grounding prompt construction

use crate::retrieval::RetrievedChunk;

pub const CONTEXT_HEADER: &str = "Project task context:\n";

/// Context block listing each retrieved chunk on its own line, nearest first
#[inline]
pub fn build_context(chunks: &[RetrievedChunk]) -> String {
    chunks
        .iter()
        .fold(String::from(CONTEXT_HEADER), |mut context, chunk| {
            context.push_str("- ");
            context.push_str(&chunk.text_chunk);
            context.push('\n');
            context
        })
}

/// Fixed grounding prompt wrapping the context block and the user's question
#[inline]
pub fn build_prompt(context: &str, question: &str) -> String {
    format!(
        "Using the following context, answer the question.\n\
         Answer concisely and in a friendly tone.\n\
         \n\
         {context}\n\
         Question: {question}\n\
         Answer:\n"
    )
}
