// Shared prompt fragments.
// Field-specific prompts live in generation/prompts.rs; this file holds what every call sends.

/// System instruction sent with every completion: plain store copy, nothing else.
pub const PLAIN_TEXT_SYSTEM: &str = "You are an App Store Optimization copywriter. \
    Respond with the requested text only. \
    Do NOT use markdown, code fences, headings or surrounding quotes. \
    Do NOT include explanations, labels or alternatives.";

/// Appended to prompts whose output has a hard character budget.
pub fn length_instruction(max_chars: usize) -> String {
    format!(
        "HARD LIMIT: the output must be at most {max_chars} characters including spaces and punctuation. \
        Anything longer is rejected."
    )
}
