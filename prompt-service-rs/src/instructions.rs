//! Instructions and input text sent on each escalation step

use crate::trace::AttemptStep;

const BASE_INSTRUCTIONS: &str = "You rewrite vague user requests into specific, well-structured prompts \
for a large language model. Keep the user's intent, add the missing context, constraints and \
expected output format, and reply with the rewritten prompt only.";

// Generate the system instructions for a step
pub fn system_instructions(step: AttemptStep) -> String {
    let mut instructions = format!("{}\n\nRules:", BASE_INSTRUCTIONS);

    instructions.push_str("\n- Write the rewritten prompt in the same language as the user's request.");

    if step.uses_web_search() {
        instructions.push_str("\n- Use web search only when current facts would make the prompt more specific.");
    } else {
        instructions.push_str("\n- Do not call any tool. Work only from the request itself.");
    }

    if step != AttemptStep::InitialWebSearch {
        instructions.push_str(
            "\n- Emit the final prompt directly as plain text. Do not narrate searches or tool calls.",
        );
    }

    if step.is_continuation() {
        instructions.push_str("\n- Use the previous response as context and finish the job it started.");
    }

    instructions
}

/// User input for a step
pub fn step_input(step: AttemptStep, prompt: &str) -> String {
    if step.is_continuation() {
        return "Using what you gathered in the previous response, write only the final \
rewritten prompt now, as plain text."
            .to_string();
    }

    format!("Rewrite this request into a specific prompt:\n\n{}", prompt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_text_rule_only_on_retries() {
        assert!(!system_instructions(AttemptStep::InitialWebSearch).contains("Emit the final prompt directly"));
        assert!(system_instructions(AttemptStep::RetryWebSearchDirectText).contains("Emit the final prompt directly"));
        assert!(system_instructions(AttemptStep::RetryModelOnly).contains("Do not call any tool"));
    }

    #[test]
    fn test_continuation_input_omits_prompt() {
        let input = step_input(AttemptStep::FinalizeFromPreviousModelOnly, "scrivi un post");
        assert!(!input.contains("scrivi un post"));

        let input = step_input(AttemptStep::InitialWebSearch, "scrivi un post");
        assert!(input.ends_with("scrivi un post"));
    }
}
