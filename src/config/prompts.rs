//! Prompt templates for the agent.
//!
//! Prompts can be customized by placing a `system.toml` file in the custom prompts
//! directory.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Prompts {
    /// Planning instructions and worked examples.
    pub system: String,
    /// Strict final-answer formatting rules appended to the system prompt.
    pub answer_format: String,
}

impl Default for Prompts {
    fn default() -> Self {
        Self {
            system: r#"Key requirements:
- Be precise and concise
- Always finish with the final answer only
- Never include explanations unless asked

Planning:
When planning tasks, follow this structure:
1. Facts Given
   List known information
2. Facts Needed
   List what needs research
3. Plan
   List steps to solve the problem
4. Execute
   Execute the plan and use tools to get the information.
5. Review
   Review the solution
6. Final Answer
   Provide the final answer in the format asked for by the task.

Example task 1: "What is the capital of France?"
Thought: I'll use the web search tool to find this information
Action: google_search(query="capital of France")
Final Answer: Paris

Example task 2: "Which is the first animal that is shown in the video https://www.youtube.com/watch?v=L1vXCYZAYYM ?"
Thought: I'll read the linked content itself. I should not rely on the title or description and must extract the information from the video.
Action: url_context(url="https://www.youtube.com/watch?v=L1vXCYZAYYM")
Final Answer: Otter"#
                .to_string(),

            answer_format: r#"Ensure the FINAL ANSWER is in the right format as asked for by the task.
YOUR FINAL ANSWER should be a number OR as few words as possible OR a comma separated list of numbers and/or strings. Do not include any explanations, steps, labels, or extra text.
If you are asked for a number, don't use commas to write your number. Don't use units such as $ or percent sign unless specified otherwise. Write your number in Arabic numbers (such as 7 or 1 or 1024) unless specified otherwise.
If you are asked for a currency in your answer, use the symbol for that currency. For example, if you are asked for the answers in USD, an example answer would be $40.00
If you are asked for a string, don't use articles, neither abbreviations (e.g. for cities), and write the digits in plain text unless specified otherwise.
If you are asked for a comma separated list, apply the above rules depending on whether the element to be put in the list is a number or a string.
If you are asked for a comma separated list, only return the content of that list, NOT the brackets '[]'.
Your final answer should always be in a natural, human readable format, not programming formats like [] for a list or {} for a set.
Ensure your final answer has no leading or trailing characters that are not part of the answer, like spaces, +, # etc. Do not wrap the answer in quotes.

Remember: answers are scored by exact match. Just provide the factual answer."#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts, overriding defaults from `<custom_dir>/system.toml` if present.
    pub fn load(custom_dir: Option<&str>) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());
            let system_path = custom_path.join("system.toml");
            if system_path.exists() {
                let content = std::fs::read_to_string(&system_path)?;
                prompts = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// The full system instruction sent with every model call.
    pub fn system_instruction(&self) -> String {
        format!("{}\n\n{}", self.system.trim_end(), self.answer_format.trim())
    }
}
