//! Task-mode heuristics and the system prompts they select.

use sandcode_provider::{Message, Role};
use serde::{Deserialize, Serialize};

/// Prompt prepended in UI mode.
pub const FRONTEND_PROMPT: &str = "You are a frontend code generator.
When the user prompt starts with 'frontend:', interpret the rest as a UI description.
- Generate a Vite + React + TypeScript app structure using batched tool_calls.
- Create or overwrite these files at the project root unless told otherwise:
  index.html (loads /src/main.tsx)
  package.json (react, react-dom; devDependencies: vite, typescript, @types/react, @types/react-dom)
  tsconfig.json
  vite.config.ts
  src/main.tsx
  src/App.tsx
- You MUST use tool_calls to make_dir('src') and then write_file for each file.
- Do not run shell commands; the server starts the dev process itself.
- Do not wrap file content in markdown fences.
- Reply with a short message saying where the app runs.
Return your answer as JSON: {
  \"tool_calls\": [ ... ],
  \"message\": \"...\"
}";

/// Prompt prepended for large tasks.
pub const AUTONOMOUS_PROMPT: &str = "You are an autonomous coding assistant.
- Batch multiple tool calls in a single response using tool_calls to save round trips.
- A typical task goes list_files, read_file as needed, make_dir if needed, write_file or append_file, then update todo.md.
- Keep messages short.
- If a tool call fails, adjust and retry once, then move on.
- Do not include markdown fences in file contents.
Return your answer as JSON with optional tool_calls and a human message: {
  \"tool_calls\": [{ \"name\": \"function\", \"parameters\": { ... } }],
  \"message\": \"...\"
}";

/// Thresholds deciding how a conversation is handled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Case-insensitive prefix of the last user message that enables UI mode
    pub ui_prefix: String,
    /// Joined user text longer than this (in characters) is a large task
    pub large_length_threshold: usize,
    /// Lowercase substrings marking a large task
    pub large_keywords: Vec<String>,
    /// Tool rounds allowed for ordinary tasks
    pub max_iterations: usize,
    /// Tool rounds allowed for large tasks
    pub max_iterations_large: usize,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            ui_prefix: "frontend:".to_string(),
            large_length_threshold: 300,
            large_keywords: [
                "build",
                "implement",
                "refactor",
                "scaffold",
                "migrate",
                "architecture",
                "fix bug",
                "add feature",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            max_iterations: 4,
            max_iterations_large: 8,
        }
    }
}

/// How a conversation is handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskMode {
    /// Generate a frontend app and start its dev server.
    pub ui: bool,
    /// Larger iteration budget and the autonomous prompt.
    pub large: bool,
}

impl PolicyConfig {
    /// Classify a conversation from its user messages.
    pub fn classify(&self, messages: &[Message]) -> TaskMode {
        let user_texts: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == Role::User)
            .map(Message::text)
            .collect();

        let ui = user_texts.last().is_some_and(|last| {
            !self.ui_prefix.is_empty()
                && last
                    .trim()
                    .to_lowercase()
                    .starts_with(&self.ui_prefix.to_lowercase())
        });

        let joined = user_texts.join(" ");
        let lowered = joined.to_lowercase();
        let large = ui
            || joined.chars().count() > self.large_length_threshold
            || self
                .large_keywords
                .iter()
                .any(|keyword| lowered.contains(&keyword.to_lowercase()));

        TaskMode { ui, large }
    }

    /// Iteration cap for a mode.
    pub fn max_iterations(&self, mode: TaskMode) -> usize {
        if mode.large {
            self.max_iterations_large
        } else {
            self.max_iterations
        }
    }
}

/// System prompt to prepend, if any.
pub fn system_prompt(mode: TaskMode) -> Option<&'static str> {
    if mode.ui {
        Some(FRONTEND_PROMPT)
    } else if mode.large {
        Some(AUTONOMOUS_PROMPT)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(texts: &[&str]) -> TaskMode {
        let messages: Vec<Message> = texts.iter().map(|t| Message::user(*t)).collect();
        PolicyConfig::default().classify(&messages)
    }

    #[test]
    fn test_small_task() {
        let mode = classify(&["what does this file do?"]);
        assert_eq!(mode, TaskMode::default());
        assert_eq!(PolicyConfig::default().max_iterations(mode), 4);
        assert!(system_prompt(mode).is_none());
    }

    #[test]
    fn test_keyword_and_length_make_large() {
        assert!(classify(&["Please Refactor the parser"]).large);
        assert!(classify(&["can you fix bug 12"]).large);
        assert!(classify(&[&"a".repeat(301)]).large);
        assert!(!classify(&[&"a".repeat(300)]).large);
        // Earlier user messages count too.
        assert!(classify(&["implement login", "thanks"]).large);
    }

    #[test]
    fn test_ui_mode_uses_last_user_message() {
        let mode = classify(&["  FRONTEND: a todo app"]);
        assert!(mode.ui);
        assert!(mode.large);
        assert_eq!(PolicyConfig::default().max_iterations(mode), 8);
        assert_eq!(system_prompt(mode), Some(FRONTEND_PROMPT));

        assert!(!classify(&["frontend: a todo app", "now explain it"]).ui);

        let assistant_only = PolicyConfig::default().classify(&[Message::assistant("frontend: x")]);
        assert!(!assistant_only.ui);
    }

    #[test]
    fn test_custom_thresholds() {
        let policy: PolicyConfig = serde_json::from_str(
            r#"{"ui_prefix": "ui:", "large_keywords": ["rewrite"], "max_iterations": 2}"#,
        )
        .unwrap();
        assert_eq!(policy.large_length_threshold, 300);

        let mode = policy.classify(&[Message::user("rewrite everything")]);
        assert!(mode.large && !mode.ui);
        assert!(!policy.classify(&[Message::user("build it")]).large);
        assert!(policy.classify(&[Message::user("ui: a form")]).ui);
        assert_eq!(policy.max_iterations(TaskMode::default()), 2);
        assert_eq!(system_prompt(mode), Some(AUTONOMOUS_PROMPT));
    }
}
