//! Interactive prompts
//!
//! Credential resolution and push recovery ask the operator questions through
//! the [`Prompter`] seam so both can run against scripted answers in tests.

use anyhow::{Context, Result};
use dialoguer::{theme::ColorfulTheme, Confirm, Input, Password};

pub trait Prompter: Send + Sync {
    /// Free-text answer (may be empty)
    fn input(&self, prompt: &str) -> Result<String>;

    /// Hidden answer for secrets
    fn secret(&self, prompt: &str) -> Result<String>;

    /// y/N question
    fn confirm(&self, prompt: &str) -> Result<bool>;
}

/// dialoguer-backed prompter on the controlling terminal
pub struct TerminalPrompter {
    theme: ColorfulTheme,
}

impl TerminalPrompter {
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }
}

impl Default for TerminalPrompter {
    fn default() -> Self {
        Self::new()
    }
}

impl Prompter for TerminalPrompter {
    fn input(&self, prompt: &str) -> Result<String> {
        Input::<String>::with_theme(&self.theme)
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()
            .with_context(|| format!("Failed to read {}", prompt))
    }

    fn secret(&self, prompt: &str) -> Result<String> {
        Password::with_theme(&self.theme)
            .with_prompt(prompt)
            .allow_empty_password(true)
            .interact()
            .with_context(|| format!("Failed to read {}", prompt))
    }

    fn confirm(&self, prompt: &str) -> Result<bool> {
        Confirm::with_theme(&self.theme)
            .with_prompt(prompt)
            .default(false)
            .interact()
            .with_context(|| format!("Failed to read answer to '{}'", prompt))
    }
}
