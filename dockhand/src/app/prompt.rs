//! Operator prompts

use dialoguer::theme::ColorfulTheme;
use dialoguer::{Input, Password, Select};

use crate::errors::DeployError;

/// Source of operator answers
pub trait Prompter: Send + Sync {
    /// Ask for a value. A blank answer yields `default`.
    ///
    /// Sensitive values are read without echo.
    fn input(&self, label: &str, default: &str, sensitive: bool) -> Result<String, DeployError>;

    /// Pick one of `items`, returning its index
    fn select(&self, label: &str, items: &[String], default: usize) -> Result<usize, DeployError>;
}

/// Interactive terminal prompts
#[derive(Default)]
pub struct TerminalPrompter {
    theme: ColorfulTheme,
}

impl TerminalPrompter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Prompter for TerminalPrompter {
    fn input(&self, label: &str, default: &str, sensitive: bool) -> Result<String, DeployError> {
        if sensitive {
            let prompt = if default.is_empty() {
                label.to_string()
            } else {
                format!("{} (leave blank to keep current)", label)
            };
            let answer = Password::with_theme(&self.theme)
                .with_prompt(prompt)
                .allow_empty_password(true)
                .interact()?;
            return Ok(if answer.is_empty() {
                default.to_string()
            } else {
                answer
            });
        }

        let mut input = Input::<String>::with_theme(&self.theme)
            .with_prompt(label)
            .allow_empty(true);
        if !default.is_empty() {
            input = input.default(default.to_string());
        }
        Ok(input.interact_text()?)
    }

    fn select(&self, label: &str, items: &[String], default: usize) -> Result<usize, DeployError> {
        Ok(Select::with_theme(&self.theme)
            .with_prompt(label)
            .items(items)
            .default(default)
            .interact()?)
    }
}
