//! Negotiation at an interactive terminal.

use console::{style, Term};
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, Select};
use serde_yaml::Value;

use super::{OptionState, OutstandingItem, OutstandingSchema, UiChannel, UiEvent};
use crate::engine::PrepareResult;
use crate::providers::value_to_string;
use crate::state::UserConfigOverrides;

/// Dialoguer theme without the default yellow `?` prefix.
fn prompt_theme() -> ColorfulTheme {
    ColorfulTheme {
        prompt_prefix: style("".to_string()),
        ..ColorfulTheme::default()
    }
}

/// Asks for every outstanding option in turn.
///
/// Declining to continue, or interrupting a prompt, stops the loop.
pub struct TerminalUi {
    term: Term,
}

impl TerminalUi {
    pub fn new() -> Self {
        Self {
            term: Term::stderr(),
        }
    }

    pub fn with_term(term: Term) -> Self {
        Self { term }
    }

    fn ask(&self, schema: &OutstandingSchema) -> Result<UiEvent, dialoguer::Error> {
        let _ = self.term.write_line("");
        for item in &schema.items {
            let _ = self.term.write_line(&format!(
                "{} {}",
                style(&item.title).bold(),
                style(format!("({})", item.requirement)).dim()
            ));
            let _ = self
                .term
                .write_line(&format!("  {}", style(&item.status_description).yellow()));
        }

        let prompt = if schema.pass == 1 {
            "Set up these requirements?"
        } else {
            "Change settings and try again?"
        };
        let proceed = Confirm::with_theme(&prompt_theme())
            .with_prompt(prompt)
            .default(true)
            .interact_on(&self.term)?;
        if !proceed {
            return Ok(UiEvent::Stopped);
        }

        let mut overrides = UserConfigOverrides::new();
        for item in &schema.items {
            for option in &item.options {
                if let Some(value) = self.ask_option(item, option)? {
                    overrides.set(&item.requirement, &option.name, value);
                }
            }
        }
        Ok(UiEvent::OverridesSubmitted(overrides))
    }

    fn ask_option(
        &self,
        item: &OutstandingItem,
        option: &OptionState,
    ) -> Result<Option<Value>, dialoguer::Error> {
        let question = format!("{}: {}", item.requirement, option.label);
        let current = option
            .value
            .as_ref()
            .or(option.default.as_ref())
            .and_then(value_to_string);

        if !option.choices.is_empty() {
            let default_idx = current
                .as_ref()
                .and_then(|c| option.choices.iter().position(|choice| choice == c))
                .unwrap_or(0);
            let selection = Select::with_theme(&prompt_theme())
                .with_prompt(&question)
                .items(&option.choices)
                .default(default_idx)
                .interact_on(&self.term)?;
            return Ok(Some(Value::from(option.choices[selection].clone())));
        }

        let theme = prompt_theme();
        let input = Input::<String>::with_theme(&theme)
            .with_prompt(&question)
            .allow_empty(true);
        let answer = match current {
            Some(current) => input.default(current).interact_on(&self.term)?,
            None => input.interact_on(&self.term)?,
        };
        Ok((!answer.is_empty()).then(|| Value::from(answer)))
    }
}

impl Default for TerminalUi {
    fn default() -> Self {
        Self::new()
    }
}

impl UiChannel for TerminalUi {
    fn is_interactive(&self) -> bool {
        self.term.is_term()
    }

    fn present(&mut self, schema: &OutstandingSchema) -> UiEvent {
        match self.ask(schema) {
            Ok(event) => event,
            Err(e) => {
                tracing::debug!("Prompt failed: {}", e);
                UiEvent::Stopped
            }
        }
    }

    fn finished(&mut self, result: &PrepareResult) {
        if let PrepareResult::Failure { stopped: false, .. } = result {
            let _ = self
                .term
                .write_line(&style("Some requirements could not be set up.").red().to_string());
        }
    }
}
