// UI layer: the small set of terminal primitives the commands need (ask a
// question, print a message, show a spinner) behind a trait, so handlers
// can be driven by a scripted UI in tests.

use std::time::Duration;

use crossterm::style::Stylize;
use dialoguer::Input;
use indicatif::{ProgressBar, ProgressStyle};

use crate::error::InputError;

pub trait Ui {
    /// Ask the operator a question and return the trimmed answer.
    fn ask(&mut self, prompt: &str) -> Result<String, InputError>;

    /// Plain output.
    fn output(&mut self, msg: &str);

    fn info(&mut self, msg: &str);

    fn warn(&mut self, msg: &str);

    fn error(&mut self, msg: &str);

    /// Show that a network call is in flight.
    fn begin_progress(&mut self, _msg: &str) {}

    fn end_progress(&mut self) {}
}

/// Ask and reject an empty answer.
pub fn ask_non_empty(ui: &mut dyn Ui, prompt: &str) -> Result<String, InputError> {
    let answer = ui.ask(prompt)?;
    if answer.is_empty() {
        return Err(InputError::Empty);
    }
    Ok(answer)
}

/// Interactive terminal UI: `dialoguer` prompts, colored messages and an
/// `indicatif` spinner while requests run.
pub struct TerminalUi {
    color: bool,
    spinner: Option<ProgressBar>,
}

impl TerminalUi {
    pub fn new() -> Self {
        Self {
            color: std::env::var_os("NO_COLOR").is_none(),
            spinner: None,
        }
    }
}

impl Default for TerminalUi {
    fn default() -> Self {
        Self::new()
    }
}

impl Ui for TerminalUi {
    fn ask(&mut self, prompt: &str) -> Result<String, InputError> {
        self.end_progress();
        let answer: String = Input::new()
            .with_prompt(prompt.trim_end())
            .allow_empty(true)
            .interact_text()?;
        Ok(answer.trim().to_string())
    }

    fn output(&mut self, msg: &str) {
        println!("{}", msg);
    }

    fn info(&mut self, msg: &str) {
        if self.color {
            println!("{}", msg.green());
        } else {
            println!("{}", msg);
        }
    }

    fn warn(&mut self, msg: &str) {
        if self.color {
            eprintln!("{}", msg.yellow());
        } else {
            eprintln!("{}", msg);
        }
    }

    fn error(&mut self, msg: &str) {
        self.end_progress();
        if self.color {
            eprintln!("{}", msg.red());
        } else {
            eprintln!("{}", msg);
        }
    }

    fn begin_progress(&mut self, msg: &str) {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
            spinner.set_style(style);
        }
        spinner.set_message(msg.to_string());
        spinner.enable_steady_tick(Duration::from_millis(100));
        if let Some(old) = self.spinner.replace(spinner) {
            old.finish_and_clear();
        }
    }

    fn end_progress(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }
}
