// Cursor-following listing loop. Fetch a page, print its items, stop on
// the end cursor, otherwise ask the operator before fetching the next.

use tracing::debug;

use crate::api::Page;
use crate::error::{ApiError, ListError};
use crate::ui::Ui;

pub const CONTINUE_PROMPT: &str = "continue: y/n ? : ";

/// How a listing ended. Both endings are normal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListOutcome {
    pub pages: usize,
    pub items: usize,
    /// The operator stopped before the last page.
    pub declined: bool,
}

pub struct PaginatedLister<'u> {
    ui: &'u mut dyn Ui,
    prompt: &'u str,
}

fn is_decline(answer: &str) -> bool {
    answer.eq_ignore_ascii_case("n") || answer.eq_ignore_ascii_case("no")
}

impl<'u> PaginatedLister<'u> {
    pub fn new(ui: &'u mut dyn Ui) -> Self {
        Self {
            ui,
            prompt: CONTINUE_PROMPT,
        }
    }

    pub fn with_prompt(mut self, prompt: &'u str) -> Self {
        self.prompt = prompt;
        self
    }

    /// Drive `fetch` from the first page (no cursor) until the end cursor or
    /// an operator decline. A failed page aborts immediately; its cursor is
    /// never followed.
    pub fn run<T, F, R>(&mut self, mut fetch: F, render: R) -> Result<ListOutcome, ListError>
    where
        F: FnMut(Option<&str>) -> Result<Page<T>, ApiError>,
        R: Fn(&T) -> String,
    {
        let mut cursor: Option<String> = None;
        let mut outcome = ListOutcome {
            pages: 0,
            items: 0,
            declined: false,
        };

        loop {
            self.ui.begin_progress("Fetching...");
            let fetched = fetch(cursor.as_deref());
            self.ui.end_progress();
            let page = fetched?;

            outcome.pages += 1;
            outcome.items += page.items.len();
            debug!(
                page = outcome.pages,
                items = page.items.len(),
                next = %page.next_cursor.raw,
                "fetched page"
            );
            for item in &page.items {
                self.ui.info(&render(item));
            }

            if page.next_cursor.is_end() {
                return Ok(outcome);
            }

            let answer = self.ui.ask(self.prompt)?;
            if is_decline(&answer) {
                outcome.declined = true;
                return Ok(outcome);
            }
            cursor = Some(page.next_cursor.raw);
        }
    }
}
