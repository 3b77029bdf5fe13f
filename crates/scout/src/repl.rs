use std::io::{self, Write};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use scout_core::{AgentEvent, Error};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::render::{RenderError, Renderer};
use crate::session::Session;

/// Inputs that end the loop, compared case-insensitively.
pub const EXIT_KEYWORDS: [&str; 3] = ["quit", "exit", "q"];

/// The question asked on the operator's behalf when the loop cannot go on.
pub const FALLBACK_QUESTION: &str = "What do you know about LangGraph?";

const PROMPT: &str = "User: ";

/// How the loop ended.
#[derive(Debug)]
pub enum ReplExit {
    /// The operator typed an exit keyword.
    Quit,
    /// The input ran out and the fallback question was answered.
    InputExhausted,
    /// A turn failed. The fallback question has been tried once.
    Failed(Error),
}

impl ReplExit {
    /// Returns the process exit code for this outcome.
    #[inline]
    pub fn exit_code(&self) -> u8 {
        match self {
            ReplExit::Quit | ReplExit::InputExhausted => 0,
            ReplExit::Failed(_) => 1,
        }
    }
}

/// The read-eval-print loop of a [`Session`].
pub struct Repl<R, W> {
    session: Session,
    input: R,
    output: W,
    renderer: Renderer,
    spinner: bool,
}

impl<R, W> Repl<R, W>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    /// Creates a loop that reads lines from `input` and prints to `output`.
    #[inline]
    pub fn new(
        session: Session,
        input: R,
        output: W,
        renderer: Renderer,
    ) -> Self {
        Self {
            session,
            input,
            output,
            renderer,
            spinner: false,
        }
    }

    /// Shows a spinner on stderr while the model is thinking.
    #[inline]
    pub fn with_spinner(mut self, spinner: bool) -> Self {
        self.spinner = spinner;
        self
    }

    /// Returns the session driven by this loop.
    #[inline]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Runs the loop until the operator quits, the input runs out or a
    /// turn fails.
    ///
    /// Blank lines are skipped and the prompt is shown again. Only failures
    /// to write the output are returned as errors, all the others end up in
    /// [`ReplExit`].
    pub async fn run(&mut self) -> io::Result<ReplExit> {
        loop {
            write!(self.output, "{PROMPT}")?;
            self.output.flush()?;

            let Some(line) = self.read_line().await else {
                // Finish the dangling prompt.
                writeln!(self.output)?;
                return match self.run_fallback().await? {
                    Ok(()) => Ok(ReplExit::InputExhausted),
                    Err(err) => Ok(ReplExit::Failed(err)),
                };
            };

            if line.trim().is_empty() {
                trace!("skipping an empty line");
                continue;
            }
            if is_exit_keyword(&line) {
                writeln!(self.output, "Goodbye!")?;
                return Ok(ReplExit::Quit);
            }

            if let Err(err) = self.run_turn(&line).await {
                self.report(&err)?;
                // The first failure decides the outcome.
                if let Err(fallback_err) = self.run_fallback().await? {
                    debug!("fallback failed as well: {fallback_err}");
                }
                return Ok(ReplExit::Failed(err));
            }
        }
    }

    async fn read_line(&mut self) -> Option<String> {
        let mut line = String::new();
        match self.input.read_line(&mut line).await {
            Ok(0) => None,
            Ok(_) => {
                let len = line.trim_end_matches(['\r', '\n']).len();
                line.truncate(len);
                Some(line)
            }
            Err(err) => {
                error!("error reading input: {}", err);
                None
            }
        }
    }

    async fn run_fallback(&mut self) -> io::Result<Result<(), Error>> {
        writeln!(self.output, "{PROMPT}{FALLBACK_QUESTION}")?;
        let result = self.run_turn(FALLBACK_QUESTION).await;
        if let Err(err) = &result {
            self.report(err)?;
        }
        Ok(result)
    }

    /// Runs one turn, rendering its events as they come. Failing to render
    /// fails the turn.
    async fn run_turn(&mut self, input: &str) -> Result<(), Error> {
        let Self {
            session,
            output,
            renderer,
            spinner: spinner_enabled,
            ..
        } = self;

        let mut spinner: Option<ProgressBar> = None;
        let result = session
            .send_message(input, |event| -> Result<(), RenderError> {
                // Finish the spinner before printing anything else.
                if let Some(spinner) = spinner.take() {
                    spinner.finish_and_clear();
                }
                if matches!(event, AgentEvent::Thinking) {
                    if *spinner_enabled {
                        spinner = Some(thinking_spinner());
                    }
                    return Ok(());
                }

                renderer.render(&mut *output, &event)?;
                output.flush().map_err(RenderError::Io)
            })
            .await;

        if let Some(spinner) = spinner {
            spinner.finish_and_clear();
        }
        result.map(|_| ())
    }

    fn report(&mut self, err: &Error) -> io::Result<()> {
        error!("turn failed: {err}");
        writeln!(self.output, "Error: {err}")
    }
}

/// Returns `true` if the line asks to leave the loop.
pub fn is_exit_keyword(line: &str) -> bool {
    let line = line.trim();
    EXIT_KEYWORDS
        .iter()
        .any(|keyword| line.eq_ignore_ascii_case(keyword))
}

fn thinking_spinner() -> ProgressBar {
    let style = ProgressStyle::with_template("{spinner} {wide_msg}")
        .map(|style| style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"))
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(style);
    spinner.set_message("🤔 Thinking...");
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}
