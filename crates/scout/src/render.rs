//! Turning agent events into terminal output.

use std::io::{self, Write};

use owo_colors::{OwoColorize, Style};
use scout_core::AgentEvent;
use serde_json::Value;

const BANNER_WIDTH: usize = 80;

/// How the conversation is printed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum RenderStyle {
    /// One line per answer and per tool result.
    #[default]
    Plain,
    /// Full-width banners around every message.
    Banner,
}

/// An error while rendering an event.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// A tool result is not the JSON payload it should be.
    #[error("malformed result from tool `{name}`: {source}")]
    MalformedToolResult {
        /// Name of the tool.
        name: String,
        /// The parse error.
        #[source]
        source: serde_json::Error,
    },
    /// A tool result doesn't say what was searched.
    #[error("result from tool `{0}` has no query")]
    MissingQuery(String),
    /// The output could not be written.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Prints agent events in a [`RenderStyle`].
#[derive(Clone, Copy, Debug, Default)]
pub struct Renderer {
    style: RenderStyle,
    color: bool,
}

impl Renderer {
    /// Creates a renderer without colors.
    #[inline]
    pub fn new(style: RenderStyle) -> Self {
        Self {
            style,
            color: false,
        }
    }

    /// Enables or disables colors.
    #[inline]
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    /// Writes `event` to `out`. Events that have no visible form in the
    /// current style are skipped.
    pub fn render<W: Write>(
        &self,
        out: &mut W,
        event: &AgentEvent<'_>,
    ) -> Result<(), RenderError> {
        match self.style {
            RenderStyle::Plain => self.render_plain(out, event),
            RenderStyle::Banner => self.render_banner(out, event),
        }
    }

    fn render_plain<W: Write>(
        &self,
        out: &mut W,
        event: &AgentEvent<'_>,
    ) -> Result<(), RenderError> {
        match event {
            AgentEvent::ToolResult(result) => {
                let query = tool_query(&result.name, &result.content)?;
                let label =
                    self.paint("Tool:", Style::new().bright_yellow().bold());
                writeln!(out, "{label} {} (query: {query})", result.name)?;
            }
            AgentEvent::FinalAnswer(answer) => {
                let label =
                    self.paint("Assistant:", Style::new().bright_cyan().bold());
                writeln!(out, "{label} {answer}")?;
            }
            AgentEvent::UserMessage(_)
            | AgentEvent::Thinking
            | AgentEvent::ToolRequest(_) => {}
        }
        Ok(())
    }

    fn render_banner<W: Write>(
        &self,
        out: &mut W,
        event: &AgentEvent<'_>,
    ) -> Result<(), RenderError> {
        match event {
            AgentEvent::UserMessage(input) => {
                self.write_banner(out, "Human Message", Style::new().green())?;
                writeln!(out, "{input}")?;
            }
            AgentEvent::ToolRequest(request) => {
                self.write_banner(out, "AI Message", Style::new().cyan())?;
                writeln!(out, "{}", request.text)?;
            }
            AgentEvent::ToolResult(result) => {
                let query = tool_query(&result.name, &result.content)?;
                self.write_banner(out, "Tool Message", Style::new().yellow())?;
                writeln!(out, "name: {}", result.name)?;
                writeln!(out, "query: {query}")?;
            }
            AgentEvent::FinalAnswer(answer) => {
                self.write_banner(out, "AI Message", Style::new().cyan())?;
                writeln!(out, "{answer}")?;
            }
            AgentEvent::Thinking => return Ok(()),
        }
        writeln!(out, "\n")?;
        Ok(())
    }

    fn write_banner<W: Write>(
        &self,
        out: &mut W,
        title: &str,
        style: Style,
    ) -> io::Result<()> {
        let banner = banner(title);
        writeln!(out, "{}\n", self.paint(&banner, style))
    }

    fn paint(&self, text: &str, style: Style) -> String {
        if self.color {
            text.style(style).to_string()
        } else {
            text.to_owned()
        }
    }
}

/// Centers ` title ` in a line of `=`.
fn banner(title: &str) -> String {
    let title = format!(" {title} ");
    let fill = BANNER_WIDTH.saturating_sub(title.len());
    let left = fill / 2;
    format!("{}{title}{}", "=".repeat(left), "=".repeat(fill - left))
}

/// Pulls the searched query out of a tool result payload.
fn tool_query(name: &str, content: &str) -> Result<String, RenderError> {
    let payload: Value = serde_json::from_str(content).map_err(|source| {
        RenderError::MalformedToolResult {
            name: name.to_owned(),
            source,
        }
    })?;
    match payload.get("query") {
        Some(Value::String(query)) => Ok(query.clone()),
        Some(Value::Null) | None => {
            Err(RenderError::MissingQuery(name.to_owned()))
        }
        Some(query) => Ok(query.to_string()),
    }
}
