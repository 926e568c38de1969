use crate::turn::{summarize, ReducerEffect};
use crate::util::format_elapsed;
use crossterm::style::Stylize;
use crossterm::terminal::{Clear, ClearType};
use crossterm::{cursor, execute};
use std::io::{self, Write};

/// Renders reducer effects as ANSI-styled terminal output for one turn.
///
/// Text streams inline after an `AI >` header; a tool invocation first shows
/// a pending placeholder line, then overwrites it in place with the finalized
/// summary once its arguments are known.
pub struct TurnRenderer {
    header_shown: bool,
}

impl Default for TurnRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TurnRenderer {
    pub fn new() -> Self {
        Self {
            header_shown: false,
        }
    }

    pub fn handle(&mut self, effect: &ReducerEffect) -> io::Result<()> {
        let mut out = io::stdout();
        match effect {
            ReducerEffect::AppendText { text } => {
                self.ensure_header(&mut out)?;
                write!(out, "{text}")?;
            }
            ReducerEffect::ToolStarted { name } => {
                self.ensure_header(&mut out)?;
                write!(out, "\n{} {} {}", "⏳".dim(), tool_label(name), "...".dim())?;
            }
            ReducerEffect::ToolFinished {
                name,
                arguments,
                duration_seconds,
            } => {
                // Overwrite the pending placeholder in place.
                write!(out, "\r")?;
                execute!(out, Clear(ClearType::UntilNewLine), cursor::Show)?;
                let summary = colorize_summary(name, &summarize(name, arguments));
                let duration = format!("({}s)", duration_seconds.floor() as u64);
                writeln!(out, "{} {summary} {}", "✓".green(), duration.green())?;
            }
            ReducerEffect::TurnComplete { .. } | ReducerEffect::None => {}
        }
        out.flush()
    }

    pub fn finish(&mut self, interrupted: bool, elapsed_seconds: u64) -> io::Result<()> {
        let mut out = io::stdout();
        let clock = format_elapsed(elapsed_seconds);
        if interrupted {
            writeln!(out, "\n{}", format!("⚠ interrupted ({clock})").yellow())?;
        } else {
            writeln!(out, "\n{}", format!("✓ done ({clock})").green())?;
        }
        self.header_shown = false;
        out.flush()
    }

    fn ensure_header(&mut self, out: &mut io::Stdout) -> io::Result<()> {
        if !self.header_shown {
            write!(out, "\n{}", "AI > ".cyan())?;
            self.header_shown = true;
        }
        Ok(())
    }
}

fn tool_label(name: &str) -> String {
    match name {
        "Bash" => "$".cyan().to_string(),
        "Read" => "📖 Read".green().to_string(),
        "Write" => "✍️  Write".yellow().to_string(),
        "Edit" => "✏️  Edit".magenta().to_string(),
        "Grep" => "🔍 Grep".blue().to_string(),
        "Glob" => "📁 Glob".blue().to_string(),
        other => format!("🔧 {other}").cyan().to_string(),
    }
}

fn colorize_summary(name: &str, summary: &str) -> String {
    match name {
        "Bash" => summary.cyan().to_string(),
        "Read" => summary.green().to_string(),
        "Write" => summary.yellow().to_string(),
        "Edit" => summary.magenta().to_string(),
        "Grep" | "Glob" => summary.blue().to_string(),
        _ => summary.cyan().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_label_known_names_have_distinct_markers() {
        assert!(tool_label("Bash").contains('$'));
        assert!(tool_label("Read").contains("Read"));
        assert!(tool_label("SomethingElse").contains("SomethingElse"));
    }

    #[test]
    fn test_colorize_summary_preserves_text() {
        let colored = colorize_summary("Bash", "$ ls -la");
        assert!(colored.contains("$ ls -la"));
    }
}
