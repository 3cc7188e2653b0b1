//! Interactive operator input.
//!
//! The import engine never talks to a terminal directly. It asks questions
//! through the [`Prompter`] trait, wrapped in a [`Console`] that checks the
//! cancellation flag around every question.

use std::io::{self, BufRead, Write};

use crate::cancel::CancelToken;
use crate::kicad::{ImpartError, ImpartResult};

/// A source of operator replies.
///
/// Implementations report a closed input channel as
/// [`io::ErrorKind::UnexpectedEof`].
pub trait Prompter {
    /// Asks for a line of text, offering `default` as the initial value.
    ///
    /// # Errors
    ///
    /// Returns an error if the reply cannot be read.
    fn prompt_with_default(&mut self, label: &str, default: &str) -> io::Result<String>;

    /// Asks for one of `candidates`. The reply is returned as entered (after
    /// completion), so callers must validate it.
    ///
    /// # Errors
    ///
    /// Returns an error if the reply cannot be read.
    fn prompt_from_candidates(&mut self, label: &str, candidates: &[String])
        -> io::Result<String>;
}

/// A line-oriented prompter over any reader/writer pair.
///
/// - Default prompts print `label [default]: `; an empty reply yields the
///   default.
/// - Candidate prompts list the candidates, then accept an exact candidate,
///   a 1-based index, or a prefix matching exactly one candidate.
pub struct LinePrompter<R, W> {
    reader: R,
    writer: W,
}

impl LinePrompter<io::StdinLock<'static>, io::Stdout> {
    /// Creates a prompter on the process's stdin and stdout.
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> LinePrompter<R, W> {
    /// Creates a prompter over the given reader and writer.
    pub const fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    /// Consumes the prompter, returning the writer (useful for inspecting
    /// transcripts).
    pub fn into_writer(self) -> W {
        self.writer
    }

    fn read_reply(&mut self) -> io::Result<String> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Err(io::Error::from(io::ErrorKind::UnexpectedEof));
        }
        Ok(line.trim().to_string())
    }
}

impl<R: BufRead, W: Write> Prompter for LinePrompter<R, W> {
    fn prompt_with_default(&mut self, label: &str, default: &str) -> io::Result<String> {
        if default.is_empty() {
            write!(self.writer, "{label}: ")?;
        } else {
            write!(self.writer, "{label} [{default}]: ")?;
        }
        self.writer.flush()?;

        let reply = self.read_reply()?;
        Ok(if reply.is_empty() {
            default.to_string()
        } else {
            reply
        })
    }

    fn prompt_from_candidates(
        &mut self,
        label: &str,
        candidates: &[String],
    ) -> io::Result<String> {
        for (index, candidate) in candidates.iter().enumerate() {
            writeln!(self.writer, "  {:>3}) {candidate}", index + 1)?;
        }
        write!(self.writer, "{label}")?;
        self.writer.flush()?;

        let reply = self.read_reply()?;
        Ok(complete(&reply, candidates).unwrap_or(reply))
    }
}

/// Resolves a reply against a candidate list.
fn complete(reply: &str, candidates: &[String]) -> Option<String> {
    if reply.is_empty() {
        return None;
    }
    if let Some(exact) = candidates.iter().find(|c| *c == reply) {
        return Some(exact.clone());
    }
    if let Ok(index) = reply.parse::<usize>() {
        if let Some(candidate) = index.checked_sub(1).and_then(|i| candidates.get(i)) {
            return Some(candidate.clone());
        }
    }
    let mut matches = candidates.iter().filter(|c| c.starts_with(reply));
    match (matches.next(), matches.next()) {
        (Some(only), None) => Some(only.clone()),
        _ => None,
    }
}

/// A [`Prompter`] bound to a cancellation token.
///
/// Every question is a suspension point: the token is checked before the
/// question is asked and again once the reply arrives, so a Ctrl+C pressed
/// while waiting aborts the import as soon as the operator's line is read.
pub struct Console<'a> {
    prompter: &'a mut dyn Prompter,
    cancel: CancelToken,
}

impl<'a> Console<'a> {
    /// Creates a console over the given prompter.
    pub fn new(prompter: &'a mut dyn Prompter, cancel: CancelToken) -> Self {
        Self { prompter, cancel }
    }

    /// Returns the cancellation token.
    #[must_use]
    pub const fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Asks for a line of text with a default.
    ///
    /// # Errors
    ///
    /// Returns [`ImpartError::Cancelled`] on cancellation,
    /// [`ImpartError::EndOfInput`] when input is closed.
    pub fn ask(&mut self, label: &str, default: &str) -> ImpartResult<String> {
        self.cancel.checkpoint()?;
        let reply = self
            .prompter
            .prompt_with_default(label, default)
            .map_err(ImpartError::prompt)?;
        self.cancel.checkpoint()?;
        Ok(reply.trim().to_string())
    }

    /// Asks for one of `candidates`.
    ///
    /// # Errors
    ///
    /// Returns [`ImpartError::Cancelled`] on cancellation,
    /// [`ImpartError::EndOfInput`] when input is closed.
    pub fn choose(&mut self, label: &str, candidates: &[String]) -> ImpartResult<String> {
        self.cancel.checkpoint()?;
        let reply = self
            .prompter
            .prompt_from_candidates(label, candidates)
            .map_err(ImpartError::prompt)?;
        self.cancel.checkpoint()?;
        Ok(reply.trim().to_string())
    }

    /// Asks a yes/no question whose default answer is `Yes`.
    ///
    /// Only a non-empty, case-insensitive prefix of `yes` counts as
    /// affirmative. An empty reply declines even though empty replies to
    /// other questions accept the default.
    ///
    /// # Errors
    ///
    /// Same as [`Console::ask`].
    pub fn confirm(&mut self, label: &str) -> ImpartResult<bool> {
        let reply = self.ask(label, "Yes")?;
        Ok(is_affirmative(&reply))
    }
}

/// Returns true if `reply` is a non-empty, case-insensitive prefix of `yes`.
#[must_use]
pub fn is_affirmative(reply: &str) -> bool {
    !reply.is_empty() && "yes".starts_with(&reply.to_lowercase())
}
