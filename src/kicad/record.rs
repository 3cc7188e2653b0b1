//! Record extraction from vendor library fragments.
//!
//! A vendor archive ships a symbol library (`.lib`) and usually a description
//! library (`.dcm`), each expected to hold exactly one record for the part:
//!
//! ```text
//! #                               <- header (optional comment block)
//! # LM358                         <-
//! #                               <-
//! $CMP LM358DR                    <- start marker, renamed to the device id
//! D Dual operational amplifier    <- description (editable)
//! F https://example.com/lm358.pdf <- datasheet (editable)
//! $ENDCMP                         <- end marker
//! ```
//!
//! Symbol records have the same shape with `DEF <name> ...` and `ENDDEF`.

use super::{ImpartError, ImpartResult};
use crate::console::Console;

/// The two kinds of legacy library database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// Description database (`.dcm`).
    Description,
    /// Symbol database (`.lib`).
    Symbol,
}

impl RecordKind {
    /// File extension of the database, without the dot.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Description => "dcm",
            Self::Symbol => "lib",
        }
    }

    /// Returns the device name declared by a start marker line, if `line` is
    /// one.
    #[must_use]
    pub fn declared_name(self, line: &str) -> Option<&str> {
        match self {
            Self::Description => line.strip_prefix("$CMP ").map(str::trim),
            Self::Symbol => {
                if line.starts_with("DEF ") {
                    line.split_whitespace().nth(1)
                } else {
                    None
                }
            }
        }
    }

    /// Returns true if `line` closes a record.
    #[must_use]
    pub fn is_end(self, line: &str) -> bool {
        match self {
            Self::Description => line.starts_with("$ENDCMP"),
            Self::Symbol => line.starts_with("ENDDEF"),
        }
    }
}

/// An editable free-text field of a description record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Description,
    Datasheet,
}

impl Field {
    /// Classifies a description record line.
    fn of(line: &str) -> Option<Self> {
        match line.chars().next() {
            Some('D') => Some(Self::Description),
            Some('F') => Some(Self::Datasheet),
            _ => None,
        }
    }

    const fn tag(self) -> char {
        match self {
            Self::Description => 'D',
            Self::Datasheet => 'F',
        }
    }

    const fn label(self) -> &'static str {
        match self {
            Self::Description => "Device description",
            Self::Datasheet => "Datasheet URL",
        }
    }
}

/// What to extract and how to name it.
#[derive(Debug, Clone, Copy)]
pub struct ExtractRequest<'a> {
    /// Canonical device identifier the record is filed under.
    pub device: &'a str,
    /// Base name of the archive, which vendors often use as the part name.
    pub original: &'a str,
    /// Name of the file being scanned, for error messages.
    pub source: &'a str,
}

/// One record, extracted from a library fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRecord {
    lines: Vec<String>,
    header_start: Option<usize>,
    start: usize,
    end: usize,
}

impl TextRecord {
    /// Lines from the start marker through the end marker.
    #[must_use]
    pub fn body(&self) -> &[String] {
        &self.lines[self.start..self.end]
    }

    /// Lines to insert for a new device: the body, preceded by its comment
    /// header when one immediately precedes the start marker.
    #[must_use]
    pub fn with_header(&self) -> &[String] {
        &self.lines[self.header_start.unwrap_or(self.start)..self.end]
    }

    /// Index of the first header line, if the record has a header.
    #[must_use]
    pub const fn header_start(&self) -> Option<usize> {
        self.header_start
    }

    /// Index range `[start, end)` of the record within the scanned lines.
    #[must_use]
    pub const fn range(&self) -> (usize, usize) {
        (self.start, self.end)
    }
}

/// Scanner position while looking for the single record.
#[derive(Debug, Clone, Copy)]
enum Scan {
    /// Before the record. `header` is the start of the comment block that
    /// would precede a record found on the next line.
    Seeking { header: Option<usize> },
    /// Inside the record.
    InRecord {
        header: Option<usize>,
        start: usize,
    },
    /// After the record's end marker.
    Closed {
        header: Option<usize>,
        start: usize,
        end: usize,
    },
}

/// Synthesises a description record for archives that ship none.
#[must_use]
pub fn placeholder_description(request: &ExtractRequest<'_>) -> TextRecord {
    let lines = vec![
        "#".to_string(),
        format!("# {}", request.original),
        "#".to_string(),
        format!("$CMP {}", request.device),
        "D".to_string(),
        "F".to_string(),
        "$ENDCMP".to_string(),
    ];
    TextRecord {
        lines,
        header_start: Some(0),
        start: 3,
        end: 7,
    }
}

/// Extracts the description record of `request.device`.
///
/// With `editor` set, the record's fields are offered for editing (see
/// [`edit_description_fields`]).
///
/// # Errors
///
/// Returns [`ImpartError::DeviceMismatch`], [`ImpartError::MultipleRecords`]
/// or [`ImpartError::UnterminatedRecord`] if the fragment does not hold
/// exactly one matching record, and prompt errors from `editor`.
pub fn extract_description(
    text: &str,
    request: &ExtractRequest<'_>,
    editor: Option<&mut Console<'_>>,
) -> ImpartResult<TextRecord> {
    let mut record = scan(RecordKind::Description, text, request)?;
    if let Some(console) = editor {
        edit_description_fields(&mut record, console)?;
    }
    Ok(record)
}

/// Offers the description and datasheet lines of a description record for
/// editing. An empty reply keeps the original text.
///
/// # Errors
///
/// Returns prompt errors, including [`ImpartError::Cancelled`].
pub fn edit_description_fields(
    record: &mut TextRecord,
    console: &mut Console<'_>,
) -> ImpartResult<()> {
    let (start, end) = record.range();
    for line in &mut record.lines[start + 1..end - 1] {
        let Some(field) = Field::of(line) else {
            continue;
        };
        let current = line.get(2..).unwrap_or("").trim().to_string();
        let reply = console.ask(field.label(), &current)?;
        if !reply.is_empty() {
            *line = format!("{} {reply}", field.tag());
        }
    }
    Ok(())
}

/// Extracts the symbol record of `request.device`.
///
/// The vendor's part name on the value line (`F1`) is replaced with the
/// device identifier.
///
/// # Errors
///
/// Returns [`ImpartError::DeviceMismatch`], [`ImpartError::MultipleRecords`]
/// or [`ImpartError::UnterminatedRecord`] if the fragment does not hold
/// exactly one matching record.
pub fn extract_symbol(text: &str, request: &ExtractRequest<'_>) -> ImpartResult<TextRecord> {
    let mut record = scan(RecordKind::Symbol, text, request)?;

    let (start, end) = record.range();
    if !request.original.is_empty() {
        for line in &mut record.lines[start + 1..end - 1] {
            if line.starts_with("F1 ") {
                *line = line.replace(request.original, request.device);
            }
        }
    }

    Ok(record)
}

/// Locates the single record in `text` and renames it to `request.device`.
fn scan(kind: RecordKind, text: &str, request: &ExtractRequest<'_>) -> ImpartResult<TextRecord> {
    let mut lines: Vec<String> = text.lines().map(str::to_string).collect();
    let mut state = Scan::Seeking { header: None };

    for (index, line) in lines.iter_mut().enumerate() {
        state = match state {
            Scan::Seeking { header } => {
                if let Some(name) = kind.declared_name(line) {
                    if !name.starts_with(request.device) {
                        return Err(ImpartError::device_mismatch(request.source));
                    }
                    *line = line.replacen(name, request.device, 1);
                    Scan::InRecord {
                        header,
                        start: index,
                    }
                } else if line.starts_with('#') {
                    // A bare "#" opens a header block; other comments only extend one
                    let opens = header.is_none() && line.trim() == "#";
                    Scan::Seeking {
                        header: if opens { Some(index) } else { header },
                    }
                } else {
                    Scan::Seeking { header: None }
                }
            }
            Scan::InRecord { header, start } => {
                if kind.declared_name(line).is_some() {
                    return Err(ImpartError::multiple_records(request.source));
                }
                if kind.is_end(line) {
                    Scan::Closed {
                        header,
                        start,
                        end: index + 1,
                    }
                } else {
                    state
                }
            }
            Scan::Closed { .. } => {
                // Applies to description fragments too, not only symbols
                if kind.declared_name(line).is_some() {
                    return Err(ImpartError::multiple_records(request.source));
                }
                state
            }
        };
    }

    match state {
        Scan::Closed { header, start, end } => {
            tracing::debug!(
                kind = ?kind,
                device = request.device,
                lines = end - start,
                "Extracted record"
            );
            Ok(TextRecord {
                lines,
                header_start: header,
                start,
                end,
            })
        }
        Scan::Seeking { .. } | Scan::InRecord { .. } => Err(ImpartError::unterminated_record(
            request.device,
            request.source,
        )),
    }
}
