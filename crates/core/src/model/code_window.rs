use thorn_insight_protocol::{FileContent, FileId};

use crate::span::{GlobalSpan, LocalSpan, SpanError};

/// The text of one loaded file and the global offset range it occupies.
///
/// This is the coordinate translator: local and global spans can only be
/// converted through a window, so the offset used is always the start of
/// the text actually on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeWindow {
    file_id: FileId,
    text: String,
    range: GlobalSpan,
}

impl CodeWindow {
    pub fn new(file_id: FileId, text: impl Into<String>, range: GlobalSpan) -> Self {
        Self {
            file_id,
            text: text.into(),
            range,
        }
    }

    /// Build a window from a `GET /files/{id}` response.
    pub fn from_content(file_id: FileId, content: FileContent) -> Result<Self, SpanError> {
        let FileContent(text, range) = content;
        Ok(Self::new(file_id, text, GlobalSpan::try_from(range)?))
    }

    pub fn file_id(&self) -> FileId {
        self.file_id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn range(&self) -> GlobalSpan {
        self.range
    }

    /// Global offset of the first byte of `text`.
    pub fn offset(&self) -> u64 {
        self.range.start()
    }

    /// Rebase `global` onto this window's text. The span must lie inside
    /// [`Self::range`] and both ends must fall on character boundaries.
    pub fn to_local(&self, global: GlobalSpan) -> Result<LocalSpan, SpanError> {
        let out_of_window = || SpanError::OutOfWindow {
            start: global.start(),
            end: global.end(),
            low: self.range.start(),
            high: self.range.end(),
        };
        if !self.range.contains(&global) {
            return Err(out_of_window());
        }
        let start = usize::try_from(global.start() - self.offset()).map_err(|_| out_of_window())?;
        let end = usize::try_from(global.end() - self.offset()).map_err(|_| out_of_window())?;
        if end > self.text.len() {
            return Err(out_of_window());
        }
        self.check_boundaries(start, end)?;
        LocalSpan::new(start, end)
    }

    /// Inverse of [`Self::to_local`]: add the window offset back. Fails when
    /// `local` runs past the end of the text or splits a character.
    pub fn to_global(&self, local: LocalSpan) -> Result<GlobalSpan, SpanError> {
        if local.end() > self.text.len() {
            return Err(SpanError::OutOfWindow {
                start: self.offset() + local.start() as u64,
                end: self.offset() + local.end() as u64,
                low: self.range.start(),
                high: self.range.end(),
            });
        }
        self.check_boundaries(local.start(), local.end())?;
        GlobalSpan::new(
            self.offset() + local.start() as u64,
            self.offset() + local.end() as u64,
        )
    }

    /// The text covered by `local`. Spans produced by [`Self::to_local`] are
    /// always valid here.
    pub fn slice(&self, local: LocalSpan) -> Option<&str> {
        self.text.get(local.start()..local.end())
    }

    fn check_boundaries(&self, start: usize, end: usize) -> Result<(), SpanError> {
        for offset in [start, end] {
            if !self.text.is_char_boundary(offset) {
                return Err(SpanError::NotCharBoundary { offset });
            }
        }
        Ok(())
    }
}
