//! Block-level editing of a draft body with undo/redo.

use db::models::document::{BlockKind, ContentBlock, RichDocument, Span, safe_url};
use thiserror::Error;

const HISTORY_LIMIT: usize = 100;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EditError {
    #[error("No block at index {0}")]
    OutOfRange(usize),
    #[error("Block {0} has no text to format")]
    NotText(usize),
    #[error("Links must be http(s), mailto or relative: {0}")]
    UnsafeLink(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mark {
    Bold,
    Italic,
}

/// A rich document plus its edit history
#[derive(Debug, Clone, Default)]
pub struct DocumentBuffer {
    document: RichDocument,
    undo: Vec<RichDocument>,
    redo: Vec<RichDocument>,
}

impl DocumentBuffer {
    pub fn new(document: RichDocument) -> Self {
        Self {
            document,
            undo: Vec::new(),
            redo: Vec::new(),
        }
    }

    pub fn document(&self) -> &RichDocument {
        &self.document
    }

    pub fn into_document(self) -> RichDocument {
        self.document
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Run `edit` against a copy and commit it only if it succeeds.
    fn commit<F>(&mut self, edit: F) -> Result<(), EditError>
    where
        F: FnOnce(&mut Vec<ContentBlock>) -> Result<(), EditError>,
    {
        let mut next = self.document.clone();
        edit(&mut next.blocks)?;
        if next == self.document {
            return Ok(());
        }
        self.undo.push(std::mem::replace(&mut self.document, next));
        if self.undo.len() > HISTORY_LIMIT {
            self.undo.remove(0);
        }
        self.redo.clear();
        Ok(())
    }

    pub fn undo(&mut self) -> bool {
        match self.undo.pop() {
            Some(previous) => {
                self.redo.push(std::mem::replace(&mut self.document, previous));
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.redo.pop() {
            Some(next) => {
                self.undo.push(std::mem::replace(&mut self.document, next));
                true
            }
            None => false,
        }
    }

    /// Insert at `index`, appending when it is past the end.
    pub fn insert_block(&mut self, index: usize, block: ContentBlock) -> Result<(), EditError> {
        self.commit(|blocks| {
            let at = index.min(blocks.len());
            blocks.insert(at, block);
            Ok(())
        })
    }

    pub fn push_paragraph(&mut self, text: &str) -> Result<(), EditError> {
        let at = self.document.blocks.len();
        self.insert_block(at, ContentBlock::paragraph(text))
    }

    pub fn remove_block(&mut self, index: usize) -> Result<ContentBlock, EditError> {
        let removed = self
            .document
            .blocks
            .get(index)
            .cloned()
            .ok_or(EditError::OutOfRange(index))?;
        self.commit(|blocks| {
            blocks.remove(index);
            Ok(())
        })?;
        Ok(removed)
    }

    /// Replace the text of a block with a single unmarked run.
    pub fn set_text(&mut self, index: usize, text: &str) -> Result<(), EditError> {
        self.commit(|blocks| {
            let block = blocks.get_mut(index).ok_or(EditError::OutOfRange(index))?;
            *block = match block {
                ContentBlock::Heading { level, .. } => ContentBlock::heading(*level, text),
                ContentBlock::Paragraph { .. } => ContentBlock::paragraph(text),
                ContentBlock::Quote { .. } => ContentBlock::Quote {
                    spans: vec![Span::plain(text)],
                },
                ContentBlock::BulletList { .. } => ContentBlock::BulletList {
                    items: text.lines().map(|l| vec![Span::plain(l)]).collect(),
                },
                ContentBlock::OrderedList { .. } => ContentBlock::OrderedList {
                    items: text.lines().map(|l| vec![Span::plain(l)]).collect(),
                },
                ContentBlock::Image { .. } => return Err(EditError::NotText(index)),
            };
            Ok(())
        })
    }

    pub fn convert_block(&mut self, index: usize, kind: BlockKind) -> Result<(), EditError> {
        self.commit(|blocks| {
            let block = blocks.get_mut(index).ok_or(EditError::OutOfRange(index))?;
            if block.kind().is_none() {
                return Err(EditError::NotText(index));
            }
            *block = block.converted(kind);
            Ok(())
        })
    }

    /// Apply a mark to every run in the block, or clear it when every run
    /// already has it.
    pub fn toggle_mark(&mut self, index: usize, mark: Mark) -> Result<(), EditError> {
        self.commit(|blocks| {
            let block = blocks.get_mut(index).ok_or(EditError::OutOfRange(index))?;
            let mut spans = block.spans_mut();
            if spans.is_empty() {
                return Err(EditError::NotText(index));
            }
            let has = |s: &Span| match mark {
                Mark::Bold => s.bold,
                Mark::Italic => s.italic,
            };
            let target = !spans.iter().all(|s| has(s));
            for span in spans.iter_mut() {
                match mark {
                    Mark::Bold => span.bold = target,
                    Mark::Italic => span.italic = target,
                }
            }
            Ok(())
        })
    }

    /// Link every run in the block, or unlink it with `None`.
    pub fn link_block(&mut self, index: usize, url: Option<&str>) -> Result<(), EditError> {
        let href = match url {
            Some(raw) => Some(
                safe_url(raw)
                    .ok_or_else(|| EditError::UnsafeLink(raw.to_string()))?
                    .to_string(),
            ),
            None => None,
        };
        self.commit(|blocks| {
            let block = blocks.get_mut(index).ok_or(EditError::OutOfRange(index))?;
            let spans = block.spans_mut();
            if spans.is_empty() {
                return Err(EditError::NotText(index));
            }
            for span in spans {
                span.link = href.clone();
            }
            Ok(())
        })
    }

    pub fn insert_image(&mut self, index: usize, src: &str, alt: &str) -> Result<(), EditError> {
        let src = safe_url(src)
            .ok_or_else(|| EditError::UnsafeLink(src.to_string()))?
            .to_string();
        self.insert_block(
            index,
            ContentBlock::Image {
                src,
                alt: alt.to_string(),
            },
        )
    }
}
