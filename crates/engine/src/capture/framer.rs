use tracing::trace;

use crate::parser::END_TAG;

enum FrameAction {
    Skip,
    StartNew,
    AddToCurrent,
    Close,
}

/// Splits the tool's output into blocks.
///
/// A block opens on a 5 field line whose first field starts with `*`
/// (`*   << Request  >> 5`) and closes on the first following line whose
/// second field is `End`. Lines outside a block are dropped.
#[derive(Debug, Default)]
pub struct BlockFramer {
    pending: Option<Vec<String>>,
    skipped: u64,
}

impl BlockFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one raw line. Returns the finished block when `line` closes it.
    pub fn push(&mut self, line: &str) -> Option<Vec<String>> {
        let line = line.trim();
        let parts: Vec<&str> = line.split_whitespace().collect();

        let action = match self.pending {
            None if is_block_start(&parts) => FrameAction::StartNew,
            None => FrameAction::Skip,
            Some(_) if parts.len() >= 2 && parts[1] == END_TAG => FrameAction::Close,
            Some(_) => FrameAction::AddToCurrent,
        };

        match action {
            FrameAction::Skip => {
                self.skipped += 1;
                trace!(line, "framer: line outside of a block");
                None
            }
            FrameAction::StartNew => {
                self.pending = Some(vec![line.to_string()]);
                None
            }
            FrameAction::AddToCurrent => {
                if let Some(block) = self.pending.as_mut() {
                    block.push(line.to_string());
                }
                None
            }
            FrameAction::Close => {
                let mut block = self.pending.take()?;
                block.push(line.to_string());
                Some(block)
            }
        }
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Lines buffered for the block still open.
    pub fn pending_len(&self) -> usize {
        self.pending.as_ref().map_or(0, Vec::len)
    }

    /// Lines dropped because no block was open.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }
}

fn is_block_start(parts: &[&str]) -> bool {
    parts.len() == 5 && parts[0].starts_with('*')
}
