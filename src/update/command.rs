//! Bot-command extraction with UTF-16 entity offsets.
//!
//! The platform measures entity `offset`/`length` in UTF-16 code units, not
//! bytes: a scalar outside the Basic Multilingual Plane occupies two units.
//! Extraction is best-effort on attacker-influenced input - malformed bounds
//! or missing structure yield no command, never an error.

use crate::update::Update;

/// A parsed bot command: the raw first token and its argument payload.
///
/// The raw form keeps the leading `/` and any `@botname` mention, e.g.
/// `"/ping@mybot"`; use [`strip_mention`](Command::strip_mention) for the
/// registry-lookup form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub raw: String,
    pub args: String,
}

impl Command {
    /// The command with any `@botname` mention resolved against `username`.
    ///
    /// The mention is dropped when it matches the configured username
    /// case-insensitively, or when no username is configured at all. A
    /// mention for a different bot is kept verbatim, so its lookup misses
    /// and the update falls through - this is how bots sharing a group chat
    /// ignore each other's commands.
    pub fn strip_mention(&self, username: Option<&str>) -> &str {
        let Some(at) = self.raw.find('@') else {
            return &self.raw;
        };
        match username {
            None => &self.raw[..at],
            Some(name) if self.raw[at + 1..].eq_ignore_ascii_case(name) => &self.raw[..at],
            Some(_) => &self.raw,
        }
    }
}

/// Byte positions of the UTF-16 code-unit boundaries of a string.
///
/// `boundaries[u]` is the byte offset of code unit `u`, or `None` when `u`
/// falls on the second half of a surrogate pair - a position only malformed
/// entity bounds can ask for.
struct Utf16Index {
    boundaries: Vec<Option<usize>>,
}

impl Utf16Index {
    fn new(text: &str) -> Self {
        let mut boundaries = Vec::with_capacity(text.len() + 1);
        for (byte_pos, ch) in text.char_indices() {
            boundaries.push(Some(byte_pos));
            if ch.len_utf16() == 2 {
                boundaries.push(None);
            }
        }
        boundaries.push(Some(text.len()));
        Self { boundaries }
    }

    /// Byte offset of code unit `unit`; `None` past the end or mid-pair.
    fn byte_at(&self, unit: usize) -> Option<usize> {
        self.boundaries.get(unit).copied().flatten()
    }
}

/// Slice `text` by a UTF-16 code-unit range.
///
/// Returns `None` when the range is out of bounds or either end lands
/// inside a surrogate pair.
pub fn utf16_slice(text: &str, offset: usize, length: usize) -> Option<&str> {
    let index = Utf16Index::new(text);
    let start = index.byte_at(offset)?;
    let end = index.byte_at(offset.checked_add(length)?)?;
    text.get(start..end)
}

/// Extract the command opening the update's message, per the entity records.
///
/// The first `bot_command` entity at offset 0 marks the command. The token
/// spans from the start of the text through the entity end, extended through
/// any immediately following non-whitespace (the entity may cover only the
/// bare command, leaving an attached `@botname` just past its end). The
/// remainder, trimmed, is the argument payload.
pub(crate) fn extract(update: &Update) -> Option<Command> {
    let message = update.message()?;
    let text = message.get("text").as_str();
    if text.is_empty() {
        return None;
    }
    let index = Utf16Index::new(text);

    for entity in update.entities() {
        if entity.get("type").as_str() != "bot_command" {
            continue;
        }
        if entity.get("offset").as_i64() != 0 {
            continue;
        }
        let length = entity.get("length").as_i64();
        if length <= 0 {
            return None;
        }
        let Some(entity_end) = index.byte_at(length as usize) else {
            // Bounds inconsistent with the text: treat the command as absent.
            return None;
        };
        let tail = &text[entity_end..];
        let token_end = entity_end + tail.find(char::is_whitespace).unwrap_or(tail.len());
        return Some(Command {
            raw: text[..token_end].to_string(),
            args: text[token_end..].trim().to_string(),
        });
    }
    None
}
