//! Status glyphs used by workflow summaries.

use console::Emoji;

use crate::phase::PhaseStatus;

pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[x] ");
pub static RUNNING: Emoji<'_, '_> = Emoji("▶️  ", "[>] ");
pub static PENDING: Emoji<'_, '_> = Emoji("⏳ ", "[ ] ");
pub static SKIPPED: Emoji<'_, '_> = Emoji("⏭️  ", "[-] ");
pub static BLOCKER: Emoji<'_, '_> = Emoji("🚧 ", "[BLOCK] ");
pub static SPARKLE: Emoji<'_, '_> = Emoji("✨ ", "* ");

pub fn status_glyph(status: PhaseStatus) -> Emoji<'static, 'static> {
    match status {
        PhaseStatus::Completed => CHECK,
        PhaseStatus::InProgress => RUNNING,
        PhaseStatus::Pending => PENDING,
        PhaseStatus::Skipped => SKIPPED,
    }
}
