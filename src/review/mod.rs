/// Document review and reconciliation
///
/// After translation, chapter boundaries in the navigation table and the
/// time-stamped blocks in the translation body can drift apart. The review
/// pass re-aligns them: blocks are reassigned to the chapters that contain
/// their start times, the section is regenerated in table order, and the
/// fine-grained markers are stripped from the final document.
pub mod reconcile;

pub use reconcile::{
    parse_chapter_table, parse_translation_blocks, rebuild_translation_section,
    reconcile_document, strip_fine_timestamps, ChapterTableEntry, TranslationBlock,
};

use tracing::info;

/// Run the full review pass over a generated document.
///
/// Reconciliation runs first; the timestamp strip only runs when
/// reconciliation actually restructured the document, since stripping
/// beforehand would destroy the markers reconciliation depends on.
pub fn review_content(content: &str, strip_markers: bool) -> String {
    match reconcile::try_reconcile(content) {
        Some(reconciled) if strip_markers => {
            info!("Document reconciled, stripping fine-grained timestamps");
            reconcile::strip_fine_timestamps(&reconciled)
        }
        Some(reconciled) => {
            info!("Document reconciled, keeping fine-grained timestamps");
            reconciled
        }
        None => content.to_string(),
    }
}
