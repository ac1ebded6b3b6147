//! Multi-class zip bundle.

use std::collections::HashSet;
use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::sheet::build_sheet;
use super::xlsx::write_sheet_xlsx;
use crate::api::logs::{log_info_indent, log_warning};
use crate::error::ExportResult;
use crate::roster::RosterStore;

/// Summary of a produced bundle.
#[derive(Debug, Clone)]
pub struct BundleSummary {
    /// Archive bytes.
    pub bytes: Vec<u8>,
    /// Entry names, in archive order.
    pub entries: Vec<String>,
    /// Requested classes skipped for having no records.
    pub skipped: Vec<String>,
}

/// Archive entry name for a class: `<class_id>.xlsx`.
///
/// Path separators are replaced so every entry stays at the archive root.
pub fn entry_name(class_id: &str) -> String {
    format!("{}.xlsx", entry_stem(class_id))
}

fn entry_stem(class_id: &str) -> String {
    class_id
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect()
}

/// Entry name not yet in `used`; later collisions get `~2`, `~3`, ...
fn unique_entry_name(class_id: &str, used: &mut HashSet<String>) -> String {
    let mut name = entry_name(class_id);
    let mut n = 2;
    while used.contains(&name) {
        name = format!("{}~{}.xlsx", entry_stem(class_id), n);
        n += 1;
    }
    used.insert(name.clone());
    name
}

/// Bundle every class of the roster.
pub fn export_bundle(store: &RosterStore) -> ExportResult<BundleSummary> {
    bundle_classes(store, &store.list_classes())
}

/// Bundle the given classes, each serialized independently.
///
/// Classes without records are skipped; no empty document is written.
pub fn bundle_classes(store: &RosterStore, classes: &[String]) -> ExportResult<BundleSummary> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut entries = Vec::new();
    let mut skipped = Vec::new();
    let mut used = HashSet::new();

    for class_id in classes {
        let roster = store.class_roster(class_id);
        if roster.is_empty() {
            log_warning(format!("Skipping class '{}' (no records)", class_id));
            skipped.push(class_id.clone());
            continue;
        }

        let bytes = write_sheet_xlsx(&build_sheet(&roster))?;
        let name = unique_entry_name(class_id, &mut used);
        zip.start_file(name.clone(), opts)?;
        zip.write_all(&bytes)?;
        log_info_indent(format!("{} ({} students)", name, roster.len()), 1);
        entries.push(name);
    }

    let bytes = zip.finish()?.into_inner();
    Ok(BundleSummary {
        bytes,
        entries,
        skipped,
    })
}
