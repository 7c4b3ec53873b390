//! Liturgy of the Hours EPUB importer.
//!
//! Walks the season index documents of the volume, resolves each index link
//! to its content members (stitching split files back together), sanitizes
//! the markup, and returns flat [`LiturgyEntry`] records ready for bulk
//! storage.
//!
//! Failures on a single entry drop that entry and are reported as
//! [`ImportWarning`]s. Failing to open the archive, or ending up with no
//! entries at all, fails the run.

pub mod index;
pub mod resolve;
pub mod sanitize;

use std::fmt;
use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};
use zip::ZipArchive;

use scriptorium_shared::{LiturgyEntry, Result, ScriptoriumError, SeasonIndex};

use crate::index::parse_index;
use crate::resolve::{member_path, resolve_members};
use crate::sanitize::sanitize_fragment;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Why an index or entry was left out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WarningKind {
    /// The index document is not in the archive.
    MissingIndex,
    /// A member exists but could not be read.
    Unreadable(String),
    /// No archive member matches the reference.
    Unresolved,
    /// Nothing survived sanitization.
    EmptyContent,
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingIndex => write!(f, "index file not found in archive"),
            Self::Unreadable(reason) => write!(f, "cannot read member: {reason}"),
            Self::Unresolved => write!(f, "no archive member matches the reference"),
            Self::EmptyContent => write!(f, "content is empty after cleanup"),
        }
    }
}

/// A skipped index or entry, with enough context to act on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportWarning {
    pub season: String,
    /// Entry title; `None` when the whole index was skipped.
    pub title: Option<String>,
    /// Index member or entry reference involved.
    pub reference: String,
    pub kind: WarningKind,
}

/// Outcome of an import run.
#[derive(Debug, Default)]
pub struct ImportReport {
    pub entries: Vec<LiturgyEntry>,
    pub warnings: Vec<ImportWarning>,
}

/// Progress callback for reporting import status.
pub trait ProgressReporter {
    /// Called when starting on a season index.
    fn phase(&self, name: &str);
    /// Called after an entry is assembled.
    fn entry_resolved(&self, entry: &LiturgyEntry);
    /// Called when the run completes.
    fn done(&self, report: &ImportReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn entry_resolved(&self, _entry: &LiturgyEntry) {}
    fn done(&self, _report: &ImportReport) {}
}

// ---------------------------------------------------------------------------
// Importer
// ---------------------------------------------------------------------------

/// Extracts entries from a liturgy EPUB given its season index mapping.
#[derive(Debug, Clone)]
pub struct Importer {
    seasons: Vec<SeasonIndex>,
}

impl Importer {
    /// `seasons` is processed in the given order.
    pub fn new(seasons: Vec<SeasonIndex>) -> Self {
        Self { seasons }
    }

    /// Open the EPUB at `path` and import it.
    pub fn import_file(
        &self,
        path: &Path,
        created_at: DateTime<Utc>,
        progress: &dyn ProgressReporter,
    ) -> Result<ImportReport> {
        let file = File::open(path).map_err(|e| ScriptoriumError::io(path, e))?;
        let mut archive = ZipArchive::new(file).map_err(|e| {
            ScriptoriumError::Archive(format!("cannot open {}: {e}", path.display()))
        })?;
        self.import(&mut archive, created_at, progress)
    }

    /// Import from an already opened archive.
    ///
    /// Every entry gets `created_at`. Entry `order` counts every index link in
    /// discovery order, so dropped entries leave gaps but never reuse a value.
    #[instrument(skip_all, fields(seasons = self.seasons.len()))]
    pub fn import<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        created_at: DateTime<Utc>,
        progress: &dyn ProgressReporter,
    ) -> Result<ImportReport> {
        let mut members: Vec<String> = archive.file_names().map(str::to_string).collect();
        members.sort();

        let mut report = ImportReport::default();
        let mut order: u32 = 0;

        for season in &self.seasons {
            progress.phase(&season.season);

            if members.binary_search(&season.index_file).is_err() {
                warn!(index = %season.index_file, season = %season.season, "index file not found in EPUB");
                report.warnings.push(ImportWarning {
                    season: season.season.clone(),
                    title: None,
                    reference: season.index_file.clone(),
                    kind: WarningKind::MissingIndex,
                });
                continue;
            }

            let index_html = match read_member(archive, &season.index_file) {
                Ok(html) => html,
                Err(e) => {
                    warn!(index = %season.index_file, error = %e, "cannot read index file");
                    report.warnings.push(ImportWarning {
                        season: season.season.clone(),
                        title: None,
                        reference: season.index_file.clone(),
                        kind: WarningKind::Unreadable(e.to_string()),
                    });
                    continue;
                }
            };

            let links = parse_index(&index_html);
            info!(season = %season.season, entries = links.len(), "parsed season index");

            for link in links {
                order += 1;
                let path = member_path(&season.index_file, &link.reference);
                let source_files = resolve_members(&members, &path);

                let drop_entry = |kind: WarningKind| {
                    warn!(
                        season = %season.season,
                        title = %link.title,
                        reference = %link.reference,
                        reason = %kind,
                        "dropping entry"
                    );
                    ImportWarning {
                        season: season.season.clone(),
                        title: Some(link.title.clone()),
                        reference: link.reference.clone(),
                        kind,
                    }
                };

                if source_files.is_empty() {
                    report.warnings.push(drop_entry(WarningKind::Unresolved));
                    continue;
                }

                let html_content = match assemble(archive, &source_files) {
                    Ok(html) => html,
                    Err(e) => {
                        report
                            .warnings
                            .push(drop_entry(WarningKind::Unreadable(e.to_string())));
                        continue;
                    }
                };

                if html_content.is_empty() {
                    report.warnings.push(drop_entry(WarningKind::EmptyContent));
                    continue;
                }

                debug!(order, title = %link.title, files = source_files.len(), "entry assembled");
                let entry = LiturgyEntry {
                    season: season.season.clone(),
                    title: link.title,
                    order,
                    source_files,
                    html_content,
                    created_at,
                };
                progress.entry_resolved(&entry);
                report.entries.push(entry);
            }
        }

        if report.entries.is_empty() {
            return Err(ScriptoriumError::empty_result(
                "no entries extracted from any season index",
            ));
        }

        info!(
            entries = report.entries.len(),
            warnings = report.warnings.len(),
            "liturgy import complete"
        );
        progress.done(&report);
        Ok(report)
    }
}

/// Read, sanitize and join the content of `source_files` in order.
fn assemble<R: Read + Seek>(archive: &mut ZipArchive<R>, source_files: &[String]) -> Result<String> {
    let mut parts = Vec::with_capacity(source_files.len());
    for name in source_files {
        let cleaned = sanitize_fragment(&read_member(archive, name)?);
        if !cleaned.is_empty() {
            parts.push(cleaned);
        }
    }
    Ok(parts.join("\n\n").trim().to_string())
}

fn read_member<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<String> {
    let mut file = archive
        .by_name(name)
        .map_err(|e| ScriptoriumError::Archive(format!("{name}: {e}")))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)
        .map_err(|e| ScriptoriumError::Archive(format!("{name}: {e}")))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::io::{Cursor, Write};

    use zip::write::SimpleFileOptions;

    use super::*;

    fn build_archive(files: &[(&str, &str)]) -> ZipArchive<Cursor<Vec<u8>>> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in files {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .expect("start file");
            writer.write_all(content.as_bytes()).expect("write file");
        }
        let cursor = writer.finish().expect("finish archive");
        ZipArchive::new(cursor).expect("reopen archive")
    }

    fn now() -> DateTime<Utc> {
        "2024-12-01T06:00:00Z".parse().expect("timestamp")
    }

    fn advent_only() -> Importer {
        Importer::new(vec![SeasonIndex::new("1.advent.htm", "Advent")])
    }

    #[test]
    fn split_entry_is_stitched_in_order() {
        let mut archive = build_archive(&[
            (
                "1.advent.htm",
                r#"<a href="V1AD01.sun_split_000.htm">First Sunday of Advent</a>"#,
            ),
            ("V1AD01.sun_split_001.htm", "<body><p>Part two</p></body>"),
            (
                "V1AD01.sun_split_000.htm",
                r#"<body><p class="MsoNormal">Part one</p></body>"#,
            ),
        ]);

        let report = advent_only()
            .import(&mut archive, now(), &SilentProgress)
            .expect("import");

        assert_eq!(report.entries.len(), 1);
        let entry = &report.entries[0];
        assert_eq!(
            entry.source_files,
            vec!["V1AD01.sun_split_000.htm", "V1AD01.sun_split_001.htm"]
        );
        assert_eq!(entry.html_content, "<p>Part one</p>\n\n<p>Part two</p>");
        assert_eq!(entry.season, "Advent");
        assert_eq!(entry.title, "First Sunday of Advent");
        assert_eq!(entry.created_at, now());
    }

    #[test]
    fn orders_are_unique_and_strictly_increasing_across_seasons() {
        let mut archive = build_archive(&[
            (
                "1.advent.htm",
                r#"<a href="a1.htm">A1</a><a href="missing.htm">Gone</a><a href="a2.htm">A2</a>"#,
            ),
            ("2.christmas.htm", r#"<a href="c1.htm">C1</a>"#),
            ("a1.htm", "<p>a1</p>"),
            ("a2.htm", "<p>a2</p>"),
            ("c1.htm", "<p>c1</p>"),
        ]);
        let importer = Importer::new(vec![
            SeasonIndex::new("1.advent.htm", "Advent"),
            SeasonIndex::new("2.christmas.htm", "Christmas"),
        ]);

        let report = importer
            .import(&mut archive, now(), &SilentProgress)
            .expect("import");

        let orders: Vec<u32> = report.entries.iter().map(|e| e.order).collect();
        assert_eq!(orders, vec![1, 3, 4]);
        assert!(orders.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(report.entries[2].season, "Christmas");

        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].kind, WarningKind::Unresolved);
        assert_eq!(report.warnings[0].title.as_deref(), Some("Gone"));
    }

    #[test]
    fn whitespace_only_entry_is_dropped_with_warning() {
        let mut archive = build_archive(&[
            (
                "1.advent.htm",
                r#"<a href="blank.htm">Blank</a><a href="full.htm">Full</a>"#,
            ),
            (
                "blank.htm",
                "<html><head><style>p{}</style></head><body>\n <o:p> </o:p>\n</body></html>",
            ),
            ("full.htm", "<p>Come, let us worship</p>"),
        ]);

        let report = advent_only()
            .import(&mut archive, now(), &SilentProgress)
            .expect("import");

        assert_eq!(report.entries.len(), 1);
        assert_eq!(report.entries[0].title, "Full");
        assert!(report.entries.iter().all(|e| e.title != "Blank"));
        assert_eq!(
            report.warnings,
            vec![ImportWarning {
                season: "Advent".into(),
                title: Some("Blank".into()),
                reference: "blank.htm".into(),
                kind: WarningKind::EmptyContent,
            }]
        );
    }

    #[test]
    fn missing_index_is_skipped_not_fatal() {
        let mut archive = build_archive(&[
            ("2.christmas.htm", r#"<a href="c1.htm">C1</a>"#),
            ("c1.htm", "<p>c1</p>"),
        ]);
        let importer = Importer::new(vec![
            SeasonIndex::new("1.advent.htm", "Advent"),
            SeasonIndex::new("2.christmas.htm", "Christmas"),
        ]);

        let report = importer
            .import(&mut archive, now(), &SilentProgress)
            .expect("import");

        assert_eq!(report.entries.len(), 1);
        assert_eq!(report.entries[0].order, 1);
        assert_eq!(report.warnings[0].kind, WarningKind::MissingIndex);
        assert_eq!(report.warnings[0].reference, "1.advent.htm");
    }

    #[test]
    fn no_entries_is_an_empty_result_error() {
        let mut archive = build_archive(&[(
            "1.advent.htm",
            r#"<a href="nowhere.htm">Nowhere</a>"#,
        )]);

        let err = advent_only()
            .import(&mut archive, now(), &SilentProgress)
            .unwrap_err();
        assert!(matches!(err, ScriptoriumError::EmptyResult { .. }));
    }

    #[test]
    fn duplicate_links_in_an_index_yield_one_entry() {
        let mut archive = build_archive(&[
            (
                "1.advent.htm",
                r#"<a href="a.htm">Monday</a><a href="a.htm">Monday (repeat)</a>"#,
            ),
            ("a.htm", "<p>a</p>"),
        ]);

        let report = advent_only()
            .import(&mut archive, now(), &SilentProgress)
            .expect("import");
        assert_eq!(report.entries.len(), 1);
        assert_eq!(report.entries[0].title, "Monday");
    }

    #[test]
    fn references_resolve_next_to_a_nested_index() {
        let mut archive = build_archive(&[
            (
                "OEBPS/1.advent.htm",
                r#"<a href="V1AD01.mon.htm#filepos100">Monday</a>"#,
            ),
            ("OEBPS/V1AD01.mon.htm", "<p>Monday</p>"),
        ]);
        let importer = Importer::new(vec![SeasonIndex::new("OEBPS/1.advent.htm", "Advent")]);

        let report = importer
            .import(&mut archive, now(), &SilentProgress)
            .expect("import");
        assert_eq!(report.entries[0].source_files, vec!["OEBPS/V1AD01.mon.htm"]);
    }

    #[test]
    fn encoded_hash_stays_part_of_the_member_name() {
        let mut archive = build_archive(&[
            (
                "1.advent.htm",
                r##"<a href="Saint%23Andrew.htm#vespers">Saint Andrew</a>"##,
            ),
            ("Saint#Andrew.htm", "<p>Andrew</p>"),
        ]);

        let report = advent_only()
            .import(&mut archive, now(), &SilentProgress)
            .expect("import");
        assert_eq!(report.entries[0].source_files, vec!["Saint#Andrew.htm"]);
        assert_eq!(report.entries[0].html_content, "<p>Andrew</p>");
    }

    #[test]
    fn import_file_rejects_non_zip_input() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("book.epub");
        std::fs::write(&path, b"not a zip").expect("write");

        let err = advent_only()
            .import_file(&path, now(), &SilentProgress)
            .unwrap_err();
        assert!(matches!(err, ScriptoriumError::Archive(_)));
    }

    #[test]
    fn import_file_missing_path_is_io_error() {
        let err = advent_only()
            .import_file(Path::new("/nonexistent/book.epub"), now(), &SilentProgress)
            .unwrap_err();
        assert!(matches!(err, ScriptoriumError::Io { .. }));
    }

    #[derive(Default)]
    struct RecordingProgress {
        phases: RefCell<Vec<String>>,
        resolved: RefCell<Vec<u32>>,
        finished: RefCell<bool>,
    }

    impl ProgressReporter for RecordingProgress {
        fn phase(&self, name: &str) {
            self.phases.borrow_mut().push(name.to_string());
        }
        fn entry_resolved(&self, entry: &LiturgyEntry) {
            self.resolved.borrow_mut().push(entry.order);
        }
        fn done(&self, _report: &ImportReport) {
            *self.finished.borrow_mut() = true;
        }
    }

    #[test]
    fn progress_sees_every_season_and_entry() {
        let mut archive = build_archive(&[
            ("1.advent.htm", r#"<a href="a.htm">A</a><a href="b.htm">B</a>"#),
            ("a.htm", "<p>a</p>"),
            ("b.htm", "<p>b</p>"),
        ]);
        let progress = RecordingProgress::default();

        advent_only()
            .import(&mut archive, now(), &progress)
            .expect("import");

        assert_eq!(*progress.phases.borrow(), vec!["Advent"]);
        assert_eq!(*progress.resolved.borrow(), vec![1, 2]);
        assert!(*progress.finished.borrow());
    }
}
