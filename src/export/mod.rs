//! Backup-directory metadata and parallel batch export.
//!
//! The JSON sidecar format itself is an external contract — this only implements the minimum
//! reading the renderer needs: folder-path resolution from `.metadata` files and page ordering
//! from `.content` files.

use rayon::prelude::*;
use serde_json::Value;
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

/// One entry from a `.metadata` sidecar file.
#[derive(Debug, Clone)]
pub struct DocumentInfo {
    pub uuid: String,
    pub name: String,
    pub parent: String,
    pub doc_type: String,
    /// Milliseconds since epoch.
    pub last_modified: i64,
}

impl DocumentInfo {
    pub fn is_folder(&self) -> bool {
        self.doc_type == "CollectionType"
    }

    pub fn is_trashed(&self) -> bool {
        self.parent == "trash"
    }
}

/// Lowercases, strips anything that isn't a word character/space/hyphen, and collapses
/// whitespace/underscores into single hyphens — a filesystem-safe slug for folder and file names.
pub fn slugify(name: &str) -> String {
    let lowered = name.to_lowercase();

    let mut cleaned = String::with_capacity(lowered.len());
    for ch in lowered.chars() {
        if ch.is_alphanumeric() || ch == '_' || ch == ' ' || ch == '-' {
            cleaned.push(ch);
        }
    }

    let mut slug = String::with_capacity(cleaned.len());
    let mut last_was_separator = false;
    for ch in cleaned.chars() {
        if ch == ' ' || ch == '_' || ch == '-' {
            if !last_was_separator {
                slug.push('-');
            }
            last_was_separator = true;
        } else {
            slug.push(ch);
            last_was_separator = false;
        }
    }

    slug.trim_matches('-').to_string()
}

/// Loads every `.metadata` file under a backup directory once, then answers folder-path
/// queries without re-reading the directory.
pub struct MetadataCache {
    items: HashMap<String, DocumentInfo>,
}

impl MetadataCache {
    pub fn load(backup_dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let mut items = HashMap::new();

        for entry in fs::read_dir(backup_dir)? {
            let entry = entry?;
            let path = entry.path();

            if path.extension().and_then(|ext| ext.to_str()) != Some("metadata") {
                continue;
            }

            let Some(uuid) = path.file_stem().and_then(|s| s.to_str()) else { continue };

            let Ok(contents) = fs::read_to_string(&path) else { continue };
            let Ok(data) = serde_json::from_str::<Value>(&contents) else { continue };

            items.insert(
                uuid.to_string(),
                DocumentInfo {
                    uuid: uuid.to_string(),
                    name: data
                        .get("visibleName")
                        .and_then(Value::as_str)
                        .unwrap_or(uuid)
                        .to_string(),
                    parent: data.get("parent").and_then(Value::as_str).unwrap_or("").to_string(),
                    doc_type: data
                        .get("type")
                        .and_then(Value::as_str)
                        .unwrap_or("DocumentType")
                        .to_string(),
                    last_modified: data
                        .get("lastModified")
                        .and_then(Value::as_str)
                        .and_then(|s| s.parse().ok())
                        .unwrap_or(0),
                },
            );
        }

        Ok(Self { items })
    }

    pub fn get(&self, uuid: &str) -> Option<&DocumentInfo> {
        self.items.get(uuid)
    }

    /// Walks the `parent` chain to the root, returning e.g. `"archive/subfolder"`, or `""` for a
    /// document that lives at the root.
    pub fn folder_path(&self, uuid: &str) -> String {
        let Some(doc) = self.items.get(uuid) else { return String::new() };

        let mut parts = Vec::new();
        let mut current_parent = doc.parent.as_str();

        while !current_parent.is_empty() && current_parent != "trash" {
            let Some(parent_doc) = self.items.get(current_parent) else { break };
            parts.push(slugify(&parent_doc.name));
            current_parent = parent_doc.parent.as_str();
        }

        parts.reverse();
        parts.join("/")
    }

    pub fn documents(&self, include_trash: bool) -> Vec<&DocumentInfo> {
        self.items
            .values()
            .filter(|doc| !doc.is_folder())
            .filter(|doc| include_trash || !doc.is_trashed())
            .collect()
    }
}

/// Reads page ordering out of a `.content` file: `uuid -> 0-indexed page number`. Understands
/// both the flat `pages: [uuid, ...]` format and the older `cPages.pages[].id`/`redir` format.
pub fn page_order(content_path: impl AsRef<Path>) -> HashMap<String, i64> {
    let mut order = HashMap::new();

    let Ok(contents) = fs::read_to_string(content_path) else { return order };
    let Ok(data) = serde_json::from_str::<Value>(&contents) else { return order };

    if let Some(pages) = data.get("pages").and_then(Value::as_array) {
        if pages.first().and_then(Value::as_str).is_some() {
            for (index, page_id) in pages.iter().enumerate() {
                if let Some(page_id) = page_id.as_str() {
                    order.insert(page_id.to_string(), index as i64);
                }
            }
            return order;
        }
    }

    if let Some(pages) = data.get("cPages").and_then(|v| v.get("pages")).and_then(Value::as_array) {
        for (index, page) in pages.iter().enumerate() {
            let Some(page_id) = page.get("id").and_then(Value::as_str) else { continue };

            let page_number = page
                .get("redir")
                .and_then(|redir| redir.get("value"))
                .and_then(Value::as_i64)
                .unwrap_or(index as i64);

            order.insert(page_id.to_string(), page_number);
        }
    }

    order
}

/// The outcome of exporting a single input file.
pub struct ExportOutcome {
    pub input: PathBuf,
    pub result: Result<PathBuf, String>,
}

/// Renders every input file to an SVG document at a sibling/derived output path, one worker per
/// file (§5: pleasantly parallel, no cross-file shared state — each worker owns its document and
/// canvas end to end).
pub fn export_batch(
    inputs: &[PathBuf],
    output_for: impl Fn(&Path) -> PathBuf + Sync,
) -> Vec<ExportOutcome> {
    inputs
        .par_iter()
        .map(|input| {
            let result = export_one(input, &output_for(input));
            ExportOutcome { input: input.clone(), result }
        })
        .collect()
}

fn export_one(input: &Path, output: &Path) -> Result<PathBuf, String> {
    use crate::{
        doc::Document,
        render::{svg::SvgCanvas, PageGeometry},
    };

    let document = Document::parse_file(input).map_err(|err| err.to_string())?;

    let mut canvas = SvgCanvas::new();
    crate::render::render(&document, &mut canvas, PageGeometry::default())
        .map_err(|err| err.to_string())?;

    fs::write(output, canvas.into_document()).map_err(|err| err.to_string())?;
    Ok(output.to_path_buf())
}

/// A [`crate::render::PageLayout`] backed by a xochitl-style backup directory's `.content`
/// sidecars: `page_ids` is `page_order`'s keys sorted into page order.
///
/// `page_size` has no page dimensions to offer — this crate carries no PDF-reading dependency
/// (`printpdf`, behind the `pdf` feature, only ever writes; reading an existing PDF's page rect is
/// the "library for rendering PDFs" §1 places out of scope). Returning `None` here falls through
/// to [`crate::render::PageGeometry::default`], the same 595×842 fallback
/// `original_source/export.py` itself uses whenever a document has no accompanying PDF.
pub struct BackupPageLayout<'a> {
    backup_dir: &'a Path,
}

impl<'a> BackupPageLayout<'a> {
    pub fn new(backup_dir: &'a Path) -> Self {
        Self { backup_dir }
    }
}

impl crate::render::PageLayout for BackupPageLayout<'_> {
    fn page_ids(&self, document_id: &str) -> Vec<String> {
        let order = page_order(self.backup_dir.join(format!("{document_id}.content")));
        let mut pages: Vec<(String, i64)> = order.into_iter().collect();
        pages.sort_by_key(|(_, number)| *number);
        pages.into_iter().map(|(id, _)| id).collect()
    }

    fn page_size(&self, _document_id: &str, _page_id: &str) -> Option<(f32, f32)> {
        None
    }
}

/// Totals returned by [`export_backup`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ExportStats {
    pub documents: usize,
    pub pages: usize,
    pub skipped: usize,
}

struct PageJob {
    rm_file: PathBuf,
    document_id: String,
    page_id: String,
    output_path: PathBuf,
}

/// Lists the reMarkable page files (`*.rm`) directly inside a document's annotation directory.
/// A missing directory (a document with no annotations yet) yields no jobs, matching
/// `original_source/export.py`'s own `if rm_dir.exists()` guard.
fn rm_files_in(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else { return Vec::new() };

    entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.extension().and_then(|ext| ext.to_str()) == Some("rm"))
        .collect()
}

/// Exports every annotated document in a xochitl-style backup directory to SVG.
///
/// Grounded directly on `original_source/export.py`'s `export_backup`: output lands under
/// `output_dir/folder_path/slugify(name)/`, one SVG per annotation file, named `page-NNN.svg`
/// when the page's position is known from [`page_order`] or by its raw page id otherwise.
/// Documents with no `*.rm` files, and pages that decode to zero strokes, are skipped rather than
/// written — matching the original's `stroke_count == 0` skip.
///
/// Unlike the original's sequential loop, every page across every document renders on
/// [`rayon`]'s global pool: each page owns its own parser, `Document`, and canvas end to end
/// (§5), so there's no reason to serialize documents the way a single Python process would.
pub fn export_backup(
    backup_dir: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
) -> std::io::Result<ExportStats> {
    use crate::render::PageLayout;

    let backup_dir = backup_dir.as_ref();
    let output_dir = output_dir.as_ref();
    fs::create_dir_all(output_dir)?;

    let cache = MetadataCache::load(backup_dir)?;
    let layout = BackupPageLayout::new(backup_dir);

    let mut jobs = Vec::new();
    let mut stats = ExportStats::default();

    for doc in cache.documents(false) {
        let rm_files = rm_files_in(&backup_dir.join(&doc.uuid));
        if rm_files.is_empty() {
            continue;
        }
        stats.documents += 1;

        let page_numbers: HashMap<String, usize> =
            layout.page_ids(&doc.uuid).into_iter().enumerate().map(|(i, id)| (id, i)).collect();

        let folder = cache.folder_path(&doc.uuid);
        let doc_output_dir = if folder.is_empty() {
            output_dir.join(slugify(&doc.name))
        } else {
            output_dir.join(&folder).join(slugify(&doc.name))
        };
        fs::create_dir_all(&doc_output_dir)?;

        for rm_file in rm_files {
            let Some(page_id) = rm_file.file_stem().and_then(|s| s.to_str()) else { continue };
            let page_id = page_id.to_string();

            let output_name = match page_numbers.get(&page_id) {
                Some(number) => format!("page-{:03}.svg", number + 1),
                None => format!("{page_id}.svg"),
            };

            jobs.push(PageJob {
                rm_file,
                document_id: doc.uuid.clone(),
                page_id,
                output_path: doc_output_dir.join(output_name),
            });
        }
    }

    let rendered: Vec<bool> = jobs.par_iter().map(|job| export_page(job, &layout)).collect();
    stats.pages = rendered.iter().filter(|&&ok| ok).count();
    stats.skipped += rendered.iter().filter(|&&ok| !ok).count();

    Ok(stats)
}

fn export_page(job: &PageJob, layout: &BackupPageLayout<'_>) -> bool {
    use crate::{
        doc::Document,
        render::{svg::SvgCanvas, PageGeometry, PageLayout},
    };

    let Ok(document) = Document::parse_file(&job.rm_file) else { return false };

    let stroke_count: usize = document.layers.iter().map(|layer| layer.strokes.len()).sum();
    if stroke_count == 0 {
        return false;
    }

    let geometry = layout
        .page_size(&job.document_id, &job.page_id)
        .map(|(width, _height)| PageGeometry::new(width))
        .unwrap_or_default();

    let mut canvas = SvgCanvas::new();
    if crate::render::render(&document, &mut canvas, geometry).is_err() {
        return false;
    }

    fs::write(&job.output_path, canvas.into_document()).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_normalizes_punctuation_and_whitespace() {
        assert_eq!(slugify("My Great Notebook!!"), "my-great-notebook");
        assert_eq!(slugify("  leading_and_trailing  "), "leading-and-trailing");
        assert_eq!(slugify("multiple---hyphens"), "multiple-hyphens");
    }

    #[test]
    fn folder_path_walks_to_root() {
        let mut items = HashMap::new();
        items.insert(
            "root-folder".to_string(),
            DocumentInfo {
                uuid: "root-folder".into(),
                name: "Archive".into(),
                parent: "".into(),
                doc_type: "CollectionType".into(),
                last_modified: 0,
            },
        );
        items.insert(
            "doc".to_string(),
            DocumentInfo {
                uuid: "doc".into(),
                name: "Notes".into(),
                parent: "root-folder".into(),
                doc_type: "DocumentType".into(),
                last_modified: 0,
            },
        );

        let cache = MetadataCache { items };
        assert_eq!(cache.folder_path("doc"), "archive");
        assert_eq!(cache.folder_path("root-folder"), "");
        assert_eq!(cache.folder_path("missing"), "");
    }

    /// Builds a minimal xochitl-style backup: one folder, one document inside it with a single
    /// annotated page, exercising `MetadataCache`/`slugify`/`folder_path`/`page_order` end to end
    /// through `export_backup` rather than in isolation.
    #[test]
    fn export_backup_organizes_output_by_folder_and_page_order() -> eyre::Result<()> {
        let backup = tempfile::tempdir()?;
        let output = tempfile::tempdir()?;

        fs::write(
            backup.path().join("folder-uuid.metadata"),
            r#"{"visibleName": "Archive", "parent": "", "type": "CollectionType"}"#,
        )?;
        fs::write(
            backup.path().join("doc-uuid.metadata"),
            r#"{"visibleName": "My Great Notebook!!", "parent": "folder-uuid", "type": "DocumentType"}"#,
        )?;
        fs::write(
            backup.path().join("doc-uuid.content"),
            r#"{"pages": ["page-uuid"]}"#,
        )?;

        let page_dir = backup.path().join("doc-uuid");
        fs::create_dir_all(&page_dir)?;
        fs::write(
            page_dir.join("page-uuid.rm"),
            crate::internals::tests::file(&crate::internals::tests::line_item_block(0)),
        )?;

        let stats = export_backup(backup.path(), output.path())?;
        assert_eq!(stats.documents, 1);
        assert_eq!(stats.pages, 1);
        assert_eq!(stats.skipped, 0);

        let expected = output.path().join("archive/my-great-notebook/page-001.svg");
        assert!(expected.is_file(), "expected {} to exist", expected.display());
        assert!(fs::read_to_string(expected)?.contains("<path"));

        Ok(())
    }

    #[test]
    fn export_backup_skips_pages_with_no_strokes() -> eyre::Result<()> {
        let backup = tempfile::tempdir()?;
        let output = tempfile::tempdir()?;

        fs::write(
            backup.path().join("doc-uuid.metadata"),
            r#"{"visibleName": "Empty", "parent": "", "type": "DocumentType"}"#,
        )?;
        fs::write(backup.path().join("doc-uuid.content"), r#"{"pages": ["page-uuid"]}"#)?;

        let page_dir = backup.path().join("doc-uuid");
        fs::create_dir_all(&page_dir)?;
        fs::write(page_dir.join("page-uuid.rm"), crate::internals::tests::file(&[]))?;

        let stats = export_backup(backup.path(), output.path())?;
        assert_eq!(stats.documents, 1);
        assert_eq!(stats.pages, 0);
        assert_eq!(stats.skipped, 1);

        Ok(())
    }
}
