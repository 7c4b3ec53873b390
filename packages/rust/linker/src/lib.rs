//! Related-posts linker.
//!
//! Walks the blog post tree, computes which posts share at least one tag, and
//! rewrites every post's `relatedPosts` front matter field. The list is fully
//! recomputed each run, so repeated runs converge on identical output.

pub mod frontmatter;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

use scriptorium_shared::{LinkerConfig, Result, ScriptoriumError};

use crate::frontmatter::Document;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Options for a linker run.
#[derive(Debug, Clone)]
pub struct LinkerOptions {
    /// Root of the post tree.
    pub content_dir: PathBuf,
    /// File name that marks a post document (e.g. `index.mdx`).
    pub file_name: String,
    /// Compute and report without writing any file.
    pub dry_run: bool,
}

impl From<&LinkerConfig> for LinkerOptions {
    fn from(config: &LinkerConfig) -> Self {
        Self {
            content_dir: config.content_dir.clone(),
            file_name: config.file_name.clone(),
            dry_run: false,
        }
    }
}

/// The identity of a post for matching purposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostKey {
    pub slug: String,
    pub tags: BTreeSet<String>,
}

impl PostKey {
    pub fn new<I, S>(slug: impl Into<String>, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            slug: slug.into(),
            tags: tags.into_iter().map(Into::into).collect(),
        }
    }
}

/// A post whose metadata was rewritten (or would be, in a dry run).
#[derive(Debug, Clone)]
pub struct LinkedPost {
    pub path: PathBuf,
    pub slug: String,
    pub title: Option<String>,
    pub related: Vec<String>,
}

/// A document that was left untouched.
#[derive(Debug)]
pub struct SkippedPost {
    pub path: PathBuf,
    pub reason: ScriptoriumError,
}

/// Outcome of a linker run.
#[derive(Debug, Default)]
pub struct LinkReport {
    pub updated: Vec<LinkedPost>,
    pub skipped: Vec<SkippedPost>,
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

/// Compute the related slugs of every post in `corpus`.
///
/// A post is related to every other post whose slug differs from its own and
/// whose tag set intersects its own. Each list follows corpus order.
pub fn compute_related(corpus: &[PostKey]) -> Vec<Vec<String>> {
    corpus
        .iter()
        .map(|post| {
            corpus
                .iter()
                .filter(|other| other.slug != post.slug && !other.tags.is_disjoint(&post.tags))
                .map(|other| other.slug.clone())
                .collect()
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Corpus discovery
// ---------------------------------------------------------------------------

/// Find every post document under `root`, sorted by path.
pub fn discover_posts(root: &Path, file_name: &str) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(ScriptoriumError::not_found(format!(
            "content directory {}",
            root.display()
        )));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "cannot read directory entry, skipping");
                continue;
            }
        };
        if entry.file_type().is_file() && entry.file_name() == file_name {
            files.push(entry.into_path());
        }
    }

    debug!(count = files.len(), root = %root.display(), "discovered post documents");
    Ok(files)
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

struct LoadedPost {
    path: PathBuf,
    document: Document,
}

/// Recompute and persist `relatedPosts` for every post under the content dir.
///
/// Documents that cannot be read or parsed are reported and skipped; they
/// take no part in matching. Every parsed document is rewritten, even when
/// its related list did not change.
#[instrument(skip_all, fields(content_dir = %options.content_dir.display()))]
pub fn link_posts(options: &LinkerOptions) -> Result<LinkReport> {
    let files = discover_posts(&options.content_dir, &options.file_name)?;
    info!(count = files.len(), "linking related posts");

    let mut report = LinkReport::default();
    let mut posts = Vec::with_capacity(files.len());

    for path in files {
        match load(&path) {
            Ok(document) => posts.push(LoadedPost { path, document }),
            Err(reason) => {
                warn!(path = %path.display(), error = %reason, "skipping unreadable post");
                report.skipped.push(SkippedPost { path, reason });
            }
        }
    }

    let keys: Vec<PostKey> = posts
        .iter()
        .map(|p| PostKey {
            slug: p.document.front_matter.slug().to_string(),
            tags: p.document.front_matter.tags().clone(),
        })
        .collect();
    let related = compute_related(&keys);

    for (mut post, related) in posts.into_iter().zip(related) {
        post.document.front_matter.set_related_posts(&related);

        let title = post.document.front_matter.title().map(str::to_string);
        info!(
            title = title.as_deref().unwrap_or("Untitled"),
            related = related.len(),
            "related articles found"
        );

        if !options.dry_run {
            if let Err(reason) = store(&post.path, &post.document) {
                warn!(path = %post.path.display(), error = %reason, "cannot rewrite post");
                report.skipped.push(SkippedPost {
                    path: post.path,
                    reason,
                });
                continue;
            }
        }

        report.updated.push(LinkedPost {
            path: post.path,
            slug: post.document.front_matter.slug().to_string(),
            title,
            related,
        });
    }

    info!(
        updated = report.updated.len(),
        skipped = report.skipped.len(),
        dry_run = options.dry_run,
        "related posts complete"
    );
    Ok(report)
}

fn load(path: &Path) -> Result<Document> {
    let text = std::fs::read_to_string(path).map_err(|e| ScriptoriumError::io(path, e))?;
    Document::parse(&text)
}

fn store(path: &Path, document: &Document) -> Result<()> {
    let text = document.render()?;
    std::fs::write(path, text).map_err(|e| ScriptoriumError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_post(root: &Path, dir: &str, front_matter: &str, body: &str) -> PathBuf {
        let post_dir = root.join(dir);
        std::fs::create_dir_all(&post_dir).expect("create post dir");
        let path = post_dir.join("index.mdx");
        std::fs::write(&path, format!("---\n{front_matter}---\n{body}")).expect("write post");
        path
    }

    fn options(root: &Path) -> LinkerOptions {
        LinkerOptions {
            content_dir: root.to_path_buf(),
            file_name: "index.mdx".into(),
            dry_run: false,
        }
    }

    fn related_of(path: &Path) -> Vec<String> {
        let text = std::fs::read_to_string(path).expect("read post");
        Document::parse(&text)
            .expect("parse post")
            .front_matter
            .related_posts()
    }

    /// Posts A {faith, hope}, B {hope, love}, C {charity}.
    fn sample_corpus(root: &Path) -> [PathBuf; 3] {
        [
            write_post(
                root,
                "a-post",
                "title: A\nslug: a\ntags:\n- faith\n- hope\n",
                "Body of A.\n",
            ),
            write_post(
                root,
                "b-post",
                "title: B\nslug: b\ntags:\n- hope\n- love\n",
                "Body of B.\n",
            ),
            write_post(
                root,
                "c-post",
                "title: C\nslug: c\ntags:\n- charity\n",
                "Body of C.\n",
            ),
        ]
    }

    #[test]
    fn tag_overlap_example() {
        let corpus = [
            PostKey::new("a", ["faith", "hope"]),
            PostKey::new("b", ["hope", "love"]),
            PostKey::new("c", ["charity"]),
        ];
        let related = compute_related(&corpus);
        assert_eq!(related[0], vec!["b"]);
        assert_eq!(related[1], vec!["a"]);
        assert!(related[2].is_empty());
    }

    #[test]
    fn related_lists_are_symmetric_and_never_self() {
        let corpus = [
            PostKey::new("advent", ["waiting", "hope"]),
            PostKey::new("easter", ["joy", "hope"]),
            PostKey::new("lent", ["fasting", "prayer"]),
            PostKey::new("vigil", ["prayer", "waiting"]),
            PostKey::new("untagged", Vec::<String>::new()),
        ];
        let related = compute_related(&corpus);

        for (i, post) in corpus.iter().enumerate() {
            assert!(!related[i].contains(&post.slug), "{} lists itself", post.slug);
            for slug in &related[i] {
                let j = corpus.iter().position(|q| &q.slug == slug).unwrap();
                assert!(!corpus[j].tags.is_disjoint(&post.tags));
                assert!(related[j].contains(&post.slug), "{slug} does not list {}", post.slug);
            }
        }
        assert!(related[4].is_empty());
    }

    #[test]
    fn related_order_follows_corpus_order() {
        let corpus = [
            PostKey::new("z", ["x"]),
            PostKey::new("m", ["x"]),
            PostKey::new("a", ["x"]),
        ];
        assert_eq!(compute_related(&corpus)[1], vec!["z", "a"]);
    }

    #[test]
    fn posts_sharing_a_slug_never_relate() {
        // Slug-less posts all read as "" and so exclude each other.
        let corpus = [
            PostKey::new("", ["x"]),
            PostKey::new("", ["x"]),
            PostKey::new("named", ["x"]),
        ];
        let related = compute_related(&corpus);
        assert_eq!(related[0], vec!["named"]);
        assert_eq!(related[2], vec!["", ""]);
    }

    #[test]
    fn link_posts_rewrites_every_post() {
        let dir = tempfile::tempdir().expect("tempdir");
        let [a, b, c] = sample_corpus(dir.path());

        let report = link_posts(&options(dir.path())).expect("link");
        assert_eq!(report.updated.len(), 3);
        assert!(report.skipped.is_empty());

        assert_eq!(related_of(&a), vec!["b"]);
        assert_eq!(related_of(&b), vec!["a"]);
        assert!(related_of(&c).is_empty());
        assert!(std::fs::read_to_string(&c).unwrap().contains("relatedPosts: []"));
        assert!(std::fs::read_to_string(&a).unwrap().ends_with("---\nBody of A.\n"));
    }

    #[test]
    fn second_run_is_byte_identical() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = sample_corpus(dir.path());

        link_posts(&options(dir.path())).expect("first run");
        let first: Vec<String> = paths
            .iter()
            .map(|p| std::fs::read_to_string(p).unwrap())
            .collect();

        link_posts(&options(dir.path())).expect("second run");
        let second: Vec<String> = paths
            .iter()
            .map(|p| std::fs::read_to_string(p).unwrap())
            .collect();

        assert_eq!(first, second);
    }

    #[test]
    fn stale_related_posts_are_replaced_not_merged() {
        let dir = tempfile::tempdir().expect("tempdir");
        let a = write_post(
            dir.path(),
            "a",
            "slug: a\ntags: [hope]\nrelatedPosts:\n- removed-post\n",
            "",
        );
        write_post(dir.path(), "b", "slug: b\ntags: [hope]\n", "");

        link_posts(&options(dir.path())).expect("link");
        assert_eq!(related_of(&a), vec!["b"]);
    }

    #[test]
    fn numeric_tags_still_take_part() {
        let dir = tempfile::tempdir().expect("tempdir");
        let a = write_post(dir.path(), "a", "slug: a\ntags: [hope, faith]\n", "");
        let b = write_post(dir.path(), "b", "slug: b\ntags: [hope, 2024]\n", "");

        let report = link_posts(&options(dir.path())).expect("link");
        assert!(report.skipped.is_empty());
        assert_eq!(report.updated.len(), 2);
        assert_eq!(related_of(&a), vec!["b"]);
        assert_eq!(related_of(&b), vec!["a"]);
        assert!(std::fs::read_to_string(&b).unwrap().contains("- 2024"));
    }

    #[test]
    fn malformed_post_is_skipped_without_aborting() {
        let dir = tempfile::tempdir().expect("tempdir");
        let [a, b, _] = sample_corpus(dir.path());
        let broken_dir = dir.path().join("broken");
        std::fs::create_dir_all(&broken_dir).unwrap();
        let broken = broken_dir.join("index.mdx");
        std::fs::write(&broken, "no front matter, tags: hope\n").unwrap();

        let report = link_posts(&options(dir.path())).expect("link");
        assert_eq!(report.updated.len(), 3);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].path, broken);
        assert!(matches!(report.skipped[0].reason, ScriptoriumError::Parse { .. }));

        assert_eq!(
            std::fs::read_to_string(&broken).unwrap(),
            "no front matter, tags: hope\n"
        );
        assert_eq!(related_of(&a), vec!["b"]);
        assert_eq!(related_of(&b), vec!["a"]);
    }

    #[test]
    fn dry_run_writes_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let [a, _, _] = sample_corpus(dir.path());
        let before = std::fs::read_to_string(&a).unwrap();

        let report = link_posts(&LinkerOptions {
            dry_run: true,
            ..options(dir.path())
        })
        .expect("link");

        assert_eq!(report.updated[0].related, vec!["b"]);
        assert_eq!(std::fs::read_to_string(&a).unwrap(), before);
    }

    #[test]
    fn discovery_only_matches_file_name_and_is_sorted() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_post(dir.path(), "b/nested", "slug: nested\n", "");
        write_post(dir.path(), "a", "slug: a\n", "");
        std::fs::write(dir.path().join("a").join("notes.md"), "---\n---\n").unwrap();

        let files = discover_posts(dir.path(), "index.mdx").expect("discover");
        let rel: Vec<PathBuf> = files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            rel,
            vec![
                PathBuf::from("a/index.mdx"),
                PathBuf::from("b/nested/index.mdx")
            ]
        );
    }

    #[test]
    fn missing_content_dir_is_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = link_posts(&options(&dir.path().join("absent"))).unwrap_err();
        assert!(matches!(err, ScriptoriumError::NotFound { .. }));
    }
}
