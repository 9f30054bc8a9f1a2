//! Selecting source files with an ordered list of glob patterns.
//!
//! Patterns are relative to the source root and use `/` as the separator. `*` never crosses a
//! directory boundary while `**` does. A pattern starting with `!` excludes files; a file is
//! selected when it matches any inclusion and no exclusion.

pub(crate) struct FileSet {
    include: Vec<Include>,
    exclude: GlobSet,
}

struct Include {
    pattern: String,
    /// The leading components of the pattern that contain no wildcards.
    base: PathBuf,
    /// Whether the whole pattern is literal, i.e. names exactly one file.
    singular: bool,
    matcher: GlobMatcher,
}

impl FileSet {
    pub(crate) fn new<'p, I: IntoIterator<Item = &'p str>>(patterns: I) -> anyhow::Result<Self> {
        let mut include = Vec::new();
        let mut exclude = GlobSetBuilder::new();

        for pattern in patterns {
            if let Some(negated) = pattern.strip_prefix('!') {
                exclude.add(glob(negated)?);
                continue;
            }

            let (base, singular) = literal_prefix(pattern);
            include.push(Include {
                pattern: pattern.to_owned(),
                base,
                singular,
                matcher: glob(pattern)?.compile_matcher(),
            });
        }

        let exclude = exclude
            .build()
            .context("failed to build exclusion globs")?;

        Ok(Self { include, exclude })
    }

    /// Find every selected file under `root`, as sorted paths relative to `root`.
    pub(crate) fn resolve(&self, root: &Path) -> anyhow::Result<Vec<PathBuf>> {
        let mut found = BTreeSet::new();

        for include in &self.include {
            let start = root.join(&include.base);

            if include.singular {
                ensure!(
                    start.is_file(),
                    "file not found with singular glob `{}` in `{}`",
                    include.pattern,
                    root.display()
                );
                if !self.exclude.is_match(&include.base) {
                    found.insert(include.base.clone());
                }
                continue;
            }

            if !start.is_dir() {
                log::debug!("`{}` matched nothing", include.pattern);
                continue;
            }

            for entry in WalkDir::new(&start).follow_links(true) {
                let entry =
                    entry.with_context(|| format!("failed to walk `{}`", start.display()))?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let relative = entry.path().strip_prefix(root).with_context(|| {
                    format!(
                        "failed to strip prefix {} from {}",
                        root.display(),
                        entry.path().display()
                    )
                })?;
                if include.matcher.is_match(relative) && !self.exclude.is_match(relative) {
                    found.insert(relative.to_owned());
                }
            }
        }

        Ok(found.into_iter().collect())
    }
}

fn glob(pattern: &str) -> anyhow::Result<Glob> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .with_context(|| format!("invalid glob `{pattern}`"))
}

fn literal_prefix(pattern: &str) -> (PathBuf, bool) {
    let mut base = PathBuf::new();
    for component in pattern.split('/') {
        if component.contains(['*', '?', '[', ']', '{', '}', '\\']) {
            return (base, false);
        }
        base.push(component);
    }
    (base, true)
}

#[cfg(test)]
mod tests {
    fn tree(files: &[&str]) -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        for file in files {
            write_file(dir.path().join(file), "").unwrap();
        }
        dir
    }

    fn resolve(patterns: &[&str], root: &Path) -> Vec<String> {
        FileSet::new(patterns.iter().copied())
            .unwrap()
            .resolve(root)
            .unwrap()
            .into_iter()
            .map(|path| path.to_str().unwrap().replace('\\', "/"))
            .collect()
    }

    #[test]
    fn exclusions_win() {
        let dir = tree(&[
            "mode/python/python.js",
            "mode/python/test.js",
            "mode/css/scss_test.js",
            "mode/css/css.js",
            "mode/meta.js",
            "mode/css/css.css",
        ]);
        let found = resolve(&["mode/**/*.js", "!mode/**/*test.js"], dir.path());
        assert_eq!(
            found,
            ["mode/css/css.js", "mode/meta.js", "mode/python/python.js"]
        );
    }

    #[test]
    fn star_stays_in_its_directory() {
        let dir = tree(&["lib/a.js", "lib/nested/b.js"]);
        assert_eq!(resolve(&["lib/*.js"], dir.path()), ["lib/a.js"]);
        assert_eq!(
            resolve(&["lib/**/*.js"], dir.path()),
            ["lib/a.js", "lib/nested/b.js"]
        );
    }

    #[test]
    fn overlapping_patterns_are_deduplicated() {
        let dir = tree(&["addon/fold/foldcode.js", "lib/codemirror.js"]);
        let found = resolve(&["lib/**/*.js", "addon/**/*.js", "**/*.js"], dir.path());
        assert_eq!(found, ["addon/fold/foldcode.js", "lib/codemirror.js"]);
    }

    #[test]
    fn missing_directories_match_nothing() {
        let dir = tree(&["lib/a.js"]);
        assert!(resolve(&["keymap/**/*.js"], dir.path()).is_empty());
    }

    #[test]
    fn singular_globs() {
        let dir = tree(&["AUTHORS", "CHANGELOG.md", "README.md"]);
        assert_eq!(
            resolve(&["AUTHORS", "CHANGELOG.md"], dir.path()),
            ["AUTHORS", "CHANGELOG.md"]
        );

        let e = FileSet::new(["AUTHORS", "LICENSE"])
            .unwrap()
            .resolve(dir.path())
            .unwrap_err();
        assert!(e.to_string().contains("`LICENSE`"), "{e}");
    }

    #[test]
    fn invalid_glob() {
        assert!(FileSet::new(["lib/[.js"]).is_err());
    }

    #[test]
    fn prefixes() {
        assert_eq!(literal_prefix("addon/**/*.js"), (PathBuf::from("addon"), false));
        assert_eq!(literal_prefix("**/*.css"), (PathBuf::new(), false));
        assert_eq!(literal_prefix("AUTHORS"), (PathBuf::from("AUTHORS"), true));
    }

    use super::literal_prefix;
    use super::FileSet;
    use crate::util::write_file;
    use std::path::Path;
    use std::path::PathBuf;
    use tempfile::TempDir;
}

use anyhow::ensure;
use anyhow::Context as _;
use globset::Glob;
use globset::GlobBuilder;
use globset::GlobMatcher;
use globset::GlobSet;
use globset::GlobSetBuilder;
use std::collections::BTreeSet;
use std::path::Path;
use std::path::PathBuf;
use walkdir::WalkDir;
