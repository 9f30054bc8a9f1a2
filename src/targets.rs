//! The build's task graph and the targets it exposes.

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum Target {
    /// Minify JavaScript and CSS.
    Minify,
    /// Copy the text files, then minify.
    Default,
}

pub(crate) struct Targets {
    minify: Arc<dyn Task>,
    default: Box<dyn Task>,
}

impl Targets {
    pub(crate) fn new(
        js: Arc<dyn JsCompiler>,
        css: Arc<dyn CssMinifier>,
    ) -> anyhow::Result<Self> {
        let minify_main_js = MinifyJs::new(
            FileSet::new(["addon/**/*.js", "keymap/**/*.js", "lib/**/*.js"])?,
            js.clone(),
        )
        .named("minify-main-js");

        let minify_modes_js = MinifyJs::new(
            FileSet::new(["mode/**/*.js", "!mode/**/*test.js"])?,
            js,
        )
        .named("minify-modes-js");

        let minify_css = MinifyCss::new(
            FileSet::new([
                "addon/**/*.css",
                "lib/**/*.css",
                "mode/**/*.css",
                "theme/**/*.css",
            ])?,
            css,
        )
        .named("minify-css");

        let copy_text_files =
            CopyFiles::new(FileSet::new(["AUTHORS", "CHANGELOG.md"])?).named("copy-text-files");

        let minify: Arc<dyn Task> =
            Arc::new(task::parallel((minify_main_js, minify_modes_js, minify_css)).named("minify"));

        // Both steps create directories in the output tree.
        let default = Box::new(
            copy_text_files
                .then(Arc::clone(&minify))
                .named("default"),
        );

        Ok(Self { minify, default })
    }

    pub(crate) fn get(&self, target: Target) -> &dyn Task {
        match target {
            Target::Minify => &*self.minify,
            Target::Default => &*self.default,
        }
    }

    /// Build `target` from the `source` tree into `out`.
    pub(crate) fn run(&self, target: Target, source: &Path, out: &Path) -> anyhow::Result<Emitted> {
        self.get(target).run(&Context::new(source, out))
    }
}


use crate::css::MinifyCss;
use crate::js::MinifyJs;
use crate::raw::CopyFiles;
use crate::util::file_set::FileSet;
use crate::util::minify::CssMinifier;
use crate::util::minify::JsCompiler;
use crate::util::task;
use crate::util::task::Context;
use crate::util::task::Emitted;
use crate::util::task::Task;
use std::path::Path;
use std::sync::Arc;
