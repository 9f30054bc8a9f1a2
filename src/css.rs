use crate::util::{
    file_set::FileSet,
    minify::CssMinifier,
    task::{Context, Emitted, Task},
    write_file,
};
use ::{
    anyhow::Context as _,
    std::{fs, sync::Arc},
};

/// Minifies each selected stylesheet whole, mirroring it into the output tree.
pub(crate) struct MinifyCss {
    files: FileSet,
    minifier: Arc<dyn CssMinifier>,
}

impl MinifyCss {
    pub(crate) fn new(files: FileSet, minifier: Arc<dyn CssMinifier>) -> Self {
        Self { files, minifier }
    }
}

impl Task for MinifyCss {
    fn run(&self, cx: &Context<'_>) -> anyhow::Result<Emitted> {
        let files = self.files.resolve(cx.source)?;

        for relative in &files {
            cx.check()?;

            let in_path = cx.source.join(relative);
            let css = fs::read_to_string(&in_path)
                .with_context(|| format!("failed to read `{}`", in_path.display()))?;

            let minified = self
                .minifier
                .minify(&css)
                .with_context(|| format!("failed to minify `{}`", relative.display()))?;

            write_file(cx.out.join(relative), minified)?;
            log::debug!("emitted {}", relative.display());
        }

        Ok(files)
    }
}
