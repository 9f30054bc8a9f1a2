use crate::util::{
    file_set::FileSet,
    minify::{JsCompiler, JsOptions, JS_SETTINGS},
    task::{Context, Emitted, Task},
    write_file,
};
use ::{
    anyhow::Context as _,
    std::{fs, sync::Arc},
};

/// Compiles each selected file on its own, mirroring it into the output tree.
pub(crate) struct MinifyJs {
    files: FileSet,
    compiler: Arc<dyn JsCompiler>,
}

impl MinifyJs {
    pub(crate) fn new(files: FileSet, compiler: Arc<dyn JsCompiler>) -> Self {
        Self { files, compiler }
    }
}

impl Task for MinifyJs {
    fn run(&self, cx: &Context<'_>) -> anyhow::Result<Emitted> {
        let files = self.files.resolve(cx.source)?;

        for relative in &files {
            cx.check()?;

            // CI kills builds that stay silent for too long
            log::info!("Minifying {}", relative.display());

            let in_path = cx.source.join(relative);
            let source = fs::read_to_string(&in_path)
                .with_context(|| format!("failed to read `{}`", in_path.display()))?;

            let options = JsOptions {
                settings: &JS_SETTINGS,
                output_file_name: relative,
            };
            let compiled = self
                .compiler
                .compile(&source, &options)
                .with_context(|| format!("failed to minify `{}`", relative.display()))?;

            write_file(cx.out.join(relative), compiled)?;
        }

        Ok(files)
    }
}
