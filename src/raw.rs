//! Files copied into the output byte for byte.

pub(crate) struct CopyFiles {
    files: FileSet,
}

impl CopyFiles {
    pub(crate) fn new(files: FileSet) -> Self {
        Self { files }
    }
}

impl Task for CopyFiles {
    fn run(&self, cx: &Context<'_>) -> anyhow::Result<Emitted> {
        let files = self.files.resolve(cx.source)?;

        for relative in &files {
            cx.check()?;

            let src = cx.source.join(relative);
            let dest = cx.out.join(relative);
            make_parents(&dest)?;
            fs::copy(&src, &dest).with_context(|| {
                format!("failed to copy {} to {}", src.display(), dest.display())
            })?;
            log::debug!("Copied {} to {}", src.display(), dest.display());
        }

        Ok(files)
    }
}

use crate::util::file_set::FileSet;
use crate::util::make_parents;
use crate::util::task::Context;
use crate::util::task::Emitted;
use crate::util::task::Task;
use anyhow::Context as _;
use std::fs;
