/// Global config shared by the entire program.
pub(crate) struct Config {
    /// Which target to build.
    pub target: Target,

    /// Root of the unminified editor sources.
    pub source: PathBuf,

    /// Root of the mirrored, minified tree.
    pub out: PathBuf,

    /// Directory whose `package.json` provides the minifiers.
    pub tools_dir: PathBuf,

    /// Whether to run `npm install` in `tools_dir` first.
    pub install: bool,

    /// Whether to rebuild whenever the sources change.
    pub watch: bool,
}

impl Config {
    #[context("invalid configuration")]
    pub(crate) fn new(args: Args) -> anyhow::Result<Self> {
        let cwd = env::current_dir().context("couldn't get current directory")?;

        // Otherwise the build would pick up its own output, and a watcher would never settle.
        ensure!(
            !cwd.join(&args.out).starts_with(cwd.join(&args.source)),
            "output directory `{}` is inside source directory `{}`",
            args.out.display(),
            args.source.display()
        );

        Ok(Self {
            target: args.target,
            source: args.source,
            out: args.out,
            tools_dir: args.tools_dir,
            install: !args.skip_install,
            watch: args.watch,
        })
    }
}

#[cfg(test)]
mod tests {
    fn args(source: &str, out: &str) -> Args {
        Args {
            target: Target::Default,
            source: PathBuf::from(source),
            out: PathBuf::from(out),
            tools_dir: PathBuf::from("tools"),
            skip_install: true,
            watch: false,
        }
    }

    #[test]
    fn sibling_directories() {
        let config = Config::new(args("codemirror", "codemirror_minified")).unwrap();
        assert_eq!(config.out, Path::new("codemirror_minified"));
        assert!(!config.install);
    }

    #[test]
    fn out_inside_source() {
        assert!(Config::new(args("codemirror", "codemirror/min")).is_err());
        assert!(Config::new(args("./codemirror", "codemirror/lib")).is_err());
        assert!(Config::new(args("codemirror", "codemirror")).is_err());
    }

    use super::Config;
    use crate::targets::Target;
    use crate::Args;
    use std::path::Path;
    use std::path::PathBuf;
}

use crate::targets::Target;
use crate::Args;
use anyhow::ensure;
use anyhow::Context as _;
use fn_error_context::context;
use std::env;
use std::path::PathBuf;
