//! The external minifiers: Closure Compiler for JavaScript and clean-css for CSS.
//!
//! Both are npm packages run through `npx` inside the tools directory, which holds the
//! `package.json` pinning them.

pub(crate) trait JsCompiler: Send + Sync {
    /// Compile a single file's source text.
    fn compile(&self, source: &str, options: &JsOptions<'_>) -> anyhow::Result<String>;
}

pub(crate) trait CssMinifier: Send + Sync {
    /// Minify a single stylesheet.
    fn minify(&self, source: &str) -> anyhow::Result<String>;
}

/// Everything the JS compiler is told about one file.
#[derive(Clone, Copy)]
pub(crate) struct JsOptions<'a> {
    pub(crate) settings: &'a JsSettings,
    pub(crate) output_file_name: &'a Path,
}

/// Closure Compiler flags, spelled the way its command line expects them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct JsSettings {
    pub(crate) compilation_level: &'static str,
    pub(crate) language_in: &'static str,
    pub(crate) language_out: &'static str,
    pub(crate) warning_level: &'static str,
}

/// Safe structural minification of the latest stable dialect into strict ES5, reporting only
/// warnings.
pub(crate) const JS_SETTINGS: JsSettings = JsSettings {
    compilation_level: "SIMPLE",
    language_in: "STABLE",
    language_out: "ECMASCRIPT5_STRICT",
    warning_level: "QUIET",
};

#[context("failed to install minifiers in `{}`", tools_dir.display())]
pub(crate) fn init(tools_dir: &Path) -> anyhow::Result<()> {
    let status = process::Command::new("npm")
        .arg("install")
        .arg("--silent")
        .current_dir(tools_dir)
        // disable the progress bar
        .stderr(process::Stdio::null())
        .status()
        .context("failed to run `npm install`")?;

    ensure!(
        status.success(),
        "`npm install` exited with a non-zero exit status"
    );

    Ok(())
}

pub(crate) struct ClosureCompiler {
    tools_dir: PathBuf,
}

impl ClosureCompiler {
    pub(crate) fn new(tools_dir: &Path) -> Self {
        Self {
            tools_dir: tools_dir.to_owned(),
        }
    }
}

impl ClosureCompiler {
    fn command(&self, settings: &JsSettings) -> process::Command {
        let mut command = process::Command::new("npx");
        command
            .arg("google-closure-compiler")
            .arg("--compilation_level")
            .arg(settings.compilation_level)
            .arg("--language_in")
            .arg(settings.language_in)
            .arg("--language_out")
            .arg(settings.language_out)
            .arg("--warning_level")
            .arg(settings.warning_level)
            .current_dir(&self.tools_dir);
        command
    }
}

impl JsCompiler for ClosureCompiler {
    fn compile(&self, source: &str, options: &JsOptions<'_>) -> anyhow::Result<String> {
        let output = pipe(&mut self.command(options.settings), source)
            .context("failed to compile JS with google-closure-compiler")?;

        if !output.stderr.trim().is_empty() {
            log::warn!(
                "{}: {}",
                options.output_file_name.display(),
                output.stderr.trim()
            );
        }

        Ok(output.stdout)
    }
}

pub(crate) struct CleanCss {
    tools_dir: PathBuf,
}

impl CleanCss {
    pub(crate) fn new(tools_dir: &Path) -> Self {
        Self {
            tools_dir: tools_dir.to_owned(),
        }
    }
}

impl CssMinifier for CleanCss {
    fn minify(&self, source: &str) -> anyhow::Result<String> {
        pipe(
            process::Command::new("npx")
                .arg("cleancss")
                .current_dir(&self.tools_dir),
            source,
        )
        .map(|output| output.stdout)
        .context("failed to minify CSS with cleancss")
    }
}

#[derive(Debug)]
struct Piped {
    stdout: String,
    stderr: String,
}

/// Feed `input` to a child process and collect what it prints.
///
/// Stdin is written from its own thread, since a child that fills its stdout pipe before
/// reading all of its input would otherwise deadlock us.
fn pipe(command: &mut process::Command, input: &str) -> anyhow::Result<Piped> {
    let mut child = command
        .stdin(process::Stdio::piped())
        .stdout(process::Stdio::piped())
        .stderr(process::Stdio::piped())
        .spawn()
        .context("failed to spawn child process")?;

    let mut stdin = child.stdin.take().context("child process has no stdin")?;

    let (written, output) = thread::scope(|scope| {
        let writer = scope.spawn(move |_| stdin.write_all(input.as_bytes()));
        let output = child.wait_with_output();
        (writer.join(), output)
    })
    .unwrap_or_else(|payload| panic::resume_unwind(payload));

    let output = output.context("failed to wait for child process")?;
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    ensure!(
        output.status.success(),
        "child process exited with {}: {}",
        output.status,
        stderr.trim()
    );

    written
        .unwrap_or_else(|payload| panic::resume_unwind(payload))
        .context("failed to write to child process' stdin")?;

    let stdout =
        String::from_utf8(output.stdout).context("child process' stdout is not valid UTF-8")?;

    Ok(Piped { stdout, stderr })
}


use anyhow::ensure;
use anyhow::Context as _;
use crossbeam::thread;
use fn_error_context::context;
use std::io::Write as _;
use std::panic;
use std::path::Path;
use std::path::PathBuf;
use std::process;
