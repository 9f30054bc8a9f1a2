//! Gulp-like task system.
//!
//! Leaf tasks are composed with [`parallel`] and [`Task::then`] into a graph that is built once
//! and passed around explicitly; nothing is registered globally.

pub(crate) trait Task: Send + Sync {
    /// Run the task, returning the paths (relative to the output root) that it emitted.
    fn run(&self, cx: &Context<'_>) -> anyhow::Result<Emitted>;

    /// Run `next` once this task has succeeded.
    fn then<B: Task>(self, next: B) -> Series<Self, B>
    where
        Self: Sized,
    {
        Series::new(self, next)
    }

    /// Log when the task starts and when it finishes.
    fn named(self, name: &'static str) -> Named<Self>
    where
        Self: Sized,
    {
        Named::new(self, name)
    }
}

pub(crate) type Emitted = Vec<PathBuf>;

/// State shared by every task of a single build.
pub(crate) struct Context<'a> {
    pub(crate) source: &'a Path,
    pub(crate) out: &'a Path,
    aborted: AtomicBool,
}

impl<'a> Context<'a> {
    pub(crate) fn new(source: &'a Path, out: &'a Path) -> Self {
        Self {
            source,
            out,
            aborted: AtomicBool::new(false),
        }
    }

    /// Ask every task still running in this build to stop before its next file.
    pub(crate) fn abort(&self) {
        self.aborted.store(true, atomic::Ordering::Relaxed);
    }

    pub(crate) fn check(&self) -> anyhow::Result<()> {
        if self.aborted.load(atomic::Ordering::Relaxed) {
            return Err(Cancelled.into());
        }
        Ok(())
    }
}

/// Returned by tasks that stopped because a sibling failed.
#[derive(Debug)]
pub(crate) struct Cancelled;

impl Display for Cancelled {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("cancelled because another task failed")
    }
}

impl std::error::Error for Cancelled {}

pub(crate) struct Series<A, B> {
    first: A,
    second: B,
}
impl<A, B> Series<A, B> {
    fn new(first: A, second: B) -> Self {
        Self { first, second }
    }
}
impl<A: Task, B: Task> Task for Series<A, B> {
    fn run(&self, cx: &Context<'_>) -> anyhow::Result<Emitted> {
        let mut emitted = self.first.run(cx)?;
        emitted.extend(self.second.run(cx)?);
        Ok(emitted)
    }
}

pub(crate) struct Named<A> {
    task: A,
    name: &'static str,
}
impl<A> Named<A> {
    fn new(task: A, name: &'static str) -> Self {
        Self { task, name }
    }
}
impl<A: Task> Task for Named<A> {
    fn run(&self, cx: &Context<'_>) -> anyhow::Result<Emitted> {
        log::info!("Starting '{}'...", self.name);
        let start = Instant::now();
        let res = self.task.run(cx);
        let elapsed = start.elapsed();
        match &res {
            Ok(_) => log::info!("Finished '{}' after {elapsed:.2?}", self.name),
            Err(e) if e.is::<Cancelled>() => log::info!("Cancelled '{}'", self.name),
            Err(_) => log::error!("'{}' errored after {elapsed:.2?}", self.name),
        }
        res
    }
}

macro_rules! impl_for_refs {
    ($($ty:ty),*) => { $(
        impl<A: Task + ?Sized> Task for $ty {
            fn run(&self, cx: &Context<'_>) -> anyhow::Result<Emitted> {
                (**self).run(cx)
            }
        }
    )* };
}

impl_for_refs!(&A, Box<A>, std::sync::Arc<A>);

/// Run every task of a tuple concurrently, each on its own thread.
///
/// All of them must succeed. A failing task aborts the others; when several fail, the error of
/// the one listed first is reported.
pub(crate) fn parallel<T: IntoParallel>(tasks: T) -> T::Parallel {
    tasks.into_parallel()
}

pub(crate) trait IntoParallel: Sized {
    type Parallel: Task;
    fn into_parallel(self) -> Self::Parallel;
}

macro_rules! impl_for_tuples {
    (@$_:ident) => {};
    (@$first:ident $($ident:ident)*) => {
        impl_for_tuples!($($ident)*);
    };
    ($($ident:ident)*) => {
        #[allow(non_snake_case)]
        const _: () = {
            pub(crate) struct Parallel<$($ident,)*>($($ident,)*);
            impl<$($ident: Task,)*> Task for Parallel<$($ident,)*> {
                fn run(&self, cx: &Context<'_>) -> anyhow::Result<Emitted> {
                    let Self($($ident,)*) = self;
                    thread::scope(|scope| {
                        $(let $ident = scope.spawn(move |_| abort_on_error(cx, $ident.run(cx)));)*
                        merge([$(join($ident),)*])
                    })
                    .unwrap_or_else(|payload| panic::resume_unwind(payload))
                }
            }

            impl<$($ident: Task,)*> IntoParallel for ($($ident,)*) {
                type Parallel = Parallel<$($ident,)*>;
                fn into_parallel(self) -> Self::Parallel {
                    let ($($ident,)*) = self;
                    Parallel($($ident,)*)
                }
            }
        };
        impl_for_tuples!(@$($ident)*);
    };
}
impl_for_tuples!(A B C D E F);

fn abort_on_error(cx: &Context<'_>, res: anyhow::Result<Emitted>) -> anyhow::Result<Emitted> {
    if res.is_err() {
        cx.abort();
    }
    res
}

fn join<T>(handle: ScopedJoinHandle<'_, T>) -> T {
    handle
        .join()
        .unwrap_or_else(|payload| panic::resume_unwind(payload))
}

/// Combine the results of concurrently run tasks.
///
/// A real failure wins over [`Cancelled`]; among real failures, the earliest in `results` order
/// wins, regardless of which happened first.
fn merge<I: IntoIterator<Item = anyhow::Result<Emitted>>>(results: I) -> anyhow::Result<Emitted> {
    let mut emitted = Vec::new();
    let mut failure: Option<anyhow::Error> = None;

    for res in results {
        match res {
            Ok(files) => emitted.extend(files),
            Err(e) => {
                let replace = match &failure {
                    None => true,
                    Some(prev) => prev.is::<Cancelled>() && !e.is::<Cancelled>(),
                };
                if replace {
                    failure = Some(e);
                }
            }
        }
    }

    if let Some(e) = failure {
        return Err(e);
    }
    emitted.sort();
    Ok(emitted)
}

#[cfg(test)]
mod tests {
    struct FnTask<F>(F);

    impl<F: Fn(&Context<'_>) -> anyhow::Result<Emitted> + Send + Sync> Task for FnTask<F> {
        fn run(&self, cx: &Context<'_>) -> anyhow::Result<Emitted> {
            (self.0)(cx)
        }
    }

    fn emits(paths: &'static [&'static str]) -> impl Task {
        FnTask(move |_: &Context<'_>| -> anyhow::Result<Emitted> {
            Ok(paths.iter().map(PathBuf::from).collect())
        })
    }

    fn fails(message: &'static str) -> impl Task {
        FnTask(move |_: &Context<'_>| -> anyhow::Result<Emitted> { Err(anyhow!(message)) })
    }

    /// Keeps working until cancelled, giving up after a few seconds.
    fn waits_for_abort() -> impl Task {
        FnTask(|cx: &Context<'_>| -> anyhow::Result<Emitted> {
            for _ in 0..500 {
                cx.check()?;
                thread::sleep(Duration::from_millis(10));
            }
            Ok(Vec::new())
        })
    }

    fn recorder<'a>(log: &'a Mutex<Vec<&'static str>>, name: &'static str) -> impl Task + 'a {
        FnTask(move |_: &Context<'_>| -> anyhow::Result<Emitted> {
            log.lock().unwrap().push(name);
            Ok(vec![PathBuf::from(name)])
        })
    }

    fn cx() -> Context<'static> {
        Context::new(Path::new("src"), Path::new("out"))
    }

    #[test]
    fn series_runs_in_order() {
        let log = Mutex::new(Vec::new());
        let task = recorder(&log, "first").then(recorder(&log, "second"));
        let emitted = task.run(&cx()).unwrap();
        assert_eq!(*log.lock().unwrap(), ["first", "second"]);
        assert_eq!(emitted, [PathBuf::from("first"), PathBuf::from("second")]);
    }

    #[test]
    fn series_stops_at_first_failure() {
        let log = Mutex::new(Vec::new());
        let task = fails("boom").then(recorder(&log, "second"));
        let e = task.run(&cx()).unwrap_err();
        assert_eq!(e.to_string(), "boom");
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn parallel_merges_outputs() {
        let task = parallel((emits(&["b", "c"]), emits(&[]), emits(&["a"])));
        let emitted = task.run(&cx()).unwrap();
        assert_eq!(emitted, ["a", "b", "c"].map(PathBuf::from));
    }

    #[test]
    fn parallel_reports_the_real_failure() {
        let context = cx();
        let e = parallel((waits_for_abort(), fails("boom")))
            .run(&context)
            .unwrap_err();
        assert!(!e.is::<Cancelled>());
        assert_eq!(e.to_string(), "boom");
        assert!(context.check().is_err());

        let e = parallel((fails("boom"), waits_for_abort()))
            .run(&cx())
            .unwrap_err();
        assert_eq!(e.to_string(), "boom");
    }

    #[test]
    fn parallel_reports_failures_in_listed_order() {
        let late = FnTask(|_: &Context<'_>| -> anyhow::Result<Emitted> {
            thread::sleep(Duration::from_millis(50));
            Err(anyhow!("late"))
        });
        let e = parallel((late, fails("early"))).run(&cx()).unwrap_err();
        assert_eq!(e.to_string(), "late");
    }

    #[test]
    fn aborted_context_cancels_new_work() {
        let context = cx();
        context.abort();
        let e = waits_for_abort().run(&context).unwrap_err();
        assert!(e.is::<Cancelled>());
    }

    #[test]
    fn shared_task_behind_arc() {
        let shared: Arc<dyn Task> = Arc::new(emits(&["x"]));
        let task = emits(&["y"]).then(Arc::clone(&shared)).named("default");
        assert_eq!(task.run(&cx()).unwrap(), ["y", "x"].map(PathBuf::from));
        assert_eq!(shared.run(&cx()).unwrap(), [PathBuf::from("x")]);
    }

    use super::parallel;
    use super::Cancelled;
    use super::Context;
    use super::Emitted;
    use super::Task;
    use anyhow::anyhow;
    use std::path::Path;
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::sync::Mutex;
    use std::thread;
    use std::time::Duration;
}

use crossbeam::thread;
use crossbeam::thread::ScopedJoinHandle;
use std::fmt;
use std::fmt::Display;
use std::fmt::Formatter;
use std::panic;
use std::path::Path;
use std::path::PathBuf;
use std::sync::atomic;
use std::sync::atomic::AtomicBool;
use std::time::Instant;
