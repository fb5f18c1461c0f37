use rustpython_vm::builtins::{PyBaseExceptionRef, PyCode};
use rustpython_vm::compiler::{CompileError, Mode};
use rustpython_vm::convert::TryFromObject;
use rustpython_vm::{AsObject, Interpreter, PyRef, Settings, VirtualMachine};
use thiserror::Error;

use crate::job::Job;
use crate::report::{FatalReport, Report, Verdict};
use crate::runner;

/// Name of the shared-namespace slot the synthesized `vars` units stash the
/// used-variable snapshot in between the user and solution runs.
pub(crate) const SAVED_SLOT: &str = "_saved_vars";

#[derive(Error, Debug)]
pub enum EngineError {
    /// A fragment raised SystemExit; the process should terminate with the
    /// requested status rather than report a verdict.
    #[error("fragment requested interpreter exit with status {0}")]
    ExitRequest(i32),
    /// The interpreter failed outside fragment execution (stream capture,
    /// non-Exception BaseException, ...).
    #[error("interpreter failure: {0}")]
    Internal(String),
}

/// A compiled fragment. A user fragment that failed to compile still yields
/// a unit, so the iteration controller can surface the syntax error
/// uniformly on every test.
pub struct CodeUnit {
    pub name: &'static str,
    pub user_attributable: bool,
    pub form: UnitForm,
}

pub enum UnitForm {
    Ready(PyRef<PyCode>),
    SyntaxError(String),
}

/// All units for one job, compiled up front. `save`/`restore` are absent
/// when the job transfers no variables.
pub struct CompiledJob {
    pub user: CodeUnit,
    pub pre: CodeUnit,
    pub solution: CodeUnit,
    pub post: CodeUnit,
    pub save: Option<CodeUnit>,
    pub restore: Option<CodeUnit>,
}

pub struct Engine {
    interpreter: Interpreter,
}

impl Engine {
    pub fn new() -> Self {
        let interpreter = Interpreter::with_init(Settings::default(), |vm| {
            vm.add_native_modules(rustpython_stdlib::get_module_inits());
            vm.add_frozen(rustpython_pylib::FROZEN_STDLIB);
        });
        Engine { interpreter }
    }

    /// Compiles the job's fragments and runs all its test iterations,
    /// producing the one report document. An author-fragment syntax error
    /// short-circuits to a fatal report before any test runs.
    pub fn check(&self, job: &Job) -> Result<Report, EngineError> {
        self.interpreter.enter(|vm| {
            let compiled = match compile_job(vm, job) {
                Ok(compiled) => compiled,
                Err(fatal) => return Ok(Report::Fatal(fatal)),
            };
            runner::run_tests(vm, &compiled, job.num_iters).map(Report::Completed)
        })
    }
}

impl Default for Engine {
    fn default() -> Self {
        Engine::new()
    }
}

pub(crate) fn compile_job(vm: &VirtualMachine, job: &Job) -> Result<CompiledJob, FatalReport> {
    let user = compile_fragment(vm, &job.user_code, "usercode", true)?;

    let (save, restore) = if job.used_vars.is_empty() {
        (None, None)
    } else {
        let save_src = format!("{} = {}", SAVED_SLOT, job.used_vars);
        let restore_src = format!("{} = {}", job.used_vars, SAVED_SLOT);
        (
            Some(compile_fragment(vm, &save_src, "vars", false)?),
            Some(compile_fragment(vm, &restore_src, "vars", false)?),
        )
    };

    let pre = compile_fragment(vm, &job.pre_code, "precode", false)?;
    let solution = compile_fragment(vm, &job.solution_code, "solution", false)?;
    let post = compile_fragment(vm, &job.post_code, "postcode", false)?;

    Ok(CompiledJob {
        user,
        pre,
        solution,
        post,
        save,
        restore,
    })
}

fn compile_fragment(
    vm: &VirtualMachine,
    source: &str,
    name: &'static str,
    user_attributable: bool,
) -> Result<CodeUnit, FatalReport> {
    match vm.compile(source, Mode::Exec, name.to_owned()) {
        Ok(code) => Ok(CodeUnit {
            name,
            user_attributable,
            form: UnitForm::Ready(code),
        }),
        Err(err) if user_attributable => Ok(CodeUnit {
            name,
            user_attributable,
            form: UnitForm::SyntaxError(err.to_string()),
        }),
        Err(err) => {
            let (line, offset) = syntax_location(vm, &err, source);
            Err(FatalReport {
                ok: true,
                verdict: Verdict::AuthorSyntax,
                file: name,
                line,
                offset,
                message: format!("Error in {name}: {err}"),
            })
        }
    }
}

/// Pulls the line/offset of a syntax error out of the SyntaxError object the
/// VM builds for it. Missing or non-integer attributes degrade to 0.
fn syntax_location(vm: &VirtualMachine, err: &CompileError, source: &str) -> (u32, u32) {
    let exc = vm.new_syntax_error(err, Some(source));
    let attr = |name: &'static str| {
        exc.as_object()
            .get_attr(name, vm)
            .ok()
            .and_then(|value| u32::try_from_object(vm, value).ok())
            .unwrap_or(0)
    };
    (attr("lineno"), attr("offset"))
}

/// Formats a runtime exception as `Type: message`, matching Python's own
/// `str()` of the exception for the message part.
pub(crate) fn describe_exception(vm: &VirtualMachine, exc: &PyBaseExceptionRef) -> String {
    let class = exc.class().name().to_string();
    let message = exc
        .as_object()
        .str(vm)
        .map(|s| s.as_str().to_owned())
        .unwrap_or_default();
    format!("{class}: {message}")
}
