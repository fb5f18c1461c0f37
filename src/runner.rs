use rustpython_vm::builtins::PyBaseExceptionRef;
use rustpython_vm::convert::TryFromObject;
use rustpython_vm::scope::Scope;
use rustpython_vm::{AsObject, VirtualMachine};

use crate::capture::OutputCapture;
use crate::diff::compare_outputs;
use crate::engine::{describe_exception, CodeUnit, CompiledJob, EngineError, UnitForm};
use crate::report::{RunReport, TestOutcome, Verdict};

/// Placeholder attached to a failure that happened before any synthetic
/// input was established.
const NO_INPUT: &str = "???";

/// Result of executing one unit against the shared namespace. Runtime
/// exceptions never propagate out of `run_unit`; they come back as `Failed`
/// with the verdict already attributed.
enum RunOutcome {
    Completed,
    Failed { verdict: Verdict, message: String },
}

/// Runs all `num_iters` test iterations and reduces their verdicts into the
/// final run report.
pub(crate) fn run_tests(
    vm: &VirtualMachine,
    units: &CompiledJob,
    num_iters: u32,
) -> Result<RunReport, EngineError> {
    // One namespace for every fragment of every iteration. It is never
    // reset; fragments accumulate state across iterations on purpose, and
    // only the used-variable save/restore pair transfers state explicitly.
    let scope = vm.new_scope_with_builtins();

    let mut overall = Verdict::Unset;
    let mut correct = 0;
    let mut tests = Vec::with_capacity(num_iters as usize);
    let mut last_input: Option<String> = None;

    for _ in 0..num_iters {
        let outcome = run_iteration(vm, units, &scope, &mut last_input)?;
        if outcome.verdict == Verdict::Correct {
            correct += 1;
        }
        overall = overall.min(outcome.verdict);
        tests.push(outcome);
    }

    Ok(RunReport {
        ok: true,
        verdict: overall,
        correct,
        tests,
    })
}

/// One test iteration: the fixed seven-step sequence, each step an early
/// exit on failure. The user's code runs before the solution's so it cannot
/// read solution-computed globals left over from a previous restore.
fn run_iteration(
    vm: &VirtualMachine,
    units: &CompiledJob,
    scope: &Scope,
    last_input: &mut Option<String>,
) -> Result<TestOutcome, EngineError> {
    // 1. precode generates this iteration's synthetic input on its stdout.
    let capture = install(vm, None)?;
    if let Some(outcome) = step(vm, &units.pre, scope, last_input)? {
        return Ok(outcome);
    }
    let test_input = contents(vm, &capture)?;
    *last_input = Some(test_input.clone());

    // 2. snapshot the used variables out of the namespace.
    if let Some(save) = &units.save {
        if let Some(outcome) = step(vm, save, scope, last_input)? {
            return Ok(outcome);
        }
    }

    // 3-4. user code, then postcode appending to the same sink.
    let capture = install(vm, Some(&test_input))?;
    if let Some(outcome) = step(vm, &units.user, scope, last_input)? {
        return Ok(outcome);
    }
    if let Some(outcome) = step(vm, &units.post, scope, last_input)? {
        return Ok(outcome);
    }
    let user_output = contents(vm, &capture)?;

    // 5. write the snapshot back so the solution sees the pre-user state.
    if let Some(restore) = &units.restore {
        if let Some(outcome) = step(vm, restore, scope, last_input)? {
            return Ok(outcome);
        }
    }

    // 6-7. solution code against the same input, then postcode again.
    let capture = install(vm, Some(&test_input))?;
    if let Some(outcome) = step(vm, &units.solution, scope, last_input)? {
        return Ok(outcome);
    }
    if let Some(outcome) = step(vm, &units.post, scope, last_input)? {
        return Ok(outcome);
    }
    let solution_output = contents(vm, &capture)?;

    // 8. exact comparison, with a line diff for the mismatch message.
    Ok(match compare_outputs(&solution_output, &user_output) {
        None => TestOutcome::matched(test_input, user_output, solution_output),
        Some(message) => TestOutcome::mismatched(test_input, user_output, solution_output, message),
    })
}

/// Runs one unit and converts any failure into the TestOutcome that ends
/// the iteration. `Ok(None)` means the step completed and the iteration
/// continues.
fn step(
    vm: &VirtualMachine,
    unit: &CodeUnit,
    scope: &Scope,
    last_input: &Option<String>,
) -> Result<Option<TestOutcome>, EngineError> {
    Ok(match run_unit(vm, unit, scope)? {
        RunOutcome::Completed => None,
        RunOutcome::Failed { verdict, message } => {
            let test = last_input.clone().unwrap_or_else(|| NO_INPUT.to_string());
            Some(TestOutcome::failed(verdict, test, message))
        }
    })
}

/// The isolation boundary: executes a unit's code object against the shared
/// namespace and catches every `Exception` the fragment raises. SystemExit
/// is a termination request and propagates, as does anything else outside
/// the `Exception` hierarchy.
fn run_unit(
    vm: &VirtualMachine,
    unit: &CodeUnit,
    scope: &Scope,
) -> Result<RunOutcome, EngineError> {
    let code = match &unit.form {
        UnitForm::Ready(code) => code.clone(),
        // The user fragment never compiled; every iteration surfaces the
        // same syntax failure at the user step.
        UnitForm::SyntaxError(message) => {
            return Ok(RunOutcome::Failed {
                verdict: Verdict::UserSyntax,
                message: message.clone(),
            })
        }
    };

    match vm.run_code_obj(code, scope.clone()) {
        Ok(_) => Ok(RunOutcome::Completed),
        Err(exc) => {
            if exc.fast_isinstance(&vm.ctx.exceptions.system_exit) {
                return Err(EngineError::ExitRequest(exit_status(vm, &exc)));
            }
            if !exc.fast_isinstance(&vm.ctx.exceptions.exception_type) {
                return Err(EngineError::Internal(describe_exception(vm, &exc)));
            }
            let described = describe_exception(vm, &exc);
            Ok(if unit.user_attributable {
                RunOutcome::Failed {
                    verdict: Verdict::UserRuntime,
                    message: described,
                }
            } else {
                RunOutcome::Failed {
                    verdict: Verdict::AuthorRuntime,
                    message: format!("{}: {}", unit.name, described),
                }
            })
        }
    }
}

fn exit_status(vm: &VirtualMachine, exc: &PyBaseExceptionRef) -> i32 {
    let args = exc.args();
    match args.as_slice().first() {
        None => 0,
        Some(value) if vm.is_none(value) => 0,
        Some(value) => i32::try_from_object(vm, value.clone()).unwrap_or(1),
    }
}

fn install(vm: &VirtualMachine, input: Option<&str>) -> Result<OutputCapture, EngineError> {
    OutputCapture::install(vm, input)
        .map_err(|exc| EngineError::Internal(describe_exception(vm, &exc)))
}

fn contents(vm: &VirtualMachine, capture: &OutputCapture) -> Result<String, EngineError> {
    capture
        .contents(vm)
        .map_err(|exc| EngineError::Internal(describe_exception(vm, &exc)))
}
