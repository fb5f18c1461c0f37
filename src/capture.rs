use rustpython_vm::{AsObject, PyObjectRef, PyResult, VirtualMachine};

/// In-memory replacement for the interpreter's standard streams during one
/// fragment run.
///
/// Installing a capture points `sys.stdout` at a fresh `io.StringIO` sink
/// and, when `input` is given, `sys.stdin` at a `StringIO` pre-loaded with
/// that text. Captures within an iteration are strictly sequential, so each
/// install simply displaces the previous sink; the real process streams are
/// never touched, which leaves stdout free for the final JSON document.
pub struct OutputCapture {
    sink: PyObjectRef,
}

impl OutputCapture {
    pub fn install(vm: &VirtualMachine, input: Option<&str>) -> PyResult<Self> {
        let string_io = vm.import("io", 0)?.get_attr("StringIO", vm)?;

        let sink = string_io.call((), vm)?;
        vm.sys_module
            .as_object()
            .set_attr("stdout", sink.clone(), vm)?;

        if let Some(text) = input {
            let feed = string_io.call((vm.ctx.new_str(text),), vm)?;
            vm.sys_module.as_object().set_attr("stdin", feed, vm)?;
        }

        Ok(OutputCapture { sink })
    }

    /// Text accumulated in the sink so far.
    pub fn contents(&self, vm: &VirtualMachine) -> PyResult<String> {
        let value = self.sink.get_attr("getvalue", vm)?.call((), vm)?;
        Ok(value.str(vm)?.as_str().to_owned())
    }
}
