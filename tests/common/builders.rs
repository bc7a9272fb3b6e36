//! Test algorithms and description builders

use parking_lot::Mutex;
use std::sync::Arc;
use viennamesh::data::builtin;
use viennamesh::pipeline::{AlgorithmDecl, ParameterDecl, ParameterType};
use viennamesh::{Algorithm, AlgorithmIo, Context, PortDescriptor, Result, DEFAULT_PORT};

/// Copies input `value` to output `default` unchanged.
#[derive(Default)]
pub struct Echo;

impl Algorithm for Echo {
    fn run(&mut self, io: &mut AlgorithmIo<'_>) -> Result<()> {
        let value = io.get_required_input("value")?;
        io.set_output(DEFAULT_PORT, value);
        Ok(())
    }

    fn ports(&self) -> &'static [PortDescriptor] {
        const PORTS: &[PortDescriptor] = &[
            PortDescriptor::required("value"),
            PortDescriptor::output(DEFAULT_PORT),
        ];
        PORTS
    }
}

/// Reads `value` as an int (converting if needed) and outputs twice it.
#[derive(Default)]
pub struct Double;

impl Algorithm for Double {
    fn run(&mut self, io: &mut AlgorithmIo<'_>) -> Result<()> {
        let value = io.get_required_input_as("value", builtin::INT)?;
        let doubled = value.value::<i64>(0)? * 2;
        let out = io.make_value(builtin::INT, doubled)?;
        io.set_output(DEFAULT_PORT, out);
        Ok(())
    }
}

/// Always fails.
#[derive(Default)]
pub struct Fail;

impl Algorithm for Fail {
    fn run(&mut self, _io: &mut AlgorithmIo<'_>) -> Result<()> {
        Err(viennamesh::ViennaMeshError::algorithm("refusing to mesh"))
    }
}

pub fn register_algorithms(ctx: &Context) {
    ctx.register_algorithm_type::<Echo>("echo").unwrap();
    ctx.register_algorithm_type::<Double>("double").unwrap();
    ctx.register_algorithm_type::<Fail>("fail").unwrap();
}

/// Appends its instance name to a shared log on every run.
pub struct Recorder {
    log: Arc<Mutex<Vec<String>>>,
}

impl Algorithm for Recorder {
    fn run(&mut self, io: &mut AlgorithmIo<'_>) -> Result<()> {
        self.log.lock().push(io.instance_name().to_string());
        Ok(())
    }
}

/// Register `record` and return its run log.
pub fn register_recorder(ctx: &Context) -> Arc<Mutex<Vec<String>>> {
    let log = Arc::new(Mutex::new(Vec::new()));
    let shared = log.clone();
    ctx.register_algorithm("record", move || {
        Box::new(Recorder {
            log: shared.clone(),
        }) as Box<dyn Algorithm>
    })
    .unwrap();
    log
}

/// `echo` instance with a literal int `value`.
pub fn echo_int(name: &str, value: i64) -> AlgorithmDecl {
    AlgorithmDecl::new("echo", name).parameter(ParameterDecl::new(
        "value",
        ParameterType::Int,
        value.to_string(),
    ))
}

/// `double` instance reading `source/default`.
pub fn double_of(name: &str, source: &str) -> AlgorithmDecl {
    AlgorithmDecl::new("double", name).parameter(ParameterDecl::link("value", source, DEFAULT_PORT))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decl_builders() {
        let decl = double_of("B", "A");
        assert_eq!(decl.id, "double");
        assert_eq!(decl.parameters[0].value, "A/default");
        assert_eq!(echo_int("A", 7).parameters[0].value, "7");
    }
}
