//! Minimal plugin: one data type and one algorithm.

use viennamesh::data::builtin;
use viennamesh::plugin::PluginRegistrar;
use viennamesh::{Algorithm, AlgorithmIo, Result, DEFAULT_PORT};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tally(pub u32);

/// Outputs the int 7.
#[derive(Default)]
struct Seven;

impl Algorithm for Seven {
    fn run(&mut self, io: &mut AlgorithmIo<'_>) -> Result<()> {
        let out = io.make_value(builtin::INT, 7_i64)?;
        io.set_output(DEFAULT_PORT, out);
        Ok(())
    }
}

fn register(registrar: &mut PluginRegistrar) {
    registrar
        .register_type::<Tally>("demo_tally")
        .register_algorithm_type::<Seven>("demo_seven");
}

viennamesh::declare_plugin!(register);
