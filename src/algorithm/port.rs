//! Port descriptors for algorithms.
//!
//! An algorithm may declare its ports via a static `PortDescriptor` array.
//! Declarations are optional: undeclared algorithms accept any port name.
//! When present, the pipeline builder warns about parameters that bind to
//! undeclared inputs and instances refuse to run while a required input is
//! unresolved.

/// Whether a port is an input or output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortDirection {
    Input,
    Output,
}

/// Static descriptor for an algorithm's port.
#[derive(Debug, Clone, Copy)]
pub struct PortDescriptor {
    pub name: &'static str,
    pub direction: PortDirection,
    /// Preferred data type, if the algorithm has one.
    pub type_name: Option<&'static str>,
    pub required: bool,
}

impl PortDescriptor {
    /// Optional input.
    pub const fn input(name: &'static str) -> Self {
        Self {
            name,
            direction: PortDirection::Input,
            type_name: None,
            required: false,
        }
    }

    /// Input the algorithm cannot run without.
    pub const fn required(name: &'static str) -> Self {
        Self {
            name,
            direction: PortDirection::Input,
            type_name: None,
            required: true,
        }
    }

    pub const fn output(name: &'static str) -> Self {
        Self {
            name,
            direction: PortDirection::Output,
            type_name: None,
            required: false,
        }
    }

    pub const fn typed(mut self, type_name: &'static str) -> Self {
        self.type_name = Some(type_name);
        self
    }

    pub fn is_input(&self) -> bool {
        self.direction == PortDirection::Input
    }
}
