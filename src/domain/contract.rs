//! Declared workflow contract: input slots, output ports, exit codes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::exit_code::ExitCode;
use super::snapshot::slots;

/// Workflow kind of the base restart workflow
pub const BASE_WORKFLOW_KIND: &str = "siesta.base";

/// Type constraint on an input slot's value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    /// Any JSON object
    Mapping,
    String,
    Bool,
    Integer,
    /// No constraint
    Any,
}

impl ValueKind {
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            ValueKind::Mapping => value.is_object(),
            ValueKind::String => value.is_string(),
            ValueKind::Bool => value.is_boolean(),
            ValueKind::Integer => value.is_i64() || value.is_u64(),
            ValueKind::Any => true,
        }
    }
}

/// A named input slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSlot {
    pub name: String,
    pub required: bool,
    pub kind: ValueKind,
}

/// A named output port
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputPort {
    pub name: String,
    pub required: bool,
}

impl OutputPort {
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: true,
        }
    }

    pub fn optional(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: false,
        }
    }
}

/// What a workflow kind exposes to its callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowContract {
    pub kind: String,
    pub inputs: Vec<InputSlot>,
    pub outputs: Vec<OutputPort>,
    pub exit_codes: Vec<ExitCode>,
}

impl WorkflowContract {
    /// Empty contract for `kind` with the built-in exit codes.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            exit_codes: ExitCode::builtins(),
        }
    }

    pub fn with_input(mut self, name: &str, required: bool, kind: ValueKind) -> Self {
        self.inputs.push(InputSlot {
            name: name.to_string(),
            required,
            kind,
        });
        self
    }

    pub fn with_output(mut self, port: OutputPort) -> Self {
        self.outputs.push(port);
        self
    }

    /// Contract of the base restart workflow.
    pub fn siesta_base() -> Self {
        Self::new(BASE_WORKFLOW_KIND)
            .with_input(slots::STRUCTURE, true, ValueKind::Any)
            .with_input(slots::OPTIONS, true, ValueKind::Mapping)
            .with_input(slots::PARAMETERS, false, ValueKind::Mapping)
            .with_input(slots::KPOINTS, false, ValueKind::Any)
            .with_input(slots::BANDSKPOINTS, false, ValueKind::Any)
            .with_input(slots::BASIS, false, ValueKind::Mapping)
            .with_input(slots::SETTINGS, false, ValueKind::Mapping)
            .with_input(slots::PSEUDOS, false, ValueKind::Any)
            .with_input("pseudo_family", false, ValueKind::String)
            .with_input(slots::PARENT_FOLDER, false, ValueKind::Any)
            .with_input(slots::PROTOCOL, false, ValueKind::String)
            .with_input(slots::RELAX, false, ValueKind::Bool)
            .with_input(slots::AUTOBANDS, false, ValueKind::Bool)
            .with_input("max_iterations", false, ValueKind::Integer)
            .with_input("clean_workdir", false, ValueKind::Bool)
            .with_output(OutputPort::optional("forces_and_stress"))
            .with_output(OutputPort::optional("bands"))
            .with_output(OutputPort::optional("output_structure"))
            .with_output(OutputPort::required("output_parameters"))
            .with_output(OutputPort::required("remote_folder"))
    }

    pub fn input(&self, name: &str) -> Option<&InputSlot> {
        self.inputs.iter().find(|slot| slot.name == name)
    }

    pub fn required_outputs(&self) -> impl Iterator<Item = &OutputPort> {
        self.outputs.iter().filter(|port| port.required)
    }

    /// Look up a declared exit code by status.
    pub fn exit_code(&self, status: u32) -> Option<&ExitCode> {
        self.exit_codes.iter().find(|code| code.status() == status)
    }
}
