//! Built-in arithmetic tools.

use beacon_core::{FieldSpec, InputSchema};
use serde::Deserialize;

use crate::registry::ToolDescriptor;

mod add;
mod multiply;

pub use add::Add;
pub use multiply::Multiply;

const OPERAND_PARAMETERS: &[&str] = &["a", "b"];

#[derive(Debug, Clone, Copy, Deserialize)]
struct Operands {
    a: f64,
    b: f64,
}

fn operand_schema() -> InputSchema {
    InputSchema::new()
        .field(FieldSpec::number("a", "First number"))
        .field(FieldSpec::number("b", "Second number"))
}

pub fn all() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor::new("add", "Add two numbers", operand_schema(), Add),
        ToolDescriptor::new(
            "multiply",
            "Multiply two numbers",
            operand_schema(),
            Multiply,
        ),
    ]
}
