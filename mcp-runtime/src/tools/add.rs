use async_trait::async_trait;
use beacon_core::{HandlerFault, InvocationResult, ToolArguments, response};

use super::{OPERAND_PARAMETERS, Operands};
use crate::registry::ToolHandler;

pub struct Add;

#[async_trait]
impl ToolHandler for Add {
    fn parameters(&self) -> &[&'static str] {
        OPERAND_PARAMETERS
    }

    async fn call(&self, args: ToolArguments) -> Result<InvocationResult, HandlerFault> {
        let Operands { a, b } = args.parse()?;
        let result = a + b;
        if !result.is_finite() {
            return Err(HandlerFault::new(format!("{a} + {b} overflows")));
        }
        Ok(response::structured(
            "Sum",
            [("a", a), ("b", b), ("result", result)],
        ))
    }
}
