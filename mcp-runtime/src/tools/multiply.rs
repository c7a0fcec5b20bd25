use async_trait::async_trait;
use beacon_core::{HandlerFault, InvocationResult, ToolArguments, response};

use super::{OPERAND_PARAMETERS, Operands};
use crate::registry::ToolHandler;

pub struct Multiply;

#[async_trait]
impl ToolHandler for Multiply {
    fn parameters(&self) -> &[&'static str] {
        OPERAND_PARAMETERS
    }

    async fn call(&self, args: ToolArguments) -> Result<InvocationResult, HandlerFault> {
        let Operands { a, b } = args.parse()?;
        let result = a * b;
        if !result.is_finite() {
            return Err(HandlerFault::new(format!("{a} * {b} overflows")));
        }
        Ok(response::structured(
            "Product",
            [("a", a), ("b", b), ("result", result)],
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn multiplies_operands() {
        let args = crate::tools::operand_schema()
            .validate(&json!({ "a": 4, "b": 2.5 }))
            .unwrap();
        let result = Multiply.call(args).await.unwrap();
        assert_eq!(
            result.rendered_text(),
            "## Product\n\n- **a:** 4\n- **b:** 2.5\n- **result:** 10"
        );
    }

    #[tokio::test]
    async fn multiplying_by_zero() {
        let args = crate::tools::operand_schema()
            .validate(&json!({ "a": 0, "b": 9 }))
            .unwrap();
        let result = Multiply.call(args).await.unwrap();
        assert!(result.rendered_text().ends_with("- **result:** 0"));
    }
}
