//! Example Tools
//!
//! Weather lookup, calculator and clock, plus name-based lookup for presets.

mod calculator;
mod clock;
mod weather;

use std::sync::Arc;

use agent_core::Tool;

pub use calculator::{CalcError, CalculatorTool, NAME as CALCULATE, evaluate, format_number};
pub use clock::{NAME as GET_TIME, get_time};
pub use weather::{NAME as GET_WEATHER, get_weather};

/// Names of the bundled tools
pub const BUILTIN_TOOL_NAMES: [&str; 3] = [GET_WEATHER, CALCULATE, GET_TIME];

/// Look up a bundled tool by name
pub fn builtin_tool(name: &str) -> Option<Arc<dyn Tool>> {
    match name {
        GET_WEATHER => Some(Arc::new(get_weather())),
        CALCULATE => Some(Arc::new(CalculatorTool)),
        GET_TIME => Some(Arc::new(get_time())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_names_resolve_to_matching_schema() {
        for name in BUILTIN_TOOL_NAMES {
            let tool = builtin_tool(name).unwrap();
            assert_eq!(tool.schema().name, name);
        }
        assert!(builtin_tool("send_email").is_none());
    }
}
