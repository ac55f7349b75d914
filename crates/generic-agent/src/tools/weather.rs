//! Weather lookup example tool. Always reports pleasant weather.

use agent_core::{FnTool, ParameterSchema};

pub const NAME: &str = "get_weather";

pub fn weather_report(city: &str) -> String {
    format!("The weather in {city} is sunny and pleasant.")
}

/// `get_weather(city)` as a function tool
pub fn get_weather() -> FnTool {
    FnTool::new(NAME, "Get the weather for a city", |call| Ok(weather_report(call.str_arg("city")?)))
        .with_param(ParameterSchema::required_string("city", "Name of the city"))
        .with_category("weather")
}
