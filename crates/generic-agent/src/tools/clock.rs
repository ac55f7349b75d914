//! Clock example tool.

use agent_core::FnTool;
use chrono::{Local, NaiveTime, Timelike};

pub const NAME: &str = "get_time";

pub fn time_report(time: NaiveTime) -> String {
    format!(
        "The current time is {:02}:{:02}:{:02}",
        time.hour(),
        time.minute(),
        time.second()
    )
}

/// `get_time()` as a function tool, reading the local clock
pub fn get_time() -> FnTool {
    FnTool::new(NAME, "Get the current local time", |_| Ok(time_report(Local::now().time())))
        .with_category("time")
}
