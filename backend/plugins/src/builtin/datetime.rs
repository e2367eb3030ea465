//! `datetime`: resolve natural-language dates ("tomorrow", "3 weeks ago",
//! "next friday", "2024-05-01") to an exact RFC 3339 timestamp.

use async_trait::async_trait;
use chrono::{
    DateTime, Datelike, Duration, FixedOffset, Local, Months, NaiveDate, NaiveDateTime,
    SecondsFormat, TimeZone, Weekday,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::error::PluginError;
use crate::sdk::{CallableSchema, Plugin, PluginContext};

const ID: &str = "datetime";

static RELATIVE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<in>in\s+)?(?P<n>a|an|\d{1,6})\s+(?P<unit>second|sec|minute|min|hour|day|week|fortnight|month|year)s?(?:\s+(?P<dir>from now|later|hence|ago|before now))?$",
    )
    .expect("relative date pattern is valid")
});

static NEXT_LAST_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<dir>next|last)\s+(?P<what>\w+)$").expect("next/last pattern is valid")
});

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d %B %Y",
    "%d %b %Y",
    "%B %d, %Y",
    "%B %d %Y",
    "%b %d, %Y",
    "%b %d %Y",
];

type Clock = fn() -> DateTime<FixedOffset>;

fn local_now() -> DateTime<FixedOffset> {
    Local::now().fixed_offset()
}

pub struct DateTimePlugin {
    clock: Clock,
}

impl DateTimePlugin {
    pub fn new() -> Self {
        Self { clock: local_now }
    }

    /// Use a fixed reference time instead of the system clock.
    pub fn with_clock(clock: Clock) -> Self {
        Self { clock }
    }
}

impl Default for DateTimePlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Plugin for DateTimePlugin {
    async fn init(&mut self, _ctx: &PluginContext) -> Result<(), PluginError> {
        info!(plugin = ID, "DateTime plugin initialized");
        Ok(())
    }

    fn id(&self) -> &str {
        ID
    }

    fn description(&self) -> &str {
        "parse date and time from natural language input."
    }

    fn schema(&self) -> CallableSchema {
        CallableSchema {
            name: ID.to_string(),
            description: "Parse date and time from natural language input such as 'now', \
                'tomorrow', 'yesterday', '1 month from now', etc. and return the exact date."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "input": {
                        "type": "string",
                        "description": "The natural language date/time input to parse."
                    }
                },
                "required": ["input"]
            }),
        }
    }

    async fn execute(&self, arguments: &str) -> Result<String, PluginError> {
        let args: Value = serde_json::from_str(arguments)
            .map_err(|e| PluginError::InvalidArguments(e.to_string()))?;
        let input = args
            .get("input")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                PluginError::InvalidArguments("input is required but was not provided".into())
            })?;

        let parsed = parse_datetime(input, (self.clock)()).map_err(PluginError::Execution)?;
        debug!(plugin = ID, input, "Parsed date/time");
        Ok(parsed.to_rfc3339_opts(SecondsFormat::Secs, true))
    }
}

/// Resolve `input` relative to `now`. Dates without an offset take `now`'s offset.
pub fn parse_datetime(
    input: &str,
    now: DateTime<FixedOffset>,
) -> Result<DateTime<FixedOffset>, String> {
    let trimmed = input.trim();
    let lowered = trimmed.to_lowercase();

    match lowered.as_str() {
        "now" | "right now" | "today" => return Ok(now),
        "tomorrow" => return Ok(now + Duration::days(1)),
        "yesterday" => return Ok(now - Duration::days(1)),
        _ => {}
    }

    if let Some(caps) = RELATIVE_RE.captures(&lowered) {
        let forward = match caps.name("dir").map(|m| m.as_str()) {
            Some("ago") | Some("before now") => false,
            Some(_) => true,
            None if caps.name("in").is_some() => true,
            None => return Err(format!("ambiguous relative date '{trimmed}'")),
        };
        let amount = match &caps["n"] {
            "a" | "an" => 1,
            n => n.parse::<i64>().map_err(|e| e.to_string())?,
        };
        return shift(now, amount, &caps["unit"], forward)
            .ok_or_else(|| format!("date '{trimmed}' is out of range"));
    }

    if let Some(caps) = NEXT_LAST_RE.captures(&lowered) {
        let forward = &caps["dir"] == "next";
        let what = &caps["what"];
        if let Ok(weekday) = what.parse::<Weekday>() {
            return Ok(nearest_weekday(now, weekday, forward));
        }
        if matches!(what, "week" | "month" | "year") {
            return shift(now, 1, what, forward)
                .ok_or_else(|| format!("date '{trimmed}' is out of range"));
        }
    }

    parse_absolute(trimmed, now).ok_or_else(|| format!("could not parse date/time '{trimmed}'"))
}

fn shift(
    now: DateTime<FixedOffset>,
    amount: i64,
    unit: &str,
    forward: bool,
) -> Option<DateTime<FixedOffset>> {
    let sign = if forward { 1 } else { -1 };
    let delta = match unit {
        "second" | "sec" => Duration::seconds(amount),
        "minute" | "min" => Duration::minutes(amount),
        "hour" => Duration::hours(amount),
        "day" => Duration::days(amount),
        "week" => Duration::weeks(amount),
        "fortnight" => Duration::weeks(amount * 2),
        "month" | "year" => {
            let months = if unit == "year" { amount * 12 } else { amount };
            let months = Months::new(u32::try_from(months).ok()?);
            return if forward {
                now.checked_add_months(months)
            } else {
                now.checked_sub_months(months)
            };
        }
        _ => return None,
    };
    now.checked_add_signed(delta * sign)
}

fn nearest_weekday(now: DateTime<FixedOffset>, target: Weekday, forward: bool) -> DateTime<FixedOffset> {
    let today = i64::from(now.weekday().num_days_from_monday());
    let target = i64::from(target.num_days_from_monday());
    let days = if forward {
        let d = (target - today).rem_euclid(7);
        if d == 0 { 7 } else { d }
    } else {
        let d = (today - target).rem_euclid(7);
        -(if d == 0 { 7 } else { d })
    };
    now + Duration::days(days)
}

fn parse_absolute(input: &str, now: DateTime<FixedOffset>) -> Option<DateTime<FixedOffset>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt);
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(input) {
        return Some(dt);
    }

    let offset = *now.offset();
    for fmt in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, fmt) {
            return offset.from_local_datetime(&naive).single();
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(input, fmt) {
            let naive = date.and_hms_opt(0, 0, 0)?;
            return offset.from_local_datetime(&naive).single();
        }
    }
    None
}
