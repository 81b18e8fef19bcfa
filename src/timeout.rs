use crate::ExecErr;
use log::warn;
use serde_json::Value;

/// Timeout used whenever the supplied option is unusable, in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 7500;

/// Raw timeout option as it reaches the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum TimeoutOption {
    Absent,
    Text(String),
    Number(serde_json::Number),
    /// Any other JSON shape, named by its kind (`object`, `array`, `boolean`).
    Unsupported(&'static str),
}

impl From<&Value> for TimeoutOption {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => TimeoutOption::Absent,
            Value::String(text) => TimeoutOption::Text(text.clone()),
            Value::Number(num) => TimeoutOption::Number(num.clone()),
            Value::Bool(_) => TimeoutOption::Unsupported("boolean"),
            Value::Array(_) => TimeoutOption::Unsupported("array"),
            Value::Object(_) => TimeoutOption::Unsupported("object"),
        }
    }
}

impl std::fmt::Display for TimeoutOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeoutOption::Absent => write!(f, "undefined"),
            TimeoutOption::Text(text) => write!(f, "{:?}", text),
            TimeoutOption::Number(num) => write!(f, "{}", num),
            TimeoutOption::Unsupported(kind) => write!(f, "<{}>", kind),
        }
    }
}

/// Conversion of the option into milliseconds.
///
/// Text is read as a base-10 integer from its leading digits, so `"3000ms"`
/// gives 3000. Text without leading digits, negative values and fractional
/// numbers are errors.
pub fn try_resolve_timeout(option: &TimeoutOption) -> Result<u64, ExecErr> {
    match option {
        TimeoutOption::Absent => Err(ExecErr::InvalidTimeout(
            "The option Timeout is undefined.".into(),
        )),
        TimeoutOption::Text(text) => parse_leading_decimal(text).map_err(|reason| {
            ExecErr::InvalidTimeout(format!(
                "The option Timeout {:?} is not a decimal: {}",
                text, reason
            ))
        }),
        TimeoutOption::Number(num) => num.as_u64().ok_or_else(|| {
            ExecErr::InvalidTimeout(format!(
                "The option Timeout {} is not a non-negative whole number.",
                num
            ))
        }),
        TimeoutOption::Unsupported(kind) => Err(ExecErr::InvalidTimeout(format!(
            "The option Timeout is invalid.\ntypeof: {}",
            kind
        ))),
    }
}

fn parse_leading_decimal(text: &str) -> Result<u64, String> {
    let text = text.trim_start();
    let text = text.strip_prefix('+').unwrap_or(text);
    let digits_len = text.bytes().take_while(|b| b.is_ascii_digit()).count();

    if digits_len == 0 {
        return Err("no leading digits".into());
    }

    text[..digits_len].parse::<u64>().map_err(|err| err.to_string())
}

/// Lenient conversion: an unusable option is logged and replaced with
/// [DEFAULT_TIMEOUT_MS].
pub fn resolve_timeout(option: &TimeoutOption) -> u64 {
    match try_resolve_timeout(option) {
        Ok(timeout) => timeout,
        Err(err) => {
            warn!(
                "Failed to parse {} as a decimal, using {}ms.\n{}",
                option, DEFAULT_TIMEOUT_MS, err
            );
            DEFAULT_TIMEOUT_MS
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_and_numbers_are_used_as_given() {
        assert_eq!(resolve_timeout(&TimeoutOption::Text("5000".into())), 5000);
        assert_eq!(resolve_timeout(&TimeoutOption::Text(" 0 ".into())), 0);
        assert_eq!(resolve_timeout(&TimeoutOption::Text("3000ms".into())), 3000);
        assert_eq!(resolve_timeout(&TimeoutOption::Text("+250".into())), 250);
        assert_eq!(resolve_timeout(&TimeoutOption::from(&json!(5000))), 5000);
    }

    #[test]
    fn unusable_options_fall_back_to_default() {
        let cases = [
            TimeoutOption::Absent,
            TimeoutOption::from(&json!({})),
            TimeoutOption::from(&json!([1])),
            TimeoutOption::from(&json!(true)),
            TimeoutOption::from(&json!(-5)),
            TimeoutOption::from(&json!(12.5)),
            TimeoutOption::Text("soon".into()),
            TimeoutOption::Text("-1".into()),
            TimeoutOption::Text("".into()),
            TimeoutOption::Text("99999999999999999999999".into()),
        ];

        for option in cases {
            assert!(matches!(
                try_resolve_timeout(&option),
                Err(ExecErr::InvalidTimeout(_))
            ));
            assert_eq!(resolve_timeout(&option), DEFAULT_TIMEOUT_MS);
        }
    }

    #[test]
    fn json_shapes_map_to_variants() {
        assert_eq!(TimeoutOption::from(&Value::Null), TimeoutOption::Absent);
        assert_eq!(
            TimeoutOption::from(&json!("3000")),
            TimeoutOption::Text("3000".into())
        );
        assert_eq!(
            TimeoutOption::from(&json!({})),
            TimeoutOption::Unsupported("object")
        );
    }
}
