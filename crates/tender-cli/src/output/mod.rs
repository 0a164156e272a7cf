use serde::Serialize;

use crate::cli::OutputFormat;

/// Render a serializable response to a string in the requested format.
pub fn render<T: Serialize>(value: &T, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(value)?),
        OutputFormat::Raw => Ok(serde_json::to_string(value)?),
    }
}

/// Print a serializable response in the requested format.
pub fn output<T: Serialize>(value: &T, format: OutputFormat) -> anyhow::Result<()> {
    let rendered = render(value, format)?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::render;
    use crate::cli::OutputFormat;

    #[test]
    fn raw_is_single_line() {
        let value = json!({"offer_id": "off-1", "alerts_created": 2});
        let raw = render(&value, OutputFormat::Raw).expect("render");
        assert!(!raw.contains('\n'));
        let parsed: serde_json::Value = serde_json::from_str(&raw).expect("parse");
        assert_eq!(parsed, value);
    }

    #[test]
    fn json_is_pretty() {
        let value = json!({"open": 1});
        let pretty = render(&value, OutputFormat::Json).expect("render");
        assert_eq!(pretty, "{\n  \"open\": 1\n}");
    }
}
