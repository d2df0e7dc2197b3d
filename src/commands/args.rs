use serde_json::{Map, Number, Value};

/// Splits command arguments on whitespace while keeping quoted runs together.
///
/// Single and double quotes both group; a quote of the other kind inside a
/// quoted run is kept literally. An unterminated quote is an error.
pub(crate) fn tokenize(input: &str) -> Result<Vec<String>, String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quote: Option<char> = None;
    let mut quoted_empty = false;
    for ch in input.chars() {
        match ch {
            '"' | '\'' => {
                if let Some(q) = in_quote {
                    if q == ch {
                        in_quote = None;
                        quoted_empty = current.is_empty();
                    } else {
                        current.push(ch);
                    }
                } else {
                    in_quote = Some(ch);
                }
            }
            c if c.is_whitespace() && in_quote.is_none() => {
                if !current.is_empty() || quoted_empty {
                    tokens.push(std::mem::take(&mut current));
                }
                quoted_empty = false;
            }
            _ => {
                quoted_empty = false;
                current.push(ch);
            }
        }
    }
    if let Some(q) = in_quote {
        return Err(format!("Unclosed quote ({}) in command arguments.", q));
    }
    if !current.is_empty() || quoted_empty {
        tokens.push(current);
    }
    Ok(tokens)
}

/// Long options recognised after a structured command keyword.
pub(crate) struct OptionSpec {
    pub flag: &'static str,
    pub key: &'static str,
}

pub(crate) struct SplitArgs {
    pub positional: Vec<String>,
    pub options: Vec<(&'static str, String)>,
}

/// Moves `--flag value` and `--flag=value` pairs for the known flags into
/// options. Unknown flags, and a known flag with no value, stay positional.
pub(crate) fn split_options(tokens: Vec<String>, known: &[OptionSpec]) -> SplitArgs {
    let mut positional = Vec::new();
    let mut options = Vec::new();
    let mut iter = tokens.into_iter().peekable();

    while let Some(token) = iter.next() {
        let Some(flag_body) = token.strip_prefix("--") else {
            positional.push(token);
            continue;
        };

        let (name, inline_value) = match flag_body.split_once('=') {
            Some((name, value)) => (name, Some(value.to_string())),
            None => (flag_body, None),
        };

        let Some(spec) = known.iter().find(|spec| spec.flag == name) else {
            positional.push(token);
            continue;
        };

        match inline_value {
            Some(value) => options.push((spec.key, value)),
            None => match iter.next_if(|next| !next.starts_with("--")) {
                Some(value) => options.push((spec.key, value)),
                None => positional.push(token),
            },
        }
    }

    SplitArgs {
        positional,
        options,
    }
}

/// Parses the argument blob of a tool call.
///
/// Accepts a JSON object, a quoted JSON object, or `key=value` pairs. An
/// empty blob is an empty object.
pub(crate) fn parse_call_arguments(input: &str) -> Result<Map<String, Value>, String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(Map::new());
    }

    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return parse_json_object(trimmed);
    }

    let tokens = tokenize(trimmed)?;
    if let [single] = tokens.as_slice() {
        if single.trim_start().starts_with('{') {
            return parse_json_object(single);
        }
    }

    parse_kv_args(&tokens)
}

/// Whether a blob is shaped like tool arguments: JSON (possibly quoted) or
/// at least one `key=value` pair.
pub(crate) fn looks_like_arguments(input: &str) -> bool {
    let trimmed = input.trim().trim_start_matches(['\'', '"']);
    trimmed.starts_with('{') || trimmed.starts_with('[') || trimmed.contains('=')
}

fn parse_json_object(text: &str) -> Result<Map<String, Value>, String> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err("Tool arguments must be a JSON object.".to_string()),
        Err(err) => Err(format!("Invalid JSON arguments: {err}")),
    }
}

fn parse_kv_args(tokens: &[String]) -> Result<Map<String, Value>, String> {
    let mut args = Map::new();
    for token in tokens {
        let Some((key, value)) = token.split_once('=') else {
            return Err(format!(
                "Invalid tool argument '{}'. Use a JSON object or key=value.",
                token
            ));
        };
        let key = key.trim();
        if key.is_empty() {
            return Err("Tool argument name cannot be empty.".to_string());
        }
        args.insert(key.to_string(), coerce_scalar(value));
    }
    Ok(args)
}

/// Interprets a shorthand value as an integer, float, or boolean when it looks
/// like one; anything else stays a string.
pub(crate) fn coerce_scalar(value: &str) -> Value {
    let digits = value.strip_prefix('-').unwrap_or(value);
    if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(int) = value.parse::<i64>() {
            return Value::Number(int.into());
        }
        if let Ok(int) = value.parse::<u64>() {
            return Value::Number(int.into());
        }
    }
    if looks_like_decimal(value) {
        if let Some(number) = value.parse::<f64>().ok().and_then(Number::from_f64) {
            return Value::Number(number);
        }
    }
    if value.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if value.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }
    Value::String(value.to_string())
}

fn looks_like_decimal(value: &str) -> bool {
    let digits = value.strip_prefix('-').unwrap_or(value);
    let Some((whole, fraction)) = digits.split_once('.') else {
        return false;
    };
    !whole.is_empty()
        && !fraction.is_empty()
        && whole.bytes().all(|b| b.is_ascii_digit())
        && fraction.bytes().all(|b| b.is_ascii_digit())
}
