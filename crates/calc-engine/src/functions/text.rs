//! Text functions
//!
//! Positions and lengths count characters, not bytes; positions are 1-based.

use super::Args;
use crate::error::{CalcError, CalcResult};
use crate::evaluator::to_number;
use calc_engine_core::Value;
use regex::RegexBuilder;

/// Longest text REPT and the pad functions will build, in characters
const MAX_TEXT_LEN: usize = 1_000_000;

fn count_arg(args: &Args<'_>, index: usize, default: f64, name: &str) -> CalcResult<usize> {
    let n = args.number_or(index, default)?;
    if n < 0.0 {
        return Err(CalcError::Argument(format!("{} requires a non-negative count", name)));
    }
    Ok(n.trunc() as usize)
}

fn check_text_len(len: Option<usize>, name: &str) -> CalcResult<()> {
    match len {
        Some(len) if len <= MAX_TEXT_LEN => Ok(()),
        _ => Err(CalcError::Argument(format!(
            "{} would produce more than {} characters",
            name, MAX_TEXT_LEN
        ))),
    }
}

/// Byte offset of the `n`th character (or the end of the string)
fn char_offset(text: &str, n: usize) -> usize {
    text.char_indices().nth(n).map_or(text.len(), |(i, _)| i)
}

/// LEN function
pub fn fn_len(args: &Args<'_>) -> CalcResult<Value> {
    Ok(Value::from(args.text(0)?.chars().count()))
}

/// LEFT(text[, count]), count defaults to 1
pub fn fn_left(args: &Args<'_>) -> CalcResult<Value> {
    let text = args.text(0)?;
    let n = count_arg(args, 1, 1.0, "LEFT")?;
    Ok(Value::String(text.chars().take(n).collect()))
}

/// RIGHT(text[, count]), count defaults to 1
pub fn fn_right(args: &Args<'_>) -> CalcResult<Value> {
    let text = args.text(0)?;
    let n = count_arg(args, 1, 1.0, "RIGHT")?;
    let len = text.chars().count();
    Ok(Value::String(text.chars().skip(len.saturating_sub(n)).collect()))
}

/// MID(text, start, count)
pub fn fn_mid(args: &Args<'_>) -> CalcResult<Value> {
    let text = args.text(0)?;
    let start = args.number(1)?;
    if start < 1.0 {
        return Err(CalcError::Argument("MID start must be at least 1".into()));
    }
    let n = count_arg(args, 2, 0.0, "MID")?;
    let skip = start.trunc() as usize - 1;
    Ok(Value::String(text.chars().skip(skip).take(n).collect()))
}

pub fn fn_upper(args: &Args<'_>) -> CalcResult<Value> {
    Ok(Value::String(args.text(0)?.to_uppercase()))
}

pub fn fn_lower(args: &Args<'_>) -> CalcResult<Value> {
    Ok(Value::String(args.text(0)?.to_lowercase()))
}

pub fn fn_trim(args: &Args<'_>) -> CalcResult<Value> {
    Ok(Value::String(args.text(0)?.trim().to_string()))
}

/// CONCATENATE function
pub fn fn_concatenate(args: &Args<'_>) -> CalcResult<Value> {
    let mut result = String::new();
    for value in args.eval_all()? {
        result.push_str(&value.as_string());
    }
    Ok(Value::String(result))
}

fn start_arg(args: &Args<'_>, index: usize) -> CalcResult<usize> {
    let start = args.number_or(index, 1.0)?;
    if start < 1.0 {
        return Err(CalcError::Argument("Start position must be at least 1".into()));
    }
    Ok(start.trunc() as usize - 1)
}

/// FIND(find_text, within_text[, start])
///
/// Case-sensitive. Returns the 1-based position, or -1 when not found.
pub fn fn_find(args: &Args<'_>) -> CalcResult<Value> {
    let needle = args.text(0)?;
    let haystack = args.text(1)?;
    let skip = start_arg(args, 2)?;

    let offset = char_offset(&haystack, skip);
    let position = haystack[offset..]
        .find(&needle)
        .map(|byte| skip + haystack[offset..offset + byte].chars().count() + 1);
    Ok(position_value(position))
}

/// SEARCH(find_text, within_text[, start])
///
/// Case-insensitive; `*` matches any run of characters and `?` any single one.
pub fn fn_search(args: &Args<'_>) -> CalcResult<Value> {
    let needle = args.text(0)?;
    let haystack = args.text(1)?;
    let skip = start_arg(args, 2)?;

    let pattern = regex::escape(&needle).replace(r"\*", ".*").replace(r"\?", ".");
    let re = RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| CalcError::Argument(format!("Invalid search pattern: {}", e)))?;

    let offset = char_offset(&haystack, skip);
    let position = re
        .find(&haystack[offset..])
        .map(|m| skip + haystack[offset..offset + m.start()].chars().count() + 1);
    Ok(position_value(position))
}

fn position_value(position: Option<usize>) -> Value {
    match position {
        Some(p) => Value::from(p),
        None => Value::Number(-1.0),
    }
}

/// SUBSTITUTE(text, old, new[, instance])
///
/// Case-sensitive. With `instance`, only that occurrence is replaced.
pub fn fn_substitute(args: &Args<'_>) -> CalcResult<Value> {
    let text = args.text(0)?;
    let old = args.text(1)?;
    let new = args.text(2)?;
    if old.is_empty() {
        return Ok(Value::String(text));
    }

    let Some(instance) = args.eval_opt(3)? else {
        return Ok(Value::String(text.replace(&old, &new)));
    };
    let instance = to_number(&instance)?;
    if instance < 1.0 {
        return Err(CalcError::Argument("SUBSTITUTE instance must be at least 1".into()));
    }

    let nth = instance.trunc() as usize - 1;
    match text.match_indices(&old).nth(nth) {
        Some((at, _)) => {
            let mut result = String::with_capacity(text.len());
            result.push_str(&text[..at]);
            result.push_str(&new);
            result.push_str(&text[at + old.len()..]);
            Ok(Value::String(result))
        }
        None => Ok(Value::String(text)),
    }
}

/// REPT(text, count)
pub fn fn_rept(args: &Args<'_>) -> CalcResult<Value> {
    let text = args.text(0)?;
    let n = count_arg(args, 1, 0.0, "REPT")?;
    check_text_len(text.chars().count().checked_mul(n), "REPT")?;
    Ok(Value::String(text.repeat(n)))
}

/// CHAR(code)
pub fn fn_char(args: &Args<'_>) -> CalcResult<Value> {
    let code = args.number(0)?;
    char::from_u32(code.trunc() as u32)
        .filter(|_| code >= 0.0)
        .map(|c| Value::String(c.to_string()))
        .ok_or_else(|| CalcError::Argument(format!("Invalid character code: {}", code)))
}

/// VALUE(text)
pub fn fn_value(args: &Args<'_>) -> CalcResult<Value> {
    match args.eval(0)? {
        value @ (Value::Number(_) | Value::Decimal(_)) => Ok(value),
        other => Ok(Value::Number(to_number(&other)?)),
    }
}

fn pad(args: &Args<'_>, left: bool) -> CalcResult<Value> {
    let text = args.text(0)?;
    let name = if left { "PadLeft" } else { "PadRight" };
    let width = count_arg(args, 1, 0.0, name)?;
    check_text_len(Some(width), name)?;
    let fill = match args.eval_opt(2)? {
        Some(value) => value.as_string().chars().next().unwrap_or(' '),
        None => ' ',
    };

    let len = text.chars().count();
    if len >= width {
        return Ok(Value::String(text));
    }
    let padding: String = std::iter::repeat(fill).take(width - len).collect();
    Ok(Value::String(if left { padding + &text } else { text + &padding }))
}

/// PadLeft(value, width[, fill])
pub fn fn_pad_left(args: &Args<'_>) -> CalcResult<Value> {
    pad(args, true)
}

/// PadRight(value, width[, fill])
pub fn fn_pad_right(args: &Args<'_>) -> CalcResult<Value> {
    pad(args, false)
}
