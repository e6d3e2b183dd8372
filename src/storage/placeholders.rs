//! Positional placeholder rewriting
//!
//! Callers write `?` placeholders regardless of backend. MySQL accepts them natively;
//! Postgres needs `$1, $2, ...`, so statements bound for Postgres pass through
//! [`to_numbered`] first.
//!
//! The `??` escape exists for Postgres operators spelled with `?` (`jsonb ? 'key'`).
//! MySQL has no such operator, so there every `?` outside a literal is a placeholder
//! and statements are sent unchanged.

use std::borrow::Cow;

use super::backend::Backend;

/// SQL text as the given backend's driver expects it for a prepared statement
pub fn for_backend(backend: Backend, sql: &str) -> Cow<'_, str> {
    match backend {
        Backend::Postgres => to_numbered(sql),
        Backend::MySql => Cow::Borrowed(sql),
    }
}

/// Rewrite `?` placeholders into `$n` form.
///
/// - `?` inside single-quoted strings, double-quoted identifiers, dollar-quoted bodies,
///   `--` line comments and `/* */` block comments is left alone.
/// - `??` is an escaped literal `?` (for Postgres JSON operators) and becomes a single `?`.
/// - Statements that already use `$n` placeholders outside literals and comments are
///   returned unchanged.
pub fn to_numbered(sql: &str) -> Cow<'_, str> {
    if !sql.contains('?') {
        return Cow::Borrowed(sql);
    }

    let mut out = String::with_capacity(sql.len() + 8);
    let mut index = 0usize;
    let mut chars = sql.char_indices().peekable();

    while let Some((pos, c)) = chars.next() {
        match c {
            '\'' | '"' => {
                let end = find_closing_quote(sql, pos, c);
                out.push_str(&sql[pos..end]);
                skip_to(&mut chars, end);
            }
            '-' if sql[pos..].starts_with("--") => {
                let end = sql[pos..].find('\n').map_or(sql.len(), |n| pos + n);
                out.push_str(&sql[pos..end]);
                skip_to(&mut chars, end);
            }
            '/' if sql[pos..].starts_with("/*") => {
                let end = sql[pos + 2..].find("*/").map_or(sql.len(), |n| pos + 2 + n + 2);
                out.push_str(&sql[pos..end]);
                skip_to(&mut chars, end);
            }
            '$' => match dollar_quote_end(sql, pos) {
                Some(end) => {
                    out.push_str(&sql[pos..end]);
                    skip_to(&mut chars, end);
                }
                None if matches!(chars.peek(), Some((_, d)) if d.is_ascii_digit()) => {
                    return Cow::Borrowed(sql);
                }
                None => out.push('$'),
            },
            '?' => {
                if matches!(chars.peek(), Some((_, '?'))) {
                    chars.next();
                    out.push('?');
                } else {
                    index += 1;
                    out.push('$');
                    out.push_str(&index.to_string());
                }
            }
            _ => out.push(c),
        }
    }

    Cow::Owned(out)
}

fn skip_to<I>(chars: &mut std::iter::Peekable<I>, end: usize)
where
    I: Iterator<Item = (usize, char)>,
{
    while let Some((pos, _)) = chars.peek() {
        if *pos >= end {
            break;
        }
        chars.next();
    }
}

/// Byte offset just past the quote closing the literal opened at `start`.
/// A doubled quote inside the literal is an escaped quote.
fn find_closing_quote(sql: &str, start: usize, quote: char) -> usize {
    let bytes = sql.as_bytes();
    let q = quote as u8;
    let mut i = start + 1;
    while i < bytes.len() {
        if bytes[i] == q {
            if bytes.get(i + 1) == Some(&q) {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    sql.len()
}

/// If a dollar-quoted body (`$$...$$` or `$tag$...$tag$`) starts at `start`, the byte
/// offset just past its closing delimiter.
fn dollar_quote_end(sql: &str, start: usize) -> Option<usize> {
    let rest = &sql[start + 1..];
    let tag_len = rest.find('$')?;
    let tag = &rest[..tag_len];
    if !tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') || tag.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    let delimiter = &sql[start..start + tag_len + 2];
    let body_start = start + delimiter.len();
    let close = sql[body_start..].find(delimiter)?;
    Some(body_start + close + delimiter.len())
}
