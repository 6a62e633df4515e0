//! Query rewriter
//!
//! Rebuilds a report's SELECT statement so that it references every dimension
//! of the target table exactly once while keeping the report's original
//! filter. Works on the narrow SQL shape the warehouse emits for reports:
//! a single-level `SELECT <list> FROM <table> [WHERE ...] [GROUP BY ...]`
//! with uppercase keywords and `table."column"` references, where the only
//! recognized aggregate wrappers are `AVG(...)` and `COUNT(...)`. Anything
//! outside that shape is rejected rather than guessed at; this is not a SQL
//! parser and must not grow into one.

use std::collections::HashSet;

use crate::models::TableInfo;
use crate::utils::{ApiError, ApiResult};

/// Aggregate wrappers the rewriter knows how to unwrap
const AGGREGATE_FUNCTIONS: [&str; 2] = ["AVG", "COUNT"];

/// SELECT-list dimensions already present in the incoming query.
#[derive(Debug, Default)]
pub struct ExistingDimensions {
    /// Lowercased table-qualified names, for catalog diffing
    pub names: HashSet<String>,
    /// Display tokens in original order, aggregates unwrapped
    pub tokens: Vec<String>,
}

/// Raw SELECT-list tokens: the text between the first `SELECT` and the first
/// `FROM`, split on commas. Token whitespace is preserved so that rejoining
/// reproduces the original list.
pub fn extract_select_list(sql: &str) -> ApiResult<Vec<String>> {
    let start = sql
        .find("SELECT")
        .map(|idx| idx + "SELECT".len())
        .ok_or_else(|| ApiError::unsupported_sql("query has no SELECT clause"))?;
    let end = sql
        .find("FROM")
        .filter(|&idx| idx >= start)
        .ok_or_else(|| ApiError::unsupported_sql("query has no FROM clause"))?;

    Ok(sql[start..end].trim().split(',').map(str::to_string).collect())
}

/// Normalize one SELECT-list token into `(normalized_name, display_token)`.
///
/// For `AVG(...)`/`COUNT(...)` wrappers the function call syntax is stripped
/// and the unwrapped text (argument plus anything after the close paren, so
/// aliases survive) becomes the display token. Plain tokens keep their
/// original text. The normalized name is the `table."column"` reference up to
/// the `AS` keyword, compared case-insensitively against the table qualifier.
pub fn normalize_token(token: &str, table_name: &str) -> ApiResult<(String, String)> {
    for func in AGGREGATE_FUNCTIONS {
        // Dispatch on the call form, not the bare keyword: a column named
        // COUNTRY or AVG_PRICE is a plain token, not an aggregate.
        if token.contains(&format!("{func}(")) {
            let display = unwrap_aggregate(token, func)?;
            let name = qualified_name(&display, table_name)?;
            return Ok((name, display));
        }
    }

    let name = qualified_name(token, table_name)?;
    Ok((name, token.to_string()))
}

/// Strip a single `FUNC(arg)` layer: the substring between the paren that
/// follows the keyword and the last close paren, concatenated with the tail
/// after that paren. Nested calls are out of contract and rejected.
fn unwrap_aggregate(token: &str, func: &str) -> ApiResult<String> {
    let call = format!("{func}(");
    let open = token
        .find(&call)
        .ok_or_else(|| ApiError::unsupported_sql(token.trim()))?;
    let inner_start = open + call.len();
    let close = token
        .rfind(')')
        .filter(|&idx| idx >= inner_start)
        .ok_or_else(|| ApiError::unsupported_sql(token.trim()))?;

    let inner = &token[inner_start..close];
    let tail = &token[close + 1..];
    if inner.contains('(') || tail.contains('(') {
        return Err(ApiError::unsupported_sql(token.trim()));
    }

    Ok(format!("{inner}{tail}"))
}

/// Extract the `table."column"` reference from a token, stopping before the
/// `AS` alias keyword when present. The table qualifier is matched
/// ASCII-case-insensitively (byte-length preserving, so the index found in
/// the lowered text is valid in the original); a token without a qualifier
/// is unsupported.
fn qualified_name(text: &str, table_name: &str) -> ApiResult<String> {
    let qualifier = format!("{}.\"", table_name.to_ascii_lowercase());
    let start = text
        .to_ascii_lowercase()
        .find(&qualifier)
        .ok_or_else(|| ApiError::unsupported_sql(text.trim()))?;

    let reference = &text[start..];
    let name = match reference.find(" AS ") {
        Some(alias) => &reference[..alias],
        None => reference,
    };
    Ok(name.trim().to_string())
}

/// Scan the incoming SQL's SELECT list into the existing-dimension set.
pub fn parse_existing_dimensions(sql: &str, table_name: &str) -> ApiResult<ExistingDimensions> {
    let mut existing = ExistingDimensions::default();
    for token in extract_select_list(sql)? {
        let (name, display) = normalize_token(&token, table_name)?;
        existing.names.insert(name.to_lowercase());
        existing.tokens.push(display);
    }
    Ok(existing)
}

/// Catalog dimensions not already present in the SELECT list, in catalog
/// order. Comparison is case-insensitive on the qualified name.
pub fn diff_catalog(catalog: &[String], existing: &HashSet<String>) -> Vec<String> {
    catalog
        .iter()
        .filter(|dimension| !existing.contains(&dimension.to_lowercase()))
        .cloned()
        .collect()
}

/// The original filter: first `WHERE` through the first `GROUP BY`
/// (exclusive) when one exists, otherwise through end of string. Empty when
/// the query has no filter; callers must tolerate that.
pub fn extract_filter_clause(sql: &str) -> String {
    let Some(start) = sql.find("WHERE") else {
        return String::new();
    };
    let clause = match sql.find("GROUP BY") {
        Some(end) if end > start => &sql[start..end],
        _ => &sql[start..],
    };
    clause.trim().to_string()
}

/// Assemble the base query: missing catalog dimensions first (catalog
/// order), then the original tokens, fully qualified to the target table.
pub fn build(
    table: &TableInfo,
    missing: &[String],
    existing_tokens: &[String],
    filter: &str,
) -> String {
    let select_list: Vec<String> = missing.iter().chain(existing_tokens).cloned().collect();
    format!(
        "SELECT {} FROM {} {}",
        select_list.join(","),
        table.fully_qualified_name(),
        filter
    )
    .trim()
    .to_string()
}

/// Full rewrite: parse the SELECT list, diff it against the table's
/// dimension catalog and reassemble with the original filter.
pub fn rewrite(sql: &str, table: &TableInfo, catalog: &[String]) -> ApiResult<String> {
    let existing = parse_existing_dimensions(sql, &table.sql_qualifier())?;
    let missing = diff_catalog(catalog, &existing.names);
    let filter = extract_filter_clause(sql);
    Ok(build(table, &missing, &existing.tokens, &filter))
}
