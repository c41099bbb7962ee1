//! Best-effort table name extraction
//!
//! Not a SQL parser: the table is the token following the first `UPDATE`,
//! `INTO` or `FROM` keyword (case-insensitive). Quotes and a trailing
//! column list or semicolon are stripped.

const TABLE_KEYWORDS: [&str; 3] = ["UPDATE", "INTO", "FROM"];

/// Table targeted by `statement`, if one can be found
pub fn table_from_statement(statement: &str) -> Option<String> {
    let mut tokens = statement.split_whitespace();
    while let Some(token) = tokens.next() {
        if TABLE_KEYWORDS.iter().any(|k| token.eq_ignore_ascii_case(k)) {
            return tokens.next().and_then(clean_table_token);
        }
    }
    None
}

fn clean_table_token(token: &str) -> Option<String> {
    let name = token.split(['(', ';', ',']).next().unwrap_or_default();
    let name = name.trim_matches(|c| c == '"' || c == '`' || c == '\'' || c == '[' || c == ']');
    (!name.is_empty()).then(|| name.to_string())
}
