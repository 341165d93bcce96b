//! Text transforms behind the normalized, structural and bi-implication keys.
//!
//! These are regex-level heuristics over statement text, not a Lean parser.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

static LINE_COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)--.*$").expect("line comment pattern is valid"));

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

static HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:theorem|lemma)\s+[^\s:(\[{⦃]+\s*").expect("declaration header pattern is valid")
});

static FORALL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bforall\b").expect("forall pattern is valid"));

static IDENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\p{L}_][\p{L}\p{N}_'!?]*(?:\.[\p{L}\p{N}_'!?]+)*")
        .expect("identifier pattern is valid")
});

const OPENERS: [char; 4] = ['(', '[', '{', '⦃'];
const CLOSERS: [char; 4] = [')', ']', '}', '⦄'];

/// Drops `--` line comments and collapses whitespace runs to one space.
pub fn normalize(statement: &str) -> String {
    let without_comments = LINE_COMMENT_RE.replace_all(statement, "");
    WHITESPACE_RE
        .replace_all(&without_comments, " ")
        .trim()
        .to_string()
}

fn depth_delta(ch: char) -> i32 {
    if OPENERS.contains(&ch) {
        1
    } else if CLOSERS.contains(&ch) {
        -1
    } else {
        0
    }
}

/// Byte offset of the first `:` at bracket depth zero that is not `:=`.
fn top_level_colon(text: &str) -> Option<usize> {
    let mut depth = 0i32;
    let mut chars = text.char_indices().peekable();
    while let Some((idx, ch)) = chars.next() {
        depth += depth_delta(ch);
        if ch == ':' && depth == 0 && chars.peek().map(|(_, c)| *c) != Some('=') {
            return Some(idx);
        }
    }
    None
}

/// Byte offset of the first `:=` at bracket depth zero.
fn top_level_assign(text: &str) -> Option<usize> {
    let mut depth = 0i32;
    let mut chars = text.char_indices().peekable();
    while let Some((idx, ch)) = chars.next() {
        depth += depth_delta(ch);
        if ch == ':' && depth == 0 && chars.peek().map(|(_, c)| *c) == Some('=') {
            return Some(idx);
        }
    }
    None
}

/// The proposition a statement asserts.
///
/// With a `theorem`/`lemma` header the body is the text after the first
/// top-level `:`; binders written before that colon are folded into a
/// leading `∀`. Without a header the whole text is the body. Anything from
/// a top-level `:=` on is dropped.
pub fn extract_body(normalized: &str) -> String {
    let Some(header) = HEADER_RE.find(normalized) else {
        return cut_at_assign(normalized).to_string();
    };
    let rest = &normalized[header.end()..];
    let Some(colon) = top_level_colon(rest) else {
        return cut_at_assign(rest).to_string();
    };
    let binders = rest[..colon].trim();
    let prop = cut_at_assign(rest[colon + 1..].trim());
    if binders.is_empty() {
        prop.to_string()
    } else {
        format!("∀ {}, {}", binders, prop)
    }
}

fn cut_at_assign(text: &str) -> &str {
    match top_level_assign(text) {
        Some(idx) => text[..idx].trim_end(),
        None => text,
    }
}

/// One binder group after a `∀`.
struct BinderGroup {
    open: char,
    close: char,
    names: Vec<String>,
    ty: Option<String>,
}

impl BinderGroup {
    fn parse(open: char, close: char, inner: &str) -> Option<Self> {
        let (names, ty) = match top_level_colon(inner) {
            Some(idx) => (&inner[..idx], Some(inner[idx + 1..].trim().to_string())),
            None => (inner, None),
        };
        let names: Vec<String> = names.split_whitespace().map(str::to_string).collect();
        if names.is_empty() {
            return None;
        }
        Some(Self {
            open,
            close,
            names,
            ty,
        })
    }

    fn render(&self) -> String {
        match &self.ty {
            Some(ty) => format!("{}{} : {}{}", self.open, self.names.join(" "), ty, self.close),
            None => format!("{}{}{}", self.open, self.names.join(" "), self.close),
        }
    }
}

/// Parses the binder list that follows a `∀`, up to its top-level comma.
///
/// Returns the groups and the byte offset just after the comma.
fn parse_binders(text: &str) -> Option<(Vec<BinderGroup>, usize)> {
    let mut groups = Vec::new();
    let mut pos = 0;
    loop {
        let rest = &text[pos..];
        let trimmed = rest.trim_start();
        pos += rest.len() - trimmed.len();
        let first = trimmed.chars().next()?;

        if first == ',' {
            return (!groups.is_empty()).then_some((groups, pos + 1));
        }

        if let Some(kind) = OPENERS.iter().position(|c| *c == first) {
            let mut depth = 0i32;
            let mut end = None;
            for (idx, ch) in trimmed.char_indices() {
                depth += depth_delta(ch);
                if depth == 0 {
                    end = Some(idx);
                    break;
                }
            }
            let end = end?;
            let inner = &trimmed[first.len_utf8()..end];
            groups.push(BinderGroup::parse(first, CLOSERS[kind], inner)?);
            pos += end + CLOSERS[kind].len_utf8();
            continue;
        }

        // bare group `a b : T` runs to the next top-level comma
        let mut depth = 0i32;
        let comma = trimmed.char_indices().find_map(|(idx, ch)| {
            depth += depth_delta(ch);
            (ch == ',' && depth == 0).then_some(idx)
        })?;
        groups.push(BinderGroup::parse('(', ')', trimmed[..comma].trim())?);
        return Some((groups, pos + comma + 1));
    }
}

/// Rewrites every `∀` binder list into parenthesized groups.
///
/// Returns the rewritten text and the bound names in first-occurrence order.
fn canonicalize_binders(text: &str) -> (String, Vec<String>) {
    let mut out = String::with_capacity(text.len());
    let mut bound: Vec<String> = Vec::new();
    let mut cursor = 0;

    while let Some(offset) = text[cursor..].find('∀') {
        let start = cursor + offset;
        out.push_str(&text[cursor..start]);
        let after = start + '∀'.len_utf8();
        match parse_binders(&text[after..]) {
            Some((groups, consumed)) => {
                for group in &groups {
                    for name in &group.names {
                        if !bound.contains(name) {
                            bound.push(name.clone());
                        }
                    }
                }
                let rendered: Vec<String> = groups.iter().map(BinderGroup::render).collect();
                out.push_str("∀ ");
                out.push_str(&rendered.join(" "));
                out.push_str(", ");
                cursor = after + consumed;
            }
            None => {
                out.push('∀');
                cursor = after;
            }
        }
    }
    out.push_str(&text[cursor..]);
    (out, bound)
}

/// Structural key: body with `forall` spelled `∀`, binder groups
/// parenthesized and bound names renamed to `v1, v2, …`.
pub fn structural_key(normalized: &str) -> String {
    let body = extract_body(normalized);
    let body = FORALL_RE.replace_all(&body, "∀");
    let body = body.replace("<->", "↔").replace("->", "→");
    let (canonical, bound) = canonicalize_binders(&body);

    let renames: HashMap<&str, String> = bound
        .iter()
        .filter(|name| name.as_str() != "_")
        .enumerate()
        .map(|(i, name)| (name.as_str(), format!("v{}", i + 1)))
        .collect();

    let renamed = IDENT_RE.replace_all(&canonical, |caps: &Captures| {
        let token = &caps[0];
        let (head, tail) = match token.find('.') {
            Some(idx) => token.split_at(idx),
            None => (token, ""),
        };
        match renames.get(head) {
            Some(new) => format!("{}{}", new, tail),
            None => token.to_string(),
        }
    });

    WHITESPACE_RE.replace_all(&renamed, " ").trim().to_string()
}

/// Removes one pair of parentheses enclosing the whole text.
fn strip_wrapping_parens(text: &str) -> &str {
    let trimmed = text.trim();
    if !(trimmed.starts_with('(') && trimmed.ends_with(')')) {
        return trimmed;
    }
    let mut depth = 0i32;
    for (idx, ch) in trimmed.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth -= 1,
            _ => {}
        }
        if depth == 0 {
            if idx + 1 == trimmed.len() {
                return trimmed[1..idx].trim();
            }
            return trimmed;
        }
    }
    trimmed
}

/// Unordered side pair of the first `↔` in a structural key.
pub fn bi_implication_key(structural: &str) -> Option<(String, String)> {
    let (left, right) = structural.split_once('↔')?;
    let left = strip_wrapping_parens(left).to_string();
    let right = strip_wrapping_parens(right).to_string();
    Some(if left <= right { (left, right) } else { (right, left) })
}
