// ── Input lines ──
//
// `#` starts a comment; surrounding whitespace is stripped; the first word
// names the command and everything after it is handed to the handler as is.

/// One non-empty input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line<'a> {
    pub cmd: &'a str,
    pub args: &'a str,
}

/// Split a raw line. `None` for blank and comment-only lines.
pub fn tokenize(raw: &str) -> Option<Line<'_>> {
    let line = raw.split_once('#').map_or(raw, |(code, _)| code).trim();
    if line.is_empty() {
        return None;
    }
    let (cmd, args) = line
        .split_once(char::is_whitespace)
        .map_or((line, ""), |(cmd, rest)| (cmd, rest.trim_start()));
    Some(Line { cmd, args })
}

/// Split `args` into at most `max` whitespace-separated fields. The last
/// field keeps the remainder of the line, inner spacing included.
pub fn split_args(args: &str, max: usize) -> Vec<&str> {
    let mut fields = Vec::new();
    let mut rest = args.trim();
    while !rest.is_empty() && fields.len() + 1 < max {
        match rest.split_once(char::is_whitespace) {
            Some((head, tail)) => {
                fields.push(head);
                rest = tail.trim_start();
            }
            None => {
                fields.push(rest);
                rest = "";
            }
        }
    }
    if !rest.is_empty() {
        fields.push(rest);
    }
    fields
}
