//! Argument-file rendering for `java @argfile` and `protoc @argfile`.
//!
//! The two consumers have different lexers. `java` understands quoted
//! tokens with backslash escapes; `protoc` reads each line verbatim and
//! performs no unquoting at all, so protoc files must never be escaped.

use std::borrow::Cow;

/// Characters that force a java argument-file token into quotes.
fn java_needs_quoting(token: &str) -> bool {
    token
        .chars()
        .any(|c| matches!(c, ' ' | '\t' | '\n' | '\r' | '\'' | '"' | '\\'))
}

/// Quote a single token for a java argument file.
///
/// Tokens without special characters pass through unchanged. Otherwise the
/// token is double-quoted and `\`, `"`, `'` are backslash-escaped while
/// newline, carriage return, and tab become the two-character escapes
/// `\n`, `\r`, `\t`.
pub fn quote_java_token(token: &str) -> Cow<'_, str> {
    if !java_needs_quoting(token) {
        return Cow::Borrowed(token);
    }
    let mut out = String::with_capacity(token.len() + 2);
    out.push('"');
    for c in token.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out.push('"');
    Cow::Owned(out)
}

/// Render a java argument file: one quoted token per line, every line
/// newline-terminated.
pub fn java_argfile(tokens: &[String]) -> String {
    let mut out = String::new();
    for token in tokens {
        out.push_str(&quote_java_token(token));
        out.push('\n');
    }
    out
}

/// Render a protoc argument file: one raw token per line, every line
/// newline-terminated. Embedded quotes pass through literally.
pub fn protoc_argfile(tokens: &[String]) -> String {
    let mut out = String::new();
    for token in tokens {
        out.push_str(token);
        out.push('\n');
    }
    out
}

/// Quote a value for a POSIX `sh` launcher script.
///
/// The value is single-quoted; embedded single quotes use the `'"'"'`
/// dance, control characters switch to ANSI-C quoting (`'$'\n''`), and
/// backslashes are doubled.
pub fn quote_posix(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        match c {
            '\'' => out.push_str("'\"'\"'"),
            '\n' => out.push_str("'$'\\n''"),
            '\r' => out.push_str("'$'\\r''"),
            '\t' => out.push_str("'$'\\t''"),
            '\\' => out.push_str("\\\\"),
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Quote a value for a Windows batch launcher script: double-quote the
/// value, doubling embedded double quotes.
pub fn quote_batch(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        if c == '"' {
            out.push_str("\"\"");
        } else {
            out.push(c);
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal java argfile lexer used to assert the round-trip law.
    fn unquote_java_line(line: &str) -> String {
        if !line.starts_with('"') {
            return line.to_string();
        }
        let inner = &line[1..line.len() - 1];
        let mut out = String::new();
        let mut chars = inner.chars();
        while let Some(c) = chars.next() {
            if c != '\\' {
                out.push(c);
                continue;
            }
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('r') => out.push('\r'),
                Some('t') => out.push('\t'),
                Some(other) => out.push(other),
                None => {}
            }
        }
        out
    }

    #[test]
    fn plain_tokens_pass_through() {
        assert_eq!(quote_java_token("-classpath"), "-classpath");
        assert_eq!(quote_java_token("/opt/dep.jar"), "/opt/dep.jar");
    }

    #[test]
    fn tokens_with_spaces_are_quoted() {
        assert_eq!(
            quote_java_token("C:\\Program Files\\dep.jar"),
            "\"C:\\\\Program Files\\\\dep.jar\""
        );
    }

    #[test]
    fn every_line_has_trailing_newline() {
        let file = java_argfile(&["a".into(), "b c".into()]);
        assert_eq!(file, "a\n\"b c\"\n");
    }

    #[test]
    fn java_argfile_round_trip() {
        let tokens: Vec<String> = vec![
            "-classpath".into(),
            "/a/b.jar:/c d/e.jar".into(),
            "it's".into(),
            "tab\there".into(),
            "line\nbreak".into(),
            "quote\"inside".into(),
            "back\\slash".into(),
        ];
        let file = java_argfile(&tokens);
        let recovered: Vec<String> = file.lines().map(unquote_java_line).collect();
        assert_eq!(recovered, tokens);
    }

    #[test]
    fn protoc_argfile_is_verbatim() {
        let file = protoc_argfile(&["--proto_path=/a b".into(), "x\"y".into()]);
        assert_eq!(file, "--proto_path=/a b\nx\"y\n");
    }

    #[test]
    fn posix_quoting_handles_single_quotes() {
        assert_eq!(quote_posix("ab"), "'ab'");
        assert_eq!(quote_posix("a'b"), "'a'\"'\"'b'");
        assert_eq!(quote_posix("a\nb"), "'a'$'\\n''b'");
        assert_eq!(quote_posix("a\\b"), "'a\\\\b'");
    }

    #[test]
    fn batch_quoting_doubles_quotes() {
        assert_eq!(quote_batch("plain"), "\"plain\"");
        assert_eq!(quote_batch("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
