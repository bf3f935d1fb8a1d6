//! Notebook-style echo for Python snippets.
//!
//! `python -c` prints nothing for a trailing bare expression, while the model
//! usually writes snippets the way it would in a REPL. If the last meaningful
//! line is a plain expression it is wrapped in `print(...)`.

const STATEMENT_KEYWORDS: &[&str] = &[
    "assert", "async", "await", "break", "class", "continue", "def", "del", "elif", "else",
    "except", "finally", "for", "from", "global", "if", "import", "lambda", "nonlocal", "pass",
    "print", "raise", "return", "try", "while", "with", "yield",
];

/// Dedent the snippet and rewrite a trailing bare expression as a print call.
pub fn prepare_python_source(source: &str) -> String {
    let mut lines = dedent(source);

    let last_meaningful = lines.iter().rposition(|line| {
        let line = line.trim();
        !line.is_empty() && !line.starts_with('#')
    });

    if let Some(index) = last_meaningful
        && looks_like_bare_expression(&lines, index)
    {
        lines[index] = format!("print({})", lines[index].trim_end());
    }

    lines.join("\n")
}

/// Strip the indentation shared by every non-blank line, plus leading and
/// trailing blank lines. Relative indentation is preserved.
fn dedent(source: &str) -> Vec<String> {
    let indent = source
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start().len())
        .min()
        .unwrap_or(0);

    let mut lines: Vec<String> = source
        .lines()
        .map(|line| {
            if line.trim().is_empty() {
                String::new()
            } else {
                line.get(indent..)
                    .unwrap_or_else(|| line.trim_start())
                    .to_string()
            }
        })
        .collect();

    while lines.last().is_some_and(|line| line.is_empty()) {
        lines.pop();
    }
    let leading = lines.iter().take_while(|line| line.is_empty()).count();
    lines.drain(..leading);
    lines
}

fn looks_like_bare_expression(lines: &[String], index: usize) -> bool {
    let line = &lines[index];

    // Indented lines belong to a block body.
    if line.starts_with(char::is_whitespace) {
        return false;
    }
    if index > 0 && lines[index - 1].trim_end().ends_with('\\') {
        return false;
    }

    let line = line.trim_end();
    if line.contains('#') || line.contains('(') || line.starts_with('@') {
        return false;
    }
    if line.ends_with(':') || line.ends_with('\\') || line.ends_with(',') {
        return false;
    }
    if has_assignment(line) || !brackets_balanced(line) {
        return false;
    }

    let first_word = line
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .next()
        .unwrap_or_default();
    if STATEMENT_KEYWORDS.contains(&first_word) {
        return false;
    }

    line.chars().any(|c| c.is_alphanumeric() || c == '_')
}

/// True when `line` contains an `=` that is not part of a comparison.
fn has_assignment(line: &str) -> bool {
    let chars: Vec<char> = line.chars().collect();
    chars.iter().enumerate().any(|(i, &c)| {
        if c != '=' {
            return false;
        }
        let prev = i.checked_sub(1).map(|p| chars[p]);
        let next = chars.get(i + 1).copied();
        let comparison = matches!(prev, Some('=' | '!' | '<' | '>')) || next == Some('=');
        !comparison
    })
}

fn brackets_balanced(line: &str) -> bool {
    let mut depth: i32 = 0;
    for c in line.chars() {
        match c {
            '[' | '{' => depth += 1,
            ']' | '}' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}
