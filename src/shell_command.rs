const SHELL_META_CHARACTERS: &[char] = &[
    '|', '&', ';', '<', '>', '(', ')', '$', '`', '*', '?', '[', ']', '{', '}', '~',
];

/// How a free-form shell line is handed to `adb shell`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ShellInvocation {
    /// Plain words, passed through as separate arguments.
    Direct(Vec<String>),
    /// Anything needing a real shell on the device: `sh -c <line>`.
    Subshell(String),
}

pub(crate) fn contains_shell_meta_characters(command: &str) -> bool {
    command.contains(SHELL_META_CHARACTERS)
}

/// Splits a command line into words. Single quotes are literal, double quotes
/// honor backslash escapes, and a bare backslash escapes the next character.
/// Returns `None` for an unterminated quote, a trailing escape, or no words.
pub(crate) fn tokenize_simple_shell_command(command: &str) -> Option<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_single_quote = false;
    let mut in_double_quote = false;
    let mut escaping = false;

    for ch in command.chars() {
        if escaping {
            current.push(ch);
            escaping = false;
            continue;
        }

        if ch == '\\' && !in_single_quote {
            escaping = true;
            continue;
        }

        if ch == '\'' && !in_double_quote {
            in_single_quote = !in_single_quote;
            continue;
        }

        if ch == '"' && !in_single_quote {
            in_double_quote = !in_double_quote;
            continue;
        }

        if ch.is_whitespace() && !in_single_quote && !in_double_quote {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
            continue;
        }

        current.push(ch);
    }

    if escaping || in_single_quote || in_double_quote {
        return None;
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    if tokens.is_empty() {
        return None;
    }

    Some(tokens)
}

/// Wraps `value` in single quotes for POSIX shell re-parsing. Embedded single
/// quotes close the span, emit `"'"`, and reopen it.
pub(crate) fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\"'\"'"))
}

/// `adb shell` joins its arguments with spaces before the device shell parses
/// them, so words carrying whitespace or quoting characters are re-quoted.
pub(crate) fn quote_remote_argument(value: &str) -> String {
    let needs_quoting = value.is_empty()
        || value.chars().any(|ch| {
            ch.is_whitespace() || matches!(ch, '\'' | '"' | '\\') || SHELL_META_CHARACTERS.contains(&ch)
        });
    if needs_quoting {
        shell_quote(value)
    } else {
        value.to_string()
    }
}

/// Direct argv when the line has no meta characters and tokenizes cleanly,
/// otherwise a subshell.
pub(crate) fn plan_shell_invocation(command: &str) -> Option<ShellInvocation> {
    let trimmed = command.trim();
    if trimmed.is_empty() {
        return None;
    }

    if !contains_shell_meta_characters(trimmed) {
        if let Some(tokens) = tokenize_simple_shell_command(trimmed) {
            return Some(ShellInvocation::Direct(tokens));
        }
    }

    Some(ShellInvocation::Subshell(trimmed.to_string()))
}

impl ShellInvocation {
    /// Arguments following `adb [-s serial]`.
    pub(crate) fn adb_args(&self) -> Vec<String> {
        match self {
            ShellInvocation::Direct(tokens) => std::iter::once("shell".to_string())
                .chain(tokens.iter().map(|token| quote_remote_argument(token)))
                .collect(),
            ShellInvocation::Subshell(line) => vec![
                "shell".to_string(),
                "sh".to_string(),
                "-c".to_string(),
                shell_quote(line),
            ],
        }
    }
}
