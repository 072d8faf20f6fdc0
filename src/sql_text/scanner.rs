/// A placeholder found in SQL text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    /// Byte offset of the first placeholder character.
    pub start: usize,
    /// Byte offset one past the last placeholder character.
    pub end: usize,
    /// 1-based parameter number, assigned the way SQLite numbers parameters.
    pub number: usize,
}

impl Placeholder {
    /// 0-based binding index.
    #[must_use]
    pub fn index(&self) -> usize {
        self.number - 1
    }
}

#[derive(Clone, Copy)]
enum State {
    Normal,
    SingleQuoted,
    DoubleQuoted,
    Backticked,
    Bracketed,
    LineComment,
    BlockComment(u32),
}

/// Find every parameter placeholder outside string literals, quoted
/// identifiers and comments.
///
/// `?` takes the next free number, `?NNN` names its number explicitly, and
/// `:name`, `@name`, `$name` reuse the number of an earlier identical name.
#[must_use]
pub fn scan_placeholders(sql: &str) -> Vec<Placeholder> {
    let bytes = sql.as_bytes();
    let mut found = Vec::new();
    let mut names: Vec<(&str, usize)> = Vec::new();
    let mut highest = 0usize;
    let mut state = State::Normal;
    let mut idx = 0;

    while idx < bytes.len() {
        let b = bytes[idx];
        match state {
            State::Normal => match b {
                b'\'' => state = State::SingleQuoted,
                b'"' => state = State::DoubleQuoted,
                b'`' => state = State::Backticked,
                b'[' => state = State::Bracketed,
                b'-' if bytes.get(idx + 1) == Some(&b'-') => {
                    state = State::LineComment;
                    idx += 1;
                }
                b'/' if bytes.get(idx + 1) == Some(&b'*') => {
                    state = State::BlockComment(1);
                    idx += 1;
                }
                b'?' => {
                    let digits_end = scan_while(bytes, idx + 1, |c| c.is_ascii_digit());
                    let explicit = sql[idx + 1..digits_end]
                        .parse::<usize>()
                        .ok()
                        .filter(|n| *n > 0);
                    let number = explicit.unwrap_or(highest + 1);
                    highest = highest.max(number);
                    found.push(Placeholder {
                        start: idx,
                        end: digits_end,
                        number,
                    });
                    idx = digits_end;
                    continue;
                }
                b':' if bytes.get(idx + 1) == Some(&b':') => {
                    // `::type` cast, not a parameter
                    idx += 2;
                    continue;
                }
                b':' | b'@' | b'$' => {
                    let name_end =
                        scan_while(bytes, idx + 1, |c| c.is_ascii_alphanumeric() || c == b'_');
                    if name_end > idx + 1 {
                        let name = &sql[idx..name_end];
                        let number = match names.iter().find(|(n, _)| *n == name) {
                            Some((_, number)) => *number,
                            None => {
                                highest += 1;
                                names.push((name, highest));
                                highest
                            }
                        };
                        found.push(Placeholder {
                            start: idx,
                            end: name_end,
                            number,
                        });
                        idx = name_end;
                        continue;
                    }
                }
                _ => {}
            },
            State::SingleQuoted => {
                if b == b'\'' {
                    if bytes.get(idx + 1) == Some(&b'\'') {
                        idx += 1; // skip escaped quote
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::DoubleQuoted => {
                if b == b'"' {
                    if bytes.get(idx + 1) == Some(&b'"') {
                        idx += 1;
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::Backticked => {
                if b == b'`' {
                    state = State::Normal;
                }
            }
            State::Bracketed => {
                if b == b']' {
                    state = State::Normal;
                }
            }
            State::LineComment => {
                if b == b'\n' {
                    state = State::Normal;
                }
            }
            State::BlockComment(depth) => {
                if b == b'/' && bytes.get(idx + 1) == Some(&b'*') {
                    state = State::BlockComment(depth + 1);
                    idx += 1;
                } else if b == b'*' && bytes.get(idx + 1) == Some(&b'/') {
                    state = if depth == 1 {
                        State::Normal
                    } else {
                        State::BlockComment(depth - 1)
                    };
                    idx += 1;
                }
            }
        }
        idx += 1;
    }

    found
}

/// Number of distinct parameters `sql` declares (the highest number used).
#[must_use]
pub fn count_placeholders(sql: &str) -> usize {
    scan_placeholders(sql)
        .iter()
        .map(|p| p.number)
        .max()
        .unwrap_or(0)
}

fn scan_while(bytes: &[u8], start: usize, pred: impl Fn(u8) -> bool) -> usize {
    let mut idx = start;
    while idx < bytes.len() && pred(bytes[idx]) {
        idx += 1;
    }
    idx
}
