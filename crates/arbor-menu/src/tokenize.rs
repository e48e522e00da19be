//! Line tokenizer: whitespace-delimited words with quoting.
//!
//! - Single quotes keep everything literally.
//! - Double quotes allow `\"` and `\\` escapes.
//! - A backslash outside quotes escapes the next character.
//! - `""` produces an empty token.

/// Tokenizer failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenizeError {
    #[error("unterminated {0} quote")]
    UnterminatedQuote(&'static str),
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode {
    Plain,
    Single,
    Double,
}

/// Split a command line into tokens.
pub fn tokenize(input: &str) -> Result<Vec<String>, TokenizeError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    // A quoted empty string still yields a token.
    let mut pending = false;
    let mut mode = Mode::Plain;
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        match (mode, ch) {
            (Mode::Single, '\'') | (Mode::Double, '"') => mode = Mode::Plain,
            (Mode::Single, c) => current.push(c),
            (Mode::Double, '\\') => match chars.peek() {
                Some(&next) if next == '"' || next == '\\' => {
                    current.push(next);
                    chars.next();
                },
                _ => current.push('\\'),
            },
            (Mode::Double, c) => current.push(c),
            (Mode::Plain, '\'') => {
                mode = Mode::Single;
                pending = true;
            },
            (Mode::Plain, '"') => {
                mode = Mode::Double;
                pending = true;
            },
            (Mode::Plain, '\\') => {
                if let Some(next) = chars.next() {
                    current.push(next);
                    pending = true;
                }
            },
            (Mode::Plain, c) if c.is_whitespace() => {
                if pending || !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                    pending = false;
                }
            },
            (Mode::Plain, c) => current.push(c),
        }
    }

    match mode {
        Mode::Single => return Err(TokenizeError::UnterminatedQuote("single")),
        Mode::Double => return Err(TokenizeError::UnterminatedQuote("double")),
        Mode::Plain => {},
    }
    if pending || !current.is_empty() {
        tokens.push(current);
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn simple_words() {
        assert_eq!(tokenize("add 2 3").unwrap(), vec!["add", "2", "3"]);
    }

    #[test]
    fn surrounding_whitespace_ignored() {
        assert_eq!(tokenize("  hello \t world  ").unwrap(), vec!["hello", "world"]);
    }

    #[test]
    fn single_quotes() {
        assert_eq!(
            tokenize("echo 'hello world'").unwrap(),
            vec!["echo", "hello world"]
        );
    }

    #[test]
    fn double_quotes_with_escape() {
        assert_eq!(
            tokenize(r#"echo "say \"hi\"""#).unwrap(),
            vec!["echo", r#"say "hi""#]
        );
    }

    #[test]
    fn backslash_escapes_space() {
        assert_eq!(
            tokenize(r"echo hello\ world").unwrap(),
            vec!["echo", "hello world"]
        );
    }

    #[test]
    fn quotes_join_adjacent_text() {
        assert_eq!(tokenize(r#"a"b c"d"#).unwrap(), vec!["ab cd"]);
    }

    #[test]
    fn empty_quoted_token() {
        assert_eq!(tokenize(r#"echo """#).unwrap(), vec!["echo", ""]);
    }

    #[test]
    fn empty_input() {
        assert!(tokenize("").unwrap().is_empty());
        assert!(tokenize("   ").unwrap().is_empty());
    }

    #[test]
    fn unterminated_quotes() {
        assert_eq!(
            tokenize("echo 'oops").unwrap_err(),
            TokenizeError::UnterminatedQuote("single")
        );
        assert_eq!(
            tokenize(r#"echo "oops"#).unwrap_err(),
            TokenizeError::UnterminatedQuote("double")
        );
    }

    proptest! {
        #[test]
        fn plain_words_round_trip(words in prop::collection::vec("[a-z0-9]{1,8}", 0..6)) {
            let line = words.join(" ");
            prop_assert_eq!(tokenize(&line).unwrap(), words);
        }

        #[test]
        fn never_panics(line in ".*") {
            let _ = tokenize(&line);
        }
    }
}
