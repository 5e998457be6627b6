/// Splits a command line (without its prefix) on runs of ASCII whitespace.
///
/// The first token is the command name. No quoting or escaping is recognised, so the result never
/// contains empty tokens.
pub fn tokenize(line: &str) -> Vec<&str> {
    line.split_ascii_whitespace().collect()
}

/// Splits off the command name, returning it and the rest of the tokens.
pub fn split_command(line: &str) -> Option<(&str, Vec<&str>)> {
    let mut tokens = line.split_ascii_whitespace();
    let name = tokens.next()?;
    Some((name, tokens.collect()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_whitespace() {
        assert_eq!(tokenize("  remind\t5m   take\nout the  bins "), [
            "remind", "5m", "take", "out", "the", "bins"
        ]);
    }

    #[test]
    fn empty_input() {
        assert!(tokenize("").is_empty());
        assert!(tokenize(" \t\n").is_empty());
        assert_eq!(split_command("   "), None);
    }

    #[test]
    fn quotes_are_not_special() {
        assert_eq!(tokenize(r#"say "hello world""#), ["say", "\"hello", "world\""]);
    }

    #[test]
    fn split_command_separates_name() {
        assert_eq!(split_command("sum 1 2 3"), Some(("sum", vec!["1", "2", "3"])));
        assert_eq!(split_command("ping"), Some(("ping", vec![])));
    }
}
