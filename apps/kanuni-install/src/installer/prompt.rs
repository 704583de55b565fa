//! Interactive confirmation.

use std::io::{BufRead, Write};

/// Asks a `[y/N]` question on stdout and reads one line from `input`.
///
/// Only `y` or `yes` (any case) confirm. An empty answer, anything else, EOF
/// or a read error count as "no". Blocks without a timeout.
pub fn confirm(input: &mut dyn BufRead, question: &str) -> bool {
    print!("{question} [y/N] ");
    let _ = std::io::stdout().flush();

    let mut answer = String::new();
    match input.read_line(&mut answer) {
        Ok(0) | Err(_) => {
            println!();
            false
        }
        Ok(_) => is_yes(&answer),
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
