//! UI utilities for the terminal client.

use std::io::Write;

/// Redisplay the prompt after printing something
pub fn redisplay_prompt(prompt: &str) {
    print!("{}", prompt);
    std::io::stdout().flush().ok();
}
