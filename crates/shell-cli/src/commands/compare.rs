//! `studio-shell compare <a> <b>`

use std::cmp::Ordering;

use crate::error::Result;

/// Print `<`, `=` or `>` for the numeric comparison of two versions.
pub fn run_compare(a: &str, b: &str) -> Result<()> {
    let symbol = match shell_extensions::compare(a, b)? {
        Ordering::Less => "<",
        Ordering::Equal => "=",
        Ordering::Greater => ">",
    };
    println!("{a} {symbol} {b}");
    Ok(())
}
