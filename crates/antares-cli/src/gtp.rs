//! GTP v2 line parsing
//!
//! Commands are lowercased and stripped of underscores, so `clear_board`
//! and `clearboard` are the same command. A leading integer is the request
//! id and is echoed in the reply.

/// One parsed request line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub id: Option<i64>,
    pub command: String,
    pub args: Vec<String>,
}

/// Splits a raw input line into id, normalized command and arguments.
/// Returns `None` for empty lines.
pub fn parse_line(line: &str) -> Option<Request> {
    let line = line.trim().to_ascii_lowercase();
    let (id, rest) = match line.find(|c: char| !c.is_ascii_digit()) {
        Some(0) => (None, line.as_str()),
        Some(split) => (line[..split].parse().ok(), line[split..].trim_start()),
        None => (line.parse().ok(), ""),
    };
    let mut words = rest.split_whitespace();
    let command: String = words.next()?.chars().filter(|&c| c != '_').collect();
    let args = words.map(str::to_owned).collect();
    Some(Request { id, command, args })
}
