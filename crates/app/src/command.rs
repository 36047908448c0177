use std::fmt;

/// One line of learner input. Positions are 1-based as displayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Flip,
    Knew,
    Missed,
    Pick(usize),
    Toggle(usize),
    Type(String),
    Pair { left: usize, right: usize },
    Unpair(usize),
    Move { from: usize, to: usize },
    Check,
    Next,
    Prev,
    Progress,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    Empty,
    Unknown(String),
    MissingArgument { command: &'static str },
    InvalidPosition { raw: String },
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Empty => write!(f, "type a command (help lists them)"),
            CommandError::Unknown(word) => write!(f, "unknown command: {word}"),
            CommandError::MissingArgument { command } => {
                write!(f, "{command} needs more arguments")
            }
            CommandError::InvalidPosition { raw } => {
                write!(f, "invalid position: {raw} (positions start at 1)")
            }
        }
    }
}

impl std::error::Error for CommandError {}

fn position<'a>(
    words: &mut impl Iterator<Item = &'a str>,
    command: &'static str,
) -> Result<usize, CommandError> {
    let raw = words.next().ok_or(CommandError::MissingArgument { command })?;
    match raw.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(CommandError::InvalidPosition {
            raw: raw.to_string(),
        }),
    }
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let line = line.trim();
        let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let mut args = rest.split_whitespace();

        let command = match word.to_ascii_lowercase().as_str() {
            "" => return Err(CommandError::Empty),
            "flip" | "f" => Self::Flip,
            "knew" | "y" => Self::Knew,
            "missed" | "n" => Self::Missed,
            "pick" => Self::Pick(position(&mut args, "pick")?),
            "toggle" => Self::Toggle(position(&mut args, "toggle")?),
            "type" => {
                let text = rest.trim();
                if text.is_empty() {
                    return Err(CommandError::MissingArgument { command: "type" });
                }
                Self::Type(text.to_string())
            }
            "pair" => Self::Pair {
                left: position(&mut args, "pair")?,
                right: position(&mut args, "pair")?,
            },
            "unpair" => Self::Unpair(position(&mut args, "unpair")?),
            "move" => Self::Move {
                from: position(&mut args, "move")?,
                to: position(&mut args, "move")?,
            },
            "check" | "c" => Self::Check,
            "next" => Self::Next,
            "prev" | "back" => Self::Prev,
            "progress" | "p" => Self::Progress,
            "help" | "?" => Self::Help,
            "quit" | "q" | "exit" => Self::Quit,
            _ => return Err(CommandError::Unknown(word.to_string())),
        };
        Ok(command)
    }
}

pub fn print_commands() {
    println!("Commands:");
    println!("  flip                 turn the flashcard over");
    println!("  knew | missed        self-assess a flipped flashcard");
    println!("  pick N               choose option N of a quiz");
    println!("  toggle N             toggle option N of a checkbox question");
    println!("  type TEXT            enter a written answer");
    println!("  pair L R             match left entry L with right entry R");
    println!("  unpair L             clear the match of left entry L");
    println!("  move FROM TO         move a step of an order item");
    println!("  check                grade the current answer");
    println!("  next | prev          navigate between items");
    println!("  progress             show how far along the session is");
    println!("  quit                 leave without reporting");
}
