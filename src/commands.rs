use anyhow::{anyhow, bail, Result};
use std::path::PathBuf;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Command {
    Load(PathBuf),
    Set { key: String, value: String },
    Start,
    Answer { question: usize, option: String },
    Next,
    Back,
    Results,
    Status,
    Reset,
    Help,
    Quit,
}

pub fn parse(line: &str) -> Result<Option<Command>> {
    let mut words = line.split_whitespace();
    let Some(keyword) = words.next() else {
        return Ok(None);
    };
    let command = match keyword {
        "load" => {
            let path: Vec<&str> = words.collect();
            if path.is_empty() {
                bail!("Usage: load <file.json>");
            }
            Command::Load(PathBuf::from(path.join(" ")))
        }
        "set" => {
            let key = words
                .next()
                .ok_or_else(|| anyhow!("Usage: set <key> <value>"))?;
            let value = words
                .next()
                .ok_or_else(|| anyhow!("Usage: set <key> <value>"))?;
            Command::Set {
                key: key.to_owned(),
                value: value.to_owned(),
            }
        }
        "answer" | "a" => {
            let question = words
                .next()
                .and_then(|n| n.parse().ok())
                .ok_or_else(|| anyhow!("Usage: answer <question#> <option>"))?;
            let option = words
                .next()
                .ok_or_else(|| anyhow!("Usage: answer <question#> <option>"))?;
            Command::Answer {
                question,
                option: option.to_owned(),
            }
        }
        "start" => Command::Start,
        "next" | "n" => Command::Next,
        "back" | "b" => Command::Back,
        "results" => Command::Results,
        "status" => Command::Status,
        "reset" => Command::Reset,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => bail!("Unknown command `{other}` (try `help`)"),
    };
    Ok(Some(command))
}
