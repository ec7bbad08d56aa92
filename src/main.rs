use anyhow::{anyhow, bail, Result};
use log::error;
use std::io::{self, BufRead, Write};

mod commands;
mod gateway;
mod pool;
mod session;

use crate::commands::Command;
use crate::gateway::openai::OpenAiGateway;
use crate::pool::grade::tally;
use crate::pool::Question;
use crate::session::{Phase, Session, SettingsOverrides};

fn main() {
    dotenv::dotenv().ok();
    pretty_env_logger::init();

    let gateway = OpenAiGateway::from_env();
    let session = Session::new(gateway, SettingsOverrides::default());
    if let Err(err) = run(session) {
        error!("fatal: {:#}", err);
        std::process::exit(1);
    }
}

fn run(mut session: Session<OpenAiGateway>) -> Result<()> {
    println!("MCQ runner — type `help` for commands.");
    if !session.has_ai() {
        println!("(no OPENAI_API_KEY configured — AI augment/explain are unavailable)");
    }

    let stdin = io::stdin();
    // Answers are addressed against the questions as last displayed, so the
    // snapshot survives option re-shuffling between renders.
    let mut displayed: Vec<Question> = Vec::new();
    loop {
        session.poll_gateway();
        print!("> ");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            return Ok(());
        }
        let command = match commands::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(err) => {
                println!("{err}");
                continue;
            }
        };
        match command {
            Command::Quit => return Ok(()),
            Command::Help => print_help(),
            Command::Load(path) => {
                let raw = match std::fs::read_to_string(&path) {
                    Ok(raw) => raw,
                    Err(err) => {
                        println!("Cannot read {}: {err}", path.display());
                        continue;
                    }
                };
                match session.load_pool(&raw) {
                    Ok(()) => print_setup(&session),
                    Err(err) => println!("{err:#}"),
                }
            }
            Command::Set { key, value } => match apply_setting(&mut session, &key, &value) {
                Ok(()) => print_setup(&session),
                Err(err) => println!("{err:#}"),
            },
            Command::Start => {
                if session.settings().allow_ai_augment && session.has_ai() {
                    println!("Consultando al modelo para ampliar el pool…");
                }
                match session.start_quiz() {
                    Ok(()) => displayed = print_quiz(&session),
                    Err(err) => println!("{err:#}"),
                }
            }
            Command::Answer { question, option } => {
                if let Err(err) = apply_answer(&mut session, &displayed, question, &option) {
                    println!("{err:#}");
                }
            }
            Command::Next => match session.phase() {
                Phase::Quiz => match session.finish_block() {
                    Ok(()) => {
                        if session.loading_ai() {
                            println!("Generando explicaciones…");
                            session.wait_gateway();
                        }
                        print_results(&session);
                    }
                    Err(err) => println!("{err:#}"),
                },
                Phase::Results => match session.next_from_results() {
                    Ok(()) => match session.phase() {
                        Phase::Quiz => displayed = print_quiz(&session),
                        Phase::Final => print_final(&session),
                        _ => {}
                    },
                    Err(err) => println!("{err:#}"),
                },
                _ => println!("Nothing to advance here."),
            },
            Command::Back => match session.phase() {
                Phase::Quiz => {
                    session.back_from_quiz()?;
                    displayed = print_quiz(&session);
                }
                Phase::Results => {
                    session.back_from_results()?;
                    displayed = print_quiz(&session);
                }
                Phase::Final => {
                    session.back_from_final()?;
                    displayed = print_quiz(&session);
                }
                Phase::Setup => println!("Already at setup."),
            },
            Command::Results => match session.phase() {
                Phase::Results => print_results(&session),
                Phase::Final => print_final(&session),
                _ => println!("No results yet."),
            },
            Command::Status => print_status(&session),
            Command::Reset => {
                session.reset();
                displayed.clear();
                println!("Session reset.");
            }
        }
    }
}

fn apply_setting(session: &mut Session<OpenAiGateway>, key: &str, value: &str) -> Result<()> {
    let mut settings = session.settings().clone();
    match key {
        "blocksize" | "block-size" => {
            let size: usize = value
                .parse()
                .map_err(|_| anyhow!("blocksize expects a number"))?;
            if size == 0 {
                bail!("blocksize must be at least 1");
            }
            settings.block_size = size;
        }
        "shuffle" => settings.shuffle_enabled = parse_switch(value)?,
        "shuffle-options" => settings.shuffle_question_enabled = parse_switch(value)?,
        "augment" => settings.allow_ai_augment = parse_switch(value)?,
        "augment-count" => {
            let count: usize = value
                .parse()
                .map_err(|_| anyhow!("augment-count expects a number"))?;
            if count == 0 {
                bail!("augment-count must be at least 1");
            }
            settings.ai_augment_count = count;
        }
        "explain" => settings.allow_ai_explain = parse_switch(value)?,
        other => bail!("Unknown setting `{other}`"),
    }
    session.set_settings(settings)
}

fn parse_switch(value: &str) -> Result<bool> {
    match value {
        "on" | "true" | "yes" => Ok(true),
        "off" | "false" | "no" => Ok(false),
        other => Err(anyhow!("Expected on/off, got `{other}`")),
    }
}

fn apply_answer(
    session: &mut Session<OpenAiGateway>,
    displayed: &[Question],
    number: usize,
    option: &str,
) -> Result<()> {
    let index = number
        .checked_sub(1)
        .ok_or_else(|| anyhow!("Questions are numbered from 1"))?;
    let question = displayed
        .get(index)
        .ok_or_else(|| anyhow!("No question #{number} in this block"))?;
    let option_id = resolve_option(question, option)?;
    let checked = !session
        .answers()
        .get(&question.id)
        .map_or(false, |selection| selection.contains(&option_id));
    session.toggle_answer(&question.id, &option_id, checked)
}

fn resolve_option(question: &Question, option: &str) -> Result<String> {
    if let Some(found) = question.options.iter().find(|o| o.id == option) {
        return Ok(found.id.clone());
    }
    // Single letters address options by displayed position.
    let mut letters = option.chars();
    if let (Some(letter), None) = (letters.next(), letters.next()) {
        let position = (letter.to_ascii_lowercase() as usize).wrapping_sub('a' as usize);
        if let Some(found) = question.options.get(position) {
            return Ok(found.id.clone());
        }
    }
    Err(anyhow!("Question has no option `{option}`"))
}

fn print_setup(session: &Session<OpenAiGateway>) {
    match session.pool() {
        Some(pool) => {
            let title = pool.title.as_deref().unwrap_or("(untitled pool)");
            println!(
                "Pool: {title} — {} questions ({} base, {} AI)",
                session.total(),
                session.base_count(),
                session.ai_count()
            );
        }
        None => println!("No pool loaded."),
    }
    let settings = session.settings();
    println!(
        "Settings: blocksize={} shuffle={} shuffle-options={} augment={} (count {}) explain={}",
        settings.block_size,
        settings.shuffle_enabled,
        settings.shuffle_question_enabled,
        settings.allow_ai_augment,
        settings.ai_augment_count,
        settings.allow_ai_explain
    );
}

fn print_quiz(session: &Session<OpenAiGateway>) -> Vec<Question> {
    let questions = session.active_questions();
    println!(
        "— Block {}/{} —",
        session.current_block() + 1,
        session.blocks().len().max(1)
    );
    for (number, question) in questions.iter().enumerate() {
        println!("{}. {}", number + 1, question.prompt);
        let selection = session.answers().get(&question.id);
        for (position, option) in question.options.iter().enumerate() {
            let letter = (b'a' + position as u8) as char;
            let mark = if selection.map_or(false, |chosen| chosen.contains(&option.id)) {
                "x"
            } else {
                " "
            };
            println!("   [{mark}] {letter}) {}", option.text);
        }
    }
    println!("(answer <question#> <letter> to pick, `next` to finish the block)");
    questions
}

fn print_results(session: &Session<OpenAiGateway>) {
    let results = session.block_results();
    let score = tally(&results);
    println!(
        "— Block {} results: {}/{} ({}%) —",
        session.current_block() + 1,
        score.score,
        score.total,
        score.percentage
    );
    for entry in &results {
        let mark = if entry.is_correct { "✓" } else { "✗" };
        println!(
            "{mark} {} — chosen [{}], correct [{}]",
            entry.id,
            entry.chosen.join(", "),
            entry.correct.join(", ")
        );
        if !entry.is_correct {
            if let Some(text) = session.explanations().and_then(|map| map.get(&entry.id)) {
                println!("   {text}");
            }
        }
    }
    if session.loading_ai() {
        println!("(explanations still loading — `results` will refresh them)");
    }
}

fn print_final(session: &Session<OpenAiGateway>) {
    let results = session.final_results();
    let score = tally(&results);
    println!(
        "— Final score: {}/{} ({}%) over the whole pool —",
        score.score, score.total, score.percentage
    );
    let missed: Vec<&str> = results
        .iter()
        .filter(|entry| !entry.is_correct)
        .map(|entry| entry.id.as_str())
        .collect();
    if !missed.is_empty() {
        println!("Missed: {}", missed.join(", "));
    }
    println!("(`back` revisits the last block, `reset` starts over)");
}

fn print_status(session: &Session<OpenAiGateway>) {
    let ai = if session.loading_ai() {
        "pending"
    } else if session.has_ai() {
        "ready"
    } else {
        "unavailable"
    };
    println!(
        "Phase: {:?} — block {}/{} — AI {ai}",
        session.phase(),
        session.current_block() + 1,
        session.blocks().len()
    );
    print_setup(session);
}

fn print_help() {
    println!(
        "Commands:\n\
         \x20 load <file.json>        load a question pool\n\
         \x20 set <key> <value>       blocksize, shuffle, shuffle-options, augment, augment-count, explain\n\
         \x20 start                   begin the quiz\n\
         \x20 answer <q#> <option>    toggle an option (letter or option id)\n\
         \x20 next                    finish block / advance\n\
         \x20 back                    previous block / revisit\n\
         \x20 results                 re-show results (refreshes explanations)\n\
         \x20 status                  session overview\n\
         \x20 reset                   clear the session\n\
         \x20 quit"
    );
}
