use std::fmt;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

use quiz_core::Clock;
use quiz_core::model::{CategoryId, DifficultyId, UserId, UserProfile};
use services::{
    AuthProvider, HttpQuizApi, QuizApiConfig, QuizSessionController, SaveStatus, SessionPhase,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidId { flag: &'static str, raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidId { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

struct Args {
    base_url: String,
    token: Option<String>,
    username: Option<String>,
    category: CategoryId,
    difficulty: DifficultyId,
    limit: u32,
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- [--base-url <url>] [--category <id>] [--difficulty <id>]");
    eprintln!("                      [--limit <n>] [--token <jwt>] [--username <name>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --base-url http://localhost:8000/api");
    eprintln!("  --category 1, --difficulty 1, --limit 10");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QUIZ_API_BASE_URL, QUIZ_API_TOKEN, QUIZ_USERNAME");
}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_id(flag: &'static str, raw: String) -> Result<u64, ArgsError> {
    raw.parse().map_err(|_| ArgsError::InvalidId { flag, raw })
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let env_config = QuizApiConfig::from_env();
        let mut base_url = env_config
            .as_ref()
            .map(|config| config.base_url.clone())
            .unwrap_or_else(|| "http://localhost:8000/api".into());
        let mut token = env_config.and_then(|config| config.bearer_token);
        let mut username = std::env::var("QUIZ_USERNAME").ok();
        let mut category = CategoryId::new(1);
        let mut difficulty = DifficultyId::new(1);
        let mut limit = 10;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--base-url" => base_url = require_value(args, "--base-url")?,
                "--token" => token = Some(require_value(args, "--token")?),
                "--username" => username = Some(require_value(args, "--username")?),
                "--category" => {
                    let raw = require_value(args, "--category")?;
                    category = CategoryId::new(parse_id("--category", raw)?);
                }
                "--difficulty" => {
                    let raw = require_value(args, "--difficulty")?;
                    difficulty = DifficultyId::new(parse_id("--difficulty", raw)?);
                }
                "--limit" => {
                    let raw = require_value(args, "--limit")?;
                    limit = parse_id("--limit", raw)? as u32;
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            base_url,
            token,
            username,
            category,
            difficulty,
            limit,
        })
    }
}

fn prompt(line: &str) -> io::Result<String> {
    print!("{line}");
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().lock().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

fn show_question(controller: &QuizSessionController) {
    let Some(question) = controller.current_question() else {
        return;
    };
    let progress = controller.progress();
    if let Some(progress) = progress {
        println!();
        println!(
            "Question ({} of {} answered): {}",
            progress.answered,
            progress.total,
            question.text()
        );
    }
    let selection = controller.current_selection();
    for (index, answer) in question.answers().iter().enumerate() {
        let marker = if selection == Some(answer.id) { "*" } else { " " };
        println!("  {marker} [{}] {}", index + 1, answer.text);
    }
    println!("Commands: 1-{} select, c confirm, n next, p previous, q quit", question.answers().len());
}

fn show_result(controller: &QuizSessionController) {
    let Some(result) = controller.result() else {
        return;
    };
    println!();
    println!(
        "Finished: {}/{} correct ({}%) in {}s",
        result.correct_answers,
        result.total_questions,
        result.score_percent,
        result.time_taken_seconds
    );
    for outcome in &result.per_question {
        let mark = if outcome.is_correct { "ok" } else { "miss" };
        println!("  question {}: {mark}", outcome.question_id);
    }
    match controller.save_status() {
        Some(SaveStatus::Saved) => println!("Result saved."),
        Some(SaveStatus::Failed) => println!("Result could not be saved; your score is shown above."),
        Some(SaveStatus::Skipped) => println!("Sign in to keep your scores."),
        _ => {}
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);
    let args = Args::parse(&mut argv).map_err(|err| {
        eprintln!("{err}");
        print_usage();
        err
    })?;

    let mut config = QuizApiConfig::new(args.base_url.clone());
    if let Some(token) = &args.token {
        config = config.with_token(token.clone());
    }
    let api = Arc::new(HttpQuizApi::new(config));

    let auth = Arc::new(AuthProvider::new());
    if args.token.is_some() {
        let username = args.username.clone().unwrap_or_else(|| "user".into());
        auth.login(UserProfile::new(UserId::new(0), username));
    }

    let controller = QuizSessionController::new(
        Clock::default_clock(),
        api.clone(),
        api,
        auth.as_ref(),
    )
    .with_question_limit(args.limit);

    println!(
        "Loading questions (category {}, difficulty {})...",
        args.category, args.difficulty
    );
    match controller.start(args.category, args.difficulty).await? {
        SessionPhase::Empty => {
            println!("No questions exist for this category and difficulty yet.");
            return Ok(());
        }
        SessionPhase::Errored => {
            let reason = controller.fetch_error().unwrap_or_default();
            eprintln!("Could not load questions: {reason}");
            let again = prompt("Retry? [y/N] ")?;
            if !again.eq_ignore_ascii_case("y")
                || controller.retry().await? != SessionPhase::Active
            {
                return Ok(());
            }
        }
        _ => {}
    }

    while controller.phase() == SessionPhase::Active {
        show_question(&controller);
        let input = prompt("> ")?;
        match input.as_str() {
            "q" => return Ok(()),
            "c" => {
                if let Ok(submitted) = controller.confirm_answer() {
                    let question = controller.current_question();
                    if submitted.is_correct {
                        println!("Correct!");
                    } else {
                        println!("Not quite.");
                    }
                    if let Some(explanation) =
                        question.as_ref().and_then(|question| question.explanation())
                    {
                        println!("  {explanation}");
                    }
                } else {
                    println!("Select an answer first.");
                }
            }
            "n" => {
                if controller.go_to_next().await.is_err() {
                    println!("Confirm your answer before moving on.");
                }
            }
            "p" => {
                if controller.go_to_previous().is_err() {
                    println!("Already at the first question.");
                }
            }
            raw => match raw.parse::<usize>() {
                Ok(choice) if choice >= 1 => {
                    let picked = controller.current_question().and_then(|question| {
                        question.answers().get(choice - 1).map(|answer| answer.id)
                    });
                    match picked {
                        Some(answer_id) => {
                            if !controller.select_answer(answer_id).unwrap_or(false) {
                                println!("This question is already submitted.");
                            }
                        }
                        None => println!("No such choice."),
                    }
                }
                _ => println!("Unrecognized command."),
            },
        }
    }

    show_result(&controller);
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    if let Err(err) = run().await {
        // at this layer, printing once is fine
        eprintln!("{err}");
        std::process::exit(2);
    }
}
