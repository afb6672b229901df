//! registrar-client: interactive front end for the registration server.
//!
//! Sends exactly one command per run and prints the server's reply.

use clap::Parser;
use registrar::client::{render, Client};
use registrar::model::{RegistrationForm, SESSIONS};
use std::io::{self, Write};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing_subscriber::EnvFilter;

/// Command-line arguments for the registration client
#[derive(Parser, Debug)]
#[command(name = "registrar-client")]
#[command(version)]
#[command(about = "Course registration client", long_about = None)]
struct ClientArgs {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:1337")]
    server: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

/// Line-oriented reader over standard input.
struct Prompt {
    lines: Lines<BufReader<Stdin>>,
}

impl Prompt {
    fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    async fn ask(&mut self, question: &str) -> io::Result<String> {
        print!("{question}");
        io::stdout().flush()?;
        match self.lines.next_line().await? {
            Some(line) => Ok(line.trim().to_string()),
            None => Err(io::Error::new(io::ErrorKind::UnexpectedEof, "input closed")),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = ClientArgs::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let client = Client::new(args.server);
    let mut prompt = Prompt::new();

    println!("*** Course registration portal ***");
    println!("1. List the courses offered during a session");
    println!("2. Register for a course");

    let result = match prompt.ask("> Choice: ").await?.as_str() {
        "1" => {
            let Some(session) = choose_session(&mut prompt).await? else {
                println!("Invalid session choice.");
                return Ok(());
            };
            println!("Courses offered during the {session} session:");
            client.load_courses(session).await
        }
        "2" => {
            let form = read_form(&mut prompt).await?;
            client.register(&form).await
        }
        _ => {
            println!("Invalid choice.");
            return Ok(());
        }
    };

    match result {
        Ok(response) => println!("{}", render(&response)),
        Err(e) => {
            eprintln!("Request failed: {e}");
            std::process::exit(1);
        }
    }
    Ok(())
}

async fn choose_session(prompt: &mut Prompt) -> io::Result<Option<&'static str>> {
    println!("Pick a session:");
    for (i, session) in SESSIONS.iter().enumerate() {
        println!("{}. {}", i + 1, session);
    }

    let choice = prompt.ask("> Choice: ").await?;
    Ok(choice
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| SESSIONS.get(i).copied()))
}

async fn read_form(prompt: &mut Prompt) -> io::Result<RegistrationForm> {
    let first_name = prompt.ask("First name: ").await?;
    let last_name = prompt.ask("Last name: ").await?;
    let email = prompt.ask("Email: ").await?;
    let student_id = prompt.ask("Student ID: ").await?;
    let session = prompt.ask("Session: ").await?;
    let course_code = prompt.ask("Course code: ").await?;

    Ok(RegistrationForm {
        student_id,
        course_code,
        session,
        first_name,
        last_name,
        email,
    })
}
