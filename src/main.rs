mod ai;
mod command;
mod config;
mod constants;
mod credentials;
mod render;
mod session;
mod storage;
mod store;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate, TimeZone};
use std::env;
use std::io::{self, Read, Write};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::ai::{DraftRequest, GeminiClient, request_draft};
use crate::command::{
    CategoryCommand, DraftArgs, ParsedCommand, ProfessorCommand, TemplateCommand, USAGE,
    parse_command,
};
use crate::config::Config;
use crate::constants::VARIABLES;
use crate::credentials::ApiKeyStore;
use crate::render::{date_label, render};
use crate::session::Session;
use crate::storage::Storage;
use crate::store::Template;

fn setup_logging() {
    use std::fs::OpenOptions;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,profmail=debug"));

    let log_file = Config::config_dir()
        .ok()
        .and_then(|dir| std::fs::create_dir_all(&dir).ok().map(|_| dir))
        .map(|dir| dir.join("profmail.log"))
        .and_then(|path| OpenOptions::new().create(true).append(true).open(&path).ok());

    if let Some(file) = log_file {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::sync::Mutex::new(file))
                    .with_ansi(false),
            )
            .init();
    } else {
        // stdout carries command output, so fall back to stderr
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn run_setup() -> Result<()> {
    println!("profmail setup");
    println!("==============\n");

    let config_path = Config::config_path()?;
    if !config_path.exists() {
        Config::default().save()?;
        println!("Wrote default configuration to {}", config_path.display());
    }

    print!("AI API key (leave empty to skip): ");
    io::stdout().flush()?;
    let key = read_secret()?;
    println!();

    if key.is_empty() {
        println!("No API key stored. Drafts will be sent without a key (proxy mode).");
        return Ok(());
    }

    ApiKeyStore::new().set(&key)?;
    println!("API key stored.");
    Ok(())
}

fn read_secret() -> Result<String> {
    let _guard = DisableEcho::new()?;

    let mut secret = String::new();
    io::stdin().read_line(&mut secret)?;
    Ok(secret.trim().to_string())
}

struct DisableEcho {
    #[cfg(unix)]
    original: libc::termios,
}

impl DisableEcho {
    #[cfg(unix)]
    fn new() -> Result<Self> {
        use std::mem::MaybeUninit;
        use std::os::unix::io::AsRawFd;

        let fd = io::stdin().as_raw_fd();
        let mut termios = MaybeUninit::<libc::termios>::uninit();

        unsafe {
            if libc::tcgetattr(fd, termios.as_mut_ptr()) != 0 {
                anyhow::bail!("Failed to get terminal attributes");
            }
            let original = termios.assume_init();
            let mut quiet = original;
            quiet.c_lflag &= !libc::ECHO;
            if libc::tcsetattr(fd, libc::TCSANOW, &quiet) != 0 {
                anyhow::bail!("Failed to set terminal attributes");
            }
            Ok(Self { original })
        }
    }

    #[cfg(not(unix))]
    fn new() -> Result<Self> {
        Ok(Self {})
    }
}

#[cfg(unix)]
impl Drop for DisableEcho {
    fn drop(&mut self) {
        use std::os::unix::io::AsRawFd;
        let fd = io::stdin().as_raw_fd();
        unsafe {
            libc::tcsetattr(fd, libc::TCSANOW, &self.original);
        }
    }
}

/// `-` means "read from stdin"; a single trailing newline is dropped.
fn resolve_text(value: String) -> Result<String> {
    if value != "-" {
        return Ok(value);
    }
    let mut text = String::new();
    io::stdin()
        .read_to_string(&mut text)
        .context("Failed to read stdin")?;
    if text.ends_with('\n') {
        text.pop();
        if text.ends_with('\r') {
            text.pop();
        }
    }
    Ok(text)
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn format_timestamp(ms: i64) -> String {
    match Local.timestamp_millis_opt(ms).single() {
        Some(time) => time.format("%Y年%-m月%-d日").to_string(),
        None => "-".to_string(),
    }
}

fn print_template_line(template: &Template) {
    println!(
        "{} {}\t[{}]\t{}\t{}",
        if template.is_favorite { "★" } else { " " },
        template.id,
        template.category.name,
        template.title,
        format_timestamp(template.updated_at)
    );
}

fn print_status(config: &Config) -> Result<()> {
    println!("Config file: {}", Config::config_path()?.display());
    println!("Store:       {}", config.storage_path()?.display());
    println!(
        "AI drafts:   {} ({})",
        if config.ai.enabled {
            "enabled"
        } else {
            "disabled"
        },
        config.ai.endpoint
    );
    println!("{}", ApiKeyStore::new().debug_info());
    Ok(())
}

async fn run_professors(session: &mut Session, cmd: ProfessorCommand) -> Result<()> {
    match cmd {
        ProfessorCommand::List => {
            for p in session.state().professors.as_slice() {
                println!("{}\t{}\t{}", p.id, p.name, p.email);
            }
        }
        ProfessorCommand::Add { name, email } => {
            let p = session.add_professor(&name, &email).await?;
            println!("Added professor {} ({})", p.name, p.id);
        }
        ProfessorCommand::Edit { id, name, email } => {
            let p = session.edit_professor(&id, &name, &email).await?;
            println!("Updated professor {} ({})", p.name, p.id);
        }
        ProfessorCommand::Remove { id } => {
            if session.remove_professor(&id).await? {
                println!("Removed professor {id}");
            }
        }
    }
    Ok(())
}

async fn run_categories(session: &mut Session, cmd: CategoryCommand) -> Result<()> {
    match cmd {
        CategoryCommand::List => {
            let state = session.state();
            for c in state.categories.as_slice() {
                println!(
                    "{}\t{}\t{}\t({} templates)",
                    c.id,
                    c.name,
                    c.color,
                    state.templates.list_by_category(&c.id).len()
                );
            }
        }
        CategoryCommand::Add { name, color } => {
            let c = session.add_category(&name, color.as_deref()).await?;
            println!("Added category {} ({})", c.name, c.id);
        }
        CategoryCommand::Remove { id } => {
            if session.delete_category(&id).await? {
                println!("Removed category {id}");
            }
        }
    }
    Ok(())
}

async fn run_templates(session: &mut Session, cmd: TemplateCommand) -> Result<()> {
    match cmd {
        TemplateCommand::List {
            category,
            favorites_only,
            search,
        } => {
            let state = session.state();
            if state.templates.is_empty() {
                println!("No templates yet. Create one with `profmail templates new`.");
                return Ok(());
            }
            let templates = state
                .templates
                .filtered(&category, favorites_only, search.as_deref());
            for template in templates {
                print_template_line(template);
            }
        }
        TemplateCommand::Show { id } => {
            let t = session.state().template(&id)?;
            println!("Title:    {}", t.title);
            println!("Category: {} ({})", t.category.name, t.category.color);
            println!("Favorite: {}", if t.is_favorite { "yes" } else { "no" });
            println!("Created:  {}", format_timestamp(t.created_at));
            println!("Updated:  {}", format_timestamp(t.updated_at));
            println!();
            println!("{}", t.content);
        }
        TemplateCommand::New {
            title,
            content,
            category,
        } => {
            let content = resolve_text(content)?;
            let t = session
                .create_template(&title, &content, category.as_deref())
                .await?;
            println!("Saved template {} ({})", t.title, t.id);
        }
        TemplateCommand::Edit {
            id,
            title,
            content,
            category,
        } => {
            let content = content.map(resolve_text).transpose()?;
            let t = session
                .update_template(&id, title, content, category.as_deref())
                .await?;
            println!("Saved template {} ({})", t.title, t.id);
        }
        TemplateCommand::Remove { id } => {
            if session.delete_template(&id).await? {
                println!("Removed template {id}");
            }
        }
        TemplateCommand::Favorite { id } => {
            if let Some(favorite) = session.toggle_favorite(&id).await? {
                println!("{} {}", if favorite { "★" } else { "☆" }, id);
            }
        }
    }
    Ok(())
}

async fn run_draft(session: &mut Session, config: &Config, args: DraftArgs) -> Result<()> {
    if !config.ai.enabled {
        anyhow::bail!("AI drafting is disabled in {}", Config::config_path()?.display());
    }

    let date = args.date.unwrap_or_else(today);
    let label = date_label(date);
    let editor = session.editor_template(args.template.as_deref())?;

    let state = session.state();
    let professor = state.professor(&args.professor)?;
    let request = DraftRequest {
        purpose: &args.purpose,
        tone: args.tone,
        extra_context: &args.context,
        professor_name: Some(&professor.name),
        sender_name: &state.sender_name,
        date_label: &label,
    };

    let client = GeminiClient::new(config.ai.endpoint.clone(), ApiKeyStore::new().get());
    let draft = request_draft(&client, &request, &editor.title).await?;

    println!("Title: {}", draft.title);
    if !draft.title_generated {
        println!("(タイトルの生成に失敗しました)");
    }
    println!();
    println!("{}", draft.content);
    println!();
    println!("--- preview ---");
    println!(
        "{}",
        render(&draft.content, &state.render_context(Some(professor), date))
    );

    if args.save {
        let saved = session.save_draft(args.template.as_deref(), draft).await?;
        println!();
        println!("Saved template {} ({})", saved.title, saved.id);
    }
    Ok(())
}

async fn run(command: ParsedCommand) -> Result<()> {
    let config = Config::load()?;
    config.ensure_dirs()?;

    if let ParsedCommand::Status = command {
        return print_status(&config);
    }

    let storage = Storage::open(&config.storage_path()?).await?;
    let mut session = Session::open(storage).await?;

    match command {
        ParsedCommand::Variables => {
            for (token, description) in VARIABLES {
                println!("{token}\t{description}");
            }
        }
        ParsedCommand::SetName(name) => {
            session.set_sender_name(&name).await?;
            println!("Name set to {}", session.state().sender_name);
        }
        ParsedCommand::SetSignature(text) => {
            session.set_signature(&resolve_text(text)?).await?;
            println!("Signature saved");
        }
        ParsedCommand::Professors(cmd) => run_professors(&mut session, cmd).await?,
        ParsedCommand::Categories(cmd) => run_categories(&mut session, cmd).await?,
        ParsedCommand::Templates(cmd) => run_templates(&mut session, cmd).await?,
        ParsedCommand::Render {
            template,
            professor,
            date,
        } => {
            let text = session.render_template(
                &template,
                professor.as_deref(),
                date.unwrap_or_else(today),
            )?;
            println!("{text}");
        }
        ParsedCommand::Draft(args) => run_draft(&mut session, &config, args).await?,
        ParsedCommand::Help | ParsedCommand::Setup | ParsedCommand::Status => {}
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();

    let command = match parse_command(&args) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("{e}\n");
            eprint!("{USAGE}");
            std::process::exit(1);
        }
    };

    match command {
        ParsedCommand::Help => {
            print!("{USAGE}");
            Ok(())
        }
        ParsedCommand::Setup => run_setup(),
        command => {
            setup_logging();
            if let Err(e) = run(command).await {
                tracing::error!("{:#}", e);
                eprintln!("エラー: {e:#}");
                std::process::exit(1);
            }
            Ok(())
        }
    }
}
