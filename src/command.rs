//! Command-line parsing
//!
//! Arguments are `<command> [subcommand] [positional...] [--flag value]...`.
//! Flags may appear anywhere after the command.

use chrono::NaiveDate;
use std::collections::HashMap;

use crate::ai::Tone;
use crate::constants::ALL_CATEGORIES;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfessorCommand {
    List,
    Add { name: String, email: String },
    Edit { id: String, name: String, email: String },
    Remove { id: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryCommand {
    List,
    Add { name: String, color: Option<String> },
    Remove { id: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateCommand {
    List {
        category: String,
        favorites_only: bool,
        search: Option<String>,
    },
    Show { id: String },
    New {
        title: String,
        content: String,
        category: Option<String>,
    },
    Edit {
        id: String,
        title: Option<String>,
        content: Option<String>,
        category: Option<String>,
    },
    Remove { id: String },
    Favorite { id: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftArgs {
    pub professor: String,
    pub purpose: String,
    pub tone: Tone,
    pub context: String,
    pub date: Option<NaiveDate>,
    pub template: Option<String>,
    pub save: bool,
}

/// Parsed command from the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedCommand {
    Help,
    Setup,
    Status,
    Variables,
    SetName(String),
    /// `-` reads the signature from stdin
    SetSignature(String),
    Professors(ProfessorCommand),
    Categories(CategoryCommand),
    Templates(TemplateCommand),
    Render {
        template: String,
        professor: Option<String>,
        date: Option<NaiveDate>,
    },
    Draft(DraftArgs),
}

/// Flags that take no value
const SWITCHES: [&str; 2] = ["favorites", "save"];

struct Args {
    positional: Vec<String>,
    flags: HashMap<String, String>,
    switches: Vec<String>,
}

impl Args {
    fn split(args: &[String]) -> Result<Self, String> {
        let mut positional = Vec::new();
        let mut flags = HashMap::new();
        let mut switches = Vec::new();

        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            let Some(name) = arg.strip_prefix("--") else {
                positional.push(arg.clone());
                continue;
            };
            if SWITCHES.contains(&name) {
                switches.push(name.to_string());
                continue;
            }
            let value = iter
                .next()
                .ok_or_else(|| format!("Missing value for --{name}"))?;
            flags.insert(name.to_string(), value.clone());
        }

        Ok(Self {
            positional,
            flags,
            switches,
        })
    }

    fn pos(&self, idx: usize, what: &str) -> Result<String, String> {
        self.positional
            .get(idx)
            .cloned()
            .ok_or_else(|| format!("Missing {what}"))
    }

    fn pos_opt(&self, idx: usize) -> Option<String> {
        self.positional.get(idx).cloned()
    }

    fn flag(&self, name: &str) -> Option<String> {
        self.flags.get(name).cloned()
    }

    fn required_flag(&self, name: &str) -> Result<String, String> {
        self.flag(name).ok_or_else(|| format!("Missing --{name}"))
    }

    fn switch(&self, name: &str) -> bool {
        self.switches.iter().any(|s| s == name)
    }

    fn date(&self) -> Result<Option<NaiveDate>, String> {
        self.flag("date").map(|d| parse_date(&d)).transpose()
    }

    /// Reject flags the command does not know about
    fn only_flags(&self, allowed: &[&str]) -> Result<(), String> {
        let unknown = self
            .flags
            .keys()
            .chain(self.switches.iter())
            .find(|name| !allowed.contains(&name.as_str()));
        match unknown {
            Some(name) => Err(format!("Unknown option: --{name}")),
            None => Ok(()),
        }
    }
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| format!("Invalid date: {value} (expected YYYY-MM-DD)"))
}

/// Parse the arguments after the program name.
pub fn parse_command(args: &[String]) -> Result<ParsedCommand, String> {
    let Some((command, rest)) = args.split_first() else {
        return Ok(ParsedCommand::Help);
    };
    let args = Args::split(rest)?;

    match command.as_str() {
        "help" | "--help" | "-h" => Ok(ParsedCommand::Help),
        "setup" => Ok(ParsedCommand::Setup),
        "status" => Ok(ParsedCommand::Status),
        "variables" | "vars" => Ok(ParsedCommand::Variables),
        "name" => {
            args.only_flags(&[])?;
            Ok(ParsedCommand::SetName(args.positional.join(" ")))
        }
        "signature" => {
            args.only_flags(&[])?;
            Ok(ParsedCommand::SetSignature(args.pos(0, "signature text")?))
        }
        "professors" | "prof" => parse_professors(&args).map(ParsedCommand::Professors),
        "categories" | "cat" => parse_categories(&args).map(ParsedCommand::Categories),
        "templates" | "tpl" => parse_templates(&args).map(ParsedCommand::Templates),
        "render" => {
            args.only_flags(&["professor", "date"])?;
            Ok(ParsedCommand::Render {
                template: args.pos(0, "template id")?,
                professor: args.flag("professor"),
                date: args.date()?,
            })
        }
        "draft" => parse_draft(&args).map(ParsedCommand::Draft),
        other => Err(format!("Unknown command: {other}")),
    }
}

fn parse_professors(args: &Args) -> Result<ProfessorCommand, String> {
    args.only_flags(&[])?;
    match args.pos_opt(0).as_deref() {
        None | Some("list") => Ok(ProfessorCommand::List),
        Some("add") => Ok(ProfessorCommand::Add {
            name: args.pos(1, "professor name")?,
            email: args.pos_opt(2).unwrap_or_default(),
        }),
        Some("edit") => Ok(ProfessorCommand::Edit {
            id: args.pos(1, "professor id")?,
            name: args.pos(2, "professor name")?,
            email: args.pos_opt(3).unwrap_or_default(),
        }),
        Some("remove" | "rm") => Ok(ProfessorCommand::Remove {
            id: args.pos(1, "professor id")?,
        }),
        Some(other) => Err(format!("Unknown professors subcommand: {other}")),
    }
}

fn parse_categories(args: &Args) -> Result<CategoryCommand, String> {
    args.only_flags(&[])?;
    match args.pos_opt(0).as_deref() {
        None | Some("list") => Ok(CategoryCommand::List),
        Some("add") => Ok(CategoryCommand::Add {
            name: args.pos(1, "category name")?,
            color: args.pos_opt(2),
        }),
        Some("remove" | "rm") => Ok(CategoryCommand::Remove {
            id: args.pos(1, "category id")?,
        }),
        Some(other) => Err(format!("Unknown categories subcommand: {other}")),
    }
}

fn parse_templates(args: &Args) -> Result<TemplateCommand, String> {
    match args.pos_opt(0).as_deref() {
        None | Some("list") => {
            args.only_flags(&["category", "favorites", "search"])?;
            Ok(TemplateCommand::List {
                category: args
                    .flag("category")
                    .unwrap_or_else(|| ALL_CATEGORIES.to_string()),
                favorites_only: args.switch("favorites"),
                search: args.flag("search"),
            })
        }
        Some("show") => {
            args.only_flags(&[])?;
            Ok(TemplateCommand::Show {
                id: args.pos(1, "template id")?,
            })
        }
        Some("new" | "add") => {
            args.only_flags(&["title", "content", "category"])?;
            Ok(TemplateCommand::New {
                title: args.required_flag("title")?,
                content: args.required_flag("content")?,
                category: args.flag("category"),
            })
        }
        Some("edit") => {
            args.only_flags(&["title", "content", "category"])?;
            Ok(TemplateCommand::Edit {
                id: args.pos(1, "template id")?,
                title: args.flag("title"),
                content: args.flag("content"),
                category: args.flag("category"),
            })
        }
        Some("remove" | "rm") => {
            args.only_flags(&[])?;
            Ok(TemplateCommand::Remove {
                id: args.pos(1, "template id")?,
            })
        }
        Some("favorite" | "fav") => {
            args.only_flags(&[])?;
            Ok(TemplateCommand::Favorite {
                id: args.pos(1, "template id")?,
            })
        }
        Some(other) => Err(format!("Unknown templates subcommand: {other}")),
    }
}

fn parse_draft(args: &Args) -> Result<DraftArgs, String> {
    args.only_flags(&[
        "professor", "purpose", "tone", "context", "date", "template", "save",
    ])?;
    let tone = match args.flag("tone") {
        Some(tone) => tone.parse()?,
        None => Tone::default(),
    };
    Ok(DraftArgs {
        professor: args.required_flag("professor")?,
        purpose: args.required_flag("purpose")?,
        tone,
        context: args.flag("context").unwrap_or_default(),
        date: args.date()?,
        template: args.flag("template"),
        save: args.switch("save"),
    })
}

/// Usage text printed by `help` and on parse errors
pub const USAGE: &str = r#"profmail - Email templates for writing to professors

Usage: profmail <command> [args]

Commands:
    setup                                   Store the AI API key
    status                                  Show config and API key sources
    name <name>                             Set your name ({自分の名前})
    signature <text|->                      Set the signature block ({署名})
    variables                               List placeholder tokens

    professors [list]
    professors add <name> [email]
    professors edit <id> <name> [email]
    professors remove <id>

    categories [list]
    categories add <name> [#rrggbb]
    categories remove <id>

    templates [list] [--category <id>|all] [--favorites] [--search <term>]
    templates show <id>
    templates new --title <t> --content <c|-> [--category <id>]
    templates edit <id> [--title <t>] [--content <c|->] [--category <id>]
    templates remove <id>
    templates favorite <id>

    render <template-id> [--professor <id>] [--date YYYY-MM-DD]
    draft --professor <id> --purpose <text> [--tone formal|casual]
          [--context <text>] [--date YYYY-MM-DD] [--template <id>] [--save]

A value of `-` reads the text from stdin.
Configuration file: ~/.config/profmail/config.toml
"#;

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Result<ParsedCommand, String> {
        let args: Vec<String> = line.split_whitespace().map(str::to_string).collect();
        parse_command(&args)
    }

    #[test]
    fn test_no_args_is_help() {
        assert_eq!(parse_command(&[]), Ok(ParsedCommand::Help));
        assert_eq!(parse("--help"), Ok(ParsedCommand::Help));
    }

    #[test]
    fn test_professor_commands() {
        assert_eq!(
            parse("professors"),
            Ok(ParsedCommand::Professors(ProfessorCommand::List))
        );
        assert_eq!(
            parse("professors add 田中 tanaka@example.ac.jp"),
            Ok(ParsedCommand::Professors(ProfessorCommand::Add {
                name: "田中".into(),
                email: "tanaka@example.ac.jp".into(),
            }))
        );
        assert_eq!(
            parse("prof edit 17 佐藤"),
            Ok(ParsedCommand::Professors(ProfessorCommand::Edit {
                id: "17".into(),
                name: "佐藤".into(),
                email: String::new(),
            }))
        );
        assert!(parse("professors add").is_err());
    }

    #[test]
    fn test_template_list_flags() {
        assert_eq!(
            parse("templates --favorites --category 2"),
            Ok(ParsedCommand::Templates(TemplateCommand::List {
                category: "2".into(),
                favorites_only: true,
                search: None,
            }))
        );
        assert_eq!(
            parse("templates list"),
            Ok(ParsedCommand::Templates(TemplateCommand::List {
                category: "all".into(),
                favorites_only: false,
                search: None,
            }))
        );
    }

    #[test]
    fn test_template_new_requires_title_and_content() {
        assert_eq!(
            parse("templates new --title 件名 --content 本文"),
            Ok(ParsedCommand::Templates(TemplateCommand::New {
                title: "件名".into(),
                content: "本文".into(),
                category: None,
            }))
        );
        assert_eq!(
            parse("templates new --title 件名"),
            Err("Missing --content".to_string())
        );
        assert_eq!(
            parse("templates new --title 件名 --content 本文 --color red"),
            Err("Unknown option: --color".to_string())
        );
    }

    #[test]
    fn test_render_with_date() {
        assert_eq!(
            parse("render 100 --professor 7 --date 2025-01-05"),
            Ok(ParsedCommand::Render {
                template: "100".into(),
                professor: Some("7".into()),
                date: NaiveDate::from_ymd_opt(2025, 1, 5),
            })
        );
        assert!(parse("render 100 --date 01/05").is_err());
        assert!(parse("render 100 --date").is_err());
    }

    #[test]
    fn test_draft_defaults() {
        let Ok(ParsedCommand::Draft(args)) = parse("draft --professor 7 --purpose 面談") else {
            panic!("expected draft command");
        };
        assert_eq!(args.tone, Tone::Formal);
        assert_eq!(args.context, "");
        assert!(!args.save);
        assert!(args.template.is_none());

        let Ok(ParsedCommand::Draft(args)) =
            parse("draft --professor 7 --purpose 面談 --tone casual --save --template 3")
        else {
            panic!("expected draft command");
        };
        assert_eq!(args.tone, Tone::Casual);
        assert!(args.save);
        assert_eq!(args.template.as_deref(), Some("3"));

        assert!(parse("draft --professor 7").is_err());
        assert!(parse("draft --professor 7 --purpose x --tone loud").is_err());
    }

    #[test]
    fn test_name_joins_words() {
        assert_eq!(
            parse("name 鈴木 太郎"),
            Ok(ParsedCommand::SetName("鈴木 太郎".into()))
        );
        assert_eq!(parse("name --x y"), Err("Unknown option: --x".to_string()));
    }

    #[test]
    fn test_unknown_command() {
        assert_eq!(parse("send"), Err("Unknown command: send".to_string()));
    }
}
