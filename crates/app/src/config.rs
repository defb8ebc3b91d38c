use std::fmt;
use std::path::{Path, PathBuf};

use lexi_core::model::{ItemCorrection, ItemId, LanguagePair, UserId};
use services::DEFAULT_SESSION_LIMIT;

pub const DEFAULT_DB_URL: &str = "sqlite://lexi.sqlite3";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_LEARN_BATCH: u32 = 10;

#[derive(Debug, PartialEq, Eq)]
pub enum ArgsError {
    MissingValue { flag: &'static str },
    MissingRequired { flag: &'static str },
    UnknownArg(String),
    UnknownCommand(String),
    InvalidValue { flag: &'static str, raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingRequired { flag } => write!(f, "{flag} is required"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown subcommand: {cmd}"),
            ArgsError::InvalidValue { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_flag<T: std::str::FromStr>(flag: &'static str, raw: &str) -> Result<T, ArgsError> {
    raw.trim().parse().map_err(|_| ArgsError::InvalidValue {
        flag,
        raw: raw.to_owned(),
    })
}

//
// ─── CONFIG ────────────────────────────────────────────────────────────────────
//

/// Settings shared by every subcommand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub db_url: String,
    pub user_id: UserId,
    pub pair: Option<LanguagePair>,
    pub limit: Option<u32>,
    pub learn_batch: Option<u32>,
    pub log_level: String,
}

impl Config {
    /// Reads `LEXI_*` variables (and `RUST_LOG`) through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns `ArgsError::InvalidValue` when a variable is set but malformed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ArgsError> {
        let db_url = lookup("LEXI_DB_URL").map_or_else(|| DEFAULT_DB_URL.into(), normalize_sqlite_url);
        let user_id = lookup("LEXI_USER_ID")
            .map(|raw| parse_flag::<u64>("LEXI_USER_ID", &raw))
            .transpose()?
            .map_or_else(|| UserId::new(1), UserId::new);
        let pair = lookup("LEXI_LANGUAGE_PAIR")
            .filter(|raw| !raw.trim().is_empty())
            .map(|raw| parse_flag("LEXI_LANGUAGE_PAIR", &raw))
            .transpose()?;
        let limit = lookup("LEXI_REVIEW_LIMIT")
            .map(|raw| parse_limit("LEXI_REVIEW_LIMIT", &raw))
            .transpose()?;
        let learn_batch = lookup("LEXI_LEARN_BATCH")
            .map(|raw| parse_limit("LEXI_LEARN_BATCH", &raw))
            .transpose()?;
        let log_level = lookup("RUST_LOG").unwrap_or_else(|| DEFAULT_LOG_LEVEL.into());

        Ok(Self {
            db_url,
            user_id,
            pair,
            limit,
            learn_batch,
            log_level,
        })
    }

    /// # Errors
    ///
    /// See [`Self::from_lookup`].
    pub fn from_env() -> Result<Self, ArgsError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Queue size for review sessions.
    #[must_use]
    pub fn review_limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_SESSION_LIMIT)
    }

    /// How many new words a learn run offers.
    #[must_use]
    pub fn learn_batch(&self) -> u32 {
        self.learn_batch.unwrap_or(DEFAULT_LEARN_BATCH)
    }
}

fn parse_limit(flag: &'static str, raw: &str) -> Result<u32, ArgsError> {
    let limit: u32 = parse_flag(flag, raw)?;
    if limit == 0 {
        return Err(ArgsError::InvalidValue {
            flag,
            raw: raw.to_owned(),
        });
    }
    Ok(limit)
}

//
// ─── COMMANDS ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItem {
    pub text: String,
    pub translation: String,
    pub example: Option<String>,
    pub phonetic: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Add(NewItem),
    Correct { item_id: ItemId, correction: ItemCorrection },
    Remove { item_id: ItemId },
    History { item_id: ItemId },
    List,
    Stats,
    Due,
    Learn,
    Review,
    Help,
}

#[derive(Debug)]
pub struct Args {
    pub config: Config,
    pub command: Command,
}

#[derive(Default)]
struct ItemFlags {
    text: Option<String>,
    translation: Option<String>,
    example: Option<String>,
    phonetic: Option<String>,
}

impl Args {
    /// Parses `argv` (without the program name) over an environment-derived config.
    /// Flags override environment values.
    ///
    /// # Errors
    ///
    /// Returns `ArgsError` for unknown commands, unknown flags, or malformed values.
    pub fn parse(
        argv: impl IntoIterator<Item = String>,
        mut config: Config,
    ) -> Result<Self, ArgsError> {
        let mut args = argv.into_iter();
        let Some(name) = args.next() else {
            return Ok(Self {
                config,
                command: Command::Help,
            });
        };

        let mut positional: Option<String> = None;
        let mut item = ItemFlags::default();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    config.db_url = normalize_sqlite_url(value);
                }
                "--user" => {
                    let value = require_value(&mut args, "--user")?;
                    config.user_id = UserId::new(parse_flag("--user", &value)?);
                }
                "--pair" => {
                    let value = require_value(&mut args, "--pair")?;
                    config.pair = Some(parse_flag("--pair", &value)?);
                }
                "--limit" => {
                    let value = require_value(&mut args, "--limit")?;
                    config.limit = Some(parse_limit("--limit", &value)?);
                }
                "--batch" => {
                    let value = require_value(&mut args, "--batch")?;
                    config.learn_batch = Some(parse_limit("--batch", &value)?);
                }
                "--text" => item.text = Some(require_value(&mut args, "--text")?),
                "--translation" => {
                    item.translation = Some(require_value(&mut args, "--translation")?);
                }
                "--example" => item.example = Some(require_value(&mut args, "--example")?),
                "--phonetic" => item.phonetic = Some(require_value(&mut args, "--phonetic")?),
                "--help" | "-h" => {
                    return Ok(Self {
                        config,
                        command: Command::Help,
                    });
                }
                other if !other.starts_with("--") && positional.is_none() => {
                    positional = Some(arg);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        let item_id = |positional: Option<String>| -> Result<ItemId, ArgsError> {
            let raw = positional.ok_or(ArgsError::MissingRequired { flag: "<item-id>" })?;
            parse_flag("<item-id>", &raw)
        };

        let command = match name.as_str() {
            "add" => Command::Add(NewItem {
                text: item
                    .text
                    .or(positional)
                    .ok_or(ArgsError::MissingRequired { flag: "--text" })?,
                translation: item
                    .translation
                    .ok_or(ArgsError::MissingRequired { flag: "--translation" })?,
                example: item.example,
                phonetic: item.phonetic,
            }),
            "correct" => Command::Correct {
                item_id: item_id(positional)?,
                correction: ItemCorrection {
                    text: item.text,
                    translation: item.translation,
                    example: item.example,
                    phonetic: item.phonetic,
                },
            },
            "remove" => Command::Remove {
                item_id: item_id(positional)?,
            },
            "history" => Command::History {
                item_id: item_id(positional)?,
            },
            "list" => Command::List,
            "stats" => Command::Stats,
            "due" => Command::Due,
            "learn" => Command::Learn,
            "review" => Command::Review,
            "help" | "--help" | "-h" => Command::Help,
            other => return Err(ArgsError::UnknownCommand(other.to_owned())),
        };

        Ok(Self { config, command })
    }
}

pub fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  app add --text <word> --translation <text> [--example <s>] [--phonetic <s>]");
    eprintln!("  app correct <item-id> [--text ..] [--translation ..] [--example ..] [--phonetic ..]");
    eprintln!("  app remove <item-id>");
    eprintln!("  app history <item-id>");
    eprintln!("  app list");
    eprintln!("  app stats");
    eprintln!("  app due");
    eprintln!("  app learn [--batch <n>]");
    eprintln!("  app review");
    eprintln!();
    eprintln!("Common flags:");
    eprintln!("  --db <sqlite_url>   (default {DEFAULT_DB_URL})");
    eprintln!("  --user <id>         (default 1)");
    eprintln!("  --pair <src-dst>    e.g. en-ru; required by add");
    eprintln!("  --limit <n>         cards per review session (default {DEFAULT_SESSION_LIMIT})");
    eprintln!("  --batch <n>         new words per learn run (default {DEFAULT_LEARN_BATCH})");
    eprintln!();
    eprintln!("Environment (a .env file is read if present):");
    eprintln!("  LEXI_DB_URL, LEXI_USER_ID, LEXI_LANGUAGE_PAIR, LEXI_REVIEW_LIMIT,");
    eprintln!("  LEXI_LEARN_BATCH, RUST_LOG");
}

//
// ─── SQLITE FILE ───────────────────────────────────────────────────────────────
//

pub fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

/// Creates the database file (and its directory) so `SQLite` can open it.
///
/// # Errors
///
/// Returns `ArgsError::InvalidDbUrl` for URLs without a file path and I/O errors
/// if the file cannot be created.
pub fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ArgsError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    fn parse(argv: &[&str], cfg: Config) -> Result<Args, ArgsError> {
        Args::parse(argv.iter().map(|s| (*s).to_owned()), cfg)
    }

    #[test]
    fn env_defaults() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.db_url, DEFAULT_DB_URL);
        assert_eq!(cfg.user_id, UserId::new(1));
        assert_eq!(cfg.pair, None);
        assert_eq!(cfg.review_limit(), DEFAULT_SESSION_LIMIT);
        assert_eq!(cfg.learn_batch(), DEFAULT_LEARN_BATCH);
        assert_eq!(cfg.log_level, "info");
    }

    #[test]
    fn env_values_are_validated() {
        let cfg = config(&[
            ("LEXI_USER_ID", "42"),
            ("LEXI_LANGUAGE_PAIR", "ko_ru"),
            ("LEXI_REVIEW_LIMIT", "5"),
        ])
        .unwrap();
        assert_eq!(cfg.user_id, UserId::new(42));
        assert_eq!(cfg.pair, Some("ko-ru".parse().unwrap()));
        assert_eq!(cfg.limit, Some(5));

        assert_eq!(
            config(&[("LEXI_REVIEW_LIMIT", "0")]).unwrap_err(),
            ArgsError::InvalidValue {
                flag: "LEXI_REVIEW_LIMIT",
                raw: "0".into()
            }
        );
        assert!(config(&[("LEXI_USER_ID", "abc")]).is_err());
    }

    #[test]
    fn flags_override_env() {
        let cfg = config(&[("LEXI_USER_ID", "42")]).unwrap();
        let args = parse(&["review", "--user", "7", "--pair", "en-ru", "--limit", "3"], cfg).unwrap();
        assert_eq!(args.command, Command::Review);
        assert_eq!(args.config.user_id, UserId::new(7));
        assert_eq!(args.config.review_limit(), 3);
    }

    #[test]
    fn learn_batch_is_separate_from_review_limit() {
        let cfg = config(&[("LEXI_REVIEW_LIMIT", "3"), ("LEXI_LEARN_BATCH", "25")]).unwrap();
        assert_eq!(cfg.review_limit(), 3);
        assert_eq!(cfg.learn_batch(), 25);

        let args = parse(&["learn", "--limit", "50"], config(&[]).unwrap()).unwrap();
        assert_eq!(args.config.learn_batch(), DEFAULT_LEARN_BATCH);
        let args = parse(&["learn", "--batch", "4"], args.config).unwrap();
        assert_eq!(args.command, Command::Learn);
        assert_eq!(args.config.learn_batch(), 4);
        assert_eq!(args.config.review_limit(), 50);

        assert!(matches!(
            parse(&["learn", "--batch", "0"], config(&[]).unwrap()),
            Err(ArgsError::InvalidValue { flag: "--batch", .. })
        ));
        assert!(config(&[("LEXI_LEARN_BATCH", "-1")]).is_err());
    }

    #[test]
    fn add_requires_text_and_translation() {
        let cfg = config(&[]).unwrap();
        let args = parse(
            &["add", "apple", "--translation", "яблоко", "--phonetic", "/ˈæp.əl/"],
            cfg.clone(),
        )
        .unwrap();
        assert_eq!(
            args.command,
            Command::Add(NewItem {
                text: "apple".into(),
                translation: "яблоко".into(),
                example: None,
                phonetic: Some("/ˈæp.əl/".into()),
            })
        );

        assert_eq!(
            parse(&["add", "--text", "apple"], cfg).unwrap_err(),
            ArgsError::MissingRequired {
                flag: "--translation"
            }
        );
    }

    #[test]
    fn item_commands_take_an_id() {
        let cfg = config(&[]).unwrap();
        let args = parse(&["remove", "12"], cfg.clone()).unwrap();
        assert_eq!(
            args.command,
            Command::Remove {
                item_id: ItemId::new(12)
            }
        );
        assert!(matches!(
            parse(&["remove"], cfg.clone()),
            Err(ArgsError::MissingRequired { .. })
        ));
        assert!(matches!(
            parse(&["remove", "x"], cfg.clone()),
            Err(ArgsError::InvalidValue { .. })
        ));
        assert_eq!(
            parse(&["history", "3"], cfg.clone()).unwrap().command,
            Command::History {
                item_id: ItemId::new(3)
            }
        );
        assert_eq!(parse(&["stats"], cfg).unwrap().command, Command::Stats);
    }

    #[test]
    fn unknown_input_is_rejected() {
        let cfg = config(&[]).unwrap();
        assert_eq!(
            parse(&["teach"], cfg.clone()).unwrap_err(),
            ArgsError::UnknownCommand("teach".into())
        );
        assert_eq!(
            parse(&["list", "--folder", "1"], cfg.clone()).unwrap_err(),
            ArgsError::UnknownArg("--folder".into())
        );
        assert_eq!(parse(&[], cfg).unwrap().command, Command::Help);
    }

    #[test]
    fn relative_paths_become_absolute_urls() {
        let url = normalize_sqlite_url("sqlite:data/lexi.db".into());
        assert!(url.starts_with("sqlite:///"));
        assert!(url.ends_with("data/lexi.db"));
        assert_eq!(
            normalize_sqlite_url("sqlite::memory:".into()),
            "sqlite::memory:"
        );
    }
}
