use std::io::{self, Write};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};

use crate::app::parse_date_input;
use crate::backend::{AuthClient, Query, QueryCache, RestClient, Session, SessionStore, SignUpOutcome};
use crate::citation::{format_citation, CitationData, CitationFormat};
use crate::config::Config;
use crate::discovery::{build_article_query, fetch_page, ARTICLE_VIEW};
use crate::error::{AppError, Result};
use crate::models::{Article, FilterState};
use crate::services::{CollectionService, PreferenceStore};

/// Discover, save, organize and cite research articles.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Screen to open on start-up, e.g. /discovery/articles or /collection/<id>
    #[arg(long)]
    pub route: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sign in with email and password (the password is prompted for without echo)
    SignIn {
        #[arg(long)]
        email: String,
    },
    /// Create an account
    SignUp {
        #[arg(long)]
        email: String,
        #[arg(long)]
        display_name: Option<String>,
    },
    /// Forget the stored session
    SignOut,
    /// Print one page of the discovery feed
    Articles(ArticleArgs),
    /// Print a citation for an article
    Cite {
        article_id: String,
        #[arg(long, value_enum, default_value_t = CitationFormat::Apa)]
        format: CitationFormat,
    },
    /// List your collections
    Collections,
}

#[derive(Args, Debug, Default)]
pub struct ArticleArgs {
    #[arg(long)]
    pub discipline: Option<String>,
    #[arg(long)]
    pub field: Option<String>,
    #[arg(long)]
    pub ticker: Option<String>,
    #[arg(long)]
    pub journal: Option<String>,
    /// Earliest publication date (YYYY-MM-DD)
    #[arg(long)]
    pub from: Option<String>,
    /// Latest publication date (YYYY-MM-DD)
    #[arg(long)]
    pub to: Option<String>,
    #[arg(long)]
    pub search: Option<String>,
    #[arg(long, default_value_t = 1)]
    pub page: usize,
    /// Ignore saved feed preferences
    #[arg(long)]
    pub no_preferences: bool,
}

impl ArticleArgs {
    fn filters(&self) -> Result<FilterState> {
        let from = parse_date_input(self.from.as_deref().unwrap_or(""))?;
        let to = parse_date_input(self.to.as_deref().unwrap_or(""))?;
        if let (Some(from), Some(to)) = (from, to) {
            if from > to {
                return Err(AppError::Validation(
                    "The start date must not be after the end date".to_string(),
                ));
            }
        }

        let mut filters = FilterState {
            search_query: self.search.clone().unwrap_or_default(),
            ticker_symbol: self.ticker.clone().unwrap_or_default(),
            journal: self.journal.clone().unwrap_or_default(),
            date_from: from,
            date_to: to,
            page: self.page.max(1),
            ..FilterState::default()
        };
        if let Some(discipline) = &self.discipline {
            filters.discipline = discipline.clone();
            filters.field = self.field.clone().unwrap_or_default();
        } else if self.field.is_some() {
            return Err(AppError::Validation(
                "--field needs a --discipline".to_string(),
            ));
        }
        Ok(filters)
    }
}

/// Run a headless subcommand.
pub async fn run(command: Command, config: &Config) -> Result<()> {
    let rest = Arc::new(RestClient::new(config, Arc::new(QueryCache::new(config.cache_ttl())))?);
    let auth = AuthClient::new(
        Arc::clone(&rest),
        SessionStore::new(config.session_path.clone()),
    );

    match command {
        Command::SignIn { email } => {
            let password = read_secret("Password: ")?;
            let session = auth.sign_in(&email, &password).await?;
            println!("Signed in as {}", describe(&session));
        }
        Command::SignUp {
            email,
            display_name,
        } => {
            let password = read_secret("Password: ")?;
            let confirmation = read_secret("Confirm password: ")?;
            match auth
                .sign_up(&email, &password, &confirmation, display_name.as_deref())
                .await?
            {
                SignUpOutcome::SignedIn(session) => {
                    println!("Account created; signed in as {}", describe(&session))
                }
                SignUpOutcome::ConfirmationRequired => {
                    println!("Account created. Check your email to confirm it, then sign in.")
                }
            }
        }
        Command::SignOut => {
            auth.sign_out().await?;
            println!("Signed out");
        }
        Command::Articles(args) => {
            let filters = args.filters()?;
            let preferences = match auth.restore().await? {
                Some(session) if !args.no_preferences => {
                    PreferenceStore::new(Arc::clone(&rest), session.user_id())
                        .load()
                        .await?
                }
                _ => None,
            };
            let query = build_article_query(&filters, preferences.as_ref(), config.page_size());
            let page = fetch_page(&rest, &query, preferences.as_ref()).await?;

            let total_pages = (page.total as usize).div_ceil(config.page_size()).max(1);
            println!(
                "{} results, page {} of {}",
                page.total, filters.page, total_pages
            );
            if page.fetched > page.articles.len() {
                println!(
                    "{} articles on this page hidden by keyword rules",
                    page.fetched - page.articles.len()
                );
            }
            println!();
            for article in &page.articles {
                print_article(article);
            }
        }
        Command::Cite { article_id, format } => {
            let article: Option<Article> = rest
                .select_one(Query::from(ARTICLE_VIEW).select("*").eq("id", &article_id))
                .await?;
            let article = article
                .ok_or_else(|| AppError::Rejected(format!("No article with id {article_id}")))?;
            println!("{}", format_citation(&CitationData::from(&article), format));
        }
        Command::Collections => {
            let session = auth
                .restore()
                .await?
                .ok_or_else(|| AppError::Auth("Please sign in first".to_string()))?;
            let mut service =
                CollectionService::new(Arc::clone(&rest), session.user_id(), config.share_base()?);
            let collections = service.refresh().await?;
            if collections.is_empty() {
                println!("No collections yet");
            }
            for collection in collections {
                let visibility = if collection.is_public { "public" } else { "private" };
                println!(
                    "{:<36}  {:<7}  {:>4}  {}",
                    collection.id, visibility, collection.article_count, collection.name
                );
            }
        }
    }

    Ok(())
}

fn describe(session: &Session) -> String {
    session
        .user
        .display_name()
        .or(session.user.email.as_deref())
        .unwrap_or(&session.user.id)
        .to_string()
}

fn read_secret(label: &str) -> Result<String> {
    read_secret_with(label, rpassword::read_password)
}

/// Prompt on stdout, then read through `read` with terminal echo left to the reader.
fn read_secret_with(label: &str, read: impl FnOnce() -> io::Result<String>) -> Result<String> {
    print!("{label}");
    io::stdout().flush()?;
    let secret = read()?;
    Ok(secret.trim_end_matches(['\r', '\n']).to_string())
}

fn print_article(article: &Article) {
    println!("{}", article.title);
    let mut meta = vec![article.id.clone()];
    if let Some(journal) = &article.journal_name {
        meta.push(journal.clone());
    }
    if let Some(date) = article.published_on() {
        meta.push(date.to_string());
    }
    if let Some(ticker) = &article.ticker_symbol {
        meta.push(format!("${ticker}"));
    }
    println!("  {}", meta.join(" | "));
    if let Some(summary) = article.summary.as_deref().filter(|s| !s.trim().is_empty()) {
        let options = textwrap::Options::new(78)
            .initial_indent("  ")
            .subsequent_indent("  ");
        println!("{}", textwrap::fill(summary.trim(), options));
    }
    println!("  {}", article.link);
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn parses_subcommands() {
        let cli = Cli::try_parse_from([
            "benchfeed", "cite", "a1", "--format", "bibtex",
        ])
        .unwrap();
        match cli.command {
            Some(Command::Cite { article_id, format }) => {
                assert_eq!(article_id, "a1");
                assert_eq!(format, CitationFormat::Bibtex);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn no_subcommand_starts_the_tui() {
        let cli = Cli::try_parse_from(["benchfeed", "--route", "/saved"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.route.as_deref(), Some("/saved"));
    }

    #[test]
    fn article_args_become_filters() {
        let args = ArticleArgs {
            discipline: Some("Biology".to_string()),
            field: Some("Genetics".to_string()),
            from: Some("2024-01-01".to_string()),
            page: 0,
            ..ArticleArgs::default()
        };
        let filters = args.filters().unwrap();
        assert_eq!(filters.discipline, "Biology");
        assert_eq!(filters.field, "Genetics");
        assert_eq!(filters.date_from, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(filters.page, 1);
    }

    #[test]
    fn inverted_date_range_is_rejected() {
        let args = ArticleArgs {
            from: Some("2024-02-01".to_string()),
            to: Some("2024-01-01".to_string()),
            ..ArticleArgs::default()
        };
        assert!(matches!(args.filters(), Err(AppError::Validation(_))));
    }

    #[test]
    fn secrets_come_from_the_hidden_reader() {
        let secret = read_secret_with("Password: ", || Ok("hunter2 \r\n".to_string())).unwrap();
        assert_eq!(secret, "hunter2 ");

        let err = read_secret_with("Password: ", || {
            Err(io::Error::new(io::ErrorKind::UnexpectedEof, "no tty"))
        })
        .unwrap_err();
        assert!(matches!(err, AppError::Io(_)));
    }

    #[test]
    fn field_without_discipline_is_rejected() {
        let args = ArticleArgs {
            field: Some("Genetics".to_string()),
            ..ArticleArgs::default()
        };
        assert!(matches!(args.filters(), Err(AppError::Validation(_))));
    }
}
