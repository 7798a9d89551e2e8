use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, Form, NoticeKind, Popup, PrefRow, Screen, RECENT_SAVED};
use crate::citation::{format_citation, CitationFormat};
use crate::models::Article;

pub fn draw(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header / nav
            Constraint::Min(0),    // Screen body
            Constraint::Length(1), // Notice or key hints
        ])
        .split(frame.area());

    render_header(frame, app, chunks[0]);

    match &app.screen {
        Screen::Landing => render_landing(frame, chunks[1]),
        Screen::SignIn | Screen::SignUp => render_auth(frame, app, chunks[1]),
        Screen::Dashboard => render_dashboard(frame, app, chunks[1]),
        Screen::Discovery => render_discovery_hub(frame, app, chunks[1]),
        Screen::DiscoveryArticles => render_articles(frame, app, chunks[1]),
        Screen::Saved => render_saved(frame, app, chunks[1]),
        Screen::Collections => render_collections(frame, app, chunks[1]),
        Screen::Collection(_) => render_collection_view(frame, app, chunks[1]),
        Screen::Benchtop => render_placeholder(frame, "Benchtop", chunks[1]),
        Screen::BenchMate => render_placeholder(frame, "BenchMate", chunks[1]),
        Screen::Account => render_account(frame, app, chunks[1]),
        Screen::NotFound => render_not_found(frame, chunks[1]),
    }

    render_status(frame, app, chunks[2]);

    if let Some(form) = app.form.as_ref().filter(|f| f.kind.is_overlay()) {
        let area = centered_rect(50, 40, frame.area());
        frame.render_widget(Clear, area);
        render_form(frame, form, form.kind.title(), area);
    }

    match &app.popup {
        Some(Popup::Help) => render_help(frame),
        Some(Popup::Article(article)) => render_article_detail(frame, app, article),
        Some(Popup::Input(input)) => render_input(frame, input.purpose.title(), &input.buffer),
        Some(Popup::Citation { data, format }) => {
            render_citation(frame, &format_citation(data, *format), *format)
        }
        Some(Popup::ConfirmDelete { name, .. }) => render_confirm(frame, name),
        Some(Popup::PickCollection { selected, .. }) => render_picker(frame, app, *selected),
        None => {}
    }
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let user = app
        .greeting_name()
        .map(|name| format!(" {name} "))
        .unwrap_or_else(|| " not signed in ".to_string());

    let block = Block::default()
        .title(format!(" benchfeed [{}] ", app.screen.title()))
        .title_bottom(Line::from(user).right_aligned())
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    if app.session.is_none() {
        let hint = Paragraph::new(" i:sign in  u:sign up  q:quit")
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(hint, inner);
        return;
    }

    let mut spans = Vec::new();
    for n in 1..=8 {
        let Some(screen) = Screen::nav(n) else {
            continue;
        };
        let current = app.screen == screen
            || (matches!(app.screen, Screen::Collection(_)) && screen == Screen::Collections);
        let style = if current {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::White)
        };
        spans.push(Span::styled(format!(" {n} {} ", screen.title()), style));
        spans.push(Span::raw(" "));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), inner);
}

fn render_landing(frame: &mut Frame, area: Rect) {
    let text = vec![
        "",
        "  Discover, save, organize and cite research articles.",
        "",
        "  Browse the latest publications by discipline, field, journal",
        "  or ticker symbol, tune a personalized feed with keywords,",
        "  and keep what matters in collections you can share.",
        "",
        "  i  Sign in",
        "  u  Create an account",
    ];
    let paragraph = Paragraph::new(text.join("\n"))
        .block(Block::default().borders(Borders::ALL).title(" Welcome "))
        .style(Style::default().fg(Color::White));
    frame.render_widget(paragraph, area);
}

fn render_auth(frame: &mut Frame, app: &App, area: Rect) {
    let Some(form) = &app.form else {
        return;
    };
    render_form(frame, form, form.kind.title(), centered_rect(60, 60, area));
}

fn render_form(frame: &mut Frame, form: &Form, title: &str, area: Rect) {
    let mut lines = vec![Line::from("")];
    for (i, field) in form.fields.iter().enumerate() {
        let focused = i == form.focus;
        let value = if field.secret {
            "•".repeat(field.value.chars().count())
        } else {
            field.value.clone()
        };
        let cursor = if focused { "_" } else { "" };
        let label_style = if focused {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };
        lines.push(Line::from(vec![
            Span::styled(format!(" {:<18}", field.label), label_style),
            Span::raw(format!("{value}{cursor}")),
        ]));
    }
    lines.push(Line::from(""));
    if let Some(error) = &form.error {
        lines.push(Line::from(Span::styled(
            format!(" {error}"),
            Style::default().fg(Color::Red),
        )));
    }
    lines.push(Line::from(Span::styled(
        " Tab:next field  Enter:submit  Esc:cancel",
        Style::default().fg(Color::DarkGray),
    )));

    let block = Block::default()
        .title(title.to_string())
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_dashboard(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 3), Constraint::Ratio(2, 3)])
        .split(area);

    let collections = app
        .collections
        .as_ref()
        .map(|c| c.collections.len())
        .unwrap_or(0);
    let personalized = match &app.preferences {
        Some(prefs) if !prefs.is_empty() => "on",
        _ => "off",
    };
    let name = app.greeting_name().unwrap_or("researcher");
    let stats = vec![
        format!(" Welcome back, {name}"),
        String::new(),
        format!(" Saved articles:    {}", app.saved.len()),
        format!(" Collections:       {collections}"),
        format!(" Personalized feed: {personalized}"),
        String::new(),
        " 2 Discovery  3 Articles  5 Collections".to_string(),
    ];
    let block = Block::default()
        .title(" Overview ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Green));
    frame.render_widget(Paragraph::new(stats.join("\n")).block(block), chunks[0]);

    let recent: Vec<&Article> = app
        .saved_list
        .iter()
        .take(RECENT_SAVED)
        .map(|s| &s.article)
        .collect();
    render_article_list(
        frame,
        app,
        &recent,
        " Recently saved ",
        "Nothing saved yet. Press 3 to browse articles.",
        chunks[1],
    );
}

fn render_discovery_hub(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 2), Constraint::Ratio(1, 2)])
        .split(area);

    let rows = app.preference_rows();
    let items: Vec<ListItem> = rows
        .iter()
        .map(|row| {
            let (tag, text, color) = match row {
                PrefRow::Discipline { name, preferred } => {
                    (if *preferred { "[x]" } else { "[ ]" }, name.clone(), Color::Cyan)
                }
                PrefRow::Field { name, preferred } => (
                    if *preferred { " [x]" } else { " [ ]" },
                    name.clone(),
                    Color::Blue,
                ),
                PrefRow::Include(k) => ("+kw", k.clone(), Color::Green),
                PrefRow::Exclude(k) => ("-kw", k.clone(), Color::Red),
                PrefRow::FollowedJournal(j) => ("★ j", j.clone(), Color::Yellow),
                PrefRow::ExcludedJournal(j) => ("✗ j", j.clone(), Color::Red),
                PrefRow::Ticker(t) => ("★ $", t.clone(), Color::Yellow),
            };
            ListItem::new(Line::from(vec![
                Span::styled(format!("{tag} "), Style::default().fg(color)),
                Span::raw(text),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .title(" Feed preferences ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");
    let mut state = ListState::default();
    if !rows.is_empty() {
        state.select(Some(app.selected_index));
    }
    frame.render_stateful_widget(list, chunks[0], &mut state);

    let prefs = &app.draft_preferences;
    let saved_state = if app.preferences_dirty() {
        "unsaved changes (w to save)"
    } else {
        "saved"
    };
    let summary = vec![
        format!(" Keyword logic:     {}", prefs.keyword_logic.label()),
        format!(" Disciplines:       {}", list_or_any(&prefs.preferred_disciplines)),
        format!(" Fields:            {}", list_or_any(&prefs.preferred_fields)),
        format!(" Include keywords:  {}", list_or_any(&prefs.include_keywords)),
        format!(" Exclude keywords:  {}", list_or_any(&prefs.exclude_keywords)),
        format!(" Followed journals: {}", list_or_any(&prefs.followed_journals)),
        format!(" Excluded journals: {}", list_or_any(&prefs.excluded_journals)),
        format!(" Followed tickers:  {}", list_or_any(&prefs.followed_ticker_symbols)),
        String::new(),
        format!(" Status: {saved_state}"),
        String::new(),
        " Enter toggles or removes the selected line.".to_string(),
        " Keywords match after each page is fetched, so a".to_string(),
        " page may show fewer articles than the page size.".to_string(),
    ];
    let block = Block::default()
        .title(" Summary ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta));
    let paragraph = Paragraph::new(summary.join("\n"))
        .block(block)
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, chunks[1]);
}

fn render_articles(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Active filters
            Constraint::Min(0),    // Cards
            Constraint::Length(1), // Pagination
        ])
        .split(area);

    let filters = &app.feed.filters;
    let mut parts = Vec::new();
    if !filters.search_query.is_empty() {
        parts.push(format!("search \"{}\"", filters.search_query));
    }
    if !filters.discipline.is_empty() {
        parts.push(format!("discipline {}", filters.discipline));
    }
    if !filters.field.is_empty() {
        parts.push(format!("field {}", filters.field));
    }
    if !filters.ticker_symbol.is_empty() {
        parts.push(format!("ticker {}", filters.ticker_symbol));
    }
    if !filters.journal.is_empty() {
        parts.push(format!("journal {}", filters.journal));
    }
    if let Some(from) = filters.date_from {
        parts.push(format!("from {from}"));
    }
    if let Some(to) = filters.date_to {
        parts.push(format!("until {to}"));
    }
    let filter_text = if parts.is_empty() {
        "No filters".to_string()
    } else {
        parts.join(" · ")
    };
    let personalized = if app.use_preferences && app.preferences.is_some() {
        " [personalized]"
    } else {
        ""
    };
    let block = Block::default()
        .title(format!(" Filters{personalized} "))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Blue));
    frame.render_widget(Paragraph::new(filter_text).block(block), chunks[0]);

    let empty = if app.feed.loading {
        "Loading articles..."
    } else if app.feed.last_fetch_failed {
        "Could not load articles. Press r to retry."
    } else {
        "No articles match these filters."
    };
    let articles: Vec<&Article> = app.feed.articles.iter().collect();
    render_article_list(frame, app, &articles, " Articles ", empty, chunks[1]);

    let mut spans = vec![Span::styled(
        format!(" {} results ", app.feed.total),
        Style::default().fg(Color::Gray),
    )];
    let total_pages = app.feed.total_pages();
    if total_pages > 1 {
        spans.push(Span::raw(format!("· page {} of {total_pages}  ", filters.page)));
        for page in app.feed.page_window() {
            let style = if page == filters.page {
                Style::default().fg(Color::Black).bg(Color::Cyan)
            } else {
                Style::default().fg(Color::White)
            };
            spans.push(Span::styled(format!(" {page} "), style));
        }
    }
    if app.feed.is_underfilled() {
        spans.push(Span::styled(
            format!(
                "  {} hidden by keyword rules",
                app.feed.fetched - app.feed.articles.len()
            ),
            Style::default().fg(Color::Yellow),
        ));
    }
    if app.feed.loading && !app.feed.articles.is_empty() {
        spans.push(Span::styled("  loading...", Style::default().fg(Color::DarkGray)));
    } else if app.feed.last_fetch_failed && !app.feed.articles.is_empty() {
        spans.push(Span::styled(
            "  showing previous results (refresh failed)",
            Style::default().fg(Color::Red),
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), chunks[2]);
}

fn render_saved(frame: &mut Frame, app: &App, area: Rect) {
    let articles: Vec<&Article> = app.saved_list.iter().map(|s| &s.article).collect();
    render_article_list(
        frame,
        app,
        &articles,
        " Saved articles ",
        "No saved articles yet. Press s on any article to save it.",
        area,
    );
}

fn render_collections(frame: &mut Frame, app: &App, area: Rect) {
    let collections = app
        .collections
        .as_ref()
        .map(|c| c.collections.as_slice())
        .unwrap_or(&[]);

    if collections.is_empty() {
        let paragraph = Paragraph::new("No collections yet. Press N to create one.")
            .block(Block::default().title(" Collections ").borders(Borders::ALL))
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(paragraph, area);
        return;
    }

    let items: Vec<ListItem> = collections
        .iter()
        .map(|c| {
            let (visibility, color) = if c.is_public {
                ("public ", Color::Green)
            } else {
                ("private", Color::DarkGray)
            };
            let mut lines = vec![Line::from(vec![
                Span::styled(format!("[{visibility}] "), Style::default().fg(color)),
                Span::styled(c.name.clone(), Style::default().add_modifier(Modifier::BOLD)),
                Span::styled(
                    format!("  {} articles", c.article_count),
                    Style::default().fg(Color::Gray),
                ),
            ])];
            if let Some(description) = c.description.as_deref().filter(|d| !d.is_empty()) {
                lines.push(Line::from(Span::styled(
                    format!("          {description}"),
                    Style::default().fg(Color::DarkGray),
                )));
            }
            ListItem::new(lines)
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .title(" Collections ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");
    let mut state = ListState::default();
    state.select(Some(app.selected_index));
    frame.render_stateful_widget(list, area, &mut state);
}

fn render_collection_view(frame: &mut Frame, app: &App, area: Rect) {
    let Some(view) = &app.collection_view else {
        let paragraph = Paragraph::new("This collection could not be loaded.")
            .block(Block::default().borders(Borders::ALL))
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(paragraph, area);
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(0)])
        .split(area);

    let collection = &view.collection;
    let visibility = if collection.is_public { "Public" } else { "Private" };
    let owner = if view.owned { "" } else { " · shared with you" };
    let header = vec![
        format!(
            " {visibility} · {} articles{owner}",
            collection.article_count
        ),
        format!(" {}", collection.description.as_deref().unwrap_or("")),
    ];
    let block = Block::default()
        .title(format!(" {} ", collection.name))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Green));
    frame.render_widget(Paragraph::new(header.join("\n")).block(block), chunks[0]);

    let articles: Vec<&Article> = view.articles.iter().collect();
    render_article_list(
        frame,
        app,
        &articles,
        " Articles ",
        "This collection is empty.",
        chunks[1],
    );
}

fn render_placeholder(frame: &mut Frame, title: &str, area: Rect) {
    let paragraph = Paragraph::new(format!("\n  {title} is coming soon."))
        .block(Block::default().title(format!(" {title} ")).borders(Borders::ALL))
        .style(Style::default().fg(Color::Gray));
    frame.render_widget(paragraph, area);
}

fn render_account(frame: &mut Frame, app: &App, area: Rect) {
    let (email, name) = app
        .session
        .as_ref()
        .map(|s| {
            (
                s.user.email.clone().unwrap_or_default(),
                s.user.display_name().unwrap_or("(not set)").to_string(),
            )
        })
        .unwrap_or_default();

    let text = vec![
        String::new(),
        format!("  Email:         {email}"),
        format!("  Display name:  {name}"),
        String::new(),
        "  n  Change display name".to_string(),
        "  K  Change password".to_string(),
        "  L  Sign out".to_string(),
    ];
    let block = Block::default()
        .title(" Account ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    frame.render_widget(Paragraph::new(text.join("\n")).block(block), area);
}

fn render_not_found(frame: &mut Frame, area: Rect) {
    let paragraph = Paragraph::new("\n  Page not found.\n\n  Press Esc to go back.")
        .block(Block::default().title(" 404 ").borders(Borders::ALL))
        .style(Style::default().fg(Color::Red));
    frame.render_widget(paragraph, area);
}

fn render_article_list(
    frame: &mut Frame,
    app: &App,
    articles: &[&Article],
    title: &str,
    empty: &str,
    area: Rect,
) {
    let block = Block::default()
        .title(title.to_string())
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    if articles.is_empty() {
        let paragraph = Paragraph::new(empty.to_string())
            .block(block)
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(paragraph, area);
        return;
    }

    let width = area.width.saturating_sub(6).max(20) as usize;
    let items: Vec<ListItem> = articles
        .iter()
        .map(|article| article_card(app, article, width))
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");

    let mut state = ListState::default();
    state.select(Some(app.selected_index.min(articles.len() - 1)));
    frame.render_stateful_widget(list, area, &mut state);
}

fn article_card<'a>(app: &App, article: &'a Article, width: usize) -> ListItem<'a> {
    let saved = if app.saved.is_saved(&article.id) { "★ " } else { "  " };
    let title_style = if app.is_followed(article) {
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::White)
    };

    let mut meta = Vec::new();
    if let Some(journal) = &article.journal_name {
        meta.push(journal.clone());
    }
    if let Some(date) = article.published_on() {
        meta.push(date.format("%b %-d, %Y").to_string());
    }
    if let Some(author) = article.author.as_deref().filter(|a| !a.is_empty()) {
        meta.push(author.to_string());
    }
    if let Some(ticker) = &article.ticker_symbol {
        meta.push(format!("${ticker}"));
    }

    let category = article
        .category_name
        .clone()
        .or_else(|| article.level_2_field.clone())
        .or_else(|| article.level_1_discipline.clone());
    let category_color = article
        .category_color
        .as_deref()
        .and_then(parse_hex_color)
        .unwrap_or(Color::Blue);

    let mut title_line = vec![
        Span::styled(saved, Style::default().fg(Color::Yellow)),
        Span::styled(article.title.as_str(), title_style),
    ];
    if let Some(category) = category {
        title_line.push(Span::styled(
            format!("  [{category}]"),
            Style::default().fg(category_color),
        ));
    }

    let mut lines = vec![
        Line::from(title_line),
        Line::from(Span::styled(
            format!("  {}", meta.join(" · ")),
            Style::default().fg(Color::Gray),
        )),
    ];
    if let Some(summary) = article.summary.as_deref().filter(|s| !s.trim().is_empty()) {
        for line in textwrap::wrap(summary.trim(), width).into_iter().take(2) {
            lines.push(Line::from(Span::styled(
                format!("  {line}"),
                Style::default().fg(Color::DarkGray),
            )));
        }
    }
    let tags = article.tags();
    if !tags.is_empty() {
        lines.push(Line::from(Span::styled(
            format!("  #{}", tags.join(" #")),
            Style::default().fg(Color::Magenta),
        )));
    }
    lines.push(Line::from(""));
    ListItem::new(lines)
}

/// `#rrggbb` category colors.
fn parse_hex_color(hex: &str) -> Option<Color> {
    let hex = hex.trim().strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    Some(Color::Rgb(channel(0)?, channel(2)?, channel(4)?))
}

fn list_or_any(values: &[String]) -> String {
    if values.is_empty() {
        "any".to_string()
    } else {
        values.join(", ")
    }
}

fn render_status(frame: &mut Frame, app: &App, area: Rect) {
    if let Some(notice) = &app.notice {
        let color = match notice.kind {
            NoticeKind::Info => Color::Cyan,
            NoticeKind::Success => Color::Green,
            NoticeKind::Error => Color::Red,
        };
        let paragraph = Paragraph::new(format!(" {}", notice.message))
            .style(Style::default().fg(color));
        frame.render_widget(paragraph, area);
        return;
    }

    let hints = match &app.screen {
        Screen::Landing => "i:sign in  u:sign up  q:quit",
        Screen::SignIn | Screen::SignUp => "Tab:next field  Enter:submit  Esc:back",
        Screen::Dashboard | Screen::Saved => {
            "j/k:nav  d:details  o:open  s:save  c:cite  a:collect  r:refresh  ?:help  q:quit"
        }
        Screen::Discovery => {
            "Enter:toggle  i/e:keyword  b/m:journal  T:ticker  g:logic  w:save  C:clear  l:articles"
        }
        Screen::DiscoveryArticles => {
            "/:search  f/F:discipline/field  t:ticker  J:journal  [ ]:dates  x:clear  n/p:page  P:personal"
        }
        Screen::Collections => {
            "Enter:open  N:new  R:rename  E:describe  v:visibility  y:share  D:delete"
        }
        Screen::Collection(_) => {
            "d:details  o:open  c:cite  X:remove  E:describe  y:share  v:visibility  Esc:back"
        }
        Screen::Account => "n:display name  K:password  L:sign out",
        _ => "Esc:back  ?:help  q:quit",
    };
    let paragraph = Paragraph::new(format!(" {hints}")).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(paragraph, area);
}

fn render_input(frame: &mut Frame, title: &str, buffer: &str) {
    let area = centered_rect(60, 20, frame.area());

    let block = Block::default()
        .title(format!(" {title} "))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));

    let inner = block.inner(area);

    // Clear the area first
    frame.render_widget(Clear, area);
    frame.render_widget(block, area);

    let input_text = format!("> {buffer}_");
    let paragraph = Paragraph::new(input_text).style(Style::default().fg(Color::White));
    frame.render_widget(paragraph, inner);
}

fn render_citation(frame: &mut Frame, citation: &str, format: CitationFormat) {
    let area = centered_rect(70, 50, frame.area());

    let tabs: Vec<Span> = CitationFormat::ALL
        .iter()
        .map(|f| {
            let style = if *f == format {
                Style::default().fg(Color::Black).bg(Color::Yellow)
            } else {
                Style::default().fg(Color::Gray)
            };
            Span::styled(format!(" {} ", f.label()), style)
        })
        .collect();

    let mut lines = vec![Line::from(tabs), Line::from("")];
    lines.extend(citation.lines().map(|l| Line::from(l.to_string())));
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Tab:format  y:copy  Esc:close",
        Style::default().fg(Color::DarkGray),
    )));

    let block = Block::default()
        .title(" Cite article ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));
    let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: false });

    frame.render_widget(Clear, area);
    frame.render_widget(paragraph, area);
}

fn render_article_detail(frame: &mut Frame, app: &App, article: &Article) {
    let area = centered_rect(80, 80, frame.area());
    let label = Style::default().fg(Color::Gray);

    let saved = if app.saved.is_saved(&article.id) { "★ " } else { "" };
    let mut lines = vec![
        Line::from(Span::styled(
            format!("{saved}{}", article.title),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];

    let mut field = |name: &str, value: Option<String>| {
        if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
            lines.push(Line::from(vec![
                Span::styled(format!("{name:<10}"), label),
                Span::raw(value),
            ]));
        }
    };
    field("Authors", article.author.clone());
    field("Journal", article.journal_name.clone());
    field(
        "Published",
        article.published_on().map(|d| d.format("%B %-d, %Y").to_string()),
    );
    field("Ticker", article.ticker_symbol.as_ref().map(|t| format!("${t}")));
    let discipline = [&article.level_1_discipline, &article.level_2_field]
        .into_iter()
        .flatten()
        .cloned()
        .collect::<Vec<_>>()
        .join(" / ");
    field("Field", Some(discipline));
    field("Category", article.category_name.clone());

    let category_color = article
        .category_color
        .as_deref()
        .and_then(parse_hex_color)
        .unwrap_or(Color::Blue);
    if let Some(description) = article
        .category_description
        .as_deref()
        .filter(|d| !d.trim().is_empty())
    {
        lines.push(Line::from(Span::styled(
            format!("{:<10}{description}", ""),
            Style::default().fg(category_color),
        )));
    }

    lines.push(Line::from(""));
    let summary = article
        .summary
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("No summary available.");
    lines.push(Line::from(summary.to_string()));

    let tags = article.tags();
    if !tags.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!("#{}", tags.join(" #")),
            Style::default().fg(Color::Magenta),
        )));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        article.link.clone(),
        Style::default().fg(Color::Cyan).add_modifier(Modifier::UNDERLINED),
    )));
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "o:open in browser  c:cite  Esc:close",
        Style::default().fg(Color::DarkGray),
    )));

    let block = Block::default()
        .title(" Article ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: false });

    frame.render_widget(Clear, area);
    frame.render_widget(paragraph, area);
}

fn render_confirm(frame: &mut Frame, name: &str) {
    let area = centered_rect(50, 20, frame.area());
    let text = format!(
        "Delete \"{name}\"?\nIts article list will be removed too.\n\ny:delete  n:cancel"
    );
    let block = Block::default()
        .title(" Delete collection ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red));
    let paragraph = Paragraph::new(text).block(block).wrap(Wrap { trim: true });

    frame.render_widget(Clear, area);
    frame.render_widget(paragraph, area);
}

fn render_picker(frame: &mut Frame, app: &App, selected: usize) {
    let area = centered_rect(50, 50, frame.area());
    let collections = app
        .collections
        .as_ref()
        .map(|c| c.collections.as_slice())
        .unwrap_or(&[]);

    let items: Vec<ListItem> = collections
        .iter()
        .map(|c| ListItem::new(format!("{} ({})", c.name, c.article_count)))
        .collect();
    let list = List::new(items)
        .block(
            Block::default()
                .title(" Add to collection ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Yellow)),
        )
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");
    let mut state = ListState::default();
    state.select(Some(selected));

    frame.render_widget(Clear, area);
    frame.render_stateful_widget(list, area, &mut state);
}

fn render_help(frame: &mut Frame) {
    let area = centered_rect(60, 80, frame.area());

    let help_text = vec![
        "",
        " Navigation:",
        "   1-8      Dashboard, Discovery, Articles, Saved,",
        "            Collections, Benchtop, BenchMate, Account",
        "   j / ↓    Move down",
        "   k / ↑    Move up",
        "   Enter    Open / select",
        "   Esc      Back",
        "",
        " Articles:",
        "   /        Search        f / F   Discipline / field",
        "   t        Ticker        J       Journal",
        "   [ / ]    Date range    x       Clear filters",
        "   n / p    Next / previous page",
        "   P        Toggle personalized feed",
        "   d        Details       s       Save",
        "   c        Cite          a       Add to collection",
        "   o        Open in browser",
        "",
        " Collections:",
        "   N new  R rename  E description  v visibility",
        "   y share link  D delete",
        "",
        " General:",
        "   r        Refresh",
        "   ?        Toggle this help",
        "   q        Quit",
        "",
        " Press any key to close",
    ];

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let paragraph = Paragraph::new(help_text.join("\n"))
        .block(block)
        .style(Style::default().fg(Color::White));

    frame.render_widget(Clear, area);
    frame.render_widget(paragraph, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
