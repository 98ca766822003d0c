// ============================================================================
// Dashboard - Rendu de la page de vote
// ============================================================================
// Dessine l'interface TUI en utilisant les widgets de ratatui
//
// CONCEPTS RATATUI :
// 1. Frame : surface de dessin
// 2. Widgets : Block, Paragraph, Tabs, Table
// 3. Layout : découpage de l'espace en zones
// 4. Style : couleurs et attributs de texte
// ============================================================================

use std::time::Instant;

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, Tabs},
    Frame,
};

use crate::app::{App, Screen};
use crate::models::{PairStats, SortMode, TotalStats};
use crate::page::{PageMode, PageNotice};
use crate::ui::{ballot, claims};

/// Dessine l'interface complète
///
/// CONCEPT RUST : Routing avec match sur enum
/// - Pattern matching sur app.current_screen
/// - Le compilateur garantit l'exhaustivité (tous les cas gérés)
pub fn render(frame: &mut Frame, app: &App) {
    match app.current_screen {
        Screen::Dashboard => render_dashboard(frame, app, false),
        // Le dashboard reste visible, la saisie remplace le footer
        Screen::InputMode => render_dashboard(frame, app, true),
        Screen::Ballot => ballot::render(frame, app),
        Screen::ClaimBack => claims::render(frame, app),
    }
}

fn render_dashboard(frame: &mut Frame, app: &App, input: bool) {
    let chunks = create_layout(frame.size());

    render_header(frame, app, chunks[0]);
    render_tabs(frame, app, chunks[1]);
    render_pairs(frame, app, chunks[2]);

    if input {
        render_input_footer(frame, app, chunks[3]);
    } else {
        render_footer(frame, app, chunks[3]);
    }
}

/// Crée le layout principal (header, onglets, table, footer)
pub(crate) fn create_layout(area: Rect) -> Vec<Rect> {
    Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Length(3), // Onglets de tri
            Constraint::Min(0),    // Table
            Constraint::Length(4), // Footer : statut + raccourcis
        ])
        .split(area)
        .to_vec()
}

// ============================================================================
// Header : totaux, fraîcheur, compte
// ============================================================================

pub(crate) fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" AquaVote ")
        .title_alignment(Alignment::Center);

    let total = app
        .page
        .total_stats()
        .and_then(TotalStats::votes_value_sum)
        .map(|sum| format!("{} AQUA", format_amount(sum)))
        .unwrap_or_else(|| "...".to_string());

    let updated = app
        .page
        .last_updated()
        .map(|time| time.format("%H:%M UTC").to_string())
        .unwrap_or_else(|| "-".to_string());

    let refresh = match app.page.next_refresh_in(Instant::now()) {
        Some(remaining) => format!("{}s", remaining.as_secs()),
        None => "paused".to_string(),
    };

    let account = match app.page.session().account_id() {
        Some(account_id) => short_account(account_id),
        None => "not connected".to_string(),
    };

    let label = Style::default().fg(Color::Gray);
    let value = Style::default().fg(Color::Green).add_modifier(Modifier::BOLD);

    let line = Line::from(vec![
        Span::styled("Total voted: ", label),
        Span::styled(total, value),
        Span::styled("  Updated: ", label),
        Span::styled(updated, value),
        Span::styled("  Refresh in: ", label),
        Span::styled(refresh, value),
        Span::styled("  Account: ", label),
        Span::styled(account, value),
        Span::styled("  Ballot: ", label),
        Span::styled(app.page.ballot().len().to_string(), value),
    ]);

    let paragraph = Paragraph::new(line).block(block).alignment(Alignment::Center);
    frame.render_widget(paragraph, area);
}

// ============================================================================
// Onglets de tri / recherche
// ============================================================================

fn render_tabs(frame: &mut Frame, app: &App, area: Rect) {
    // Mode recherche : pas d'onglet actif, on affiche les assets filtrés
    if let PageMode::Filtered { base, counter } = app.page.mode() {
        let counter = counter.map(|c| c.to_string()).unwrap_or_else(|| "any".to_string());
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(" Search ");
        let line = Line::from(vec![
            Span::styled(base.to_string(), Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
            Span::raw(" / "),
            Span::styled(counter, Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
        ]);
        frame.render_widget(Paragraph::new(line).block(block), area);
        return;
    }

    let titles: Vec<Line> = SortMode::ALL.iter().map(|mode| Line::from(mode.label())).collect();
    let selected = app
        .page
        .sort()
        .and_then(|sort| SortMode::ALL.iter().position(|mode| *mode == sort))
        .unwrap_or(0);

    let tabs = Tabs::new(titles)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan))
                .title(" Sort "),
        )
        .select(selected)
        .style(Style::default().fg(Color::Gray))
        .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));

    frame.render_widget(tabs, area);
}

// ============================================================================
// Table des paires
// ============================================================================

fn render_pairs(frame: &mut Frame, app: &App, area: Rect) {
    let title = match app.page.empty_state_message() {
        Some(PageNotice::SearchResults) => " Search results ".to_string(),
        _ => " Pairs ".to_string(),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(title);

    let pairs = match app.page.pairs() {
        Some(pairs) if !app.page.is_loading() || app.page.is_changing_page() => pairs,
        _ => {
            render_message(frame, block, area, "Loading...".to_string(), Color::Gray);
            return;
        }
    };

    match app.page.empty_state_message() {
        Some(notice @ PageNotice::CreatePair { .. }) => {
            let text = format!("{}  Press [n] to create it.", notice.message());
            render_message(frame, block, area, text, Color::Yellow);
            return;
        }
        Some(PageNotice::NoPairsFound) => {
            render_message(frame, block, area, PageNotice::NoPairsFound.message().to_string(), Color::Gray);
            return;
        }
        _ => {}
    }

    let header = Row::new(vec!["", "Pair", "Users voted", "AQUA voted", "Share", "Rewards"])
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));

    // CONCEPT RUST : Iterator chaining
    // - enumerate() pour connaître la ligne sélectionnée
    let rows: Vec<Row> = pairs
        .iter()
        .enumerate()
        .map(|(index, pair)| pair_row(app, pair, index == app.selected_index))
        .collect();

    let widths = [
        Constraint::Length(3),
        Constraint::Min(24),
        Constraint::Length(12),
        Constraint::Length(14),
        Constraint::Length(9),
        Constraint::Length(9),
    ];

    let table = Table::new(rows, widths).header(header).block(block);
    frame.render_widget(table, area);
}

fn pair_row<'a>(app: &App, pair: &PairStats, selected: bool) -> Row<'a> {
    let total = app.page.total_stats();

    let mark = if app.page.ballot().contains(&pair.market_key) { "[x]" } else { "[ ]" };
    let users = pair
        .voting_amount
        .map(|n| n.to_string())
        .unwrap_or_else(|| "-".to_string());
    let votes = pair.votes().map(format_amount).unwrap_or_else(|| "-".to_string());
    let share = total
        .and_then(|total| pair.vote_share(total))
        .map(|share| format!("{:.2}%", share))
        .unwrap_or_else(|| "-".to_string());

    let rewards_on = total.map_or(false, |total| pair.is_rewards_on(total));
    let rewards = if rewards_on {
        Cell::from("ON").style(Style::default().fg(Color::Green))
    } else {
        Cell::from("off").style(Style::default().fg(Color::DarkGray))
    };

    let label = if pair.is_boosted() {
        format!("{} ⚡", pair.label())
    } else {
        pair.label()
    };

    let mut style = Style::default();
    if selected {
        style = style.add_modifier(Modifier::BOLD).add_modifier(Modifier::REVERSED);
    }

    Row::new(vec![
        Cell::from(mark),
        Cell::from(label),
        Cell::from(users),
        Cell::from(votes),
        Cell::from(share),
        rewards,
    ])
    .style(style)
}

pub(crate) fn render_message(frame: &mut Frame, block: Block, area: Rect, text: String, color: Color) {
    let text = vec![Line::from(""), Line::from(Span::styled(text, Style::default().fg(color)))];
    let paragraph = Paragraph::new(text).block(block).alignment(Alignment::Center);
    frame.render_widget(paragraph, area);
}

// ============================================================================
// Footer : pagination, statut, raccourcis
// ============================================================================

fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let mut status = Vec::new();
    if app.page.show_pagination() {
        status.push(Span::styled(
            format!("Page {}/{} ({} pairs)", app.page.page(), app.page.page_count(), app.page.count()),
            Style::default().fg(Color::Gray),
        ));
        if app.page.is_changing_page() {
            status.push(Span::styled("  loading...", Style::default().fg(Color::Gray)));
        }
    }
    if let Some(message) = &app.status_message {
        status.push(Span::styled(format!("  {}", message), Style::default().fg(Color::Red)));
    }

    let shortcuts = if app.is_awaiting_quit_confirmation() {
        quit_confirmation_line()
    } else {
        let key = Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD);
        let account = if app.is_logged() { " Logout  " } else { " Login  " };
        Line::from(vec![
            Span::styled("[q]", key),
            Span::raw(" Quit  "),
            Span::styled("[Tab]", key),
            Span::raw(" Sort  "),
            Span::styled("[←→]", key),
            Span::raw(" Page  "),
            Span::styled("[b/c]", key),
            Span::raw(" Search  "),
            Span::styled("[x]", key),
            Span::raw(" Clear  "),
            Span::styled("[Space]", key),
            Span::raw(" Select  "),
            Span::styled("[v]", key),
            Span::raw(" Vote  "),
            Span::styled("[Enter]", key),
            Span::raw(" My votes  "),
            Span::styled("[a]", key),
            Span::raw(account),
        ])
    };

    let paragraph = Paragraph::new(vec![Line::from(status), shortcuts])
        .block(block)
        .alignment(Alignment::Center);
    frame.render_widget(paragraph, area);
}

/// Message de confirmation de quit
///
/// CONCEPT : Style avec BLINK pour attirer l'attention
pub(crate) fn quit_confirmation_line<'a>() -> Line<'a> {
    Line::from(vec![
        Span::styled(
            "⚠  Appuyez sur ",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            "[q]",
            Style::default()
                .fg(Color::Red)
                .add_modifier(Modifier::BOLD)
                .add_modifier(Modifier::SLOW_BLINK),
        ),
        Span::styled(
            " à nouveau pour quitter, ou n'importe quelle autre touche pour annuler ⚠",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ),
    ])
}

/// Dessine le footer en mode input avec la ligne de saisie
fn render_input_footer(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Green)); // Vert pour indiquer mode input

    let input_line = Line::from(vec![
        Span::styled(
            &app.input_prompt,
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::styled(&app.input_buffer, Style::default().fg(Color::White)),
        Span::styled("█", Style::default().fg(Color::White).add_modifier(Modifier::SLOW_BLINK)),
    ]);

    let help_line = Line::from(vec![
        Span::styled("[Enter]", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
        Span::raw(" Confirm (empty = remove filter)  "),
        Span::styled("[ESC]", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
        Span::raw(" Cancel"),
    ]);

    let paragraph = Paragraph::new(vec![input_line, help_line])
        .block(block)
        .alignment(Alignment::Left);
    frame.render_widget(paragraph, area);
}

// ============================================================================
// Formatage
// ============================================================================

/// Montant compact : 1234567.8 → "1.23M"
pub(crate) fn format_amount(value: f64) -> String {
    let abs = value.abs();
    if abs >= 1_000_000_000.0 {
        format!("{:.2}B", value / 1_000_000_000.0)
    } else if abs >= 1_000_000.0 {
        format!("{:.2}M", value / 1_000_000.0)
    } else if abs >= 1_000.0 {
        format!("{:.2}K", value / 1_000.0)
    } else {
        format!("{:.2}", value)
    }
}

/// "GABC…WXYZ"
pub(crate) fn short_account(account_id: &str) -> String {
    let chars: Vec<char> = account_id.chars().collect();
    if chars.len() <= 8 {
        return account_id.to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}…{}", head, tail)
}
