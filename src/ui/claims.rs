// ============================================================================
// Écran : votes verrouillés d'une paire
// ============================================================================
// Chaque vote est une claimable balance : elle redevient récupérable
// par l'utilisateur après la date de fin de verrouillage
// ============================================================================

use chrono::Utc;
use ratatui::{
    layout::{Alignment, Constraint, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};

use crate::app::{App, ClaimBackView};
use crate::ui::dashboard::{create_layout, render_header, render_message};

pub fn render(frame: &mut Frame, app: &App) {
    let chunks = create_layout(frame.size());

    render_header(frame, app, chunks[0]);

    let Some(view) = &app.claim_back else {
        let block = Block::default().borders(Borders::ALL);
        render_message(frame, block, chunks[2], "No pair selected".to_string(), Color::Gray);
        return;
    };

    let title = Paragraph::new(Line::from(vec![
        Span::styled(view.pair.label(), Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
        Span::styled(
            format!("  {} vote(s), {} claimable now", view.entries.len(), app.claimable_now()),
            Style::default().fg(Color::Gray),
        ),
    ]))
    .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)))
    .alignment(Alignment::Center);
    frame.render_widget(title, chunks[1]);

    render_entries(frame, view, chunks[2]);

    let footer = Paragraph::new(vec![
        Line::from(""),
        Line::from(vec![
            Span::styled("[ESC]", Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
            Span::raw(" Back"),
        ]),
    ])
    .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)))
    .alignment(Alignment::Center);
    frame.render_widget(footer, chunks[3]);
}

fn render_entries(frame: &mut Frame, view: &ClaimBackView, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Your votes ");

    if view.entries.is_empty() {
        render_message(frame, block, area, "No votes for this pair".to_string(), Color::Gray);
        return;
    }

    let now = Utc::now();
    let header = Row::new(vec!["Amount", "Type", "Voted at", "Claim back"])
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));

    let rows: Vec<Row> = view
        .entries
        .iter()
        .map(|entry| {
            let kind = if entry.is_downvote { "downvote" } else { "upvote" };
            let voted_at = entry
                .last_modified_time
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "-".to_string());

            let claim = if entry.is_claimable(now) {
                Cell::from("available").style(Style::default().fg(Color::Green))
            } else {
                let date = entry
                    .claim_back_date
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_default();
                Cell::from(date).style(Style::default().fg(Color::Gray))
            };

            Row::new(vec![
                Cell::from(entry.amount.clone()),
                Cell::from(kind),
                Cell::from(voted_at),
                claim,
            ])
        })
        .collect();

    let widths = [
        Constraint::Length(18),
        Constraint::Length(10),
        Constraint::Length(18),
        Constraint::Min(18),
    ];
    frame.render_widget(Table::new(rows, widths).header(header).block(block), area);
}
