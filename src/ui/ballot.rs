// ============================================================================
// Écran : bulletin de vote
// ============================================================================
// Liste des paires sélectionnées avant la signature du vote
// ============================================================================

use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

use crate::app::App;
use crate::ui::dashboard::{create_layout, format_amount, render_header, render_message};

pub fn render(frame: &mut Frame, app: &App) {
    let chunks = create_layout(frame.size());

    render_header(frame, app, chunks[0]);

    let intro = Paragraph::new(Line::from(Span::styled(
        "Lock AQUA in favor of these markets. The vote is signed in your wallet.",
        Style::default().fg(Color::Gray),
    )))
    .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)))
    .alignment(Alignment::Center);
    frame.render_widget(intro, chunks[1]);

    render_pairs(frame, app, chunks[2]);
    render_footer(frame, chunks[3]);
}

fn render_pairs(frame: &mut Frame, app: &App, area: Rect) {
    let pairs = app.page.ballot().pairs();
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(format!(" Ballot ({}) ", pairs.len()));

    if pairs.is_empty() {
        render_message(frame, block, area, "Ballot is empty".to_string(), Color::Gray);
        return;
    }

    let items: Vec<ListItem> = pairs
        .iter()
        .enumerate()
        .map(|(index, pair)| {
            let votes = pair.votes().map(format_amount).unwrap_or_else(|| "-".to_string());
            let line = format!(" {:<32} {:>14} AQUA", pair.label(), votes);

            let mut style = Style::default().fg(Color::White);
            if index == app.ballot_index {
                style = style.add_modifier(Modifier::BOLD).add_modifier(Modifier::REVERSED);
            }
            ListItem::new(line).style(style)
        })
        .collect();

    frame.render_widget(List::new(items).block(block), area);
}

fn render_footer(frame: &mut Frame, area: Rect) {
    let key = Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD);
    let line = Line::from(vec![
        Span::styled("[↑↓]", key),
        Span::raw(" Navigate  "),
        Span::styled("[d]", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
        Span::raw(" Remove  "),
        Span::styled("[ESC]", key),
        Span::raw(" Close"),
    ]);

    let paragraph = Paragraph::new(vec![Line::from(""), line])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)))
        .alignment(Alignment::Center);
    frame.render_widget(paragraph, area);
}
