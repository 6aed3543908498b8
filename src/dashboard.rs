//! Presentation of a finished analysis. Nothing here recomputes, sorts or
//! filters what the service returned.

use ratatui::prelude::*;

use crate::models::{
    format_score, MatchStatus, Readiness, ResumeAnalysis, ShortlistProbability,
};

const GAUGE_CELLS: usize = 20;
const BAR_CELLS: usize = 24;

/// Overall score tone: green from 80, yellow from 60, red below.
pub fn score_tone(score: f64) -> Color {
    if score >= 80.0 {
        Color::Green
    } else if score >= 60.0 {
        Color::Yellow
    } else {
        Color::Red
    }
}

/// Company match tone, banded at 60/70/80.
pub fn match_tone(percentage: f64) -> Color {
    if percentage >= 80.0 {
        Color::Green
    } else if percentage >= 70.0 {
        Color::Blue
    } else if percentage >= 60.0 {
        Color::Yellow
    } else {
        Color::Red
    }
}

fn readiness_style(readiness: Option<Readiness>) -> (Color, usize) {
    match readiness {
        Some(Readiness::FaangReady) => (Color::Magenta, 3),
        Some(Readiness::IndustryReady) => (Color::Green, 2),
        _ => (Color::Gray, 1),
    }
}

fn probability_tone(probability: Option<ShortlistProbability>) -> Color {
    match probability {
        Some(ShortlistProbability::Exceptional | ShortlistProbability::High) => Color::Green,
        Some(ShortlistProbability::Medium) => Color::Yellow,
        _ => Color::Red,
    }
}

fn status_tone(status: Option<MatchStatus>) -> Color {
    match status {
        Some(MatchStatus::StrongMatch) => Color::Green,
        Some(MatchStatus::Shortlist) => Color::Blue,
        Some(MatchStatus::Borderline) => Color::Yellow,
        _ => Color::Red,
    }
}

/// Filled/empty cell counts for a 0-100 value; out-of-range values are drawn clamped.
fn bar_cells(value: f64, cells: usize) -> (usize, usize) {
    let ratio = if value.is_finite() { (value / 100.0).clamp(0.0, 1.0) } else { 0.0 };
    let filled = (ratio * cells as f64).round() as usize;
    (filled, cells - filled)
}

fn bar(value: f64, cells: usize, color: Color) -> Vec<Span<'static>> {
    let (filled, empty) = bar_cells(value, cells);
    vec![
        Span::styled("█".repeat(filled), Style::default().fg(color)),
        Span::styled("░".repeat(empty), Style::default().fg(Color::DarkGray)),
    ]
}

fn heading(title: &str, color: Color) -> Line<'static> {
    Line::from(Span::styled(
        title.to_string(),
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    ))
}

fn tag(label: &str, color: Color) -> Span<'static> {
    Span::styled(
        format!("[{}]", label),
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    )
}

fn wrapped(text: &str, indent: &str, width: usize, style: Style, lines: &mut Vec<Line<'static>>) {
    let width = width.saturating_sub(indent.chars().count()).max(20);
    for line in textwrap::fill(text, width).lines() {
        lines.push(Line::from(Span::styled(format!("{}{}", indent, line), style)));
    }
}

fn bullets(items: &[String], marker_color: Color, width: usize, lines: &mut Vec<Line<'static>>) {
    for item in items {
        let width = width.saturating_sub(4).max(20);
        let filled = textwrap::fill(item, width);
        for (i, line) in filled.lines().enumerate() {
            let marker = if i == 0 { "  • " } else { "    " };
            lines.push(Line::from(vec![
                Span::styled(marker, Style::default().fg(marker_color)),
                Span::raw(line.to_string()),
            ]));
        }
    }
}

fn chips(items: &[String], color: Color) -> Line<'static> {
    let mut spans = vec![Span::raw("  ")];
    for item in items {
        spans.push(tag(item, color));
        spans.push(Span::raw(" "));
    }
    Line::from(spans)
}

/// Builds the whole dashboard as styled lines for the given terminal width.
pub fn render(analysis: &ResumeAnalysis, width: usize) -> Text<'static> {
    let mut lines: Vec<Line<'static>> = Vec::new();
    let dim = Style::default().fg(Color::DarkGray);

    // Score gauge
    let tone = score_tone(analysis.ats_score);
    lines.push(heading("OVERALL ATS SCORE", Color::White));
    let mut gauge = vec![Span::raw("  ")];
    gauge.extend(bar(analysis.ats_score, GAUGE_CELLS, tone));
    gauge.push(Span::styled(
        format!(" {}", format_score(analysis.ats_score)),
        Style::default().fg(tone).add_modifier(Modifier::BOLD),
    ));
    gauge.push(Span::styled(" / 100", dim));
    lines.push(Line::from(gauge));
    lines.push(Line::from(""));

    // Readiness & probability
    lines.push(heading("READINESS & PROBABILITY", Color::White));
    let (readiness_color, thirds) = readiness_style(analysis.readiness());
    let mut readiness = vec![Span::raw("  Readiness Level       "), tag(&analysis.readiness_level, readiness_color), Span::raw(" ")];
    readiness.push(Span::styled("■".repeat(thirds * 3), Style::default().fg(readiness_color)));
    readiness.push(Span::styled("□".repeat((3 - thirds) * 3), dim));
    lines.push(Line::from(readiness));
    lines.push(Line::from(vec![
        Span::raw("  Shortlist Probability "),
        tag(&analysis.shortlist_probability, probability_tone(analysis.probability())),
    ]));
    lines.push(Line::from(""));

    // Breakdown
    lines.push(heading("SCORE BREAKDOWN", Color::White));
    for (label, value) in analysis.breakdown.entries() {
        let mut row = vec![Span::raw(format!("  {:<22}", label))];
        row.extend(bar(value, BAR_CELLS, Color::Gray));
        row.push(Span::raw(format!(" {}%", format_score(value))));
        lines.push(Line::from(row));
    }
    lines.push(Line::from(""));

    // Company cards
    lines.push(heading("COMPANY-SPECIFIC ANALYSIS", Color::White));
    for company in &analysis.company_matches {
        lines.push(Line::from(vec![
            Span::styled(
                format!("  {}", company.name),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw(" "),
            tag(&company.status, status_tone(company.match_status())),
        ]));
        let mut row = vec![Span::raw("    ")];
        row.extend(bar(company.match_percentage, BAR_CELLS, match_tone(company.match_percentage)));
        row.push(Span::raw(format!(" {}%", format_score(company.match_percentage))));
        lines.push(Line::from(row));
        wrapped(&company.reason, "    ", width, dim, &mut lines);
    }
    lines.push(Line::from(""));

    lines.push(heading("STRENGTHS", Color::Green));
    bullets(&analysis.strengths, Color::Green, width, &mut lines);
    lines.push(Line::from(""));
    lines.push(heading("CRITICAL WEAKNESSES", Color::Red));
    bullets(&analysis.weaknesses, Color::Red, width, &mut lines);
    lines.push(Line::from(""));

    // Optimization lab
    lines.push(heading("PROFESSIONAL SUMMARY UPGRADE", Color::Cyan));
    lines.push(Line::from(Span::styled("  Current:", dim)));
    wrapped(
        &format!("\"{}\"", analysis.summary_suggestion.current),
        "    ",
        width,
        Style::default().add_modifier(Modifier::ITALIC),
        &mut lines,
    );
    lines.push(Line::from(Span::styled(
        "  ATS optimized version:",
        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
    )));
    wrapped(&analysis.summary_suggestion.optimized, "    ", width, Style::default(), &mut lines);
    lines.push(Line::from(""));

    lines.push(heading("FUTURE SKILL RECOMMENDATIONS", Color::Cyan));
    lines.push(chips(&analysis.future_skills, Color::Cyan));
    lines.push(Line::from(""));

    lines.push(heading("BULLET POINT PERFORMANCE UPGRADES", Color::Cyan));
    for upgrade in &analysis.experience_upgrades {
        wrapped(
            &upgrade.original,
            "  │ ",
            width,
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::CROSSED_OUT),
            &mut lines,
        );
        wrapped(
            &upgrade.upgraded,
            "  │ ",
            width,
            Style::default().add_modifier(Modifier::BOLD),
            &mut lines,
        );
        wrapped(
            &format!("↑ {}", upgrade.impact_description),
            "  │ ",
            width,
            Style::default().fg(Color::Green),
            &mut lines,
        );
        lines.push(Line::from(""));
    }

    lines.push(heading("ROLE-OPTIMIZED SKILL TAXONOMY", Color::White));
    for group in &analysis.skill_optimization {
        lines.push(Line::from(Span::styled(
            format!("  {}", group.category.to_uppercase()),
            dim.add_modifier(Modifier::BOLD),
        )));
        lines.push(chips(&group.skills, Color::White));
    }
    lines.push(Line::from(""));

    lines.push(heading("CRITICAL REJECTION RISKS", Color::Red));
    lines.push(Line::from(Span::styled(
        "  The following factors may trigger automatic ATS rejections or recruiter dismissals:",
        Style::default().fg(Color::Red),
    )));
    lines.push(chips(&analysis.rejection_risks, Color::Red));

    Text::from(lines)
}

/// Drops styling, one output line per rendered line.
pub fn to_plain(text: &Text) -> String {
    let mut out = String::new();
    for line in &text.lines {
        for span in &line.spans {
            out.push_str(&span.content);
        }
        out.push('\n');
    }
    out
}
