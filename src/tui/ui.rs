//! UI rendering for the debugger.

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph, List, ListItem},
    style::{Color, Style, Modifier},
};
use crate::MachineState;
use super::app::DebuggerApp;

/// Main draw function.
pub fn draw(frame: &mut Frame, app: &DebuggerApp) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(60),
            Constraint::Percentage(40),
        ])
        .split(frame.area());

    // Left side: code, machine state and status
    let left_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(10),
            Constraint::Length(7),
            Constraint::Length(3),
        ])
        .split(chunks[0]);

    draw_disassembly(frame, left_chunks[0], app);
    draw_machine(frame, left_chunks[1], app);
    draw_status(frame, left_chunks[2], app);

    // Right side: memory, output and help
    let right_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(10),
            Constraint::Length(6),
            Constraint::Length(5),
        ])
        .split(chunks[1]);

    draw_memory(frame, right_chunks[0], app);
    draw_output(frame, right_chunks[1], app);
    draw_help(frame, right_chunks[2]);
}

/// Draw disassembly starting at the instruction pointer.
fn draw_disassembly(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let disasm = app.get_disassembly((area.height as usize).saturating_sub(2));

    let items: Vec<ListItem> = disasm
        .iter()
        .map(|(addr, instr, is_current)| {
            let prefix = if *is_current { "▶ " } else { "  " };
            let bp = if app.breakpoints.contains(addr) { "●" } else { " " };
            let text = format!("{}{:04}: {}", prefix, addr, instr);

            let style = if *is_current {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else if app.breakpoints.contains(addr) {
                Style::default().fg(Color::Red)
            } else {
                Style::default()
            };

            ListItem::new(format!("{} {}", bp, text)).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(Block::default()
            .title(" Disassembly ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)));

    frame.render_widget(list, area);
}

/// Draw instruction pointer, relative base, state and queues.
fn draw_machine(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let vm = &app.vm;
    let input: Vec<String> = vm.input().iter().map(|v| v.to_string()).collect();

    let content = vec![
        Line::from(vec![
            Span::raw("IP: "),
            Span::styled(format!("{:<8}", vm.ip()), Style::default().fg(Color::Yellow)),
            Span::raw("RB: "),
            Span::styled(format!("{}", vm.relative_base()), Style::default().fg(Color::White)),
        ]),
        Line::from(vec![
            Span::raw("Cycles: "),
            Span::styled(format!("{}", vm.cycles), Style::default().fg(Color::Cyan)),
            Span::raw("   State: "),
            Span::styled(format!("{:?}", vm.state), state_style(vm.state)),
        ]),
        Line::from(vec![
            Span::raw("Input queue: "),
            Span::styled(format!("[{}]", input.join(", ")), Style::default().fg(Color::White)),
        ]),
        Line::from(vec![
            Span::raw("Memory cells: "),
            Span::styled(format!("{}", vm.mem.len()), Style::default().fg(Color::White)),
            Span::raw(" + far: "),
            Span::styled(format!("{}", vm.mem.far_len()), Style::default().fg(Color::White)),
        ]),
    ];

    let paragraph = Paragraph::new(content)
        .block(Block::default()
            .title(" Machine ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Green)));

    frame.render_widget(paragraph, area);
}

/// Draw memory view.
fn draw_memory(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let visible_rows = (area.height as usize).saturating_sub(2);
    let ip = app.vm.ip();

    let items: Vec<ListItem> = app.vm.mem
        .dump(app.mem_scroll, visible_rows)
        .into_iter()
        .map(|(addr, value)| {
            let text = format!("{:04}: {}", addr, value);

            let style = if addr == ip {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else if value != 0 {
                Style::default().fg(Color::White)
            } else {
                Style::default().fg(Color::DarkGray)
            };

            ListItem::new(text).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(Block::default()
            .title(" Memory ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Magenta)));

    frame.render_widget(list, area);
}

/// Draw the most recent outputs.
fn draw_output(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let shown = app.outputs.len().saturating_sub(32);
    let recent: Vec<String> = app.outputs[shown..].iter().map(|v| v.to_string()).collect();

    let output = Paragraph::new(recent.join(" "))
        .wrap(ratatui::widgets::Wrap { trim: true })
        .style(Style::default().fg(Color::White))
        .block(Block::default()
            .title(format!(" Output ({}) ", app.outputs.len()))
            .borders(Borders::ALL));

    frame.render_widget(output, area);
}

/// Draw status bar, or the input prompt while entering a value.
fn draw_status(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let (title, text) = match &app.input_line {
        Some(line) => (" Input ", format!("> {}", line)),
        None => (" Status ", app.status.clone()),
    };

    let status = Paragraph::new(text)
        .style(Style::default().fg(Color::White))
        .block(Block::default()
            .title(title)
            .borders(Borders::ALL));

    frame.render_widget(status, area);
}

/// Draw help panel.
fn draw_help(frame: &mut Frame, area: Rect) {
    let help = Paragraph::new(vec![
        Line::from("s: Step  r: Run  p: Pause  b: Breakpoint"),
        Line::from("i: Input  x: Reset  ↑↓/PgUp/PgDn: Memory"),
        Line::from("q: Quit"),
    ])
    .style(Style::default().fg(Color::DarkGray))
    .block(Block::default()
        .title(" Help ")
        .borders(Borders::ALL));

    frame.render_widget(help, area);
}

/// Get color style for a machine state.
fn state_style(state: MachineState) -> Style {
    match state {
        MachineState::Running => Style::default().fg(Color::Green),
        MachineState::HasOutput => Style::default().fg(Color::Cyan),
        MachineState::WaitingForInput => Style::default().fg(Color::Yellow),
        MachineState::Halted => Style::default().fg(Color::Red),
    }
}
