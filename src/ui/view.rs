//! Rendering for the interactive remote

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, List, ListItem, ListState, Paragraph},
    Frame,
};

use crate::models::{DeviceClass, FRIENDLY_MODEL_NAME};
use crate::remote::Remote;
use crate::ui::controls::{Controls, InputMode, HELP};
use crate::ui::Theme;

/// Draw the whole screen
pub fn render(frame: &mut Frame, remote: &Remote, controls: &Controls) {
    let area = frame.area();

    frame.render_widget(Clear, area);
    frame.render_widget(
        Block::default().style(Style::default().bg(Theme::BACKGROUND)),
        area,
    );

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(5),    // Devices + remote
            Constraint::Length(1), // Status bar
        ])
        .split(area);

    render_header(frame, chunks[0], remote);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(chunks[1]);
    render_devices(frame, body[0], remote);
    render_remote(frame, body[1], remote, controls);

    render_status_bar(frame, chunks[2], remote, controls);

    if controls.show_help {
        render_help(frame, area);
    }
}

fn render_header(frame: &mut Frame, area: Rect, remote: &Remote) {
    let discovering = if remote.is_discovering() {
        Span::styled("  ⟳ discovering", Theme::busy())
    } else {
        Span::raw("")
    };

    let title = Line::from(vec![
        Span::styled(" ROKU REMOTE ", Theme::title()),
        Span::styled(
            format!("  {} device(s)", remote.devices().len()),
            Theme::dimmed(),
        ),
        discovering,
    ]);

    let header = Paragraph::new(title).block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Theme::border()),
    );
    frame.render_widget(header, area);
}

fn render_devices(frame: &mut Frame, area: Rect, remote: &Remote) {
    let block = Block::default()
        .title(Span::styled(" Devices ", Theme::title()))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Theme::border());

    if remote.devices().is_empty() {
        let empty = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled("No devices yet", Theme::dimmed())),
            Line::from(Span::styled("press d to search again", Theme::dimmed())),
        ])
        .alignment(Alignment::Center)
        .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let items: Vec<ListItem> = remote
        .devices()
        .iter()
        .map(|device| {
            let name = device.cached_name().unwrap_or(device.base_url());
            ListItem::new(Line::from(Span::styled(format!(" {}", name), Theme::device())))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(Theme::device_selected())
        .highlight_symbol("▶");

    let mut state = ListState::default();
    state.select(remote.selected_index());
    frame.render_stateful_widget(list, area, &mut state);
}

fn render_remote(frame: &mut Frame, area: Rect, remote: &Remote, controls: &Controls) {
    let border = if controls.mode == InputMode::Typing {
        Theme::border_focused()
    } else {
        Theme::border()
    };
    let block = Block::default()
        .title(Span::styled(" Remote ", Theme::title()))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(border);

    let Some(device) = remote.selected() else {
        let waiting = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled("Waiting for a device...", Theme::busy())),
        ])
        .alignment(Alignment::Center)
        .block(block);
        frame.render_widget(waiting, area);
        return;
    };

    let info = device.cached_info();
    let model = info
        .and_then(|i| i.get(FRIENDLY_MODEL_NAME))
        .unwrap_or("unknown model");
    let class = info.map(DeviceClass::from_info).unwrap_or(DeviceClass::Unknown);

    let power = match remote.power() {
        Some(true) => Span::styled("● ON", Theme::power(true)),
        Some(false) => Span::styled("○ OFF", Theme::power(false)),
        None => Span::styled("? unknown", Theme::dimmed()),
    };

    let mut lines = vec![
        Line::from(Span::styled(
            device.cached_name().unwrap_or("unnamed"),
            Theme::title(),
        )),
        Line::from(Span::styled(format!("{} · {}", model, class), Theme::dimmed())),
        Line::from(Span::styled(device.base_url(), Theme::dimmed())),
        Line::from(""),
        Line::from(vec![Span::styled("Power  ", Theme::dimmed()), power]),
        Line::from(vec![
            Span::styled("Input  ", Theme::dimmed()),
            Span::styled(format!("next: {}", controls.input), Theme::device()),
        ]),
    ];

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled("Channels", Theme::dimmed())));
    if controls.channels.is_empty() {
        lines.push(Line::from(Span::styled(
            "  none configured ([[channels]] in config.toml)",
            Theme::dimmed(),
        )));
    }
    for (n, channel) in controls.channels.iter().enumerate() {
        lines.push(Line::from(vec![
            Span::styled(format!("  {} ", n + 1), Theme::keycap()),
            Span::styled(channel.label.as_str(), Theme::device()),
        ]));
    }

    if let Some(sent) = &controls.last_sent {
        lines.push(Line::from(vec![
            Span::styled("Sent   ", Theme::dimmed()),
            Span::styled(sent.as_str(), Theme::keycap()),
        ]));
    }

    if controls.mode == InputMode::Typing {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Typing: keys go to the on-screen keyboard (Esc to stop)",
            Theme::busy(),
        )));
    }

    let panel = Paragraph::new(lines).block(block);
    frame.render_widget(panel, area);
}

fn render_status_bar(frame: &mut Frame, area: Rect, remote: &Remote, controls: &Controls) {
    let mode = match controls.mode {
        InputMode::Normal => Span::styled(" REMOTE ", Theme::mode_badge(false)),
        InputMode::Typing => Span::styled(" TYPING ", Theme::mode_badge(true)),
    };

    let line = Line::from(vec![
        mode,
        Span::raw(" "),
        Span::styled(remote.status.as_str(), Theme::status_bar()),
        Span::raw(" │ "),
        Span::styled("?:help  q:quit", Theme::dimmed()),
    ]);

    frame.render_widget(Paragraph::new(line).style(Theme::status_bar()), area);
}

fn render_help(frame: &mut Frame, area: Rect) {
    let height = (HELP.len() as u16 + 2).min(area.height);
    let width = 50.min(area.width);
    let popup = Rect {
        x: area.x + area.width.saturating_sub(width) / 2,
        y: area.y + area.height.saturating_sub(height) / 2,
        width,
        height,
    };

    frame.render_widget(Clear, popup);

    let lines: Vec<Line> = HELP
        .iter()
        .map(|(keys, what)| {
            Line::from(vec![
                Span::styled(format!("{:>16}  ", keys), Theme::keycap()),
                Span::styled(*what, Theme::device()),
            ])
        })
        .collect();

    let help = Paragraph::new(lines).block(
        Block::default()
            .title(Span::styled(" Keys ", Theme::title()))
            .borders(Borders::ALL)
            .border_type(BorderType::Double)
            .border_style(Theme::border_focused())
            .style(Style::default().bg(Theme::PANEL)),
    );
    frame.render_widget(help, popup);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::EcpClient;
    use crate::config::ChannelPreset;
    use crate::device::DeviceDescriptor;
    use crate::discovery::{DiscoveryEngine, SessionId};
    use crate::remote::RemoteSettings;
    use ratatui::{backend::TestBackend, Terminal};

    fn buffer_text(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[tokio::test]
    async fn test_render_empty_remote() {
        let remote = Remote::new(RemoteSettings::default(), DiscoveryEngine::new(), EcpClient::new());
        let controls = Controls::new();
        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();

        terminal.draw(|f| render(f, &remote, &controls)).unwrap();

        let text = buffer_text(&terminal);
        assert!(text.contains("ROKU REMOTE"));
        assert!(text.contains("No devices yet"));
        assert!(text.contains("REMOTE"));
    }

    #[tokio::test]
    async fn test_render_lists_channel_presets() {
        let mut server = mockito::Server::new_async().await;
        let _info = server
            .mock("GET", "/query/device-info")
            .with_status(200)
            .with_body(
                "<device-info>\
                   <friendly-device-name>Den</friendly-device-name>\
                   <power-mode>PowerOn</power-mode>\
                 </device-info>",
            )
            .create_async()
            .await;

        let mut remote = Remote::new(RemoteSettings::default(), DiscoveryEngine::new(), EcpClient::new());
        remote
            .publisher()
            .publish(SessionId::new(1), DeviceDescriptor::new(EcpClient::new(), server.url()));
        remote.drain_registrations().await;

        let controls = Controls::new().with_channels(vec![
            ChannelPreset {
                id: "12".to_string(),
                label: "Netflix".to_string(),
            },
            ChannelPreset {
                id: "837".to_string(),
                label: "YouTube".to_string(),
            },
        ]);
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();

        terminal.draw(|f| render(f, &remote, &controls)).unwrap();

        let text = buffer_text(&terminal);
        assert!(text.contains("Channels"));
        assert!(text.contains("1 Netflix"));
        assert!(text.contains("2 YouTube"));
    }

    #[tokio::test]
    async fn test_render_help_and_typing_mode() {
        let remote = Remote::new(RemoteSettings::default(), DiscoveryEngine::new(), EcpClient::new());
        let mut controls = Controls::new();
        controls.show_help = true;
        controls.mode = InputMode::Typing;
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();

        terminal.draw(|f| render(f, &remote, &controls)).unwrap();

        let text = buffer_text(&terminal);
        assert!(text.contains("TYPING"));
        assert!(text.contains("Keys"));
    }
}
