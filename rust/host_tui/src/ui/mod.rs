use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Style, Stylize},
    symbols::Marker,
    text::{Line, Text},
    widgets::{
        Axis, Block, BorderType, Chart, Dataset, GraphType, List, ListItem, ListState, Paragraph,
        StatefulWidget, Widget,
    },
};

use crate::app::{Action, App, Origin, RunState};

impl Widget for &mut App {
    /// Renders the user interface widgets.
    fn render(self, area: Rect, buf: &mut Buffer) {
        let layout = Layout::vertical([Constraint::Fill(1), Constraint::Length(1)]);
        let [main_area, footer_area] = area.layout(&layout);

        let footer = Text::from(format!(
            "{} @ {} baud -> {}",
            self.config.port,
            self.config.baud_rate,
            self.config.output.display()
        ))
        .centered();
        footer.render(footer_area, buf);

        let main_layout = Layout::horizontal([Constraint::Ratio(1, 3), Constraint::Ratio(2, 3)]);
        let [left_third, right_area] = main_area.layout(&main_layout);

        let left_layout = Layout::vertical([
            Constraint::Length(8),
            Constraint::Length(8),
            Constraint::Fill(1),
        ]);
        let [commands_area, status_area, info_area] = left_third.layout(&left_layout);
        self.render_commands(commands_area, buf);
        self.render_status(status_area, buf);
        self.render_info(info_area, buf);

        let chart_layout = Layout::vertical([Constraint::Ratio(1, 2); 2]);
        let [angle_area, duty_area] = right_area.layout(&chart_layout);
        self.render_charts(angle_area, duty_area, buf);
    }
}

impl App {
    fn render_commands(&mut self, area: Rect, buf: &mut Buffer) {
        let instructions = Line::from(vec![
            " Move: ".into(),
            "<Up>,<Down>".blue().bold(),
            " Select: ".into(),
            "<Enter>".blue().bold(),
            " Exit: ".into(),
            "<Esc>,<Ctrl+C> ".blue().bold(),
        ]);

        let cmd_block = Block::bordered()
            .title(" Commands ")
            .title_alignment(Alignment::Center)
            .border_type(BorderType::Rounded)
            .title_bottom(instructions);

        let items = Action::ALL
            .iter()
            .map(|action| format!("{action} <{}>", action.shortcut()));
        let list = List::new(items)
            .block(cmd_block)
            .highlight_symbol("-> ")
            .highlight_style(Style::new().blue());

        StatefulWidget::render(list, area, buf, &mut self.commands_state);
    }

    fn render_status(&self, area: Rect, buf: &mut Buffer) {
        let status_block = Block::bordered()
            .title(" Latest reading ")
            .title_alignment(Alignment::Center)
            .border_type(BorderType::Rounded);

        let state = match self.run_state {
            RunState::Idle => "Waiting for start".yellow(),
            RunState::Running => "Running".green(),
            RunState::Ended => "Finished".blue(),
        };
        let link = if self.connected {
            "connected".green()
        } else {
            "lost, restart to reconnect".red()
        };
        let mut lines = vec![
            Line::from(vec!["State: ".into(), state]),
            Line::from(vec!["Link: ".into(), link]),
        ];
        match self.latest {
            Some(sample) => {
                lines.push(Line::from(format!("Angle: {:.4} deg", sample.angle_deg)));
                lines.push(Line::from(format!("Duty cycle: {:.4} %", sample.duty_percent)));
                lines.push(Line::from(format!("Timer: {} ms", sample.time_ms)));
            }
            None => lines.push(Line::from("No samples yet")),
        }
        let unsaved = if self.recording.has_unsaved() {
            " (unsaved)"
        } else {
            ""
        };
        lines.push(Line::from(format!(
            "Recorded: {} samples{unsaved}",
            self.recording.len()
        )));

        Paragraph::new(lines).block(status_block).render(area, buf);
    }

    fn render_info(&self, area: Rect, buf: &mut Buffer) {
        let info_block = Block::bordered()
            .title(" Messages to/from MCU ")
            .title_alignment(Alignment::Center)
            .border_type(BorderType::Rounded);

        let items = self.messages.iter().map(|entry| {
            let item = ListItem::new(Text::from(format!(
                "{} -- {}: {}",
                entry.timestamp.format("%H:%M:%S%.3f"),
                entry.origin,
                entry.text
            )));
            match entry.origin {
                Origin::Local => item.dim(),
                _ => item,
            }
        });

        let list = List::new(items).block(info_block);
        let mut state = ListState::default();
        state.select_last();

        StatefulWidget::render(list, area, buf, &mut state);
    }

    fn render_charts(&mut self, angle_area: Rect, duty_area: Rect, buf: &mut Buffer) {
        let x_bounds = self.plot.x_bounds();
        let angle_bounds = self.plot.angle_bounds();
        let duty_bounds = self.plot.duty_bounds();
        let (angles, duties) = self.plot.series();

        let angle = Dataset::default()
            .name("Angle")
            .marker(Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::new().fg(Color::Cyan))
            .data(angles);
        chart(angle, " Angle (deg) ", x_bounds, angle_bounds).render(angle_area, buf);

        let duty = Dataset::default()
            .name("Duty cycle")
            .marker(Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::new().fg(Color::Magenta))
            .data(duties);
        chart(duty, " Duty cycle (%) ", x_bounds, duty_bounds).render(duty_area, buf);
    }
}

fn chart<'a>(
    dataset: Dataset<'a>,
    title: &'a str,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
) -> Chart<'a> {
    let block = Block::bordered()
        .title(title)
        .title_alignment(Alignment::Center)
        .border_type(BorderType::Rounded);
    Chart::new(vec![dataset])
        .block(block)
        .x_axis(
            Axis::default()
                .title("Time (ms)")
                .bounds(x_bounds)
                .labels(axis_labels(x_bounds, 0)),
        )
        .y_axis(
            Axis::default()
                .bounds(y_bounds)
                .labels(axis_labels(y_bounds, 1)),
        )
}

/// Labels for the two ends and the middle of an axis.
fn axis_labels(bounds: [f64; 2], precision: usize) -> [String; 3] {
    let [low, high] = bounds;
    [low, (low + high) / 2.0, high].map(|value| format!("{value:.precision$}"))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_axis_labels() {
        assert_eq!(axis_labels([0.0, 10_000.0], 0), ["0", "5000", "10000"]);
        assert_eq!(axis_labels([-45.0, 90.0], 1), ["-45.0", "22.5", "90.0"]);
    }
}
