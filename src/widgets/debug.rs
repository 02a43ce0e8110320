use ratatui::{
    buffer::Buffer,
    layout::Rect,
    widgets::{Paragraph, Widget},
};
use std::time::Duration;

#[derive(Default)]
pub struct DebugState {
    pub enabled: bool,
    pub num_events: usize,
    pub num_frames: usize,
    pub num_key_events: usize,
    pub last_key_event_name: String,
    pub last_type_name: String,
    pub num_recomputes: usize,
    pub last_recompute: Option<Duration>,
    /// Last action taken for a key, e.g. "next_tab".
    pub last_action: String,
}

impl DebugState {
    pub fn on_key(&mut self, event: &crossterm::event::KeyEvent) {
        self.num_key_events += 1;
        self.last_key_event_name = format!("{:?}", event.code);
        self.last_type_name = format!("{:?}", event.kind);
    }

    pub fn on_recompute(&mut self, elapsed: Duration) {
        self.num_recomputes += 1;
        self.last_recompute = Some(elapsed);
    }
}

impl Widget for &DebugState {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let recompute = self
            .last_recompute
            .map(|d| format!("{:.1}ms", d.as_secs_f64() * 1000.0))
            .unwrap_or_else(|| "-".to_string());
        Paragraph::new(format!(
            "events={} keys={} last_key={} kind={} last_action={} frames={} recomputes={} last_recompute={}",
            self.num_events,
            self.num_key_events,
            self.last_key_event_name,
            self.last_type_name,
            self.last_action,
            self.num_frames,
            self.num_recomputes,
            recompute
        ))
        .render(area, buf);
    }
}
