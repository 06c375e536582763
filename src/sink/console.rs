use std::io::Write;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use tracing::debug;

use crate::event::Event;
use crate::filter::RuleSet;
use crate::format::EventTemplate;
use crate::sink::Sink;

pub const CONSOLE_SINK_NAME: &str = "logs";

/// Writes one formatted line per accepted event. The writer is injectable
/// so tests can capture output; production wires up stdout.
pub struct ConsoleSink {
    rules: RuleSet,
    template: EventTemplate,
    writer: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleSink {
    pub fn new(rules: RuleSet, template: EventTemplate) -> Self {
        Self::with_writer(rules, template, Box::new(std::io::stdout()))
    }

    pub fn with_writer(
        rules: RuleSet,
        template: EventTemplate,
        writer: Box<dyn Write + Send>,
    ) -> Self {
        Self {
            rules,
            template,
            writer: Mutex::new(writer),
        }
    }
}

impl Sink for ConsoleSink {
    fn name(&self) -> &str {
        CONSOLE_SINK_NAME
    }

    fn deliver(&self, event: &Event) -> Result<()> {
        if !self.rules.is_allowed(event) {
            debug!(key = %event.key(), sink = CONSOLE_SINK_NAME, "event rejected by filter");
            return Ok(());
        }

        let line = self.template.render(event);
        let mut writer = self.writer.lock();
        writeln!(writer, "{line}").context("writing event line")?;
        Ok(())
    }
}
