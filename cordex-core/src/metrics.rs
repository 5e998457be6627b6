use prometheus::{IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

/// Counters for everything the dispatcher does.
///
/// Each instance owns its registry rather than using the process-global one, so several
/// dispatchers can live in one process.
pub struct Metrics {
    registry: Registry,
    /// Inbound events, including ones that never resolved to a command.
    pub events: IntCounter,
    /// Commands whose handler was spawned, by command path.
    pub commands: IntCounterVec,
    /// Gate rejections, by reason.
    pub rejections: IntCounterVec,
    /// Handlers that returned an error or panicked, by command path.
    pub failures: IntCounterVec,
    /// Unknown command names.
    pub not_found: IntCounter,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Metrics> {
        let registry = Registry::new_custom(Some("cordex".to_owned()), None)?;

        let events = IntCounter::new("events", "Total number of inbound events")?;
        let commands = IntCounterVec::new(Opts::new("commands", "Commands executed"), &["command"])?;
        let rejections = IntCounterVec::new(Opts::new("rejections", "Invocations rejected by the gate"), &[
            "reason",
        ])?;
        let failures = IntCounterVec::new(Opts::new("failures", "Command handlers that failed"), &["command"])?;
        let not_found = IntCounter::new("not_found", "Invocations of unknown commands")?;

        registry.register(Box::new(events.clone()))?;
        registry.register(Box::new(commands.clone()))?;
        registry.register(Box::new(rejections.clone()))?;
        registry.register(Box::new(failures.clone()))?;
        registry.register(Box::new(not_found.clone()))?;

        Ok(Metrics {
            registry,
            events,
            commands,
            rejections,
            failures,
            not_found,
        })
    }

    pub fn add_event(&self) {
        self.events.inc();
    }

    pub fn add_command(&self, command: &str) {
        self.commands.with_label_values(&[command]).inc();
    }

    pub fn add_rejection(&self, reason: &str) {
        self.rejections.with_label_values(&[reason]).inc();
    }

    pub fn add_failure(&self, command: &str) {
        self.failures.with_label_values(&[command]).inc();
    }

    pub fn add_not_found(&self) {
        self.not_found.inc();
    }

    /// Every metric in the Prometheus text exposition format.
    pub fn render(&self) -> anyhow::Result<String> {
        Ok(TextEncoder::new().encode_to_string(&self.registry.gather())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_render_with_labels() {
        let metrics = Metrics::new().unwrap();
        metrics.add_event();
        metrics.add_command("ping");
        metrics.add_command("ping");
        metrics.add_rejection("on_cooldown");

        assert_eq!(metrics.commands.with_label_values(&["ping"]).get(), 2);

        let rendered = metrics.render().unwrap();
        assert!(rendered.contains("cordex_events 1"));
        assert!(rendered.contains(r#"cordex_commands{command="ping"} 2"#));
        assert!(rendered.contains(r#"cordex_rejections{reason="on_cooldown"} 1"#));
    }

    #[test]
    fn instances_are_independent() {
        let first = Metrics::new().unwrap();
        let second = Metrics::new().unwrap();
        first.add_not_found();
        assert_eq!(second.not_found.get(), 0);
    }
}
