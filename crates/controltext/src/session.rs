//! One text protocol session over a schema.
//!
//! A session reads lines, applies them to the schema through a
//! [`SchemaAdaptor`] keyed by [`TextAddress`], and writes responses to a
//! [`LineSink`]. Subscriptions live on a notifier owned by the session and
//! deliver through the same sink.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use controlconf::ControlConfig;
use controlplane::{
    ChangeNotifierAdaptor, ControlIdentityComparator, IdentitySet, Milliseconds, RangedValue, Schema, SchemaAdaptor,
    Section, TextAddress, ValuePosition, DEFAULT_MIN_SCAN_PERIOD,
};
use regex::Regex;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::TextError;
use crate::escape::{escape, unescape};

/// Characters that turn an address into a pattern.
const REGEX_CHARS: &[char] = &['\\', ':', '[', ']', '{', '}', '|', '+', '(', ')', '.', '^', '$', '*', '?'];

const SLEEP: Duration = Duration::from_millis(500);

/// Where a session writes its output lines.
pub trait LineSink: Send + Sync {
    fn send_line(&self, line: String);
}

impl LineSink for mpsc::UnboundedSender<String> {
    fn send_line(&self, line: String) {
        if self.send(line).is_err() {
            debug!("output closed, dropping line");
        }
    }
}

/// Collects lines in memory. Clones share the buffer.
#[derive(Debug, Clone, Default)]
pub struct CapturedLines {
    lines: Arc<Mutex<Vec<String>>>,
}

impl CapturedLines {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain everything written so far.
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.lines.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl LineSink for CapturedLines {
    fn send_line(&self, line: String) {
        self.lines.lock().unwrap_or_else(PoisonError::into_inner).push(line);
    }
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Repeat each input line prefixed with `>`.
    pub echo: bool,
    pub max_update_period: Milliseconds,
    pub min_update_period: Milliseconds,
    pub min_scan_period: Milliseconds,
    /// Address patterns that protocol writes may not change.
    pub write_protect: Vec<String>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            echo: false,
            max_update_period: 30,
            min_update_period: 10_000,
            min_scan_period: DEFAULT_MIN_SCAN_PERIOD,
            write_protect: Vec::new(),
        }
    }
}

impl From<&ControlConfig> for SessionOptions {
    fn from(config: &ControlConfig) -> Self {
        Self {
            echo: config.session.echo,
            max_update_period: config.subscription.max_update_period_ms,
            min_update_period: config.subscription.min_update_period_ms,
            min_scan_period: config.notifier.min_scan_period_ms,
            write_protect: config.session.write_protect.clone(),
        }
    }
}

/// What the caller should do after a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// Pause before reading the next line.
    Sleep(Duration),
    Quit,
}

pub struct TextSession {
    adaptor: Arc<SchemaAdaptor<TextAddress>>,
    notifications: ChangeNotifierAdaptor<TextAddress>,
    sink: Arc<dyn LineSink>,
    write_access: ControlIdentityComparator,
    options: SessionOptions,
}

impl TextSession {
    pub fn new(schema: Arc<Schema>, sink: Arc<dyn LineSink>, options: SessionOptions) -> Result<Self, TextError> {
        let adaptor = Arc::new(SchemaAdaptor::<TextAddress>::new(schema));
        let notifications = adaptor.change_notifier(options.min_scan_period);

        let protected = IdentitySet::new();
        adaptor.schema().fill_write_access(&protected);
        for pattern in &options.write_protect {
            for address in matching_addresses(&adaptor, pattern)? {
                protected.add(adaptor.lookup_identity_for_address(&address)?);
            }
        }
        info!(protected = protected.num_items(), "text session started");

        Ok(Self {
            adaptor,
            notifications,
            sink,
            write_access: ControlIdentityComparator::set(protected),
            options,
        })
    }

    pub fn adaptor(&self) -> &Arc<SchemaAdaptor<TextAddress>> {
        &self.adaptor
    }

    /// Run the session's own subscriptions.
    pub fn tick(&self, now: Milliseconds) {
        self.notifications.tick(now);
    }

    /// Apply one input line. Failures are reported on the sink.
    pub fn handle_line(&self, now: Milliseconds, line: &str) -> Flow {
        if self.options.echo {
            self.sink.send_line(format!(">{}", line));
        }
        match self.dispatch(now, line) {
            Ok(flow) => flow,
            Err(e) => {
                debug!(line, error = %e, "line failed");
                self.sink.send_line(format!("# Error: {} : {}", line, e));
                Flow::Continue
            }
        }
    }

    fn dispatch(&self, now: Milliseconds, line: &str) -> Result<Flow, TextError> {
        if line == ":quit" || line == ":exit" {
            return Ok(Flow::Quit);
        }
        let Some(first) = line.chars().next() else {
            return Ok(Flow::Continue);
        };
        let has_equals = line.contains('=');

        match first {
            '#' => {}
            c if (c.is_ascii_alphanumeric() || c == '/') && !has_equals => self.handle_get(line)?,
            '?' => self.handle_describe(&line[1..])?,
            '+' => self.handle_subscribe(now, &line[1..])?,
            '-' => self.handle_unsubscribe(&line[1..])?,
            ':' => return self.handle_command(&line[1..]),
            _ if has_equals => self.handle_set(now, line)?,
            _ => {}
        }
        Ok(Flow::Continue)
    }

    /// Expand `address` to every address it names.
    fn targets(&self, address: &str) -> Result<Vec<TextAddress>, TextError> {
        if address.contains(REGEX_CHARS) {
            matching_addresses(&self.adaptor, address)
        } else {
            Ok(vec![TextAddress::from(address)])
        }
    }

    fn handle_get(&self, line: &str) -> Result<(), TextError> {
        let Some(address) = line.split_whitespace().next() else {
            return Ok(());
        };
        for target in self.targets(address)? {
            self.sink.send_line(get_line(&self.adaptor, &target)?);
        }
        Ok(())
    }

    fn handle_set(&self, now: Milliseconds, line: &str) -> Result<(), TextError> {
        let Some((address, value)) = line.split_once('=') else {
            return Ok(());
        };
        let address = address.trim();
        if address.is_empty() || value.is_empty() {
            return Ok(());
        }

        if address.contains(REGEX_CHARS) {
            let targets = matching_addresses(&self.adaptor, address)?;
            let _hold = self.adaptor.schema().manager().hold();
            for target in targets {
                self.set_one(now, &target, value)?;
            }
        } else {
            self.set_one(now, &TextAddress::from(address), value)?;
        }
        Ok(())
    }

    fn set_one(&self, now: Milliseconds, address: &TextAddress, value: &str) -> Result<(), TextError> {
        let validator = Some(&self.write_access);
        if self.adaptor.is_storage_type_string(address)? {
            self.adaptor.set_value(validator, now, address, unescape(value)?)?;
        } else {
            self.adaptor.set_value(validator, now, address, value)?;
        }
        self.sink.send_line(get_line(&self.adaptor, address)?);
        Ok(())
    }

    fn handle_describe(&self, line: &str) -> Result<(), TextError> {
        let Some(address) = line.split_whitespace().next() else {
            return Ok(());
        };
        for target in self.targets(address)? {
            self.sink.send_line(self.describe(&target)?);
        }
        Ok(())
    }

    fn describe(&self, address: &TextAddress) -> Result<String, TextError> {
        let identity = self.adaptor.lookup_identity_for_address(address)?;
        let schema = self.adaptor.schema();
        let pos = ValuePosition::default();

        let body = match identity.section {
            Section::DescriptorLevel => {
                let value = schema.with_control_value(&identity, pos, |v| describe_value(&v.name, &v.value))?;
                format!(": [{}]", value)
            }
            Section::Property => {
                let value = schema.with_control_value(&identity, pos, |v| describe_value(&v.name, &v.value))?;
                format!(":{}", value)
            }
            Section::Name => {
                let name = format!("name_{}", identity.item + 1);
                format!(":{}", schema.with_ranged_value(&identity, pos, |v| describe_value(&name, v))?)
            }
            Section::HPosLevel | Section::WPosLevel => {
                let name = format!("item_{}_{}", identity.h_pos + 1, identity.w_pos + 1);
                format!(":{}", schema.with_ranged_value(&identity, pos, |v| describe_value(&name, v))?)
            }
        };
        Ok(format!("?{{'{}'{}}}", address, body))
    }

    fn handle_subscribe(&self, now: Milliseconds, line: &str) -> Result<(), TextError> {
        let mut params = line.split_whitespace();
        let Some(address) = params.next() else {
            return Ok(());
        };
        let max_update_period = match params.next() {
            Some(p) => parse_period(p)?,
            None => self.options.max_update_period,
        };
        let min_update_period = match params.next() {
            Some(p) => parse_period(p)?,
            None => self.options.min_update_period,
        };

        for target in self.targets(address)? {
            let adaptor = Arc::clone(&self.adaptor);
            let sink = Arc::clone(&self.sink);
            self.notifications.add_address_subscription(
                &target,
                max_update_period,
                min_update_period,
                now,
                move |_, addresses: &BTreeSet<TextAddress>| deliver(&adaptor, sink.as_ref(), addresses),
            )?;
            debug!(address = %target, max_update_period, min_update_period, "subscribed");
        }
        Ok(())
    }

    fn handle_unsubscribe(&self, line: &str) -> Result<(), TextError> {
        for target in self.targets(line.trim())? {
            if !self.notifications.remove_address_subscription(&target)? {
                debug!(address = %target, "no subscription to remove");
            }
            self.sink.send_line(format!("-{}", target));
        }
        Ok(())
    }

    fn handle_command(&self, line: &str) -> Result<Flow, TextError> {
        match line.split_whitespace().next() {
            Some("sleep") => Ok(Flow::Sleep(SLEEP)),
            Some(other) => Err(TextError::BadCommand(other.to_string())),
            None => Ok(Flow::Continue),
        }
    }
}

impl std::fmt::Debug for TextSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextSession")
            .field("adaptor", &self.adaptor)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

fn deliver(adaptor: &SchemaAdaptor<TextAddress>, sink: &dyn LineSink, addresses: &BTreeSet<TextAddress>) {
    for address in addresses {
        match get_line(adaptor, address) {
            Ok(line) => sink.send_line(line),
            Err(e) => warn!(address = %address, error = %e, "delivery failed"),
        }
    }
}

/// Every published address matching the whole of `pattern`.
fn matching_addresses(adaptor: &SchemaAdaptor<TextAddress>, pattern: &str) -> Result<Vec<TextAddress>, TextError> {
    let regex = Regex::new(&format!("^(?:{})$", pattern))?;
    Ok(adaptor
        .addresses()
        .filter(|a| regex.is_match(a.as_str()))
        .cloned()
        .collect())
}

fn get_line(adaptor: &SchemaAdaptor<TextAddress>, address: &TextAddress) -> Result<String, TextError> {
    let value = adaptor.get_value_string(address, false)?;
    if adaptor.is_storage_type_string(address)? {
        Ok(format!("{}='{}'", address, escape(&value)))
    } else {
        Ok(format!("{}={}", address, value))
    }
}

fn describe_value(name: &str, v: &RangedValue) -> String {
    if v.is_string() {
        return format!("[ {{ 'value' : '{}'}} ]", escape(&v.value_string(false)));
    }
    format!(
        "{{ 'name' : '{}', 'value' : '{}', 'minimum' : '{}', 'maximum' : '{}', 'default' : '{}', 'step' : '{}', 'units' : '{}'}}",
        name,
        v.value_string(false),
        v.minimum_string(false),
        v.maximum_string(false),
        v.default_string(false),
        v.step_string(false),
        v.units_suffix(),
    )
}

fn parse_period(s: &str) -> Result<Milliseconds, TextError> {
    s.parse::<Milliseconds>()
        .map_err(|_| TextError::InvalidPeriod(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mixer::{generate, MixerLayout};

    fn session(options: SessionOptions) -> (TextSession, CapturedLines) {
        let schema = Arc::new(generate(&MixerLayout::new(2, 1)));
        let lines = CapturedLines::new();
        let session = TextSession::new(schema, Arc::new(lines.clone()), options).unwrap();
        (session, lines)
    }

    #[test]
    fn test_flow() {
        let (s, _) = session(SessionOptions::default());
        assert_eq!(s.handle_line(0, ":quit"), Flow::Quit);
        assert_eq!(s.handle_line(0, ":exit"), Flow::Quit);
        assert_eq!(s.handle_line(0, ":sleep"), Flow::Sleep(Duration::from_millis(500)));
        assert_eq!(s.handle_line(0, ""), Flow::Continue);
        assert_eq!(s.handle_line(0, "# nothing"), Flow::Continue);
    }

    #[test]
    fn test_echo() {
        let (s, lines) = session(SessionOptions {
            echo: true,
            ..Default::default()
        });
        s.handle_line(0, "/input/1/mute");
        assert_eq!(lines.take(), vec![">/input/1/mute", "/input/1/mute=false"]);
    }

    #[test]
    fn test_bad_command() {
        let (s, lines) = session(SessionOptions::default());
        s.handle_line(0, ":dance now");
        assert_eq!(lines.take(), vec!["# Error: :dance now : Bad command: dance"]);
    }

    #[test]
    fn test_bad_period() {
        let (s, lines) = session(SessionOptions::default());
        s.handle_line(0, "+/input/1/gain soon");
        assert_eq!(lines.take(), vec!["# Error: +/input/1/gain soon : invalid period: soon"]);
    }

    #[test]
    fn test_regex_detection() {
        let (s, _) = session(SessionOptions::default());
        let targets = s.targets("/input/.*/gain").unwrap();
        assert_eq!(targets, vec![TextAddress::from("/input/1/gain"), TextAddress::from("/input/2/gain")]);
        assert_eq!(s.targets("/nowhere").unwrap(), vec![TextAddress::from("/nowhere")]);
    }

    #[test]
    fn test_pattern_is_anchored() {
        let (s, _) = session(SessionOptions::default());
        assert!(s.targets("input.*").unwrap().is_empty());
    }

    #[test]
    fn test_write_protect_patterns() {
        let (s, lines) = session(SessionOptions {
            write_protect: vec!["/output/.*".into()],
            ..Default::default()
        });
        s.handle_line(0, "/output/1/mute=1");
        assert_eq!(lines.take(), vec!["# Error: /output/1/mute=1 : read only: /output/1/mute"]);
        s.handle_line(0, "/input/1/mute=1");
        assert_eq!(lines.take(), vec!["/input/1/mute=true"]);
    }

    #[test]
    fn test_options_from_config() {
        let mut config = ControlConfig::default();
        config.session.echo = true;
        config.subscription.max_update_period_ms = 50;
        let options = SessionOptions::from(&config);
        assert!(options.echo);
        assert_eq!(options.max_update_period, 50);
        assert_eq!(options.min_update_period, 10_000);
        assert_eq!(options.min_scan_period, 30);
    }
}
