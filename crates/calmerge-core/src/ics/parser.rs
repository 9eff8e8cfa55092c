//! Component tree builder.
//!
//! A finite state machine over unfolded lines. Open components live in an
//! index-addressed arena; each node refers to its parent by index, and the
//! owned [`Component`] tree is materialized once a top-level block closes.

use tracing::{debug, warn};

use crate::error::{IcsError, IcsResult};

use super::component::{Component, ComponentKind};
use super::lexer::{parse_property, unfold_lines};

/// A non-fatal problem found while building the component tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseWarning {
    /// 1-based logical line number.
    pub line: usize,
    /// Human-readable description.
    pub message: String,
}

impl ParseWarning {
    fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

/// The parts of a VCALENDAR this crate works with.
#[derive(Debug, Clone, Default)]
pub struct ParsedCalendar {
    /// Direct VEVENT children of the VCALENDAR.
    pub events: Vec<Component>,
    /// Direct VTIMEZONE children of the VCALENDAR.
    pub timezones: Vec<Component>,
    /// Problems that did not stop the parse.
    pub warnings: Vec<ParseWarning>,
}

/// Arena node for a component that is still being built.
#[derive(Debug)]
struct Node {
    component: Component,
    parent: Option<usize>,
    children: Vec<usize>,
    /// Line of the BEGIN that opened the node.
    line: usize,
    /// Set when the node was abandoned without a matching END.
    detached: bool,
}

/// Builder state.
#[derive(Debug)]
enum State {
    OutsideComponent,
    InsideComponent { stack: Vec<usize> },
}

/// Builds top-level components from logical lines.
#[derive(Debug)]
struct TreeBuilder {
    arena: Vec<Node>,
    state: State,
    roots: Vec<Component>,
    warnings: Vec<ParseWarning>,
}

impl TreeBuilder {
    fn new() -> Self {
        Self {
            arena: Vec::new(),
            state: State::OutsideComponent,
            roots: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn feed(&mut self, line_no: usize, line: &str) {
        if let Some(kind) = directive(line, "BEGIN") {
            self.begin(line_no, ComponentKind::parse(kind));
        } else if let Some(kind) = directive(line, "END") {
            self.end(line_no, ComponentKind::parse(kind));
        } else if let State::InsideComponent { stack } = &self.state {
            let Some(&top) = stack.last() else {
                return;
            };
            if let Some(property) = parse_property(line) {
                self.arena[top].component.push_property(property);
            }
        }
    }

    fn begin(&mut self, line: usize, kind: ComponentKind) {
        let index = self.arena.len();
        let parent = match &self.state {
            State::InsideComponent { stack } => stack.last().copied(),
            State::OutsideComponent => None,
        };

        self.arena.push(Node {
            component: Component::new(kind),
            parent,
            children: Vec::new(),
            line,
            detached: false,
        });
        if let Some(parent) = parent {
            self.arena[parent].children.push(index);
        }

        match &mut self.state {
            State::InsideComponent { stack } => stack.push(index),
            State::OutsideComponent => {
                self.state = State::InsideComponent { stack: vec![index] };
            }
        }
    }

    fn end(&mut self, line: usize, kind: ComponentKind) {
        let State::InsideComponent { stack } = &mut self.state else {
            self.warnings.push(ParseWarning::new(
                line,
                format!("END:{kind} without matching BEGIN"),
            ));
            return;
        };

        // Close the nearest open component of this kind; anything opened
        // after it was never closed and is dropped.
        let Some(position) = stack
            .iter()
            .rposition(|&i| self.arena[i].component.kind == kind)
        else {
            self.warnings.push(ParseWarning::new(
                line,
                format!("END:{kind} without matching BEGIN"),
            ));
            return;
        };

        let unclosed: Vec<usize> = stack.drain(position + 1..).collect();
        let closed = stack.pop();
        let now_empty = stack.is_empty();

        for index in unclosed {
            self.abandon(index);
        }

        if now_empty {
            self.state = State::OutsideComponent;
            if let Some(root) = closed {
                let component = self.materialize(root);
                self.roots.push(component);
            }
        }
    }

    fn abandon(&mut self, index: usize) {
        let node = &mut self.arena[index];
        node.detached = true;
        let message = format!(
            "{} opened here was never closed; dropping it",
            node.component.kind
        );
        let line = node.line;
        if let Some(parent) = node.parent {
            self.arena[parent].children.retain(|&c| c != index);
        }
        self.warnings.push(ParseWarning::new(line, message));
    }

    /// Moves a closed subtree out of the arena into an owned tree.
    fn materialize(&mut self, index: usize) -> Component {
        let children = std::mem::take(&mut self.arena[index].children);
        let mut component = std::mem::replace(
            &mut self.arena[index].component,
            Component::new(ComponentKind::Other(String::new())),
        );
        let live: Vec<usize> = children
            .into_iter()
            .filter(|&c| !self.arena[c].detached)
            .collect();
        component.children = live.into_iter().map(|c| self.materialize(c)).collect();
        component
    }

    fn finish(mut self) -> (Vec<Component>, Vec<ParseWarning>) {
        if let State::InsideComponent { stack } = std::mem::replace(&mut self.state, State::OutsideComponent) {
            for index in stack {
                let node = &self.arena[index];
                self.warnings.push(ParseWarning::new(
                    node.line,
                    format!(
                        "{} opened here was never closed; dropping it",
                        node.component.kind
                    ),
                ));
            }
        }
        (self.roots, self.warnings)
    }
}

/// Returns the value of a `BEGIN:`/`END:` line, matching the name case-insensitively.
fn directive<'a>(line: &'a str, name: &str) -> Option<&'a str> {
    let (head, value) = line.split_once(':')?;
    head.trim().eq_ignore_ascii_case(name).then_some(value)
}

/// Parses text into its top-level components.
///
/// Lines outside any component are ignored. Unbalanced blocks are reported as
/// warnings and their unclosed subtrees are dropped.
pub fn parse_components(input: &str) -> (Vec<Component>, Vec<ParseWarning>) {
    let mut builder = TreeBuilder::new();
    for (i, line) in unfold_lines(input).iter().enumerate() {
        builder.feed(i + 1, line);
    }
    builder.finish()
}

/// Parses an iCalendar document and returns its events and timezones.
///
/// # Errors
///
/// Returns [`IcsError::CalendarNotFound`] if there is no top-level VCALENDAR.
#[tracing::instrument(skip(input), fields(input_len = input.len()))]
pub fn parse_ics(input: &str) -> IcsResult<ParsedCalendar> {
    let (roots, mut warnings) = parse_components(input);

    let mut calendars = roots
        .into_iter()
        .filter(|c| c.kind == ComponentKind::Calendar);
    let calendar = calendars.next().ok_or(IcsError::CalendarNotFound)?;
    let extra = calendars.count();
    if extra > 0 {
        warnings.push(ParseWarning::new(
            0,
            format!("ignoring {extra} additional VCALENDAR component(s)"),
        ));
    }

    for warning in &warnings {
        warn!(line = warning.line, "{}", warning.message);
    }

    let mut parsed = ParsedCalendar {
        warnings,
        ..Default::default()
    };
    for child in calendar.children {
        match child.kind {
            ComponentKind::Event => parsed.events.push(child),
            ComponentKind::Timezone => parsed.timezones.push(child),
            _ => {}
        }
    }

    debug!(
        events = parsed.events.len(),
        timezones = parsed.timezones.len(),
        "Parsed calendar"
    );

    Ok(parsed)
}
