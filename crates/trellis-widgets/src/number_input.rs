#![forbid(unsafe_code)]

//! The numeric editor state machine.
//!
//! The editable text is the *span* between an immutable prefix and suffix.
//! Two modes:
//!
//! - **Viewing**: the span shows the canonical value formatted with grouping
//!   separators (when `decimals > 0`).
//! - **Editing**: the first accepted edit strips the grouping separators
//!   (adjusting the caret) and sets `in_edit_mode`; the span is then a raw
//!   digit buffer.
//!
//! After every accepted edit the span is re-parsed; only a successful parse
//! inside the permitted range updates the canonical value and fires
//! `value_changed`. A failed parse leaves the text as typed and the value
//! untouched. Enter or focus loss reformats from the canonical value.
//!
//! # Character acceptance
//!
//! - Digits: always, except directly behind the decimal separator once the
//!   mandated number of trailing decimal digits exists.
//! - `-`: only at position 0, only once, only when the range admits
//!   negatives.
//! - Decimal separator: at most once, never inside the mandated trailing
//!   decimal digits, rejected entirely when `decimals == 0`.
//! - Everything else is consumed and ignored.
//!
//! Selections and caret positions are char offsets into the span; the span
//! only ever holds ASCII digits, the sign and the configured separators.

use std::cell::RefCell;
use std::rc::Rc;

use unicode_width::UnicodeWidthStr;

use trellis_core::input::{Key, KeyInput, Modifiers};
use trellis_core::{Event, EventPublisher};
use trellis_runtime::{BindError, BoundControl, ControlId, NumberFormat, Property, Value};

use crate::control::ControlBase;
use crate::error::WidgetError;

struct NumberState {
    span: String,
    value: f64,
    min_value: f64,
    max_value: f64,
    increment: f64,
    decimals: usize,
    prefix: String,
    suffix: String,
    format: NumberFormat,
    sel_start: usize,
    sel_end: usize,
    in_edit_mode: bool,
}

enum EditOp {
    Backspace,
    Delete,
    Insert(char),
}

/// Numeric input state with range, increment and prefix/suffix framing.
#[derive(Clone)]
pub struct NumberInput {
    base: ControlBase,
    state: Rc<RefCell<NumberState>>,
    value_changed: EventPublisher<()>,
}

impl Default for NumberInput {
    fn default() -> Self {
        Self::new()
    }
}

impl NumberInput {
    /// A new input: value 0, unbounded range, increment 1, no decimals.
    #[must_use]
    pub fn new() -> Self {
        Self::with_format(NumberFormat::default())
    }

    /// A new input using the given separators.
    #[must_use]
    pub fn with_format(format: NumberFormat) -> Self {
        let base = ControlBase::new();
        let state = Rc::new(RefCell::new(NumberState {
            span: String::new(),
            value: 0.0,
            min_value: 0.0,
            max_value: 0.0,
            increment: 1.0,
            decimals: 0,
            prefix: String::new(),
            suffix: String::new(),
            format,
            sel_start: 0,
            sel_end: 0,
            in_edit_mode: false,
        }));
        let value_changed = EventPublisher::new();

        let input = Self {
            base,
            state,
            value_changed,
        };
        input.write_span_from(0.0);

        // The property lives in the base's registry the input itself owns,
        // so its closures capture only the state cell and the publisher.
        let read = Rc::clone(&input.state);
        let write = Rc::clone(&input.state);
        let publisher = input.value_changed.clone();
        input.base.register_property(
            "Value",
            Property::new(
                move || Value::Float(read.borrow().value),
                move |value| {
                    let number = value.coerce_float()?;
                    {
                        let state = write.borrow();
                        if state.min_value != state.max_value
                            && (number < state.min_value || number > state.max_value)
                        {
                            return Err(BindError::OutOfRange);
                        }
                    }
                    apply_value(&write, &publisher, number, true);
                    Ok(())
                },
                input.value_changed.event(),
            ),
        );

        input
    }

    #[must_use]
    pub fn base(&self) -> &ControlBase {
        &self.base
    }

    // ── Configuration ───────────────────────────────────────────────

    #[must_use]
    pub fn decimals(&self) -> usize {
        self.state.borrow().decimals
    }

    /// Number of decimal places shown and protected while editing (0–8).
    pub fn set_decimals(&self, decimals: usize) -> Result<(), WidgetError> {
        if decimals > 8 {
            return Err(WidgetError::InvalidDecimals);
        }
        self.state.borrow_mut().decimals = decimals;
        let value = self.value();
        self.write_span_from(value);
        Ok(())
    }

    #[must_use]
    pub fn prefix(&self) -> String {
        self.state.borrow().prefix.clone()
    }

    /// Literal text before the editable span; never editable itself.
    pub fn set_prefix(&self, prefix: impl Into<String>) {
        self.state.borrow_mut().prefix = prefix.into();
        let value = self.value();
        self.write_span_from(value);
    }

    #[must_use]
    pub fn suffix(&self) -> String {
        self.state.borrow().suffix.clone()
    }

    /// Literal text after the editable span.
    pub fn set_suffix(&self, suffix: impl Into<String>) {
        self.state.borrow_mut().suffix = suffix.into();
        let value = self.value();
        self.write_span_from(value);
    }

    #[must_use]
    pub fn increment(&self) -> f64 {
        self.state.borrow().increment
    }

    /// Step applied by the arrow keys and the wheel.
    pub fn set_increment(&self, increment: f64) {
        self.state.borrow_mut().increment = increment;
    }

    #[must_use]
    pub fn min_value(&self) -> f64 {
        self.state.borrow().min_value
    }

    #[must_use]
    pub fn max_value(&self) -> f64 {
        self.state.borrow().max_value
    }

    /// Permitted range; equal bounds disable range checking. A current
    /// value outside the new range is adjusted to the nearer bound.
    pub fn set_range(&self, min: f64, max: f64) -> Result<(), WidgetError> {
        if min > max {
            return Err(WidgetError::InvalidRange);
        }
        {
            let mut state = self.state.borrow_mut();
            state.min_value = min;
            state.max_value = max;
        }
        if min != max {
            let value = self.value();
            if value < min {
                self.internal_set_value(min, true);
            } else if value > max {
                self.internal_set_value(max, true);
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn number_format(&self) -> NumberFormat {
        self.state.borrow().format
    }

    pub fn set_number_format(&self, format: NumberFormat) {
        self.state.borrow_mut().format = format;
        if !self.in_edit_mode() {
            let value = self.value();
            self.write_span_from(value);
        }
    }

    // ── Value ───────────────────────────────────────────────────────

    #[must_use]
    pub fn value(&self) -> f64 {
        self.state.borrow().value
    }

    /// Set the canonical value; rejects values outside the permitted range.
    pub fn set_value(&self, value: f64) -> Result<(), WidgetError> {
        {
            let state = self.state.borrow();
            if state.min_value != state.max_value
                && (value < state.min_value || value > state.max_value)
            {
                return Err(WidgetError::OutOfRange);
            }
        }
        self.internal_set_value(value, true);
        Ok(())
    }

    /// Fired after the canonical value actually changes.
    #[must_use]
    pub fn value_changed(&self) -> Event<()> {
        self.value_changed.event()
    }

    /// The bindable value property.
    #[must_use]
    pub fn value_property(&self) -> Property {
        self.base
            .property("Value")
            .expect("Value property is registered in new()")
    }

    // ── Text and selection ──────────────────────────────────────────

    /// The full display text: prefix + span + suffix.
    #[must_use]
    pub fn text(&self) -> String {
        let state = self.state.borrow();
        format!("{}{}{}", state.prefix, state.span, state.suffix)
    }

    /// The editable span between prefix and suffix.
    #[must_use]
    pub fn span(&self) -> String {
        self.state.borrow().span.clone()
    }

    /// Rendered cell width of the display text, for layout hints.
    #[must_use]
    pub fn display_width(&self) -> usize {
        UnicodeWidthStr::width(self.text().as_str())
    }

    #[must_use]
    pub fn in_edit_mode(&self) -> bool {
        self.state.borrow().in_edit_mode
    }

    /// Current selection as char offsets into the span.
    #[must_use]
    pub fn selection(&self) -> (usize, usize) {
        let state = self.state.borrow();
        (state.sel_start, state.sel_end)
    }

    /// Clamp and set the selection; caret = collapsed selection.
    pub fn set_selection(&self, start: usize, end: usize) {
        let mut state = self.state.borrow_mut();
        let len = state.span.chars().count();
        state.sel_start = start.min(len);
        state.sel_end = end.min(len);
    }

    /// Select the whole numeric span.
    pub fn select_number(&self) {
        let mut state = self.state.borrow_mut();
        state.sel_start = 0;
        state.sel_end = state.span.chars().count();
    }

    // ── Mode transitions ────────────────────────────────────────────

    /// Reformat from the canonical value and leave edit mode.
    pub fn end_edit(&self) {
        let value = self.value();
        self.write_span_from(value);
        self.state.borrow_mut().in_edit_mode = false;
    }

    pub fn handle_focus_gained(&self) {
        self.base.set_focused(true);
        self.select_number();
    }

    pub fn handle_focus_lost(&self) {
        self.base.set_focused(false);
        self.end_edit();
    }

    // ── Input ───────────────────────────────────────────────────────

    /// Feed one key press; returns whether the input was consumed.
    pub fn handle_key(&self, input: KeyInput) -> bool {
        if input.modifiers.contains(Modifiers::ALT) {
            return false;
        }
        let shift = input.modifiers.contains(Modifiers::SHIFT);

        match input.key {
            Key::Char(c) if input.modifiers.contains(Modifiers::CONTROL) => {
                if c.eq_ignore_ascii_case(&'a') {
                    self.select_number();
                    true
                } else {
                    false
                }
            }
            Key::Char(c) => self.handle_char(c),
            Key::Backspace => {
                self.process_edit(&EditOp::Backspace);
                true
            }
            Key::Delete => {
                self.process_edit(&EditOp::Delete);
                true
            }
            Key::Up => {
                self.increment_value(self.increment());
                true
            }
            Key::Down => {
                self.increment_value(-self.increment());
                true
            }
            Key::Return => {
                if self.in_edit_mode() {
                    self.end_edit();
                    self.select_number();
                    true
                } else {
                    false
                }
            }
            Key::Home => {
                let (_, end) = self.selection();
                if shift {
                    self.set_selection(0, end);
                } else {
                    self.set_selection(0, 0);
                }
                true
            }
            Key::End => {
                let (start, _) = self.selection();
                let len = self.span().chars().count();
                if shift {
                    self.set_selection(start, len);
                } else {
                    self.set_selection(len, len);
                }
                true
            }
            Key::Left => {
                let (start, end) = self.selection();
                if shift {
                    if start > 0 {
                        self.set_selection(start - 1, end);
                    }
                } else if start != end {
                    self.set_selection(start, start);
                } else if start > 0 {
                    self.set_selection(start - 1, start - 1);
                }
                true
            }
            Key::Right => {
                let (start, end) = self.selection();
                let len = self.span().chars().count();
                if shift {
                    self.set_selection(start, (end + 1).min(len));
                } else if start != end {
                    self.set_selection(end, end);
                } else if end < len {
                    self.set_selection(end + 1, end + 1);
                }
                true
            }
            _ => false,
        }
    }

    /// One wheel rotation in notches; positive steps up.
    pub fn handle_wheel(&self, notches: f64) {
        self.increment_value(notches * self.increment());
    }

    /// Place the caret from a click at a char position in the *full* text.
    /// Positions inside prefix or suffix clamp to the span's edges.
    pub fn click(&self, position: usize) {
        let (prefix_len, span_len) = {
            let state = self.state.borrow();
            (
                state.prefix.chars().count(),
                state.span.chars().count(),
            )
        };
        let caret = position.saturating_sub(prefix_len).min(span_len);
        self.set_selection(caret, caret);
    }

    /// Double click selects the whole number.
    pub fn double_click(&self) {
        self.select_number();
    }

    /// Replace the selection with pasted text, then parse; on failure the
    /// span reverts to the canonical value. The span is reselected either
    /// way. Returns whether the paste produced a valid value.
    pub fn paste(&self, pasted: &str) -> bool {
        {
            let mut state = self.state.borrow_mut();
            let mut chars: Vec<char> = state.span.chars().collect();
            let len = chars.len();
            let start = state.sel_start.min(len);
            let end = state.sel_end.min(len).max(start);
            chars.splice(start..end, pasted.chars());
            state.span = chars.into_iter().collect();
            let caret = start + pasted.chars().count();
            state.sel_start = caret;
            state.sel_end = caret;
        }
        let parsed = self.try_update_value(true);
        if !parsed {
            let value = self.value();
            self.write_span_from(value);
        }
        self.select_number();
        parsed
    }

    // ── Internals ───────────────────────────────────────────────────

    fn handle_char(&self, c: char) -> bool {
        let (chars, start, end, decimals, decimal_sep, min, max) = {
            let state = self.state.borrow();
            (
                state.span.chars().collect::<Vec<char>>(),
                state.sel_start,
                state.sel_end,
                state.decimals,
                state.format.decimal_sep,
                state.min_value,
                state.max_value,
            )
        };

        if c.is_ascii_digit() {
            if start == end && decimals > 0 {
                if let Some(i) = chars.iter().position(|&ch| ch == decimal_sep) {
                    // The mandated trailing digits are already present;
                    // nothing may be typed behind the separator.
                    if i + decimals < chars.len() && start > i {
                        return true;
                    }
                }
            }
            self.process_edit(&EditOp::Insert(c));
            return true;
        }

        if c == '-' {
            if min != max && min >= 0.0 {
                return true;
            }
            if start > 0 || (chars.contains(&'-') && end == 0) {
                return true;
            }
            self.process_edit(&EditOp::Insert(c));
            return true;
        }

        if c == decimal_sep {
            if decimals == 0 {
                return true;
            }
            if start == 0 && end == 0 && chars.first() == Some(&'-') {
                return true;
            }
            if end + decimals < chars.len() {
                return true;
            }
            if let Some(i) = chars.iter().position(|&ch| ch == decimal_sep) {
                if i <= start || i > end {
                    return true;
                }
            }
            self.process_edit(&EditOp::Insert(c));
            return true;
        }

        // Anything else is swallowed.
        true
    }

    fn process_edit(&self, op: &EditOp) {
        {
            let mut state = self.state.borrow_mut();
            let mut chars: Vec<char> = state.span.chars().collect();
            let len = chars.len();
            let mut start = state.sel_start.min(len);
            let end = state.sel_end.min(len).max(start);
            let had_selection = start != end;

            if !state.in_edit_mode {
                let group_sep = state.format.group_sep;
                let seps_before_start = if state.decimals > 0 {
                    chars[..start].iter().filter(|&&ch| ch == group_sep).count()
                } else {
                    0
                };
                if had_selection {
                    chars.drain(start..end);
                }
                if state.decimals > 0 {
                    chars.retain(|&ch| ch != group_sep);
                    start -= seps_before_start;
                }
                state.in_edit_mode = true;
            } else if had_selection {
                chars.drain(start..end);
            }

            match op {
                EditOp::Backspace => {
                    if !had_selection && start > 0 {
                        start -= 1;
                        chars.remove(start);
                    }
                }
                EditOp::Delete => {
                    if !had_selection && start < chars.len() {
                        chars.remove(start);
                    }
                }
                EditOp::Insert(c) => {
                    chars.insert(start, *c);
                    start += 1;
                }
            }

            state.span = chars.into_iter().collect();
            state.sel_start = start;
            state.sel_end = start;
        }
        self.try_update_value(false);
    }

    /// Parse the span; a valid in-range number becomes the canonical value.
    fn try_update_value(&self, set_text: bool) -> bool {
        let (mut text, min, max) = {
            let state = self.state.borrow();
            (
                state
                    .span
                    .replacen(state.format.decimal_sep, ".", 1),
                state.min_value,
                state.max_value,
            )
        };
        if text.is_empty() || text == "." {
            text = "0".to_string();
        }
        let Ok(value) = text.parse::<f64>() else {
            return false;
        };
        if min != max && (value < min || value > max) {
            return false;
        }
        self.internal_set_value(value, set_text);
        true
    }

    fn increment_value(&self, delta: f64) {
        let (value, min, max) = {
            let state = self.state.borrow();
            (state.value, state.min_value, state.max_value)
        };
        let mut next = value + delta;
        if min != max {
            next = next.clamp(min, max);
        }
        self.internal_set_value(next, true);
        self.select_number();
    }

    fn internal_set_value(&self, value: f64, set_text: bool) {
        apply_value(&self.state, &self.value_changed, value, set_text);
    }

    fn write_span_from(&self, value: f64) {
        write_span(&self.state, value);
    }
}

/// Rebuild the span from `value` and clamp the selection into it.
fn write_span(state: &RefCell<NumberState>, value: f64) {
    let mut state = state.borrow_mut();
    state.span = if state.decimals > 0 {
        state.format.format_grouped(value, state.decimals)
    } else {
        state.format.format(value, state.decimals)
    };
    let len = state.span.chars().count();
    state.sel_start = state.sel_start.min(len);
    state.sel_end = state.sel_end.min(len);
}

/// Adopt `value` as canonical, optionally rewriting the span; publishes
/// only on an actual change.
fn apply_value(
    state: &RefCell<NumberState>,
    publisher: &EventPublisher<()>,
    value: f64,
    set_text: bool,
) {
    if set_text {
        write_span(state, value);
    }
    let changed = {
        let mut state = state.borrow_mut();
        if value == state.value {
            false
        } else {
            state.value = value;
            true
        }
    };
    if changed {
        publisher.raise();
    }
}

impl BoundControl for NumberInput {
    fn control_id(&self) -> ControlId {
        self.base.control_id()
    }

    fn properties(&self) -> Vec<Property> {
        self.base.properties()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
