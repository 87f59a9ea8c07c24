//! Event Kind - tagged classification of a notification type string
//!
//! Rule tables match on [`EventKind`] instead of repeating prefix checks.

use crate::accessible::StateSet;

/// `window:*` sub-kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowEvent {
    Activate,
    Deactivate,
    Create,
    Destroy,
    Other,
}

/// `object:property-change:*` sub-kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Property {
    Name,
    Description,
    Value,
    Other,
}

/// `document:*` sub-kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentEvent {
    LoadComplete,
    PageChanged,
    Other,
}

/// Classification of a notification type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Window(WindowEvent),
    Mouse { button: bool },
    ChildrenChanged { removal: bool, system: bool },
    ActiveDescendantChanged,
    PropertyChange(Property),
    SelectionChanged,
    /// `state` is empty for state names Beacon does not model
    StateChanged { state: StateSet, system: bool },
    TextCaretMoved,
    TextChanged { insert: bool, system: bool },
    TextSelectionChanged,
    TextAttributesChanged,
    Document(DocumentEvent),
    Other,
}

impl EventKind {
    pub fn classify(event_type: &str) -> Self {
        let mut parts = event_type.split(':');
        let namespace = parts.next().unwrap_or_default();
        let category = parts.next().unwrap_or_default();
        let detail = parts.next().unwrap_or_default();
        let system = event_type.ends_with(":system");

        match namespace {
            "window" => Self::Window(match category {
                "activate" => WindowEvent::Activate,
                "deactivate" => WindowEvent::Deactivate,
                "create" => WindowEvent::Create,
                "destroy" => WindowEvent::Destroy,
                _ => WindowEvent::Other,
            }),
            "mouse" => Self::Mouse {
                button: category == "button",
            },
            "document" => Self::Document(match category {
                "load-complete" => DocumentEvent::LoadComplete,
                "page-changed" => DocumentEvent::PageChanged,
                _ => DocumentEvent::Other,
            }),
            "object" => match category {
                "children-changed" => Self::ChildrenChanged {
                    removal: detail == "remove",
                    system,
                },
                "active-descendant-changed" => Self::ActiveDescendantChanged,
                "property-change" => Self::PropertyChange(match detail {
                    d if d.ends_with("name") => Property::Name,
                    d if d.ends_with("description") => Property::Description,
                    d if d.ends_with("value") => Property::Value,
                    _ => Property::Other,
                }),
                "selection-changed" => Self::SelectionChanged,
                "state-changed" => Self::StateChanged {
                    state: StateSet::from_state_name(detail).unwrap_or_default(),
                    system,
                },
                "text-caret-moved" => Self::TextCaretMoved,
                "text-changed" => Self::TextChanged {
                    insert: detail == "insert",
                    system,
                },
                "text-selection-changed" => Self::TextSelectionChanged,
                "text-attributes-changed" => Self::TextAttributesChanged,
                _ => Self::Other,
            },
            _ => Self::Other,
        }
    }

    /// `object:state-changed:<state>` for the given state
    pub fn is_state(self, wanted: StateSet) -> bool {
        matches!(self, Self::StateChanged { state, .. } if state == wanted)
    }
}
