//! Role rules - per event-kind admission rules for unfocused sources
//!
//! Each [`Rule`] pairs an event-kind predicate with a condition on the
//! source. Rules are tried in table order; the first applicable rule whose
//! condition holds decides. A rule with an `otherwise` verdict also decides
//! when its condition fails, ending the walk for that kind.

use super::Verdict;
use crate::focus::FocusState;
use beacon_foundation::{
    AxObject, EventKind, Notification, PipelineConfig, Property, Result, Role, StateSet,
};

/// Facts about one notification, gathered once before the walk
pub struct RuleInput<'a> {
    pub event: &'a Notification,
    pub kind: EventKind,
    pub source: &'a AxObject,
    pub role: Role,
    pub states: StateSet,
    pub focus: &'a FocusState,
    pub config: &'a PipelineConfig,
}

pub enum Condition {
    RoleIn(&'static [Role]),
    RoleNotIn(&'static [Role]),
    Custom(fn(&RuleInput<'_>) -> Result<bool>),
}

impl Condition {
    fn holds(&self, input: &RuleInput<'_>) -> Result<bool> {
        match self {
            Condition::RoleIn(roles) => Ok(roles.contains(&input.role)),
            Condition::RoleNotIn(roles) => Ok(!roles.contains(&input.role)),
            Condition::Custom(check) => check(input),
        }
    }
}

pub struct Rule {
    pub name: &'static str,
    pub applies: fn(EventKind) -> bool,
    pub condition: Condition,
    pub on_match: Verdict,
    pub otherwise: Option<Verdict>,
}

/// Walk [`RULES`]; `None` when no rule decided
pub fn evaluate(input: &RuleInput<'_>) -> Result<Option<Verdict>> {
    for rule in RULES {
        if !(rule.applies)(input.kind) {
            continue;
        }
        if rule.condition.holds(input)? {
            return Ok(Some(rule.on_match));
        }
        if let Some(verdict) = rule.otherwise {
            return Ok(Some(verdict));
        }
    }
    Ok(None)
}

// ============================================================================
// Event kind predicates
// ============================================================================

fn children_changed(kind: EventKind) -> bool {
    matches!(kind, EventKind::ChildrenChanged { .. })
}

fn children_removed(kind: EventKind) -> bool {
    matches!(kind, EventKind::ChildrenChanged { removal: true, .. })
}

fn active_descendant_changed(kind: EventKind) -> bool {
    kind == EventKind::ActiveDescendantChanged
}

fn name_changed(kind: EventKind) -> bool {
    kind == EventKind::PropertyChange(Property::Name)
}

fn value_changed(kind: EventKind) -> bool {
    kind == EventKind::PropertyChange(Property::Value)
}

fn selection_changed(kind: EventKind) -> bool {
    kind == EventKind::SelectionChanged
}

fn system_state_changed(kind: EventKind) -> bool {
    matches!(kind, EventKind::StateChanged { system: true, .. })
}

fn checked_changed(kind: EventKind) -> bool {
    kind.is_state(StateSet::CHECKED)
}

fn selected_changed(kind: EventKind) -> bool {
    kind.is_state(StateSet::SELECTED)
}

fn sensitive_changed(kind: EventKind) -> bool {
    kind.is_state(StateSet::SENSITIVE)
}

fn showing_changed(kind: EventKind) -> bool {
    kind.is_state(StateSet::SHOWING)
}

fn caret_moved(kind: EventKind) -> bool {
    kind == EventKind::TextCaretMoved
}

fn text_inserted(kind: EventKind) -> bool {
    matches!(kind, EventKind::TextChanged { insert: true, .. })
}

fn system_text_changed(kind: EventKind) -> bool {
    matches!(kind, EventKind::TextChanged { system: true, .. })
}

fn text_changed(kind: EventKind) -> bool {
    matches!(kind, EventKind::TextChanged { .. })
}

// ============================================================================
// Conditions
// ============================================================================

fn payload_missing(input: &RuleInput<'_>) -> Result<bool> {
    Ok(input.event.any_data.as_object().is_none())
}

fn focus_is_dead(input: &RuleInput<'_>) -> Result<bool> {
    Ok(input.focus.focus_is_dead())
}

fn payload_is_dead(input: &RuleInput<'_>) -> Result<bool> {
    Ok(!input.event.any_data.as_object().is_some_and(AxObject::is_live))
}

fn payload_unusable(input: &RuleInput<'_>) -> Result<bool> {
    Ok(!input.event.any_data.as_object().is_some_and(AxObject::is_usable))
}

fn payload_is_menu_or_image(input: &RuleInput<'_>) -> Result<bool> {
    let Some(child) = input.event.any_data.as_object() else {
        return Ok(false);
    };
    let role = child.role()?;
    Ok(role.is_menu_related() || role == Role::Image)
}

fn no_active_script(input: &RuleInput<'_>) -> Result<bool> {
    Ok(input.focus.active_script().is_none())
}

fn not_from_active_app(input: &RuleInput<'_>) -> Result<bool> {
    let Some(script) = input.focus.active_script() else {
        return Ok(true);
    };
    Ok(script.app() != input.source.application()?)
}

fn not_showing(input: &RuleInput<'_>) -> Result<bool> {
    Ok(!input.states.contains(StateSet::SHOWING))
}

fn unselected_push_button(input: &RuleInput<'_>) -> Result<bool> {
    Ok(input.event.detail1 == 0 && input.role == Role::PushButton)
}

fn oversized_insertion(input: &RuleInput<'_>) -> Result<bool> {
    Ok(input.event.detail2 > input.config.max_inserted_text)
}

fn focus_is_selectable(input: &RuleInput<'_>) -> Result<bool> {
    Ok(input
        .focus
        .locus_of_focus()
        .and_then(|f| f.has_state(StateSet::SELECTABLE).ok())
        .unwrap_or(false))
}

fn always(_: &RuleInput<'_>) -> Result<bool> {
    Ok(true)
}

// ============================================================================
// Rule table
// ============================================================================

const NAME_NOISE_ROLES: &[Role] = &[
    Role::Canvas,
    Role::CheckBox,
    Role::Icon,
    Role::Image,
    Role::List,
    Role::ListItem,
    Role::Menu,
    Role::MenuItem,
    Role::Panel,
    Role::RadioButton,
    Role::Section,
    Role::TableRow,
    Role::TableCell,
    Role::TreeItem,
];

const VALUE_NOISE_ROLES: &[Role] = &[Role::SplitPane, Role::ScrollBar];

const TABLE_LIKE_ROLES: &[Role] = &[
    Role::Table,
    Role::TableCell,
    Role::TableRow,
    Role::Tree,
    Role::TreeItem,
    Role::TreeTable,
];

const SENSITIVE_ROLES: &[Role] = &[Role::Text, Role::Entry];

const SHOWING_ROLES: &[Role] = &[
    Role::Alert,
    Role::Animation,
    Role::Dialog,
    Role::InfoBar,
    Role::Menu,
    Role::Notification,
    Role::StatusBar,
    Role::ToolTip,
];

pub static RULES: &[Rule] = &[
    // children-changed
    Rule {
        name: "children-changed without child",
        applies: children_changed,
        condition: Condition::Custom(payload_missing),
        on_match: Verdict::Drop("no child in any_data"),
        otherwise: None,
    },
    Rule {
        name: "removal while focus is dead",
        applies: children_removed,
        condition: Condition::Custom(focus_is_dead),
        on_match: Verdict::Admit("child removed while focus is dead"),
        otherwise: None,
    },
    Rule {
        name: "dead child",
        applies: children_changed,
        condition: Condition::Custom(payload_is_dead),
        on_match: Verdict::Drop("dead child in any_data"),
        otherwise: None,
    },
    Rule {
        name: "menu or image child",
        applies: children_changed,
        condition: Condition::Custom(payload_is_menu_or_image),
        on_match: Verdict::Drop("role of child in any_data"),
        otherwise: None,
    },
    Rule {
        name: "no active script",
        applies: children_changed,
        condition: Condition::Custom(no_active_script),
        on_match: Verdict::Drop("no active script"),
        otherwise: None,
    },
    Rule {
        name: "not from active app",
        applies: children_changed,
        condition: Condition::Custom(not_from_active_app),
        on_match: Verdict::Drop("not from active application"),
        otherwise: None,
    },
    // active-descendant-changed
    Rule {
        name: "dead descendant",
        applies: active_descendant_changed,
        condition: Condition::Custom(payload_unusable),
        on_match: Verdict::Drop("missing or dead descendant"),
        otherwise: None,
    },
    // property-change
    Rule {
        name: "name change noise",
        applies: name_changed,
        condition: Condition::RoleIn(NAME_NOISE_ROLES),
        on_match: Verdict::Drop("name change from unfocused noisy role"),
        otherwise: Some(Verdict::Admit("name change")),
    },
    Rule {
        name: "value change noise",
        applies: value_changed,
        condition: Condition::RoleIn(VALUE_NOISE_ROLES),
        on_match: Verdict::Drop("value change from unfocused noisy role"),
        otherwise: Some(Verdict::Admit("value change")),
    },
    // selection-changed
    Rule {
        name: "selection change",
        applies: selection_changed,
        condition: Condition::Custom(always),
        on_match: Verdict::Admit("selection change from live source"),
        otherwise: None,
    },
    // state-changed
    Rule {
        name: "system state change in table",
        applies: system_state_changed,
        condition: Condition::RoleIn(TABLE_LIKE_ROLES),
        on_match: Verdict::Drop("system state change from table-like role"),
        otherwise: None,
    },
    Rule {
        name: "checked while hidden",
        applies: checked_changed,
        condition: Condition::Custom(not_showing),
        on_match: Verdict::Drop("checked change from non-showing source"),
        otherwise: Some(Verdict::Admit("checked change")),
    },
    Rule {
        name: "unselected push button",
        applies: selected_changed,
        condition: Condition::Custom(unselected_push_button),
        on_match: Verdict::Drop("push button unselected"),
        otherwise: Some(Verdict::Admit("selected change")),
    },
    Rule {
        name: "sensitive noise",
        applies: sensitive_changed,
        condition: Condition::RoleNotIn(SENSITIVE_ROLES),
        on_match: Verdict::Drop("sensitive change from non-text role"),
        otherwise: Some(Verdict::Admit("sensitive change")),
    },
    Rule {
        name: "showing noise",
        applies: showing_changed,
        condition: Condition::RoleNotIn(SHOWING_ROLES),
        on_match: Verdict::Drop("showing change from uninteresting role"),
        otherwise: Some(Verdict::Admit("showing change")),
    },
    // text
    Rule {
        name: "caret in label",
        applies: caret_moved,
        condition: Condition::RoleIn(&[Role::Label]),
        on_match: Verdict::Drop("caret moved in unfocused label"),
        otherwise: Some(Verdict::Admit("caret moved")),
    },
    Rule {
        name: "oversized insertion",
        applies: text_inserted,
        condition: Condition::Custom(oversized_insertion),
        on_match: Verdict::Drop("inserted text too long"),
        otherwise: None,
    },
    Rule {
        name: "system text change spam",
        applies: system_text_changed,
        condition: Condition::Custom(focus_is_selectable),
        on_match: Verdict::Drop("system text change while focus is selectable"),
        otherwise: None,
    },
    Rule {
        name: "text change",
        applies: text_changed,
        condition: Condition::Custom(always),
        on_match: Verdict::Admit("text change"),
        otherwise: None,
    },
];
