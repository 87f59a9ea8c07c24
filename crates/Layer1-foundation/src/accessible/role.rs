//! Accessible roles and state sets
//!
//! Only the roles and states the event pipeline reasons about are modelled;
//! anything else the bus reports maps to [`Role::Unknown`].

use bitflags::bitflags;
use serde::de::value::{self, StrDeserializer};
use serde::de::IntoDeserializer;
use serde::{Deserialize, Serialize};

// ============================================================================
// Role
// ============================================================================

/// Accessible role reported by a bus object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    Alert,
    Animation,
    Application,
    Canvas,
    CheckBox,
    CheckMenuItem,
    DesktopFrame,
    Dialog,
    DocumentFrame,
    Entry,
    Frame,
    Icon,
    Image,
    InfoBar,
    Label,
    List,
    ListItem,
    Menu,
    MenuBar,
    MenuItem,
    Notification,
    Panel,
    PopupMenu,
    ProgressBar,
    PushButton,
    RadioButton,
    RadioMenuItem,
    ScrollBar,
    Section,
    SplitPane,
    StatusBar,
    Table,
    TableCell,
    TableRow,
    TearoffMenuItem,
    Text,
    ToolTip,
    Tree,
    TreeItem,
    TreeTable,
    Window,
    #[serde(other)]
    Unknown,
}

impl Role {
    /// Parse a kebab-case role name (`"push-button"`). Unrecognised names
    /// become [`Role::Unknown`].
    pub fn from_name(name: &str) -> Self {
        let normalized = name.trim().to_ascii_lowercase().replace([' ', '_'], "-");
        let de: StrDeserializer<'_, value::Error> = normalized.as_str().into_deserializer();
        Role::deserialize(de).unwrap_or(Role::Unknown)
    }

    /// Menus, menu bars and every kind of menu item
    pub fn is_menu_related(self) -> bool {
        matches!(
            self,
            Role::Menu
                | Role::MenuBar
                | Role::MenuItem
                | Role::CheckMenuItem
                | Role::RadioMenuItem
                | Role::TearoffMenuItem
                | Role::PopupMenu
        )
    }

    pub fn is_table_like(self) -> bool {
        matches!(self, Role::Table | Role::TreeTable)
    }

    /// Top-level containers that can become the active window
    pub fn is_top_level(self) -> bool {
        matches!(self, Role::Frame | Role::Window | Role::Dialog)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::String(s)) => f.write_str(&s),
            _ => write!(f, "{:?}", self),
        }
    }
}

// ============================================================================
// StateSet
// ============================================================================

bitflags! {
    /// States reported by a bus object
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct StateSet: u32 {
        const ACTIVE     = 1 << 0;
        const BUSY       = 1 << 1;
        const CHECKED    = 1 << 2;
        const DEFUNCT    = 1 << 3;
        const EDITABLE   = 1 << 4;
        const ENABLED    = 1 << 5;
        const FOCUSABLE  = 1 << 6;
        const FOCUSED    = 1 << 7;
        const ICONIFIED  = 1 << 8;
        const MODAL      = 1 << 9;
        const SELECTABLE = 1 << 10;
        const SELECTED   = 1 << 11;
        const SENSITIVE  = 1 << 12;
        const SHOWING    = 1 << 13;
        const VISIBLE    = 1 << 14;
    }
}

impl StateSet {
    /// Parse a single state name (`"focused"`, case-insensitive)
    pub fn from_state_name(name: &str) -> Option<Self> {
        Self::from_name(&name.trim().to_ascii_uppercase())
    }

    /// Parse a list of state names, failing on the first unknown one
    pub fn parse_all<'a>(names: impl IntoIterator<Item = &'a str>) -> Result<Self, String> {
        names.into_iter().try_fold(Self::empty(), |acc, name| {
            Self::from_state_name(name)
                .map(|state| acc | state)
                .ok_or_else(|| format!("unknown state '{}'", name))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_from_name() {
        assert_eq!(Role::from_name("push-button"), Role::PushButton);
        assert_eq!(Role::from_name("Tool Tip"), Role::ToolTip);
        assert_eq!(Role::from_name("no-such-role"), Role::Unknown);
        assert_eq!(serde_json::from_str::<Role>("\"sparkly\"").unwrap(), Role::Unknown);
        assert_eq!(Role::TreeTable.to_string(), "tree-table");
    }

    #[test]
    fn test_role_groups() {
        assert!(Role::RadioMenuItem.is_menu_related());
        assert!(!Role::PushButton.is_menu_related());
        assert!(Role::TreeTable.is_table_like());
    }

    #[test]
    fn test_state_parsing() {
        let states = StateSet::parse_all(["focused", "Showing"]).unwrap();
        assert!(states.contains(StateSet::FOCUSED | StateSet::SHOWING));
        assert!(StateSet::parse_all(["bogus"]).is_err());
    }
}
