//! Permission vocabulary: modules, actions and the grid that joins them.
//!
//! A [`PermissionGrid`] is total: every [`Module`] has an [`ActionSet`], and
//! every action set has all four [`Action`] flags. Grids coming from outside
//! (override editors, snapshots) are checked when they are deserialized.

use core::str::FromStr;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Back-office area guarded by permissions.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Module {
    Inventory,
    Sales,
    Purchases,
    Customers,
    Prescriptions,
    Returns,
    Reports,
    Settings,
    Users,
}

/// Operation within a module.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    View,
    Add,
    Edit,
    Delete,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GridError {
    #[error("permission grid is missing module '{0}'")]
    MissingModule(Module),

    #[error("unknown module '{0}'")]
    UnknownModule(String),

    #[error("unknown action '{0}'")]
    UnknownAction(String),
}

impl Module {
    pub const COUNT: usize = 9;

    pub const ALL: [Module; Module::COUNT] = [
        Module::Inventory,
        Module::Sales,
        Module::Purchases,
        Module::Customers,
        Module::Prescriptions,
        Module::Returns,
        Module::Reports,
        Module::Settings,
        Module::Users,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Module::Inventory => "inventory",
            Module::Sales => "sales",
            Module::Purchases => "purchases",
            Module::Customers => "customers",
            Module::Prescriptions => "prescriptions",
            Module::Returns => "returns",
            Module::Reports => "reports",
            Module::Settings => "settings",
            Module::Users => "users",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl Action {
    pub const ALL: [Action; 4] = [Action::View, Action::Add, Action::Edit, Action::Delete];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::View => "view",
            Action::Add => "add",
            Action::Edit => "edit",
            Action::Delete => "delete",
        }
    }
}

impl core::fmt::Display for Module {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::fmt::Display for Action {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Module {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Module::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| GridError::UnknownModule(s.to_string()))
    }
}

impl FromStr for Action {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| GridError::UnknownAction(s.to_string()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Action set
// ─────────────────────────────────────────────────────────────────────────────

/// The four action flags for one module.
///
/// All four keys are required on the wire; unknown keys are rejected.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActionSet {
    pub view: bool,
    pub add: bool,
    pub edit: bool,
    pub delete: bool,
}

impl ActionSet {
    pub const NONE: ActionSet = ActionSet { view: false, add: false, edit: false, delete: false };
    pub const ALL: ActionSet = ActionSet { view: true, add: true, edit: true, delete: true };
    pub const VIEW: ActionSet = ActionSet { view: true, add: false, edit: false, delete: false };
    pub const VIEW_ADD: ActionSet = ActionSet { view: true, add: true, edit: false, delete: false };
    pub const VIEW_ADD_EDIT: ActionSet = ActionSet { view: true, add: true, edit: true, delete: false };

    pub fn allows(&self, action: Action) -> bool {
        match action {
            Action::View => self.view,
            Action::Add => self.add,
            Action::Edit => self.edit,
            Action::Delete => self.delete,
        }
    }

    pub fn set(&mut self, action: Action, allowed: bool) {
        match action {
            Action::View => self.view = allowed,
            Action::Add => self.add = allowed,
            Action::Edit => self.edit = allowed,
            Action::Delete => self.delete = allowed,
        }
    }

    pub fn with(mut self, action: Action, allowed: bool) -> Self {
        self.set(action, allowed);
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Grid
// ─────────────────────────────────────────────────────────────────────────────

/// Total mapping of module -> action set.
///
/// Serialized as a JSON object keyed by module name. Deserialization goes
/// through [`PermissionGrid::from_map`], so a partial grid never exists.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<Module, ActionSet>",
    into = "BTreeMap<Module, ActionSet>"
)]
pub struct PermissionGrid {
    entries: [ActionSet; Module::COUNT],
}

impl PermissionGrid {
    /// Same action set for every module.
    pub const fn uniform(actions: ActionSet) -> Self {
        Self { entries: [actions; Module::COUNT] }
    }

    pub const fn deny_all() -> Self {
        Self::uniform(ActionSet::NONE)
    }

    pub const fn allow_all() -> Self {
        Self::uniform(ActionSet::ALL)
    }

    /// Build from a module map; every module must be present.
    pub fn from_map(map: BTreeMap<Module, ActionSet>) -> Result<Self, GridError> {
        let mut entries = [ActionSet::NONE; Module::COUNT];
        for module in Module::ALL {
            let actions = map.get(&module).ok_or(GridError::MissingModule(module))?;
            entries[module.index()] = *actions;
        }
        Ok(Self { entries })
    }

    pub fn actions(&self, module: Module) -> ActionSet {
        self.entries[module.index()]
    }

    pub fn allows(&self, module: Module, action: Action) -> bool {
        self.actions(module).allows(action)
    }

    /// Replace one module's action set, returning the new grid.
    pub fn with_module(mut self, module: Module, actions: ActionSet) -> Self {
        self.entries[module.index()] = actions;
        self
    }

    /// Flip a single flag, returning the new grid.
    pub fn with_action(mut self, module: Module, action: Action, allowed: bool) -> Self {
        self.entries[module.index()].set(action, allowed);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (Module, ActionSet)> + '_ {
        Module::ALL.into_iter().map(|m| (m, self.actions(m)))
    }

    /// Every granted (module, action) pair, in module then action order.
    pub fn granted(&self) -> Vec<(Module, Action)> {
        self.iter()
            .flat_map(|(m, set)| {
                Action::ALL
                    .into_iter()
                    .filter(move |a| set.allows(*a))
                    .map(move |a| (m, a))
            })
            .collect()
    }
}

impl TryFrom<BTreeMap<Module, ActionSet>> for PermissionGrid {
    type Error = GridError;

    fn try_from(map: BTreeMap<Module, ActionSet>) -> Result<Self, Self::Error> {
        Self::from_map(map)
    }
}

impl From<PermissionGrid> for BTreeMap<Module, ActionSet> {
    fn from(grid: PermissionGrid) -> Self {
        grid.iter().collect()
    }
}
