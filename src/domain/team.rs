//! Back-office team members and their per-module permissions.

use crate::domain::{ParseLabelError, Status, TimeMs};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TeamRole {
    #[serde(rename = "admin")]
    Admin,
    #[serde(rename = "manager")]
    Manager,
    #[serde(rename = "support")]
    Support,
    #[serde(rename = "Chief Operating Officer (COO)")]
    Coo,
    #[serde(rename = "Chief Technology Officer (CTO)")]
    Cto,
    #[serde(rename = "Chief Marketing Officer (CMO)")]
    Cmo,
    #[serde(rename = "Chief Advising Officer (CAO)")]
    Cao,
}

impl TeamRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TeamRole::Admin => "admin",
            TeamRole::Manager => "manager",
            TeamRole::Support => "support",
            TeamRole::Coo => "Chief Operating Officer (COO)",
            TeamRole::Cto => "Chief Technology Officer (CTO)",
            TeamRole::Cmo => "Chief Marketing Officer (CMO)",
            TeamRole::Cao => "Chief Advising Officer (CAO)",
        }
    }
}

impl FromStr for TeamRole {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            TeamRole::Admin,
            TeamRole::Manager,
            TeamRole::Support,
            TeamRole::Coo,
            TeamRole::Cto,
            TeamRole::Cmo,
            TeamRole::Cao,
        ]
        .into_iter()
        .find(|r| r.as_str() == s)
        .ok_or_else(|| ParseLabelError::new("team role", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Permission {
    pub view: bool,
    pub edit: bool,
    pub delete: bool,
}

impl Permission {
    const fn new(view: bool, edit: bool, delete: bool) -> Self {
        Self { view, edit, delete }
    }

    pub fn allows(&self, action: PermissionAction) -> bool {
        match action {
            PermissionAction::View => self.view,
            PermissionAction::Edit => self.edit,
            PermissionAction::Delete => self.delete,
        }
    }

    fn set(&mut self, action: PermissionAction, value: bool) {
        match action {
            PermissionAction::View => self.view = value,
            PermissionAction::Edit => self.edit = value,
            PermissionAction::Delete => self.delete = value,
        }
    }
}

/// Back-office area a permission applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionModule {
    Users,
    Accounts,
    Pnl,
    Wallets,
    Transactions,
    Chat,
    Agents,
    Plans,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionAction {
    View,
    Edit,
    Delete,
}

/// Permission grid across all modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModulePermissions {
    pub users: Permission,
    pub accounts: Permission,
    pub pnl: Permission,
    pub wallets: Permission,
    pub transactions: Permission,
    pub chat: Permission,
    pub agents: Permission,
    pub plans: Permission,
}

impl Default for ModulePermissions {
    /// View everywhere, edit accounts, full control of chat.
    fn default() -> Self {
        Self {
            users: Permission::new(true, false, false),
            accounts: Permission::new(true, true, false),
            pnl: Permission::new(true, false, false),
            wallets: Permission::new(true, false, false),
            transactions: Permission::new(true, false, false),
            chat: Permission::new(true, true, true),
            agents: Permission::new(true, false, false),
            plans: Permission::new(true, false, false),
        }
    }
}

impl ModulePermissions {
    pub fn module(&self, module: PermissionModule) -> &Permission {
        match module {
            PermissionModule::Users => &self.users,
            PermissionModule::Accounts => &self.accounts,
            PermissionModule::Pnl => &self.pnl,
            PermissionModule::Wallets => &self.wallets,
            PermissionModule::Transactions => &self.transactions,
            PermissionModule::Chat => &self.chat,
            PermissionModule::Agents => &self.agents,
            PermissionModule::Plans => &self.plans,
        }
    }

    fn module_mut(&mut self, module: PermissionModule) -> &mut Permission {
        match module {
            PermissionModule::Users => &mut self.users,
            PermissionModule::Accounts => &mut self.accounts,
            PermissionModule::Pnl => &mut self.pnl,
            PermissionModule::Wallets => &mut self.wallets,
            PermissionModule::Transactions => &mut self.transactions,
            PermissionModule::Chat => &mut self.chat,
            PermissionModule::Agents => &mut self.agents,
            PermissionModule::Plans => &mut self.plans,
        }
    }

    pub fn allows(&self, module: PermissionModule, action: PermissionAction) -> bool {
        self.module(module).allows(action)
    }

    /// Copy with a single flag changed.
    pub fn with(mut self, module: PermissionModule, action: PermissionAction, value: bool) -> Self {
        self.module_mut(module).set(action, value);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMember {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: TeamRole,
    pub status: Status,
    pub permissions: ModulePermissions,
    pub created_at: TimeMs,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login: Option<TimeMs>,
}

impl TeamMember {
    /// Generate a member id of the form `D[100-999]`.
    pub fn generate_id() -> String {
        let bytes = *uuid::Uuid::new_v4().as_bytes();
        let n = 100 + u16::from_le_bytes([bytes[0], bytes[1]]) % 900;
        format!("D{}", n)
    }
}

/// Editable member profile fields.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMemberDraft {
    pub name: String,
    pub email: String,
    pub role: TeamRole,
    #[serde(default)]
    pub status: Status,
}
