//! Role-based navigation menu filtering
//!
//! Menus are static trees declared by each front end. An item either links
//! somewhere (`url`) or groups other items (`children`), and may restrict
//! itself to a set of roles. Items without `roles` are public.
//!
//! Filtering checks an item's own roles before looking at its children: a
//! restricted group the caller cannot see is dropped together with every
//! child, including public ones.
//!
//! # Examples
//!
//! ```rust
//! use content_pipeline::menu::{MenuItem, filter_menu_by_role};
//!
//! let menu = vec![
//!     MenuItem::link("home", "Home", "/"),
//!     MenuItem::link("users", "Users", "/admin/users").with_roles(&["admin"]),
//! ];
//!
//! let visible = filter_menu_by_role(&menu, "user");
//! assert_eq!(visible.len(), 1);
//! assert_eq!(visible[0].id, "home");
//! assert_eq!(filter_menu_by_role(&menu, "Admin").len(), 2);
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ContentError;

/// Role that bypasses every restriction
pub const SUPER_ADMIN: &str = "super_admin";

/// Known roles, lowest rank first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Moderator,
    Admin,
    SuperAdmin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Moderator => "moderator",
            Role::Admin => "admin",
            Role::SuperAdmin => SUPER_ADMIN,
        }
    }
}

impl FromStr for Role {
    type Err = ContentError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Role::User),
            "moderator" => Ok(Role::Moderator),
            "admin" => Ok(Role::Admin),
            SUPER_ADMIN => Ok(Role::SuperAdmin),
            other => Err(ContentError::InvalidInput(format!("Unknown role '{other}'"))),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Roles allowed to pass a [`has_role`] check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleRequirement {
    /// The given role or any role ranked above it
    AtLeast(String),
    /// Exactly one of the listed roles; a single-element list behaves like
    /// [`RoleRequirement::AtLeast`]
    AnyOf(Vec<String>),
}

impl From<&str> for RoleRequirement {
    fn from(role: &str) -> Self {
        RoleRequirement::AtLeast(role.to_string())
    }
}

impl From<Vec<String>> for RoleRequirement {
    fn from(roles: Vec<String>) -> Self {
        RoleRequirement::AnyOf(roles)
    }
}

fn is_super_admin(role: &str) -> bool {
    role.trim().eq_ignore_ascii_case(SUPER_ADMIN)
}

fn same_role(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

fn meets_rank(user_role: &str, required: &str) -> bool {
    match (user_role.parse::<Role>(), required.parse::<Role>()) {
        (Ok(user), Ok(required)) => user >= required,
        _ => same_role(user_role, required),
    }
}

/// Check a user's role against a requirement
///
/// Matching is case-insensitive. `super_admin` always passes. Role names
/// outside the built-in hierarchy only match themselves.
///
/// ```rust
/// use content_pipeline::menu::{RoleRequirement, has_role};
///
/// assert!(has_role("admin", &"moderator".into()));
/// assert!(!has_role("user", &"moderator".into()));
/// assert!(!has_role("admin", &RoleRequirement::AnyOf(vec!["user".into(), "moderator".into()])));
/// assert!(has_role("super_admin", &RoleRequirement::AnyOf(vec![])));
/// ```
pub fn has_role(user_role: &str, allowed: &RoleRequirement) -> bool {
    if is_super_admin(user_role) {
        return true;
    }

    match allowed {
        RoleRequirement::AtLeast(required) => meets_rank(user_role, required),
        RoleRequirement::AnyOf(roles) if roles.len() == 1 => meets_rank(user_role, &roles[0]),
        RoleRequirement::AnyOf(roles) => roles.iter().any(|role| same_role(user_role, role)),
    }
}

/// One navigation entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<MenuItem>,
    /// Roles allowed to see the item; `None` means public
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,
}

impl MenuItem {
    /// Public leaf item
    pub fn link(id: impl Into<String>, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            icon: None,
            url: Some(url.into()),
            children: Vec::new(),
            roles: None,
        }
    }

    /// Public group item
    pub fn group(id: impl Into<String>, title: impl Into<String>, children: Vec<MenuItem>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            icon: None,
            url: None,
            children,
            roles: None,
        }
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn with_roles(mut self, roles: &[&str]) -> Self {
        self.roles = Some(roles.iter().map(|role| role.to_string()).collect());
        self
    }

    /// Returns `true` if the item's own role list admits `role`
    pub fn is_visible_to(&self, role: &str) -> bool {
        if is_super_admin(role) {
            return true;
        }
        match &self.roles {
            None => true,
            Some(roles) => roles.iter().any(|allowed| same_role(allowed, role)),
        }
    }
}

/// Filter a menu tree down to the items `role` may see
///
/// `super_admin` gets the tree unchanged. Otherwise an item is kept when its
/// own roles admit the caller, and only then are its children filtered. A
/// restricted group whose children all disappear survives only when it links
/// somewhere itself. Public items are always kept.
pub fn filter_menu_by_role(items: &[MenuItem], role: &str) -> Vec<MenuItem> {
    if is_super_admin(role) {
        return items.to_vec();
    }

    items
        .iter()
        .filter_map(|item| filter_item(item, role))
        .collect()
}

fn filter_item(item: &MenuItem, role: &str) -> Option<MenuItem> {
    if !item.is_visible_to(role) {
        return None;
    }

    if item.children.is_empty() {
        return Some(item.clone());
    }

    let children = filter_menu_by_role(&item.children, role);
    if children.is_empty() && item.url.is_none() && item.roles.is_some() {
        return None;
    }

    Some(MenuItem {
        id: item.id.clone(),
        title: item.title.clone(),
        icon: item.icon.clone(),
        url: item.url.clone(),
        children,
        roles: item.roles.clone(),
    })
}
