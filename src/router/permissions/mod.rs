use crate::config::PermissionsConfig;
use crate::router::intent::IntentKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use tracing::{info, warn};

/// Caller role. Unknown strings parse to `Other`, which is never a member of
/// any allowed set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    SuperAdmin,
    Admin,
    Hr,
    Manager,
    Employee,
    Other(String),
}

impl Role {
    /// Every role that regular staff-facing rules grant.
    pub const STAFF: [Role; 4] = [Role::Admin, Role::Hr, Role::Manager, Role::Employee];

    pub fn as_str(&self) -> &str {
        match self {
            Self::SuperAdmin => "SUPER_ADMIN",
            Self::Admin => "ADMIN",
            Self::Hr => "HR",
            Self::Manager => "MANAGER",
            Self::Employee => "EMPLOYEE",
            Self::Other(name) => name,
        }
    }
}

impl FromStr for Role {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace(['-', ' '], "_");
        Ok(match normalized.as_str() {
            "SUPER_ADMIN" | "SUPERADMIN" => Self::SuperAdmin,
            "ADMIN" => Self::Admin,
            "HR" => Self::Hr,
            "MANAGER" => Self::Manager,
            "EMPLOYEE" => Self::Employee,
            _ => Self::Other(s.trim().to_string()),
        })
    }
}

impl From<String> for Role {
    fn from(s: String) -> Self {
        match s.parse() {
            Ok(role) => role,
            Err(never) => match never {},
        }
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One row of the permission table. `sub: None` covers every sub-intent of
/// `intent` that has no exact row.
#[derive(Debug, Clone)]
pub struct PermissionRule {
    pub intent: IntentKind,
    pub sub: Option<&'static str>,
    pub roles: Vec<Role>,
}

fn rule(intent: IntentKind, sub: Option<&'static str>, roles: &[Role]) -> PermissionRule {
    PermissionRule {
        intent,
        sub,
        roles: roles.to_vec(),
    }
}

/// The static `intent x sub-intent -> roles` table.
pub fn default_rules() -> Vec<PermissionRule> {
    use IntentKind::{
        Creation, EmployeeAction, Enhancement, ExecutiveCommand, GeneralChat, GoalAction,
        LeaveAction, PayrollAction, PerformanceAction, Query, RecognitionAction, Report, SelfHeal,
        TaskAction,
    };
    let admin = [Role::Admin];
    let people_ops = [Role::Admin, Role::Hr];
    let supervisors = [Role::Admin, Role::Hr, Role::Manager];
    let staff = Role::STAFF;

    vec![
        rule(ExecutiveCommand, None, &admin),
        rule(SelfHeal, None, &admin),
        rule(Enhancement, None, &admin),
        rule(Creation, None, &admin),
        rule(EmployeeAction, Some("add"), &people_ops),
        rule(EmployeeAction, Some("update"), &people_ops),
        // Deleting staff records is reserved to the super role
        rule(EmployeeAction, Some("delete"), &[]),
        rule(EmployeeAction, Some("list"), &supervisors),
        rule(EmployeeAction, Some("search"), &supervisors),
        rule(TaskAction, None, &staff),
        rule(GoalAction, None, &staff),
        rule(PerformanceAction, None, &supervisors),
        rule(RecognitionAction, None, &staff),
        rule(LeaveAction, Some("create"), &staff),
        rule(LeaveAction, Some("balance"), &staff),
        rule(LeaveAction, Some("list"), &staff),
        rule(LeaveAction, Some("approve"), &supervisors),
        rule(LeaveAction, Some("reject"), &supervisors),
        rule(PayrollAction, Some("payslip"), &staff),
        rule(PayrollAction, None, &people_ops),
        rule(Report, Some("payroll"), &people_ops),
        rule(Report, None, &supervisors),
        rule(Query, Some("late"), &supervisors),
        rule(Query, None, &staff),
        rule(GeneralChat, None, &staff),
    ]
}

#[derive(Default)]
struct IntentRules {
    any: Option<Vec<Role>>,
    subs: HashMap<&'static str, Vec<Role>>,
}

/// Central authorization point for intents, tools and commands. Handlers
/// never re-check roles themselves.
pub struct PermissionGate {
    rules: HashMap<IntentKind, IntentRules>,
    super_role: Role,
}

impl PermissionGate {
    pub fn new(config: &PermissionsConfig) -> Self {
        Self::with_rules(config, default_rules())
    }

    pub fn with_rules(config: &PermissionsConfig, rules: Vec<PermissionRule>) -> Self {
        let mut table: HashMap<IntentKind, IntentRules> = HashMap::new();
        for r in rules {
            let entry = table.entry(r.intent).or_default();
            match r.sub {
                Some(sub) => {
                    entry.subs.insert(sub, r.roles);
                }
                None => entry.any = Some(r.roles),
            }
        }
        Self {
            rules: table,
            super_role: config.super_role.parse().unwrap_or(Role::SuperAdmin),
        }
    }

    pub fn super_role(&self) -> &Role {
        &self.super_role
    }

    /// Whether the table has a row covering `(intent, sub)`.
    pub fn has_rule(&self, intent: IntentKind, sub: Option<&str>) -> bool {
        self.lookup(intent, sub).is_some()
    }

    fn lookup(&self, intent: IntentKind, sub: Option<&str>) -> Option<&[Role]> {
        let rules = self.rules.get(&intent)?;
        sub.and_then(|sub| rules.subs.get(sub))
            .or(rules.any.as_ref())
            .map(Vec::as_slice)
    }

    /// Deny-by-default check of an intent against the caller's role.
    pub fn authorize(&self, intent: IntentKind, sub: Option<&str>, role: &Role) -> bool {
        let what = match sub {
            Some(sub) => format!("{}/{}", intent, sub),
            None => intent.to_string(),
        };
        match self.lookup(intent, sub) {
            Some(allowed) => self.allows_role(allowed, role, &what),
            None if self.is_super(role) => self.allows_role(&[], role, &what),
            None => {
                warn!("no permission rule for {}, denying role {}", what, role);
                false
            }
        }
    }

    /// Whether `role` could make an `(intent, sub)` request. Used to offer
    /// suggestions; not logged.
    pub fn can_request(&self, intent: IntentKind, sub: Option<&str>, role: &Role) -> bool {
        match self.lookup(intent, sub) {
            Some(allowed) => self.can_see(allowed, role),
            None => self.is_super(role),
        }
    }

    /// Membership check shared by intents, tools and commands. This is the
    /// only place the super role bypass happens.
    pub fn allows_role(&self, allowed: &[Role], role: &Role, what: &str) -> bool {
        if self.is_super(role) {
            info!("super role {} bypassing permission check for {}", role, what);
            return true;
        }
        Self::is_member(allowed, role)
    }

    /// Capability discovery (listing tools or commands). Same outcome as
    /// [`Self::allows_role`] but not an authorization decision, so not logged.
    pub fn can_see(&self, allowed: &[Role], role: &Role) -> bool {
        self.is_super(role) || Self::is_member(allowed, role)
    }

    fn is_member(allowed: &[Role], role: &Role) -> bool {
        !matches!(role, Role::Other(_)) && allowed.contains(role)
    }

    fn is_super(&self, role: &Role) -> bool {
        *role == self.super_role
    }
}
