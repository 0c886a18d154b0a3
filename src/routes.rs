use serde_json::Value;

/// Visibility policy attached to a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteVisibility {
    /// Always renderable.
    Public,
    /// Requires an authenticated session.
    Private,
    /// Requires an authenticated session with the elevated role.
    Admin,
}

/// Session facts the gate decides on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Session {
    pub authenticated: bool,
    pub admin: bool,
}

/// What the router should do for a route under a given session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Render,
    RedirectToLogin,
    RedirectToForbidden,
}

pub fn gate(visibility: RouteVisibility, session: Session) -> GateDecision {
    match visibility {
        RouteVisibility::Public => GateDecision::Render,
        RouteVisibility::Private => {
            if session.authenticated {
                GateDecision::Render
            } else {
                GateDecision::RedirectToLogin
            }
        }
        RouteVisibility::Admin => {
            if session.authenticated && session.admin {
                GateDecision::Render
            } else {
                GateDecision::RedirectToForbidden
            }
        }
    }
}

/// One route pattern with its policy. Patterns use `:name` for a path
/// parameter; a trailing `?` marks that segment optional.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteDef {
    pub pattern: &'static str,
    pub visibility: RouteVisibility,
}

/// The console's route surface. The pricing entry's policy is supplied when
/// the table is built, since it depends on server status state.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<RouteDef>,
    not_found: RouteDef,
}

impl RouteTable {
    pub fn new(pricing: RouteVisibility) -> Self {
        use RouteVisibility::{Admin, Private, Public};

        let routes = vec![
            RouteDef { pattern: "/", visibility: Public },
            RouteDef { pattern: "/setup", visibility: Public },
            RouteDef { pattern: "/forbidden", visibility: Public },
            RouteDef { pattern: "/login", visibility: Public },
            RouteDef { pattern: "/register", visibility: Public },
            RouteDef { pattern: "/reset", visibility: Public },
            RouteDef { pattern: "/user/reset", visibility: Public },
            RouteDef { pattern: "/oauth/github", visibility: Public },
            RouteDef { pattern: "/oauth/oidc", visibility: Public },
            RouteDef { pattern: "/oauth/linuxdo", visibility: Public },
            RouteDef { pattern: "/about", visibility: Public },
            RouteDef { pattern: "/token-query", visibility: Public },
            RouteDef { pattern: "/pricing", visibility: pricing },
            RouteDef { pattern: "/console", visibility: Private },
            RouteDef { pattern: "/console/token", visibility: Private },
            RouteDef { pattern: "/console/playground", visibility: Private },
            RouteDef { pattern: "/console/personal", visibility: Private },
            RouteDef { pattern: "/console/topup", visibility: Private },
            RouteDef { pattern: "/console/log", visibility: Private },
            RouteDef { pattern: "/console/midjourney", visibility: Private },
            RouteDef { pattern: "/console/task", visibility: Private },
            RouteDef { pattern: "/console/chat/:id?", visibility: Private },
            RouteDef { pattern: "/chat2link", visibility: Private },
            RouteDef { pattern: "/console/models", visibility: Admin },
            RouteDef { pattern: "/console/channel", visibility: Admin },
            RouteDef { pattern: "/console/redemption", visibility: Admin },
            RouteDef { pattern: "/console/user", visibility: Admin },
            RouteDef { pattern: "/console/setting", visibility: Admin },
        ];

        Self {
            routes,
            not_found: RouteDef {
                pattern: "*",
                visibility: Public,
            },
        }
    }

    /// Builds the table with the pricing policy taken from the header-nav
    /// feature flag.
    pub fn from_status(header_nav_modules: Option<&str>) -> Self {
        Self::new(pricing_visibility(header_nav_modules))
    }

    /// Finds the route matching `path`, falling back to the not-found
    /// catch-all.
    pub fn resolve(&self, path: &str) -> &RouteDef {
        self.routes
            .iter()
            .find(|route| pattern_matches(route.pattern, path))
            .unwrap_or(&self.not_found)
    }

    pub fn decide(&self, path: &str, session: Session) -> GateDecision {
        gate(self.resolve(path).visibility, session)
    }

    pub fn routes(&self) -> &[RouteDef] {
        &self.routes
    }
}

/// Computes the pricing page's policy from the header-nav feature flag: a
/// JSON object whose `pricing.requireAuth` opts into authentication. A
/// missing or malformed flag, and the legacy boolean shape, stay public;
/// a broken flag must never lock visitors out.
pub fn pricing_visibility(header_nav_modules: Option<&str>) -> RouteVisibility {
    let Some(raw) = header_nav_modules else {
        return RouteVisibility::Public;
    };
    if raw.trim().is_empty() {
        return RouteVisibility::Public;
    }
    let value = match serde_json::from_str::<Value>(raw) {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(%err, "failed to parse header nav modules; pricing stays public");
            return RouteVisibility::Public;
        }
    };
    match value.get("pricing") {
        // Legacy on/off shape predates per-module auth settings.
        Some(Value::Bool(_)) => RouteVisibility::Public,
        Some(module) if module.get("requireAuth").and_then(Value::as_bool) == Some(true) => {
            RouteVisibility::Private
        }
        _ => RouteVisibility::Public,
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

fn pattern_matches(pattern: &str, path: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    let pattern_segments: Vec<&str> = segments(pattern).collect();
    let path_segments: Vec<&str> = segments(path).collect();

    let optional_tail = pattern_segments
        .last()
        .is_some_and(|segment| segment.ends_with('?'));
    let required = if optional_tail {
        pattern_segments.len() - 1
    } else {
        pattern_segments.len()
    };

    if path_segments.len() < required || path_segments.len() > pattern_segments.len() {
        return false;
    }

    pattern_segments
        .iter()
        .zip(path_segments.iter())
        .all(|(pattern_segment, path_segment)| {
            let pattern_segment = pattern_segment.trim_end_matches('?');
            pattern_segment.starts_with(':') || pattern_segment == *path_segment
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pricing_defaults_public_when_flag_is_absent_or_broken() {
        assert_eq!(pricing_visibility(None), RouteVisibility::Public);
        assert_eq!(pricing_visibility(Some("")), RouteVisibility::Public);
        assert_eq!(pricing_visibility(Some("   ")), RouteVisibility::Public);
        assert_eq!(pricing_visibility(Some("{not json")), RouteVisibility::Public);
        assert_eq!(pricing_visibility(Some("null")), RouteVisibility::Public);
        assert_eq!(
            pricing_visibility(Some(r#"{"chat": {"requireAuth": true}}"#)),
            RouteVisibility::Public
        );
    }

    #[test]
    fn pricing_legacy_boolean_shape_stays_public() {
        assert_eq!(
            pricing_visibility(Some(r#"{"pricing": true}"#)),
            RouteVisibility::Public
        );
        assert_eq!(
            pricing_visibility(Some(r#"{"pricing": false}"#)),
            RouteVisibility::Public
        );
    }

    #[test]
    fn pricing_requires_auth_only_on_explicit_opt_in() {
        assert_eq!(
            pricing_visibility(Some(r#"{"pricing": {"requireAuth": true}}"#)),
            RouteVisibility::Private
        );
        assert_eq!(
            pricing_visibility(Some(r#"{"pricing": {"requireAuth": false}}"#)),
            RouteVisibility::Public
        );
        assert_eq!(
            pricing_visibility(Some(r#"{"pricing": {}}"#)),
            RouteVisibility::Public
        );
        assert_eq!(
            pricing_visibility(Some(r#"{"pricing": {"requireAuth": "yes"}}"#)),
            RouteVisibility::Public
        );
    }

    #[test]
    fn resolve_matches_static_paths() {
        let table = RouteTable::new(RouteVisibility::Public);
        assert_eq!(table.routes().len(), 28);
        assert_eq!(table.resolve("/").pattern, "/");
        assert_eq!(table.resolve("/token-query").visibility, RouteVisibility::Public);
        assert_eq!(table.resolve("/console").visibility, RouteVisibility::Private);
        assert_eq!(table.resolve("/console/token").visibility, RouteVisibility::Private);
        assert_eq!(table.resolve("/console/user").visibility, RouteVisibility::Admin);
        assert_eq!(table.resolve("/oauth/github").visibility, RouteVisibility::Public);
        // Trailing slashes do not change the match.
        assert_eq!(table.resolve("/console/").visibility, RouteVisibility::Private);
    }

    #[test]
    fn resolve_handles_optional_parameter_segment() {
        let table = RouteTable::new(RouteVisibility::Public);
        assert_eq!(table.resolve("/console/chat").pattern, "/console/chat/:id?");
        assert_eq!(table.resolve("/console/chat/42").pattern, "/console/chat/:id?");
        assert_eq!(table.resolve("/console/chat/42/extra").pattern, "*");
    }

    #[test]
    fn resolve_falls_back_to_catch_all() {
        let table = RouteTable::new(RouteVisibility::Public);
        assert_eq!(table.resolve("/no/such/page").pattern, "*");
        assert_eq!(
            table.resolve("/no/such/page").visibility,
            RouteVisibility::Public
        );
    }

    #[test]
    fn gate_redirects_by_policy() {
        let anonymous = Session::default();
        let user = Session {
            authenticated: true,
            admin: false,
        };
        let admin = Session {
            authenticated: true,
            admin: true,
        };

        assert_eq!(gate(RouteVisibility::Public, anonymous), GateDecision::Render);
        assert_eq!(
            gate(RouteVisibility::Private, anonymous),
            GateDecision::RedirectToLogin
        );
        assert_eq!(gate(RouteVisibility::Private, user), GateDecision::Render);
        assert_eq!(
            gate(RouteVisibility::Admin, anonymous),
            GateDecision::RedirectToForbidden
        );
        assert_eq!(
            gate(RouteVisibility::Admin, user),
            GateDecision::RedirectToForbidden
        );
        assert_eq!(gate(RouteVisibility::Admin, admin), GateDecision::Render);
    }

    #[test]
    fn table_wires_pricing_policy_from_status() {
        let locked = RouteTable::from_status(Some(r#"{"pricing": {"requireAuth": true}}"#));
        assert_eq!(locked.resolve("/pricing").visibility, RouteVisibility::Private);
        assert_eq!(
            locked.decide("/pricing", Session::default()),
            GateDecision::RedirectToLogin
        );

        let open = RouteTable::from_status(None);
        assert_eq!(open.resolve("/pricing").visibility, RouteVisibility::Public);
        assert_eq!(
            open.decide("/pricing", Session::default()),
            GateDecision::Render
        );
    }
}
