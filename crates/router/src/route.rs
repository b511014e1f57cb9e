//! Route records and path matching

use std::collections::HashMap;

/// Authorization requirements declared on a route
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteMeta {
    pub requires_auth: bool,
    /// Roles allowed to open the route; empty means any logged-in user
    pub roles: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RouteRecord {
    /// Relative to the parent unless it starts with `/`; `*` matches anything
    pub path: String,
    pub name: Option<String>,
    pub meta: RouteMeta,
    pub redirect: Option<String>,
    pub children: Vec<RouteRecord>,
}

impl RouteRecord {
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            name: None,
            meta: RouteMeta::default(),
            redirect: None,
            children: Vec::new(),
        }
    }

    /// Route that forwards every unmatched path to `to`
    pub fn catch_all(to: &str) -> Self {
        Self::new("*").redirect_to(to)
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn requires_auth(mut self) -> Self {
        self.meta.requires_auth = true;
        self
    }

    pub fn roles(mut self, roles: &[&str]) -> Self {
        self.meta.roles = roles.iter().map(|r| r.to_string()).collect();
        self
    }

    pub fn redirect_to(mut self, to: &str) -> Self {
        self.redirect = Some(to.to_string());
        self
    }

    pub fn children(mut self, children: Vec<RouteRecord>) -> Self {
        self.children = children;
        self
    }

    fn is_catch_all(&self) -> bool {
        self.path == "*"
    }
}

/// A path matched against the table, with every record on the way
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRoute {
    pub path: String,
    pub name: Option<String>,
    pub params: HashMap<String, String>,
    /// Metadata of each matched record, outermost first
    pub matched: Vec<RouteMeta>,
    pub redirect: Option<String>,
}

impl ResolvedRoute {
    /// True if any matched record requires authentication
    pub fn requires_auth(&self) -> bool {
        self.matched.iter().any(|meta| meta.requires_auth)
    }

    /// Union of the roles declared by the matched records
    pub fn required_roles(&self) -> Vec<&str> {
        self.matched
            .iter()
            .flat_map(|meta| meta.roles.iter().map(String::as_str))
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<RouteRecord>,
}

impl RouteTable {
    pub fn new(routes: Vec<RouteRecord>) -> Self {
        Self { routes }
    }

    /// The admin console's pages
    pub fn admin_console() -> Self {
        Self::new(vec![
            RouteRecord::new("/login").named("Login"),
            RouteRecord::new("/").requires_auth().children(vec![
                RouteRecord::new("").named("Dashboard"),
                RouteRecord::new("review").named("Review"),
                RouteRecord::new("admin/users").named("AdminUsers").roles(&["admin"]),
                RouteRecord::new("admin/settings").named("AdminSettings").roles(&["admin"]),
                RouteRecord::new("admin/data").named("AdminData").roles(&["admin"]),
                RouteRecord::new("admin/raw-data").named("AdminRawData").roles(&["admin"]),
                RouteRecord::new("admin/legal-articles")
                    .named("AdminLegalArticles")
                    .roles(&["admin"]),
            ]),
            RouteRecord::catch_all("/login"),
        ])
    }

    pub fn routes(&self) -> &[RouteRecord] {
        &self.routes
    }

    /// Match `path` (query and fragment are ignored); records are tried in order
    pub fn resolve(&self, path: &str) -> Option<ResolvedRoute> {
        let path = normalize(path);
        let target: Vec<&str> = segments(&path).collect();

        let mut chain = Vec::new();
        for record in &self.routes {
            if let Some(params) = match_record(record, &[], &target, &mut chain) {
                let last = chain.last()?;
                return Some(ResolvedRoute {
                    name: last.name.clone(),
                    redirect: last.redirect.clone(),
                    matched: chain.iter().map(|r| r.meta.clone()).collect(),
                    params,
                    path,
                });
            }
        }
        None
    }
}

/// `/a/b/?x=1#top` → `/a/b`
pub(crate) fn normalize(path: &str) -> String {
    let end = path.find(|c: char| c == '?' || c == '#').unwrap_or(path.len());
    let joined = segments(&path[..end]).collect::<Vec<_>>().join("/");
    format!("/{}", joined)
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

fn match_record<'a>(
    record: &'a RouteRecord,
    prefix: &[&'a str],
    target: &[&str],
    chain: &mut Vec<&'a RouteRecord>,
) -> Option<HashMap<String, String>> {
    chain.push(record);

    if record.is_catch_all() {
        return Some(HashMap::new());
    }

    let mut pattern: Vec<&'a str> = if record.path.starts_with('/') {
        Vec::new()
    } else {
        prefix.to_vec()
    };
    pattern.extend(segments(&record.path));

    for child in &record.children {
        if let Some(params) = match_record(child, &pattern, target, chain) {
            return Some(params);
        }
    }

    if let Some(params) = match_segments(&pattern, target) {
        return Some(params);
    }

    chain.pop();
    None
}

fn match_segments(pattern: &[&str], target: &[&str]) -> Option<HashMap<String, String>> {
    if pattern.len() != target.len() {
        return None;
    }
    let mut params = HashMap::new();
    for (expected, actual) in pattern.iter().zip(target) {
        match expected.strip_prefix(':') {
            Some(name) => {
                params.insert(name.to_string(), actual.to_string());
            }
            None if expected == actual => {}
            None => return None,
        }
    }
    Some(params)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("/admin/users/?page=2#top"), "/admin/users");
        assert_eq!(normalize(""), "/");
        assert_eq!(normalize("//review"), "/review");
    }

    #[test]
    fn test_nested_route_collects_parent_meta() {
        let table = RouteTable::admin_console();

        let route = table.resolve("/admin/users").unwrap();
        assert_eq!(route.name.as_deref(), Some("AdminUsers"));
        assert!(route.requires_auth());
        assert_eq!(route.required_roles(), vec!["admin"]);
        assert_eq!(route.matched.len(), 2);

        let dashboard = table.resolve("/").unwrap();
        assert_eq!(dashboard.name.as_deref(), Some("Dashboard"));
        assert!(dashboard.requires_auth());
        assert!(dashboard.required_roles().is_empty());

        let login = table.resolve("/login").unwrap();
        assert!(!login.requires_auth());
    }

    #[test]
    fn test_unknown_path_hits_catch_all() {
        let table = RouteTable::admin_console();
        let route = table.resolve("/does/not/exist").unwrap();
        assert_eq!(route.redirect.as_deref(), Some("/login"));
        assert!(!route.requires_auth());
    }

    #[test]
    fn test_params_are_captured() {
        let table = RouteTable::new(vec![RouteRecord::new("/")
            .requires_auth()
            .children(vec![RouteRecord::new("review/:id").named("ReviewItem")])]);

        let route = table.resolve("/review/42").unwrap();
        assert_eq!(route.name.as_deref(), Some("ReviewItem"));
        assert_eq!(route.params.get("id").map(String::as_str), Some("42"));
        assert!(table.resolve("/review").is_none());
    }
}
