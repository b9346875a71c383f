use crate::context::RouteRecord;
use crate::facts::SyntaxFacts;

const HTTP_METHODS: &[&str] = &["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS"];

/// HTTP routes declared in one file.
///
/// Two shapes are recognised: registration calls with a literal path
/// (`app.get('/users', ...)`, `@router.post("/x")`, `.route("/x", ...)`) and
/// file-router modules that export functions named after HTTP methods.
pub fn routes_from_facts(file: &str, facts: &SyntaxFacts) -> Vec<RouteRecord> {
    let mut routes = Vec::new();

    for call in &facts.calls {
        let Some(path) = call.first_arg.as_deref() else {
            continue;
        };
        if !path.starts_with('/') {
            continue;
        }
        let Some(method) = registration_method(call.short_name()) else {
            continue;
        };
        routes.push(RouteRecord {
            file: file.to_string(),
            method: method.to_string(),
            path: path.to_string(),
            handler: call.decorates.clone(),
            line: call.line,
        });
    }

    if let Some(path) = file_router_path(file) {
        for decl in facts.exported() {
            let method = if HTTP_METHODS.contains(&decl.name.as_str()) {
                decl.name.clone()
            } else if decl.name == "default" || decl.name == "handler" {
                "ANY".to_string()
            } else {
                continue;
            };
            routes.push(RouteRecord {
                file: file.to_string(),
                method,
                path: path.clone(),
                handler: Some(decl.name.clone()),
                line: decl.start,
            });
        }
    }

    routes
}

fn registration_method(name: &str) -> Option<&'static str> {
    let method = match name.to_ascii_lowercase().as_str() {
        "get" => "GET",
        "post" => "POST",
        "put" => "PUT",
        "patch" => "PATCH",
        "delete" | "del" => "DELETE",
        "head" => "HEAD",
        "options" => "OPTIONS",
        "all" | "route" | "api_route" | "websocket" => "ANY",
        _ => return None,
    };
    Some(method)
}

/// URL path for Next.js style `app/**/route.ts` and `pages/api/**` files.
pub fn file_router_path(file: &str) -> Option<String> {
    let trimmed = file.strip_prefix("src/").unwrap_or(file);
    let (stem, _) = trimmed.rsplit_once('.')?;

    if let Some(rest) = stem.strip_prefix("app/") {
        let dir = rest.strip_suffix("/route").or_else(|| (rest == "route").then_some(""))?;
        let segments: Vec<&str> = dir
            .split('/')
            .filter(|segment| !segment.is_empty())
            .filter(|segment| !(segment.starts_with('(') && segment.ends_with(')')))
            .collect();
        return Some(format!("/{}", segments.join("/")));
    }

    if let Some(rest) = stem.strip_prefix("pages/api/") {
        let rest = rest.strip_suffix("/index").unwrap_or(rest);
        let rest = if rest == "index" { "" } else { rest };
        return Some(if rest.is_empty() {
            "/api".to_string()
        } else {
            format!("/api/{rest}")
        });
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::{CallFact, DeclKind, Declaration};
    use pretty_assertions::assert_eq;

    fn call(callee: &str, arg: Option<&str>, decorates: Option<&str>) -> CallFact {
        CallFact {
            callee: callee.to_string(),
            line: 3,
            enclosing: None,
            first_arg: arg.map(str::to_string),
            decorates: decorates.map(str::to_string),
        }
    }

    fn export(name: &str) -> Declaration {
        Declaration {
            name: name.to_string(),
            kind: DeclKind::Function,
            start: 1,
            end: 4,
            exported: true,
            returns_jsx: false,
        }
    }

    #[test]
    fn registration_calls_become_routes() {
        let facts = SyntaxFacts {
            calls: vec![
                call("app.get", Some("/api/users"), None),
                call("router.post", Some("/login"), Some("login")),
                call("app.get", Some("port"), None),
                call("logger.info", Some("/not-a-route"), None),
            ],
            ..SyntaxFacts::default()
        };
        let routes = routes_from_facts("server.ts", &facts);
        let summary: Vec<(&str, &str, Option<&str>)> = routes
            .iter()
            .map(|r| (r.method.as_str(), r.path.as_str(), r.handler.as_deref()))
            .collect();
        assert_eq!(
            summary,
            vec![("GET", "/api/users", None), ("POST", "/login", Some("login"))]
        );
        assert_eq!(routes[0].symbol(), "GET /api/users");
    }

    #[test]
    fn file_router_exports_become_routes() {
        let facts = SyntaxFacts {
            declarations: vec![export("GET"), export("POST"), export("helper")],
            ..SyntaxFacts::default()
        };
        let routes = routes_from_facts("src/app/api/users/[id]/route.ts", &facts);
        let summary: Vec<(&str, &str)> = routes
            .iter()
            .map(|r| (r.method.as_str(), r.path.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![("GET", "/api/users/[id]"), ("POST", "/api/users/[id]")]
        );
    }

    #[test]
    fn file_router_paths() {
        assert_eq!(
            file_router_path("app/(auth)/login/route.ts").as_deref(),
            Some("/login")
        );
        assert_eq!(
            file_router_path("pages/api/index.ts").as_deref(),
            Some("/api")
        );
        assert_eq!(
            file_router_path("src/pages/api/auth/session.js").as_deref(),
            Some("/api/auth/session")
        );
        assert_eq!(file_router_path("src/app/page.tsx"), None);
        assert_eq!(file_router_path("lib/db.ts"), None);
    }
}
