//! Compiled path templates

use crate::error::TemplateError;
use crate::function::{Function, Value};
use crate::parser::{parse, Expr, Segment};
use crate::variable::Variable;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use spacereg_core::{Space, User};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// A compiled `(user, space) -> path` evaluator
///
/// Cloning is cheap; the parsed form is shared.
#[derive(Clone)]
pub struct PathTemplate {
    source: Arc<str>,
    segments: Arc<[Segment]>,
}

impl PathTemplate {
    /// Parse and type-check `source`
    pub fn compile(source: &str) -> Result<Self, TemplateError> {
        let segments = parse(source)?;
        Ok(Self {
            source: Arc::from(source),
            segments: Arc::from(segments),
        })
    }

    /// Template text as written
    pub fn source(&self) -> &str {
        &self.source
    }

    /// True when the template contains no actions
    pub fn is_static(&self) -> bool {
        self.segments
            .iter()
            .all(|segment| matches!(segment, Segment::Text(_)))
    }

    /// Literal text before the first action
    pub fn static_prefix(&self) -> &str {
        match self.segments.first() {
            Some(Segment::Text(text)) => text,
            _ => "",
        }
    }

    /// Variables referenced anywhere in the template, in order of appearance
    pub fn variables(&self) -> Vec<Variable> {
        let mut out = Vec::new();
        for segment in self.segments.iter() {
            if let Segment::Action(expr) = segment {
                expr.visit_variables(&mut out);
            }
        }
        out
    }

    /// True when rendering reads the current user
    pub fn needs_user(&self) -> bool {
        self.variables().into_iter().any(Variable::needs_user)
    }

    /// True when rendering reads the space owner
    pub fn needs_owner(&self) -> bool {
        self.variables().into_iter().any(Variable::needs_owner)
    }

    /// Render against an optional user and an optional space
    ///
    /// Fails with [`TemplateError::MissingValue`] when a referenced value is
    /// absent and no enclosing `default` covers it.
    pub fn render(&self, user: Option<&User>, space: Option<&Space>) -> Result<String, TemplateError> {
        let mut out = String::with_capacity(self.source.len());
        for segment in self.segments.iter() {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Action(expr) => {
                    let value = eval(expr, user, space)?;
                    out.push_str(&value.to_string());
                }
            }
        }
        Ok(out)
    }

    /// Render against a space
    pub fn render_space(&self, user: Option<&User>, space: &Space) -> Result<String, TemplateError> {
        self.render(user, Some(space))
    }

    /// Render against a user alone, as done for home paths
    pub fn render_user(&self, user: &User) -> Result<String, TemplateError> {
        self.render(Some(user), None)
    }
}

fn eval(expr: &Expr, user: Option<&User>, space: Option<&Space>) -> Result<Value, TemplateError> {
    match expr {
        Expr::Var(var) => Ok(Value::Str(var.read(user, space)?.to_string())),
        Expr::Lit(value) => Ok(value.clone()),
        Expr::Call { func, args } => {
            let mut values = Vec::with_capacity(args.len());
            for (index, arg) in args.iter().enumerate() {
                let covered_by_default = *func == Function::Default && index + 1 == args.len();
                let value = match eval(arg, user, space) {
                    Err(err) if covered_by_default && err.is_render_error() => {
                        Value::Str(String::new())
                    }
                    other => other?,
                };
                values.push(value);
            }
            Ok(func.apply(values))
        }
    }
}

impl fmt::Debug for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PathTemplate").field(&self.source()).finish()
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl PartialEq for PathTemplate {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for PathTemplate {}

impl FromStr for PathTemplate {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::compile(s)
    }
}

impl Serialize for PathTemplate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

impl<'de> Deserialize<'de> for PathTemplate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let source = String::deserialize(deserializer)?;
        Self::compile(&source).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn project(name: &str) -> Space {
        Space::new("storage-1", "p-1", name, "project")
    }

    fn personal(owner: &str) -> Space {
        Space::new("storage-1", owner, owner, "personal").with_owner(User::new(owner))
    }

    #[test]
    fn test_space_name_substitution() {
        let template = PathTemplate::compile("/projects/{{Space.Name}}").unwrap();
        let path = template
            .render_space(None, &project("Baz space 1"))
            .unwrap();
        assert_eq!(path, "/projects/Baz space 1");
    }

    #[test]
    fn test_go_style_dot_prefix() {
        let template = PathTemplate::compile("/projects/{{.Space.Name}}").unwrap();
        assert_eq!(
            template.render_space(None, &project("Foo")).unwrap(),
            "/projects/Foo"
        );
    }

    #[test]
    fn test_owner_sharding() {
        let template = PathTemplate::compile(
            "/users/{{substr 0 1 .Space.Owner.Username}}/{{.Space.Owner.Username}}",
        )
        .unwrap();
        assert_eq!(
            template.render_space(None, &personal("einstein")).unwrap(),
            "/users/e/einstein"
        );
        assert!(template.needs_owner());
        assert!(!template.needs_user());
    }

    #[test]
    fn test_home_template_uses_current_user() {
        let template = PathTemplate::compile("/users/{{.CurrentUser.Id.OpaqueId}}").unwrap();
        let user = User::new("marie").with_opaque_id("4c510ada");
        assert_eq!(template.render_user(&user).unwrap(), "/users/4c510ada");
    }

    #[test]
    fn test_missing_values() {
        let template = PathTemplate::compile("/users/{{Space.Owner.Username}}").unwrap();
        assert_matches!(
            template.render_space(None, &project("Shared")),
            Err(TemplateError::MissingValue { path }) if path == "Space.Owner"
        );
        let template = PathTemplate::compile("/home/{{CurrentUser.Username}}").unwrap();
        assert_matches!(
            template.render_space(None, &project("Shared")),
            Err(TemplateError::MissingValue { .. })
        );
    }

    #[test]
    fn test_default_covers_missing_owner() {
        let template =
            PathTemplate::compile(r#"/shares/{{ Space.Owner.Username | default "public" }}"#)
                .unwrap();
        assert_eq!(
            template.render_space(None, &project("Shared")).unwrap(),
            "/shares/public"
        );
        assert_eq!(
            template.render_space(None, &personal("marie")).unwrap(),
            "/shares/marie"
        );
    }

    #[test]
    fn test_static_template() {
        let template = PathTemplate::compile("/public").unwrap();
        assert!(template.is_static());
        assert_eq!(template.static_prefix(), "/public");
        let sharded = PathTemplate::compile("/users/{{.Space.Owner.Username}}").unwrap();
        assert_eq!(sharded.static_prefix(), "/users/");
        assert_eq!(
            template.render_space(None, &project("x")).unwrap(),
            "/public"
        );
    }

    #[test]
    fn test_serde_as_source_string() {
        let template = PathTemplate::compile("/projects/{{Space.Name}}").unwrap();
        let json = serde_json::to_string(&template).unwrap();
        assert_eq!(json, r#""/projects/{{Space.Name}}""#);
        let back: PathTemplate = serde_json::from_str(&json).unwrap();
        assert_eq!(back, template);
        assert!(serde_json::from_str::<PathTemplate>(r#""/{{ nope }}""#).is_err());
    }
}
