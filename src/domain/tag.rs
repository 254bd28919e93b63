use git2::Oid;

/// An annotated release tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub name: String,
    pub message: String,
    pub target: Oid,
}

impl Tag {
    /// Create a new tag pointing at `target`
    pub fn new(name: impl Into<String>, message: impl Into<String>, target: Oid) -> Self {
        Tag {
            name: name.into(),
            message: message.into(),
            target,
        }
    }
}

/// Reference name for a tag called `name`
pub fn tag_refname(name: &str) -> String {
    format!("refs/tags/{}", name)
}

/// Expand a `{version}` message template
pub fn render_template(template: &str, version: &str) -> String {
    template.replace("{version}", version)
}
