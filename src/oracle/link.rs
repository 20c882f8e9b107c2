//! External reference lookup for catalog entries.
use super::client::ID_PLACEHOLDER;

/// Placeholder substituted with the entry's display name.
pub const NAME_PLACEHOLDER: &str = "{name}";

/// Anything that can attach an external link to an entry.
pub trait LinkLookup: Sync {
    /// `None` means "nothing found"; the stored link is kept in that case.
    fn lookup(&self, id: &str, name: &str) -> Option<String>;
}

/// Link built from a URL template with `{id}` and `{name}` placeholders.
#[derive(Debug, Clone)]
pub struct TemplateLink {
    template: String,
}

impl TemplateLink {
    pub fn new(template: &str) -> Self {
        Self {
            template: template.to_string(),
        }
    }
}

impl LinkLookup for TemplateLink {
    fn lookup(&self, id: &str, name: &str) -> Option<String> {
        if id.trim().is_empty() {
            return None;
        }
        let link = self
            .template
            .replace(ID_PLACEHOLDER, id)
            .replace(NAME_PLACEHOLDER, &urlencoding::encode(name.trim()));
        Some(link)
    }
}
