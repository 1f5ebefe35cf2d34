//! Query identities.

use std::fmt;

/// Identity of a cached query: a resource name plus ordered parameters.
///
/// The canonical string form joins the parts with `/`, so the task list is
/// `tasks` and task 2 is `tasks/2`.
///
/// ```
/// use taskflow::cache::QueryKey;
///
/// let list = QueryKey::new("tasks");
/// let detail = QueryKey::new("tasks").with_param(2);
/// assert_eq!(detail.to_string(), "tasks/2");
/// assert!(detail.starts_with(&list));
/// assert!(!list.starts_with(&detail));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey {
    resource: String,
    params: Vec<String>,
}

impl QueryKey {
    /// Key for `resource` with no parameters.
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            params: Vec::new(),
        }
    }

    /// Append a parameter.
    pub fn with_param(mut self, param: impl ToString) -> Self {
        self.params.push(param.to_string());
        self
    }

    /// Resource name.
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Parameters in order.
    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// `true` when `prefix` names the same resource and its parameters are
    /// a leading run of ours. Every key starts with itself.
    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.resource == prefix.resource && self.params.starts_with(&prefix.params)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.resource)?;
        for param in &self.params {
            write!(f, "/{}", param)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_form() {
        assert_eq!(QueryKey::new("tasks").to_string(), "tasks");
        assert_eq!(
            QueryKey::new("tasks").with_param(7).with_param("comments").to_string(),
            "tasks/7/comments"
        );
    }

    #[test]
    fn prefix_matching_is_per_parameter() {
        let list = QueryKey::new("tasks");
        let two = QueryKey::new("tasks").with_param(2);
        let twenty = QueryKey::new("tasks").with_param(20);
        assert!(list.starts_with(&list));
        assert!(twenty.starts_with(&list));
        assert!(!twenty.starts_with(&two));
        assert!(!QueryKey::new("tasks-archive").starts_with(&list));
    }
}
