use ferry_types::{ContextTags, RunContext};

/// Decides whether a changeset is eligible under the run's context.
///
/// Untagged changesets always run. Tagged changesets run only when the run
/// context equals one of their tags (exact, case-sensitive); with no run
/// context they never run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextFilter {
    context: Option<RunContext>,
}

impl ContextFilter {
    #[must_use]
    pub fn new(context: Option<RunContext>) -> Self {
        Self { context }
    }

    #[must_use]
    pub fn context(&self) -> Option<&RunContext> {
        self.context.as_ref()
    }

    #[must_use]
    pub fn is_eligible(&self, tags: &ContextTags) -> bool {
        if tags.is_empty() {
            return true;
        }
        self.context
            .as_ref()
            .is_some_and(|context| tags.contains(context.as_str()))
    }
}
