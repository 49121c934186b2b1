use remote_session::ViewDefinition;

use crate::{error::Error, settings::Settings};

pub const DEFAULT_VIEW_FIELDS: [&str; 2] = ["ID", "Title"];

/// What a page query loads.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewSpec {
    /// Load only these fields.
    Fields(Vec<String>),
    /// Caller supplied view, e.g. with a filter. Its own row limit wins when set.
    Custom(ViewDefinition),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchOptions {
    pub view: ViewSpec,
    pub row_limit: u32,
}

impl FetchOptions {
    pub fn fields<I, S>(fields: I, row_limit: u32) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            view: ViewSpec::Fields(fields.into_iter().map(Into::into).collect()),
            row_limit,
        }
    }

    pub fn custom(view: ViewDefinition, row_limit: u32) -> Self {
        Self {
            view: ViewSpec::Custom(view),
            row_limit,
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.row_limit == 0 {
            return Err(Error::PreconditionViolation(
                "row limit must be greater than zero".to_string(),
            ));
        }
        match &self.view {
            ViewSpec::Fields(fields) if fields.is_empty() => Err(Error::PreconditionViolation(
                "at least one view field is required".to_string(),
            )),
            ViewSpec::Fields(fields) if fields.iter().any(|f| f.trim().is_empty()) => Err(
                Error::PreconditionViolation("view field names must not be empty".to_string()),
            ),
            ViewSpec::Custom(view) if view.row_limit == Some(0) => Err(
                Error::PreconditionViolation("custom view has a zero row limit".to_string()),
            ),
            _ => Ok(()),
        }
    }

    /// The view every page request is made with.
    pub fn view_definition(&self) -> ViewDefinition {
        match &self.view {
            ViewSpec::Fields(fields) => ViewDefinition::new()
                .with_fields(fields.iter().cloned())
                .with_row_limit(self.row_limit),
            ViewSpec::Custom(view) => {
                let mut view = view.clone();
                if view.row_limit.is_none() {
                    view.row_limit = Some(self.row_limit);
                }
                view
            }
        }
    }
}

impl From<&Settings> for FetchOptions {
    fn from(settings: &Settings) -> Self {
        Self::fields(DEFAULT_VIEW_FIELDS, settings.page_row_limit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteOptions {
    /// Deletions buffered in the session before a commit
    pub batch_limit: usize,
    pub row_limit: u32,
}

impl DeleteOptions {
    pub fn validate(&self) -> Result<(), Error> {
        if self.batch_limit == 0 {
            return Err(Error::PreconditionViolation(
                "batch limit must be greater than zero".to_string(),
            ));
        }
        if self.row_limit == 0 {
            return Err(Error::PreconditionViolation(
                "row limit must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl From<&Settings> for DeleteOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            batch_limit: settings.delete_batch_limit,
            row_limit: settings.page_row_limit,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeleteSummary {
    pub pages: u32,
    pub deleted: u64,
    pub commits: u32,
}
