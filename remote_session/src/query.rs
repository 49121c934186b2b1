use core_types::Entry;
use quick_xml::escape::escape;

/// Opaque, server issued resume point of a collection scan.
///
/// `None` in place of a cursor means either "scan not started" (before the first page)
/// or "scan complete" (after a page). Callers tell the two apart by whether a page has
/// already been fetched.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageCursor(String);

impl PageCursor {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewScope {
    #[default]
    Default,
    RecursiveAll,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldFilter {
    pub field: String,
    pub value_type: String,
    pub value: String,
}

/// Request builder describing what a page query loads: the view fields, the page size
/// ceiling and an optional equality filter. All of it travels in one round trip.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ViewDefinition {
    pub fields: Vec<String>,
    pub row_limit: Option<u32>,
    pub scope: ViewScope,
    pub filter: Option<FieldFilter>,
}

impl ViewDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields.extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn with_row_limit(mut self, row_limit: u32) -> Self {
        self.row_limit = Some(row_limit);
        self
    }

    pub fn recursive(mut self) -> Self {
        self.scope = ViewScope::RecursiveAll;
        self
    }

    pub fn where_eq(
        mut self,
        field: impl Into<String>,
        value_type: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.filter = Some(FieldFilter {
            field: field.into(),
            value_type: value_type.into(),
            value: value.into(),
        });
        self
    }

    /// Renders the view as the server's view definition string.
    pub fn to_xml(&self) -> String {
        let mut xml = String::from("<View");
        if self.scope == ViewScope::RecursiveAll {
            xml.push_str(" Scope=\"RecursiveAll\"");
        }
        xml.push('>');

        if let Some(filter) = &self.filter {
            xml.push_str(&format!(
                "<Query><Where><Eq><FieldRef Name=\"{}\"/><Value Type=\"{}\">{}</Value></Eq></Where></Query>",
                escape(filter.field.as_str()),
                escape(filter.value_type.as_str()),
                escape(filter.value.as_str())
            ));
        }

        if !self.fields.is_empty() {
            xml.push_str("<ViewFields>");
            for field in &self.fields {
                xml.push_str(&format!("<FieldRef Name=\"{}\"/>", escape(field.as_str())));
            }
            xml.push_str("</ViewFields>");
        }

        if let Some(row_limit) = self.row_limit {
            xml.push_str(&format!("<RowLimit>{}</RowLimit>", row_limit));
        }

        xml.push_str("</View>");
        xml
    }
}

/// One page request: a view plus the cursor to resume from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemQuery {
    pub view: ViewDefinition,
    pub position: Option<PageCursor>,
}

impl ItemQuery {
    pub fn new(view: ViewDefinition, position: Option<PageCursor>) -> Self {
        Self { view, position }
    }

    /// The view definition string a transport sends along with `position`.
    pub fn view_xml(&self) -> String {
        self.view.to_xml()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ItemPage {
    pub entries: Vec<Entry>,
    pub next_cursor: Option<PageCursor>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_view_xml() {
        let view = ViewDefinition::new()
            .with_fields(["ID", "Title"])
            .with_row_limit(3000);
        assert_eq!(
            view.to_xml(),
            "<View><ViewFields><FieldRef Name=\"ID\"/><FieldRef Name=\"Title\"/></ViewFields><RowLimit>3000</RowLimit></View>"
        );
    }

    #[test]
    fn test_recursive_filter_xml_is_escaped() {
        let view = ViewDefinition::new()
            .recursive()
            .where_eq("FileRef", "Url", "/docs/a&b.txt");
        assert_eq!(
            view.to_xml(),
            "<View Scope=\"RecursiveAll\"><Query><Where><Eq><FieldRef Name=\"FileRef\"/><Value Type=\"Url\">/docs/a&amp;b.txt</Value></Eq></Where></Query></View>"
        );
    }

    #[test]
    fn test_item_query_renders_its_view() {
        let query = ItemQuery::new(
            ViewDefinition::new().with_fields(["ID"]).with_row_limit(2),
            Some(PageCursor::new("Paged=TRUE&p_ID=2")),
        );
        assert_eq!(
            query.view_xml(),
            "<View><ViewFields><FieldRef Name=\"ID\"/></ViewFields><RowLimit>2</RowLimit></View>"
        );
    }

    #[test]
    fn test_empty_view() {
        assert_eq!(ViewDefinition::new().to_xml(), "<View></View>");
    }
}
