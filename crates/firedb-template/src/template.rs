//! A handlebars template bound to one page region.

use std::sync::Arc;

use handlebars::Handlebars;
use serde_json::{Map, Value};
use tracing::{debug, error, instrument};

use crate::error::{Result, TemplateError};
use crate::page::Page;
use crate::source::TemplateSource;

/// Name the fetched template is registered under.
const TEMPLATE_NAME: &str = "main";

/// A template that renders data into one region of a [`Page`].
///
/// The template can be fetched and rendered in one step
/// ([`display_main`](Template::display_main)), or fetched first
/// ([`prepare`](Template::prepare)) and rendered later with new data
/// ([`display_after`](Template::display_after)).
///
/// # Example
///
/// ```no_run
/// # async fn run() -> firedb_template::Result<()> {
/// use std::sync::Arc;
/// use firedb_template::{FileSource, Page, Template};
/// use serde_json::json;
///
/// let page = Arc::new(Page::with_regions(["menu"]));
/// let mut menu = Template::new(
///     "templates/menu.hbs",
///     "menu",
///     json!({"items": ["Home", "About"]}),
///     Arc::new(FileSource::new()),
///     page.clone(),
/// )?;
/// menu.display_main().await?;
/// # Ok(())
/// # }
/// ```
pub struct Template {
    path: String,
    placeholder: String,
    data: Map<String, Value>,
    source: Arc<dyn TemplateSource>,
    page: Arc<Page>,
    registry: Handlebars<'static>,
    fetched: bool,
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn into_object(value: Value) -> Result<Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(TemplateError::NotAnObject { kind: kind(&other) }),
    }
}

impl Template {
    /// Bind a template resource to a page region with initial data.
    ///
    /// Fails if `data` is not a JSON object.
    pub fn new(
        path: impl Into<String>,
        placeholder: impl Into<String>,
        data: Value,
        source: Arc<dyn TemplateSource>,
        page: Arc<Page>,
    ) -> Result<Self> {
        let data = into_object(data).inspect_err(|e| error!(error = %e, "Rejected template data"))?;
        Ok(Self {
            path: path.into(),
            placeholder: placeholder.into(),
            data,
            source,
            page,
            registry: Handlebars::new(),
            fetched: false,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    /// Current template data.
    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    /// Whether the template text has been fetched.
    pub fn is_fetched(&self) -> bool {
        self.fetched
    }

    /// Fetch the template without rendering it.
    #[instrument(skip(self), fields(path = %self.path, placeholder = %self.placeholder))]
    pub async fn prepare(&mut self) -> Result<()> {
        self.check_placeholder()?;
        self.fetch().await
    }

    /// Fetch the template and render it with the current data.
    #[instrument(skip(self), fields(path = %self.path, placeholder = %self.placeholder))]
    pub async fn display_main(&mut self) -> Result<()> {
        self.check_placeholder()?;
        self.fetch().await?;
        self.render()
    }

    /// Replace the data and render the fetched template again.
    ///
    /// `None` renders with an empty object.
    pub fn display_after(&mut self, data: Option<Value>) -> Result<()> {
        let data = data.unwrap_or_else(|| Value::Object(Map::new()));
        self.data = into_object(data).inspect_err(|e| error!(error = %e, "Rejected template data"))?;
        self.render()
    }

    pub fn make_visible(&self) -> Result<()> {
        self.page.set_visible(&self.placeholder, true)
    }

    pub fn make_invisible(&self) -> Result<()> {
        self.page.set_visible(&self.placeholder, false)
    }

    fn check_placeholder(&self) -> Result<()> {
        if self.page.has_region(&self.placeholder) {
            Ok(())
        } else {
            let err = TemplateError::PlaceholderNotFound {
                id: self.placeholder.clone(),
            };
            error!(error = %err, "Template target missing");
            Err(err)
        }
    }

    async fn fetch(&mut self) -> Result<()> {
        let text = self
            .source
            .fetch(&self.path)
            .await
            .inspect_err(|e| error!(error = %e, "Template fetch failed"))?;

        self.registry
            .register_template_string(TEMPLATE_NAME, text)
            .map_err(|e| TemplateError::Compile {
                path: self.path.clone(),
                message: e.to_string(),
            })?;
        self.fetched = true;
        debug!("Template fetched");
        Ok(())
    }

    fn render(&self) -> Result<()> {
        if !self.fetched {
            return Err(TemplateError::NotFetched {
                path: self.path.clone(),
            });
        }
        let html = self
            .registry
            .render(TEMPLATE_NAME, &self.data)
            .map_err(|e| TemplateError::Render {
                message: e.to_string(),
            })?;
        self.page.set_html(&self.placeholder, html)
    }
}

impl std::fmt::Debug for Template {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Template")
            .field("path", &self.path)
            .field("placeholder", &self.placeholder)
            .field("fetched", &self.fetched)
            .finish()
    }
}
