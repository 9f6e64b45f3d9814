//! Page lifecycle: creation, activation, application switching

use super::MidasOs;
use crate::app::Application;
use crate::error::{MidasError, Result};
use tracing::{debug, info};

/// A named, ordered group of applications
pub struct Page {
    name: String,
    apps: Vec<Box<dyn Application>>,
}

impl Page {
    pub(super) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            apps: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.apps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.apps.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&dyn Application> {
        self.apps.get(index).map(|app| app.as_ref())
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut (dyn Application + 'static)> {
        self.apps.get_mut(index).map(|app| app.as_mut())
    }

    pub(super) fn apps_mut(&mut self) -> &mut [Box<dyn Application>] {
        &mut self.apps
    }

    fn deactivate_all(&mut self) {
        for app in &mut self.apps {
            app.on_deactivate();
        }
    }
}

impl MidasOs {
    /// Create `name` unless it exists; returns whether a page was created
    pub fn add_page(&mut self, name: &str) -> bool {
        if self.page(name).is_some() {
            return false;
        }
        self.pages.push(Page::new(name));
        debug!("Page '{}' added", name);
        true
    }

    /// Append `app` to `page` and return its index
    pub fn add_application(&mut self, page: &str, mut app: Box<dyn Application>) -> Result<usize> {
        let target = self
            .page_mut(page)
            .ok_or_else(|| MidasError::NotFound(format!("page '{}'", page)))?;
        let index = target.apps.len();
        app.on_attach(page, index);
        info!("Application '{}' added to page '{}' at {}", app.name(), page, index);
        target.apps.push(app);
        Ok(index)
    }

    /// Make `name` the active page and notify its applications
    ///
    /// The previous page's applications stay active unless
    /// `deactivate_previous_on_switch` is set.
    pub fn switch_page(&mut self, name: &str) -> Result<()> {
        if self.page(name).is_none() {
            return Err(MidasError::NotFound(format!("page '{}'", name)));
        }

        if self.options.deactivate_previous_on_switch {
            if let Some(previous) = self.active_page.clone().filter(|p| p != name) {
                if let Some(page) = self.page_mut(&previous) {
                    page.deactivate_all();
                }
            }
        }

        self.active_page = Some(name.to_string());
        if let Some(page) = self.page_mut(name) {
            for app in &mut page.apps {
                app.on_page_activate();
            }
        }
        info!("📄 Active page: '{}'", name);
        Ok(())
    }

    /// Deactivate every application on `page`, then activate the one at `index`
    ///
    /// Returns `Ok(false)` without touching anything when the page or index
    /// does not exist.
    pub fn alt_tab(&mut self, page: &str, index: usize) -> Result<bool> {
        let Some(target) = self.page_mut(page) else {
            return Ok(false);
        };
        if index >= target.apps.len() {
            debug!("alt_tab ignored: page '{}' has no application {}", page, index);
            return Ok(false);
        }

        target.deactivate_all();
        let app = &mut target.apps[index];
        app.on_activate()?;
        info!("Application '{}' focused on page '{}'", app.name(), page);
        Ok(true)
    }

    /// Deactivate and drop every application on `name`, then remove the page
    pub fn close_page(&mut self, name: &str) -> bool {
        let Some(position) = self.pages.iter().position(|p| p.name() == name) else {
            return false;
        };

        let mut page = self.pages.remove(position);
        page.deactivate_all();
        if self.active_page.as_deref() == Some(name) {
            self.active_page = None;
        }
        info!("Page '{}' closed ({} applications dropped)", name, page.len());
        true
    }

    /// Create `name` if absent; applications must be added again
    pub fn open_page(&mut self, name: &str) -> bool {
        self.add_page(name)
    }
}
